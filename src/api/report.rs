use actix_web::{HttpResponse, Responder, web};

use crate::api::{LiveReports, rejection_response};
use crate::auth::auth::AuthUser;
use crate::model::role::Role;

/// Monthly attendance report for one employee. Employees may only fetch
/// their own; HR/Admin may fetch anyone's.
#[utoipa::path(
    get,
    path = "/api/v1/report/{employee_id}/{year}/{month}",
    params(
        ("employee_id" = u64, Path, description = "Employee the report covers"),
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = u32, Path, description = "Calendar month (1-12)")
    ),
    responses(
        (status = 200, description = "Monthly report", body = crate::core::report::MonthlyReport),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn monthly_report(
    auth: AuthUser,
    reports: web::Data<LiveReports>,
    path: web::Path<(u64, i32, u32)>,
) -> actix_web::Result<impl Responder> {
    let (employee_id, year, month) = path.into_inner();

    if auth.role == Role::Employee && auth.employee_id != Some(employee_id) {
        return Err(actix_web::error::ErrorForbidden("Own report only"));
    }

    match reports.monthly_report(employee_id, year, month).await {
        Ok(report) => Ok(HttpResponse::Ok().json(report)),
        Err(rejection) => Ok(rejection_response(rejection)),
    }
}

/// Monthly report across all active employees (HR/Admin), bounded by the
/// configured batch limit.
#[utoipa::path(
    get,
    path = "/api/v1/report/{year}/{month}",
    params(
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = u32, Path, description = "Calendar month (1-12)")
    ),
    responses(
        (status = 200, description = "Reports for active employees", body = Vec<crate::core::report::MonthlyReport>),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn all_employees_report(
    auth: AuthUser,
    reports: web::Data<LiveReports>,
    path: web::Path<(i32, u32)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (year, month) = path.into_inner();
    match reports.all_employees_report(year, month).await {
        Ok(list) => {
            let count = list.len();
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "data": list,
                "count": count,
            })))
        }
        Err(rejection) => Ok(rejection_response(rejection)),
    }
}
