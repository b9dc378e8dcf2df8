use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::{LiveEngine, rejection_response};
use crate::auth::auth::AuthUser;
use crate::core::engine::{CheckInAction, CheckOutAction, Identity};
use crate::core::qr::{INDIVIDUAL_TOKEN_TTL_SECS, QrPurpose};
use crate::model::attendance::{AttendanceStatus, GeoPoint};

#[derive(Deserialize, ToSchema)]
pub struct CheckInPayload {
    /// QR token scanned by the employee
    pub token: String,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
    #[schema(example = -6.20005)]
    pub latitude: Option<f64>,
    #[schema(example = 106.80005)]
    pub longitude: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutPayload {
    /// QR token (batch or individual); may be omitted with `record_id`
    pub token: Option<String>,
    /// Explicit attendance record reference, scoped to the caller and today
    pub record_id: Option<u64>,
    #[schema(example = -6.20005)]
    pub latitude: Option<f64>,
    #[schema(example = 106.80005)]
    pub longitude: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct BatchTokenPayload {
    pub purpose: QrPurpose,
    #[schema(example = "2026-01-05T10:00:00Z", value_type = String, format = "date-time")]
    pub expires_at: DateTime<Utc>,
}

fn fold_location(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
        _ => None,
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInPayload,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Invalid token, already checked in, or outside the office radius"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    engine: web::Data<LiveEngine>,
    payload: web::Json<CheckInPayload>,
) -> actix_web::Result<impl Responder> {
    tracing::debug!(user_id = auth.user_id, user = %auth.username, "check-in requested");
    let identity = auth.identity()?;
    let payload = payload.into_inner();
    let action = CheckInAction {
        token: payload.token,
        status: payload.status,
        location: fold_location(payload.latitude, payload.longitude),
    };

    match engine.check_in(&identity, action).await {
        Ok(record) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Checked in successfully",
            "record": record,
        }))),
        Err(rejection) => Ok(rejection_response(rejection)),
    }
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = CheckOutPayload,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No open record, already checked out, or outside the office radius"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    engine: web::Data<LiveEngine>,
    payload: web::Json<CheckOutPayload>,
) -> actix_web::Result<impl Responder> {
    let identity = auth.identity()?;
    let payload = payload.into_inner();
    let action = CheckOutAction {
        token: payload.token,
        record_id: payload.record_id,
        location: fold_location(payload.latitude, payload.longitude),
    };

    match engine.check_out(&identity, action).await {
        Ok(record) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Checked out successfully",
            "record": record,
        }))),
        Err(rejection) => Ok(rejection_response(rejection)),
    }
}

/// Issue a time-boxed batch QR token (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/attendance/qr/batch",
    request_body = BatchTokenPayload,
    responses(
        (status = 200, description = "Batch token issued"),
        (status = 400, description = "Expiry lies in the past"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn issue_batch_qr(
    auth: AuthUser,
    engine: web::Data<LiveEngine>,
    payload: web::Json<BatchTokenPayload>,
) -> actix_web::Result<impl Responder> {
    // administrative callers are not required to have an employee profile
    let identity = Identity {
        employee_id: auth.employee_id.unwrap_or(0),
        role: auth.role,
    };

    match engine
        .issue_batch_token(&identity, payload.purpose, payload.expires_at)
        .await
    {
        Ok((token, batch_id)) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Batch token issued",
            "token": token,
            "batch_id": batch_id,
            "expires_at": payload.expires_at,
        }))),
        Err(rejection) => Ok(rejection_response(rejection)),
    }
}

/// Issue an individual check-out token for the caller's open record
#[utoipa::path(
    post,
    path = "/api/v1/attendance/qr/record/{record_id}",
    params(
        ("record_id" = u64, Path, description = "Open attendance record owned by the caller")
    ),
    responses(
        (status = 200, description = "Record token issued"),
        (status = 400, description = "Record missing, foreign, or already closed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn issue_record_qr(
    auth: AuthUser,
    engine: web::Data<LiveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let identity = auth.identity()?;
    let record_id = path.into_inner();

    match engine.issue_record_token(&identity, record_id).await {
        Ok(token) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Record token issued",
            "token": token,
            "expires_in_secs": INDIVIDUAL_TOKEN_TTL_SECS,
        }))),
        Err(rejection) => Ok(rejection_response(rejection)),
    }
}
