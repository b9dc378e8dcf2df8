pub mod attendance;
pub mod leave;
pub mod report;

use actix_web::HttpResponse;

use crate::core::clock::SystemClock;
use crate::core::engine::{AttendanceEngine, Rejection};
use crate::core::reconcile::LeaveReconciler;
use crate::core::repo::MySqlAttendanceRepo;
use crate::core::report::ReportAggregator;

pub type LiveEngine = AttendanceEngine<MySqlAttendanceRepo, SystemClock>;
pub type LiveReconciler = LeaveReconciler<MySqlAttendanceRepo>;
pub type LiveReports = ReportAggregator<MySqlAttendanceRepo>;

/// Maps a core rejection onto a transport response. Every rejection renders
/// the same `{"message": ...}` shape as the success path so clients can show
/// it directly; `OutOfRange` additionally carries the computed distance and
/// the configured radius.
pub fn rejection_response(rejection: Rejection) -> HttpResponse {
    match &rejection {
        Rejection::Forbidden => HttpResponse::Forbidden().json(serde_json::json!({
            "message": rejection.to_string()
        })),
        Rejection::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure surfaced to client");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Internal Server Error"
            }))
        }
        Rejection::OutOfRange { distance_meters, radius_meters } => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "message": rejection.to_string(),
                "distance_meters": distance_meters,
                "radius_meters": radius_meters,
            }))
        }
        _ => HttpResponse::BadRequest().json(serde_json::json!({
            "message": rejection.to_string()
        })),
    }
}
