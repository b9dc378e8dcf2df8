use crate::api::attendance::{BatchTokenPayload, CheckInPayload, CheckOutPayload};
use crate::api::leave::CreateLeave;
use crate::core::qr::QrPurpose;
use crate::core::report::{DailyDetail, MonthlyReport};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoPoint};
use crate::model::leave::{LeaveKind, LeaveStatus};
use crate::model::office::OfficeLocation;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Presensi Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance & Leave Service

QR-based employee attendance with geofence validation, leave reconciliation
and monthly reporting.

### 🔹 Key Features
- **Attendance**
  - QR-token check-in and check-out with office geofence validation
  - Lateness annotation against a configurable cutoff
- **QR Tokens**
  - HMAC-signed batch tokens (admin-set expiry) and short-lived record tokens
- **Leave**
  - Submit, approve and reject requests; approval reconciles the span into
    attendance rows without overwriting existing days
- **Reports**
  - Per-employee and all-employee monthly summaries with per-status counters

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication** issued by the
identity service. Approvals and batch tokens require **Admin** or **HR**.

### 📦 Response Format
- JSON-based RESTful responses; rejections carry a human-readable `message`
"#
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::issue_batch_qr,
        crate::api::attendance::issue_record_qr,
        crate::api::leave::create_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::report::monthly_report,
        crate::api::report::all_employees_report,
    ),
    components(schemas(
        CheckInPayload,
        CheckOutPayload,
        BatchTokenPayload,
        CreateLeave,
        AttendanceRecord,
        AttendanceStatus,
        GeoPoint,
        OfficeLocation,
        LeaveKind,
        LeaveStatus,
        QrPurpose,
        MonthlyReport,
        DailyDetail,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, check-out and QR tokens"),
        (name = "Leave", description = "Leave requests and approval"),
        (name = "Report", description = "Monthly attendance reports")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
