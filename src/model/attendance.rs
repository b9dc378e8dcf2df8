use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Daily attendance classification. `Present` rows carry timestamps and
/// geolocation; the other statuses are written without either, whether they
/// arrive through check-in or through leave reconciliation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Leave,
    Permission,
    Sick,
}

/// WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = -6.2)]
    pub latitude: f64,
    #[schema(example = 106.8)]
    pub longitude: f64,
}

/// One employee-day of attendance. At most one open (`checkout_at` null)
/// row exists per (employee_id, date); the storage schema carries a unique
/// key on that pair.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkin_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkout_at: Option<DateTime<Utc>>,
    pub checkin_location: Option<GeoPoint>,
    pub checkout_location: Option<GeoPoint>,
    #[schema(example = "on time")]
    pub note: String,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.checkout_at.is_none()
    }

    /// Only rows that were actually clocked in can be closed. Rows
    /// synthesized by leave reconciliation have no `checkin_at` and never
    /// accept a check-out.
    pub fn is_closeable(&self) -> bool {
        self.checkin_at.is_some() && self.checkout_at.is_none()
    }
}

/// Creation shape handed to the repository; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewAttendanceRecord {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub checkin_at: Option<DateTime<Utc>>,
    pub checkin_location: Option<GeoPoint>,
    pub note: String,
}
