use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::attendance::AttendanceStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveKind {
    Leave,
    Sick,
    Duty,
}

impl LeaveKind {
    /// Attendance classification written for each reconciled day.
    pub fn attendance_status(&self) -> AttendanceStatus {
        match self {
            LeaveKind::Leave => AttendanceStatus::Leave,
            LeaveKind::Sick => AttendanceStatus::Sick,
            LeaveKind::Duty => AttendanceStatus::Permission,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// Leave request as read back from storage. Owned by the leave CRUD surface;
/// the attendance core consumes it on approval and when building reports.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    pub kind: LeaveKind,
    #[schema(example = "2025-06-10", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2025-06-12", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    #[schema(example = "family matter")]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_attendance_status() {
        assert_eq!(LeaveKind::Leave.attendance_status(), AttendanceStatus::Leave);
        assert_eq!(LeaveKind::Sick.attendance_status(), AttendanceStatus::Sick);
        assert_eq!(LeaveKind::Duty.attendance_status(), AttendanceStatus::Permission);
    }

    #[test]
    fn kind_parses_lowercase() {
        assert_eq!("duty".parse::<LeaveKind>().unwrap(), LeaveKind::Duty);
        assert_eq!("approved".parse::<LeaveStatus>().unwrap(), LeaveStatus::Approved);
    }
}
