use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

use super::engine::Rejection;
use super::repo::AttendanceRepo;

/// Upper bound on employees folded into one all-employees report request.
pub const MAX_REPORT_BATCH: u32 = 200;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyDetail {
    #[schema(example = "2025-06-10", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkin_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkout_at: Option<DateTime<Utc>>,
    pub note: String,
    /// True when the entry was expanded from an approved leave span rather
    /// than read from an attendance row.
    pub synthesized: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyReport {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 6)]
    pub month: u32,
    pub total_present: u32,
    pub total_sick: u32,
    pub total_leave: u32,
    pub daily_detail: Vec<DailyDetail>,
}

/// Read-only fold of a month of attendance rows and approved leave spans
/// into per-status counters and a merged, date-sorted detail list.
pub struct ReportAggregator<R> {
    repo: R,
    batch_limit: u32,
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_month.pred_opt()?))
}

impl<R: AttendanceRepo> ReportAggregator<R> {
    pub fn new(repo: R, batch_limit: u32) -> Self {
        Self {
            repo,
            batch_limit: batch_limit.min(MAX_REPORT_BATCH),
        }
    }

    pub async fn monthly_report(
        &self,
        employee_id: u64,
        year: i32,
        month: u32,
    ) -> Result<MonthlyReport, Rejection> {
        let (first, last) = month_bounds(year, month).ok_or(Rejection::InvalidPeriod)?;

        let records = self
            .repo
            .find_records_in_range(employee_id, first, last)
            .await?;
        let spans = self
            .repo
            .find_approved_leave_spans(employee_id, first, last)
            .await?;

        let mut merged: BTreeMap<NaiveDate, DailyDetail> = BTreeMap::new();

        // synthesized entries first, clamped to the month
        for span in &spans {
            let status = span.kind.attendance_status();
            let note = span
                .note
                .clone()
                .unwrap_or_else(|| format!("{} approved", span.kind));
            let mut day = span.start_date.max(first);
            let until = span.end_date.min(last);
            while day <= until {
                merged.insert(
                    day,
                    DailyDetail {
                        date: day,
                        status,
                        checkin_at: None,
                        checkout_at: None,
                        note: note.clone(),
                        synthesized: true,
                    },
                );
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }

        // actual rows take precedence over anything synthesized
        for record in &records {
            merged.insert(record.date, detail_from_record(record));
        }

        let mut report = MonthlyReport {
            employee_id,
            year,
            month,
            total_present: 0,
            total_sick: 0,
            total_leave: 0,
            daily_detail: Vec::with_capacity(merged.len()),
        };
        for detail in merged.into_values() {
            match detail.status {
                AttendanceStatus::Present => report.total_present += 1,
                AttendanceStatus::Sick => report.total_sick += 1,
                AttendanceStatus::Leave | AttendanceStatus::Permission => {
                    report.total_leave += 1
                }
            }
            report.daily_detail.push(detail);
        }
        Ok(report)
    }

    /// The monthly fold mapped over every active employee, bounded by the
    /// configured batch limit.
    pub async fn all_employees_report(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<MonthlyReport>, Rejection> {
        month_bounds(year, month).ok_or(Rejection::InvalidPeriod)?;
        let ids = self.repo.list_active_employee_ids(self.batch_limit).await?;
        let mut reports = Vec::with_capacity(ids.len());
        for employee_id in ids {
            reports.push(self.monthly_report(employee_id, year, month).await?);
        }
        Ok(reports)
    }
}

fn detail_from_record(record: &AttendanceRecord) -> DailyDetail {
    DailyDetail {
        date: record.date,
        status: record.status,
        checkin_at: record.checkin_at,
        checkout_at: record.checkout_at,
        note: record.note.clone(),
        synthesized: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repo::memory::InMemoryRepo;
    use crate::model::attendance::NewAttendanceRecord;
    use crate::model::leave::{LeaveKind, LeaveRequest, LeaveStatus};
    use chrono::{TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    async fn seed_present(repo: &InMemoryRepo, employee_id: u64, day: u32) {
        repo.create_record(NewAttendanceRecord {
            employee_id,
            date: date(day),
            status: AttendanceStatus::Present,
            checkin_at: Some(Utc.with_ymd_and_hms(2025, 6, day, 1, 0, 0).unwrap()),
            checkin_location: None,
            note: "on time".into(),
        })
        .await
        .unwrap();
    }

    fn approved_leave(employee_id: u64, start: u32, end: u32, kind: LeaveKind) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id,
            kind,
            start_date: date(start),
            end_date: date(end),
            status: LeaveStatus::Approved,
            note: None,
        }
    }

    #[tokio::test]
    async fn counts_and_ordering() {
        let repo = InMemoryRepo::new();
        seed_present(&repo, 7, 3).await;
        seed_present(&repo, 7, 2).await;
        repo.create_record(NewAttendanceRecord {
            employee_id: 7,
            date: date(5),
            status: AttendanceStatus::Sick,
            checkin_at: None,
            checkin_location: None,
            note: "sick approved".into(),
        })
        .await
        .unwrap();
        repo.add_leave(approved_leave(7, 10, 11, LeaveKind::Leave));

        let report = ReportAggregator::new(repo, MAX_REPORT_BATCH)
            .monthly_report(7, 2025, 6)
            .await
            .unwrap();

        assert_eq!(report.total_present, 2);
        assert_eq!(report.total_sick, 1);
        assert_eq!(report.total_leave, 2);

        let dates: Vec<_> = report.daily_detail.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2), date(3), date(5), date(10), date(11)]);
        assert!(report.daily_detail[3].synthesized);
    }

    #[tokio::test]
    async fn record_takes_precedence_over_synthesized_entry() {
        let repo = InMemoryRepo::new();
        seed_present(&repo, 7, 11).await;
        repo.add_leave(approved_leave(7, 10, 12, LeaveKind::Leave));

        let report = ReportAggregator::new(repo, MAX_REPORT_BATCH)
            .monthly_report(7, 2025, 6)
            .await
            .unwrap();

        let day11 = report
            .daily_detail
            .iter()
            .find(|d| d.date == date(11))
            .unwrap();
        assert_eq!(day11.status, AttendanceStatus::Present);
        assert!(!day11.synthesized);

        assert_eq!(report.total_present, 1);
        assert_eq!(report.total_leave, 2);
    }

    #[tokio::test]
    async fn leave_span_is_clamped_to_the_month() {
        let repo = InMemoryRepo::new();
        // span runs from late May into June
        repo.add_leave(LeaveRequest {
            id: 2,
            employee_id: 7,
            kind: LeaveKind::Duty,
            start_date: NaiveDate::from_ymd_opt(2025, 5, 29).unwrap(),
            end_date: date(2),
            status: LeaveStatus::Approved,
            note: Some("offsite assignment".into()),
        });

        let report = ReportAggregator::new(repo, MAX_REPORT_BATCH)
            .monthly_report(7, 2025, 6)
            .await
            .unwrap();

        let dates: Vec<_> = report.daily_detail.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(1), date(2)]);
        // duty counts toward the leave bucket
        assert_eq!(report.total_leave, 2);
    }

    #[tokio::test]
    async fn invalid_month_is_rejected() {
        let repo = InMemoryRepo::new();
        let result = ReportAggregator::new(repo, MAX_REPORT_BATCH)
            .monthly_report(7, 2025, 13)
            .await;
        assert!(matches!(result, Err(Rejection::InvalidPeriod)));
    }

    #[tokio::test]
    async fn december_bounds() {
        let (first, last) = month_bounds(2025, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[tokio::test]
    async fn all_employees_respects_batch_limit() {
        let repo = InMemoryRepo::new();
        repo.set_employee_ids((1..=10).collect());
        seed_present(&repo, 1, 2).await;

        let reports = ReportAggregator::new(repo, 3)
            .all_employees_report(2025, 6)
            .await
            .unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].total_present, 1);
        assert_eq!(reports[1].total_present, 0);
    }
}
