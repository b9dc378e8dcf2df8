use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::{
    attendance::{AttendanceRecord, NewAttendanceRecord},
    leave::{LeaveRequest, LeaveStatus},
};

use super::engine::Rejection;
use super::repo::{AttendanceRepo, RepoError};

/// Synthesizes attendance rows for the days of an approved leave request.
/// First-write-wins: days the employee already has a record for are left
/// untouched, and the batch insert is all-or-nothing so a mid-span storage
/// failure never leaves a half-populated month.
pub struct LeaveReconciler<R> {
    repo: R,
}

impl<R: AttendanceRepo> LeaveReconciler<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the rows actually created, which may be empty when every day
    /// in the span was already covered.
    pub async fn on_approved(
        &self,
        leave: &LeaveRequest,
    ) -> Result<Vec<AttendanceRecord>, Rejection> {
        if leave.status != LeaveStatus::Approved {
            tracing::warn!(leave_id = leave.id, status = %leave.status, "reconciliation skipped for non-approved leave");
            return Ok(Vec::new());
        }

        let existing = self
            .repo
            .find_records_in_range(leave.employee_id, leave.start_date, leave.end_date)
            .await?;
        let covered: HashSet<NaiveDate> = existing.iter().map(|r| r.date).collect();

        let status = leave.kind.attendance_status();
        let note = leave
            .note
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{} approved", leave.kind));

        let mut missing = Vec::new();
        let mut day = leave.start_date;
        while day <= leave.end_date {
            if !covered.contains(&day) {
                missing.push(NewAttendanceRecord {
                    employee_id: leave.employee_id,
                    date: day,
                    status,
                    checkin_at: None,
                    checkin_location: None,
                    note: note.clone(),
                });
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let created = match self.repo.create_records_atomic(missing).await {
            Ok(rows) => rows,
            // a check-in raced the batch insert; covered days are recomputed
            // on the next attempt, so the caller can simply retry
            Err(RepoError::Duplicate) => return Err(Rejection::ReconcileConflict),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            leave_id = leave.id,
            employee_id = leave.employee_id,
            days = created.len(),
            "leave reconciled into attendance"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repo::memory::InMemoryRepo;
    use crate::model::attendance::AttendanceStatus;
    use crate::model::leave::LeaveKind;
    use chrono::{TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn leave(status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 7,
            kind: LeaveKind::Leave,
            start_date: date(10),
            end_date: date(12),
            status,
            note: None,
        }
    }

    #[tokio::test]
    async fn approved_span_creates_one_row_per_day() {
        let repo = InMemoryRepo::new();
        let created = LeaveReconciler::new(repo.clone())
            .on_approved(&leave(LeaveStatus::Approved))
            .await
            .unwrap();

        assert_eq!(created.len(), 3);
        let dates: Vec<_> = created.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(10), date(11), date(12)]);
        for record in &created {
            assert_eq!(record.status, AttendanceStatus::Leave);
            assert!(record.checkin_at.is_none());
            assert!(record.checkout_at.is_none());
            assert!(record.checkin_location.is_none());
            assert_eq!(record.note, "leave approved");
        }
    }

    #[tokio::test]
    async fn existing_day_is_never_overwritten() {
        let repo = InMemoryRepo::new();
        let present = repo
            .create_record(NewAttendanceRecord {
                employee_id: 7,
                date: date(11),
                status: AttendanceStatus::Present,
                checkin_at: Some(Utc.with_ymd_and_hms(2025, 6, 11, 1, 0, 0).unwrap()),
                checkin_location: None,
                note: "on time".into(),
            })
            .await
            .unwrap();

        let created = LeaveReconciler::new(repo.clone())
            .on_approved(&leave(LeaveStatus::Approved))
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|r| r.date != date(11)));

        let kept = repo
            .find_record(present.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.status, AttendanceStatus::Present);
        assert_eq!(kept.note, "on time");
    }

    #[tokio::test]
    async fn pending_leave_is_ignored() {
        let repo = InMemoryRepo::new();
        let created = LeaveReconciler::new(repo.clone())
            .on_approved(&leave(LeaveStatus::Pending))
            .await
            .unwrap();
        assert!(created.is_empty());
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn duty_leave_writes_permission_rows() {
        let repo = InMemoryRepo::new();
        let mut l = leave(LeaveStatus::Approved);
        l.kind = LeaveKind::Duty;
        l.note = Some("client site visit".into());
        let created = LeaveReconciler::new(repo).on_approved(&l).await.unwrap();
        assert!(created.iter().all(|r| r.status == AttendanceStatus::Permission));
        assert!(created.iter().all(|r| r.note == "client site visit"));
    }

    #[tokio::test]
    async fn storage_failure_leaves_nothing_behind() {
        let repo = InMemoryRepo::new();
        repo.fail_next_batch();
        let result = LeaveReconciler::new(repo.clone())
            .on_approved(&leave(LeaveStatus::Approved))
            .await;
        assert!(matches!(result, Err(Rejection::Storage(_))));
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn failed_reconciliation_can_be_retried() {
        let repo = InMemoryRepo::new();
        repo.fail_next_batch();
        let reconciler = LeaveReconciler::new(repo.clone());
        let request = leave(LeaveStatus::Approved);

        let first = reconciler.on_approved(&request).await;
        assert!(matches!(first, Err(Rejection::Storage(_))));
        assert!(repo.records().is_empty());

        // the request is still approved with no rows; a second run completes
        let created = reconciler.on_approved(&request).await.unwrap();
        assert_eq!(created.len(), 3);
    }

    #[tokio::test]
    async fn insert_race_surfaces_as_conflict() {
        let repo = InMemoryRepo::new();
        repo.conflict_next_batch();
        let result = LeaveReconciler::new(repo.clone())
            .on_approved(&leave(LeaveStatus::Approved))
            .await;
        assert_eq!(result.unwrap_err(), Rejection::ReconcileConflict);
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn single_day_span() {
        let repo = InMemoryRepo::new();
        let mut l = leave(LeaveStatus::Approved);
        l.end_date = l.start_date;
        let created = LeaveReconciler::new(repo).on_approved(&l).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].date, date(10));
    }
}
