use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, GeoPoint, NewAttendanceRecord},
    role::Role,
};

use super::clock::{Clock, TemporalContext};
use super::geo;
use super::qr::{QrCodec, QrPurpose, TokenFault};
use super::repo::{AttendanceRepo, RepoError};

/// Verified caller identity, handed in by the authentication layer. The
/// engine trusts it verbatim and never re-derives the role from storage.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub employee_id: u64,
    pub role: Role,
}

/// Why an operation was refused. Every variant renders to a human-readable
/// message so the transport layer can hand it straight to a client.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum Rejection {
    #[display(fmt = "This action is restricted to employee accounts")]
    Forbidden,
    #[display(fmt = "Invalid QR token: {}", _0)]
    InvalidToken(TokenFault),
    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "No open attendance record found for today")]
    NoOpenRecord,
    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,
    #[display(fmt = "A location is required for present attendance")]
    LocationRequired,
    #[display(fmt = "No office location has been configured")]
    NoOfficeConfigured,
    #[display(
        fmt = "Outside the office radius: {:.0} m away, allowed {:.0} m",
        distance_meters,
        radius_meters
    )]
    OutOfRange {
        distance_meters: f64,
        radius_meters: f64,
    },
    #[display(fmt = "Attendance status not accepted for this action")]
    InvalidStatus,
    #[display(fmt = "Attendance changed while reconciling the leave span; retry the approval")]
    ReconcileConflict,
    #[display(fmt = "Invalid reporting period")]
    InvalidPeriod,
    #[display(fmt = "Storage failure: {}", _0)]
    Storage(String),
}

impl From<RepoError> for Rejection {
    fn from(e: RepoError) -> Self {
        match e {
            // the unique key on (employee_id, date) is the storage-level
            // backstop for the open-record precondition
            RepoError::Duplicate => Rejection::AlreadyCheckedIn,
            RepoError::Storage(msg) => Rejection::Storage(msg),
        }
    }
}

impl From<TokenFault> for Rejection {
    fn from(fault: TokenFault) -> Self {
        Rejection::InvalidToken(fault)
    }
}

#[derive(Debug, Clone)]
pub struct CheckInAction {
    pub token: String,
    pub status: AttendanceStatus,
    pub location: Option<GeoPoint>,
}

/// The target record resolves through a batch token (the caller's open
/// record for today), an individual token (bound record id), or an explicit
/// record reference; the reference is always scoped to the caller.
#[derive(Debug, Clone, Default)]
pub struct CheckOutAction {
    pub token: Option<String>,
    pub record_id: Option<u64>,
    pub location: Option<GeoPoint>,
}

const DEFAULT_CHECKIN_NOTE: &str = "on time";

/// Check-in/check-out state machine. Checks run in a fixed order, cheapest
/// and most security-relevant first: role, then token, then record state,
/// then geography. An unauthorized or replayed request never learns its
/// distance from the office.
pub struct AttendanceEngine<R, C> {
    repo: R,
    clock: C,
    temporal: TemporalContext,
    qr: QrCodec,
    late_cutoff: (u32, u32),
    day_locks: Cache<(u64, NaiveDate), Arc<Mutex<()>>>,
}

impl<R: AttendanceRepo, C: Clock> AttendanceEngine<R, C> {
    pub fn new(
        repo: R,
        clock: C,
        temporal: TemporalContext,
        qr: QrCodec,
        late_cutoff: (u32, u32),
    ) -> Self {
        Self {
            repo,
            clock,
            temporal,
            qr,
            late_cutoff,
            day_locks: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(86_400))
                .build(),
        }
    }

    /// Serializes the check-then-create sequence per (employee, day); the
    /// storage unique key remains the final arbiter.
    async fn day_lock(&self, employee_id: u64, date: NaiveDate) -> Arc<Mutex<()>> {
        self.day_locks
            .get_with((employee_id, date), async { Arc::new(Mutex::new(())) })
            .await
    }

    pub async fn check_in(
        &self,
        identity: &Identity,
        action: CheckInAction,
    ) -> Result<AttendanceRecord, Rejection> {
        if !identity.role.is_employee_class() {
            return Err(Rejection::Forbidden);
        }

        let now = self.clock.now_utc();
        let claims = self.qr.decode(&action.token)?;
        self.qr.validate(&claims, QrPurpose::CheckIn, now)?;

        let today = self.temporal.date_key(now);
        let lock = self.day_lock(identity.employee_id, today).await;
        let _held = lock.lock().await;

        if self
            .repo
            .find_open_record(identity.employee_id, today)
            .await?
            .is_some()
        {
            return Err(Rejection::AlreadyCheckedIn);
        }

        let (location, note) = match action.status {
            AttendanceStatus::Present => {
                let point = action.location.ok_or(Rejection::LocationRequired)?;
                let office = self
                    .repo
                    .find_office_location()
                    .await?
                    .ok_or(Rejection::NoOfficeConfigured)?;
                let distance = geo::distance_between(point, office.location());
                if distance > office.radius_meters {
                    return Err(Rejection::OutOfRange {
                        distance_meters: distance,
                        radius_meters: office.radius_meters,
                    });
                }
                let note = if self.temporal.is_late(now, self.late_cutoff.0, self.late_cutoff.1) {
                    format!("late check-in at {}", self.temporal.localize(now).format("%H:%M"))
                } else {
                    DEFAULT_CHECKIN_NOTE.to_string()
                };
                (Some(point), note)
            }
            // location is dropped for non-present statuses, no geofence check
            AttendanceStatus::Leave | AttendanceStatus::Permission => {
                (None, format!("{} recorded at check-in", action.status))
            }
            // sick rows are only ever written by leave reconciliation
            AttendanceStatus::Sick => return Err(Rejection::InvalidStatus),
        };

        let record = self
            .repo
            .create_record(NewAttendanceRecord {
                employee_id: identity.employee_id,
                date: today,
                status: action.status,
                checkin_at: Some(now),
                checkin_location: location,
                note,
            })
            .await?;

        tracing::info!(
            employee_id = identity.employee_id,
            date = %record.date,
            status = %record.status,
            "check-in recorded"
        );
        Ok(record)
    }

    pub async fn check_out(
        &self,
        identity: &Identity,
        action: CheckOutAction,
    ) -> Result<AttendanceRecord, Rejection> {
        if !identity.role.is_employee_class() {
            return Err(Rejection::Forbidden);
        }

        let now = self.clock.now_utc();
        let today = self.temporal.date_key(now);

        let target = match (&action.token, action.record_id) {
            (Some(token), _) => {
                let claims = self.qr.decode(token)?;
                self.qr.validate(&claims, QrPurpose::CheckOut, now)?;
                match claims.record_id {
                    Some(id) => self.repo.find_record(id).await?,
                    // batch token: the caller's own open record for today
                    None => self.repo.find_open_record(identity.employee_id, today).await?,
                }
            }
            (None, Some(id)) => self.repo.find_record(id).await?,
            (None, None) => self.repo.find_open_record(identity.employee_id, today).await?,
        };

        let Some(record) = target else {
            return Err(Rejection::NoOpenRecord);
        };
        if record.employee_id != identity.employee_id || record.date != today {
            return Err(Rejection::NoOpenRecord);
        }
        if record.checkout_at.is_some() {
            return Err(Rejection::AlreadyCheckedOut);
        }
        // rows synthesized by leave reconciliation have no check-in and are
        // never closed
        if !record.is_closeable() {
            return Err(Rejection::NoOpenRecord);
        }

        let local = self.temporal.localize(now).format("%H:%M");
        let (location, note_line) = if record.status == AttendanceStatus::Present {
            let point = action.location.ok_or(Rejection::LocationRequired)?;
            let office = self
                .repo
                .find_office_location()
                .await?
                .ok_or(Rejection::NoOfficeConfigured)?;
            let distance = geo::distance_between(point, office.location());
            if distance > office.radius_meters {
                return Err(Rejection::OutOfRange {
                    distance_meters: distance,
                    radius_meters: office.radius_meters,
                });
            }
            (
                Some(point),
                format!("; checked out at {local}, {distance:.0} m from {}", office.name),
            )
        } else {
            (None, format!("; checked out at {local}"))
        };

        if !self
            .repo
            .close_record(record.id, now, location, &note_line)
            .await?
        {
            // lost the race against a concurrent check-out
            return Err(Rejection::AlreadyCheckedOut);
        }

        tracing::info!(
            employee_id = identity.employee_id,
            record_id = record.id,
            "check-out recorded"
        );
        self.repo
            .find_record(record.id)
            .await?
            .ok_or(Rejection::NoOpenRecord)
    }

    /// Time-boxed token any employee may present. Administrative roles only.
    pub async fn issue_batch_token(
        &self,
        identity: &Identity,
        purpose: QrPurpose,
        expires_at: DateTime<Utc>,
    ) -> Result<(String, String), Rejection> {
        if !matches!(identity.role, Role::Admin | Role::Hr) {
            return Err(Rejection::Forbidden);
        }
        let now = self.clock.now_utc();
        if expires_at <= now {
            return Err(Rejection::InvalidToken(TokenFault::Expired));
        }
        Ok(self.qr.issue_batch_token(purpose, now, expires_at))
    }

    /// Check-out token bound to the caller's own open record. Never issued
    /// for a record that is already closed or was synthesized by leave
    /// reconciliation.
    pub async fn issue_record_token(
        &self,
        identity: &Identity,
        record_id: u64,
    ) -> Result<String, Rejection> {
        if !identity.role.is_employee_class() {
            return Err(Rejection::Forbidden);
        }
        let record = self
            .repo
            .find_record(record_id)
            .await?
            .ok_or(Rejection::NoOpenRecord)?;
        if record.employee_id != identity.employee_id {
            return Err(Rejection::NoOpenRecord);
        }
        if record.checkout_at.is_some() {
            return Err(Rejection::AlreadyCheckedOut);
        }
        if !record.is_closeable() {
            return Err(Rejection::NoOpenRecord);
        }
        Ok(self
            .qr
            .issue_record_token(QrPurpose::CheckOut, record.id, self.clock.now_utc()))
    }
}
