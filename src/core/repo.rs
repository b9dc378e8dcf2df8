use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use sqlx::MySqlPool;

use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, GeoPoint, NewAttendanceRecord},
    leave::{LeaveKind, LeaveRequest, LeaveStatus},
    office::OfficeLocation,
};

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RepoError {
    /// The storage unique key on (employee_id, date) rejected the write.
    #[display(fmt = "duplicate attendance row")]
    Duplicate,
    #[display(fmt = "storage failure: {}", _0)]
    Storage(String),
}

impl std::error::Error for RepoError {}

/// Storage abstraction the attendance core is written against. Production
/// uses [`MySqlAttendanceRepo`]; tests use an in-memory implementation.
#[allow(async_fn_in_trait)]
pub trait AttendanceRepo: Send + Sync {
    /// The row for (employee_id, date) with `checkout_at` still null, if any.
    async fn find_open_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepoError>;

    async fn find_record(&self, id: u64) -> Result<Option<AttendanceRecord>, RepoError>;

    async fn find_records_in_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError>;

    async fn create_record(
        &self,
        record: NewAttendanceRecord,
    ) -> Result<AttendanceRecord, RepoError>;

    /// Conditional single-statement close: sets `checkout_at` and the
    /// checkout location and appends `note_line`, but only while the row is
    /// still open. Returns false when the row was already closed.
    async fn close_record(
        &self,
        id: u64,
        checkout_at: DateTime<Utc>,
        checkout_location: Option<GeoPoint>,
        note_line: &str,
    ) -> Result<bool, RepoError>;

    /// All-or-nothing batch insert used by leave reconciliation.
    async fn create_records_atomic(
        &self,
        records: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, RepoError>;

    async fn find_office_location(&self) -> Result<Option<OfficeLocation>, RepoError>;

    /// Approved leave requests overlapping [start, end] for one employee.
    async fn find_approved_leave_spans(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, RepoError>;

    async fn list_active_employee_ids(&self, limit: u32) -> Result<Vec<u64>, RepoError>;
}

fn storage(e: sqlx::Error) -> RepoError {
    RepoError::Storage(e.to_string())
}

fn map_insert_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        // MySQL signals a unique-key violation with SQLSTATE 23000
        if db_err.code().as_deref() == Some("23000") {
            return RepoError::Duplicate;
        }
    }
    storage(e)
}

/// Flat storage shape; locations are split into scalar columns and folded
/// back into [`GeoPoint`] pairs at this boundary only.
#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: String,
    checkin_at: Option<DateTime<Utc>>,
    checkout_at: Option<DateTime<Utc>>,
    checkin_lat: Option<f64>,
    checkin_lng: Option<f64>,
    checkout_lat: Option<f64>,
    checkout_lng: Option<f64>,
    note: String,
}

fn fold_point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
        _ => None,
    }
}

impl AttendanceRow {
    fn into_record(self) -> Result<AttendanceRecord, RepoError> {
        let status: AttendanceStatus = self
            .status
            .parse()
            .map_err(|_| RepoError::Storage(format!("unknown attendance status: {}", self.status)))?;
        Ok(AttendanceRecord {
            id: self.id,
            employee_id: self.employee_id,
            date: self.date,
            status,
            checkin_at: self.checkin_at,
            checkout_at: self.checkout_at,
            checkin_location: fold_point(self.checkin_lat, self.checkin_lng),
            checkout_location: fold_point(self.checkout_lat, self.checkout_lng),
            note: self.note,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    kind: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    note: Option<String>,
}

impl LeaveRow {
    fn into_request(self) -> Result<LeaveRequest, RepoError> {
        let kind: LeaveKind = self
            .kind
            .parse()
            .map_err(|_| RepoError::Storage(format!("unknown leave kind: {}", self.kind)))?;
        let status: LeaveStatus = self
            .status
            .parse()
            .map_err(|_| RepoError::Storage(format!("unknown leave status: {}", self.status)))?;
        Ok(LeaveRequest {
            id: self.id,
            employee_id: self.employee_id,
            kind,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            note: self.note,
        })
    }
}

const SELECT_ATTENDANCE: &str = r#"
    SELECT id, employee_id, date, status,
           checkin_at, checkout_at,
           checkin_lat, checkin_lng, checkout_lat, checkout_lng,
           note
    FROM attendance
"#;

#[derive(Clone)]
pub struct MySqlAttendanceRepo {
    pool: MySqlPool,
}

impl MySqlAttendanceRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Single leave request by id, used by the approval flow before handing
    /// off to reconciliation. Not part of the core trait; the engine never
    /// needs it.
    pub async fn find_leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, RepoError> {
        let row = sqlx::query_as::<_, LeaveRow>(
            r#"
            SELECT id, employee_id, kind, start_date, end_date, status, note
            FROM leave_requests
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(LeaveRow::into_request).transpose()
    }
}

impl AttendanceRepo for MySqlAttendanceRepo {
    async fn find_open_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        let sql = format!(
            "{SELECT_ATTENDANCE} WHERE employee_id = ? AND date = ? AND checkout_at IS NULL LIMIT 1"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(AttendanceRow::into_record).transpose()
    }

    async fn find_record(&self, id: u64) -> Result<Option<AttendanceRecord>, RepoError> {
        let sql = format!("{SELECT_ATTENDANCE} WHERE id = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(AttendanceRow::into_record).transpose()
    }

    async fn find_records_in_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        let sql = format!(
            "{SELECT_ATTENDANCE} WHERE employee_id = ? AND date BETWEEN ? AND ? ORDER BY date"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(AttendanceRow::into_record).collect()
    }

    async fn create_record(
        &self,
        record: NewAttendanceRecord,
    ) -> Result<AttendanceRecord, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, status, checkin_at, checkin_lat, checkin_lng, note)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.status.to_string())
        .bind(record.checkin_at)
        .bind(record.checkin_location.map(|p| p.latitude))
        .bind(record.checkin_location.map(|p| p.longitude))
        .bind(&record.note)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(AttendanceRecord {
            id: result.last_insert_id(),
            employee_id: record.employee_id,
            date: record.date,
            status: record.status,
            checkin_at: record.checkin_at,
            checkout_at: None,
            checkin_location: record.checkin_location,
            checkout_location: None,
            note: record.note,
        })
    }

    async fn close_record(
        &self,
        id: u64,
        checkout_at: DateTime<Utc>,
        checkout_location: Option<GeoPoint>,
        note_line: &str,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET checkout_at = ?,
                checkout_lat = ?,
                checkout_lng = ?,
                note = CONCAT(note, ?)
            WHERE id = ? AND checkout_at IS NULL
            "#,
        )
        .bind(checkout_at)
        .bind(checkout_location.map(|p| p.latitude))
        .bind(checkout_location.map(|p| p.longitude))
        .bind(note_line)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_records_atomic(
        &self,
        records: Vec<NewAttendanceRecord>,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let mut created = Vec::with_capacity(records.len());

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO attendance
                    (employee_id, date, status, checkin_at, checkin_lat, checkin_lng, note)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.employee_id)
            .bind(record.date)
            .bind(record.status.to_string())
            .bind(record.checkin_at)
            .bind(record.checkin_location.map(|p| p.latitude))
            .bind(record.checkin_location.map(|p| p.longitude))
            .bind(&record.note)
            .execute(&mut *tx)
            .await
            .map_err(map_insert_error)?;

            created.push(AttendanceRecord {
                id: result.last_insert_id(),
                employee_id: record.employee_id,
                date: record.date,
                status: record.status,
                checkin_at: record.checkin_at,
                checkout_at: None,
                checkin_location: record.checkin_location,
                checkout_location: None,
                note: record.note,
            });
        }

        tx.commit().await.map_err(storage)?;
        Ok(created)
    }

    async fn find_office_location(&self) -> Result<Option<OfficeLocation>, RepoError> {
        sqlx::query_as::<_, OfficeLocation>(
            r#"
            SELECT id, name, latitude, longitude, radius_meters
            FROM office_locations
            ORDER BY id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)
    }

    async fn find_approved_leave_spans(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, RepoError> {
        let rows = sqlx::query_as::<_, LeaveRow>(
            r#"
            SELECT id, employee_id, kind, start_date, end_date, status, note
            FROM leave_requests
            WHERE employee_id = ?
              AND status = 'approved'
              AND start_date <= ?
              AND end_date >= ?
            ORDER BY start_date
            "#,
        )
        .bind(employee_id)
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(LeaveRow::into_request).collect()
    }

    async fn list_active_employee_ids(&self, limit: u32) -> Result<Vec<u64>, RepoError> {
        sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id FROM employees
            WHERE status = 'active'
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)
    }
}
