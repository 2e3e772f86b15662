//! Durable store backed by SQLite.
//!
//! A single connection guarded by a mutex, with the schema applied through
//! embedded versioned migrations. Writes that must be indivisible (slot
//! claiming, guarded deletes) run inside immediate transactions so the
//! check-then-write sequence is atomic even when several server processes
//! share the database file. Transient busy/locked failures are retried with
//! linear backoff before being surfaced as `Unavailable`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql, TransactionBehavior};

use crate::assessment::domain::{AnalyticsSummary, SubmissionRecord, SubmissionSummary};
use crate::assessment::scoring::StressLevel;
use crate::booking::domain::{
    AppointmentDetail, AppointmentStatus, AppointmentStatusView, AvailableSlot, BookedAppointment,
    ClientDetails, CounselorAppointment, CounselorAvailability, CounselorRecord, DashboardStats,
    SlotClaim, SlotOverview, SlotRecord,
};

use super::{ConflictKind, CounselStore, Entity, StoreError};

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("connection mutex poisoned".to_string()))
    }

    /// Retry transient busy/locked failures with linear backoff, then give
    /// up with `Unavailable`.
    fn with_retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(StoreError::Busy(reason)) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(StoreError::Unavailable(reason));
                    }
                    tracing::warn!(attempt, %reason, "store busy, retrying");
                    std::thread::sleep(RETRY_BASE_DELAY * attempt);
                }
                other => return other,
            }
        }
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = schema_version(conn);

    let migrations: &[(i64, &str)] = &[(1, include_str!("../../resources/migrations/001_initial.sql"))];

    for (version, sql) in migrations {
        if *version > current_version {
            tracing::info!(version, "applying schema migration");
            conn.execute_batch(sql).map_err(|err| {
                StoreError::Backend(format!("migration v{version} failed: {err}"))
            })?;
        }
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Busy(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn decode_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| StoreError::Backend(format!("malformed stored date '{raw}': {err}")))
}

fn encode_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn decode_time(raw: &str) -> Result<NaiveTime, StoreError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .map_err(|err| StoreError::Backend(format!("malformed stored time '{raw}': {err}")))
}

// Fixed-width RFC 3339 so lexicographic order matches chronological order.
fn encode_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| StoreError::Backend(format!("malformed stored timestamp '{raw}': {err}")))
}

fn encode_answers(answers: &BTreeMap<String, u8>) -> Result<String, StoreError> {
    serde_json::to_string(answers)
        .map_err(|err| StoreError::Backend(format!("failed to encode answers: {err}")))
}

fn decode_answers(raw: &str) -> Result<BTreeMap<String, u8>, StoreError> {
    serde_json::from_str(raw)
        .map_err(|err| StoreError::Backend(format!("malformed stored answers: {err}")))
}

fn decode_status(raw: &str) -> Result<AppointmentStatus, StoreError> {
    AppointmentStatus::from_label(raw)
        .ok_or_else(|| StoreError::Backend(format!("unknown appointment status '{raw}'")))
}

fn decode_stress(raw: &str) -> Result<StressLevel, StoreError> {
    StressLevel::from_label(raw)
        .ok_or_else(|| StoreError::Backend(format!("unknown stress level '{raw}'")))
}

fn optional_text(raw: String) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

type AppointmentRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

impl CounselStore for SqliteStore {
    fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let section1 = encode_answers(&record.section1_answers)?;
        let section2 = encode_answers(&record.section2_answers)?;
        let section3 = encode_answers(&record.section3_answers)?;
        self.with_retry(|| {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO assessment_submissions (
                     submission_id, submitted_at,
                     section1_answers, section2_answers, section3_answers,
                     section1_score, section2_score, section3_score, overall_score,
                     stress_level, recommendation
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.submission_id,
                    encode_timestamp(record.submitted_at),
                    section1,
                    section2,
                    section3,
                    record.section1_score,
                    record.section2_score,
                    record.section3_score,
                    record.overall_score,
                    record.stress_level.label(),
                    record.recommendation,
                ],
            )?;
            Ok(())
        })
    }

    fn fetch_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<SubmissionRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT submission_id, submitted_at,
                        section1_answers, section2_answers, section3_answers,
                        section1_score, section2_score, section3_score, overall_score,
                        stress_level, recommendation
                 FROM assessment_submissions WHERE submission_id = ?1",
                params![submission_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, f64>(7)?,
                        row.get::<_, f64>(8)?,
                        row.get::<_, String>(9)?,
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .optional()?;

        row.map(submission_from_row).transpose()
    }

    fn list_submissions(&self, skip: u32, limit: u32) -> Result<Vec<SubmissionSummary>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT submission_id, submitted_at, overall_score, stress_level, recommendation
             FROM assessment_submissions
             ORDER BY submitted_at DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![i64::from(limit), i64::from(skip)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (submission_id, submitted_at, overall_score, stress_level, recommendation) = row?;
            summaries.push(SubmissionSummary {
                submission_id,
                submitted_at: decode_timestamp(&submitted_at)?,
                overall_score,
                stress_level: decode_stress(&stress_level)?,
                recommendation,
            });
        }
        Ok(summaries)
    }

    fn assessment_analytics(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<AnalyticsSummary, StoreError> {
        let conn = self.lock()?;
        let base = "SELECT COUNT(*),
                           COALESCE(AVG(overall_score), 0.0),
                           COALESCE(SUM(CASE WHEN stress_level = 'Low' THEN 1 ELSE 0 END), 0),
                           COALESCE(SUM(CASE WHEN stress_level = 'Moderate' THEN 1 ELSE 0 END), 0),
                           COALESCE(SUM(CASE WHEN stress_level = 'High' THEN 1 ELSE 0 END), 0)
                    FROM assessment_submissions";
        let since_encoded = since.map(encode_timestamp);
        let (sql, query_params): (String, Vec<&dyn ToSql>) = match &since_encoded {
            Some(cutoff) => (
                format!("{base} WHERE submitted_at >= ?1"),
                vec![cutoff as &dyn ToSql],
            ),
            None => (base.to_string(), Vec::new()),
        };

        let (total, average, low, moderate, high) =
            conn.query_row(&sql, query_params.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?;

        Ok(AnalyticsSummary {
            total_assessments: total as u64,
            average_score: average,
            low_stress: low as u64,
            moderate_stress: moderate as u64,
            high_stress: high as u64,
        })
    }

    fn insert_counselor(&self, record: &CounselorRecord) -> Result<(), StoreError> {
        self.with_retry(|| {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let taken = tx
                .query_row(
                    "SELECT 1 FROM counselors WHERE email = ?1",
                    params![record.email],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if taken {
                return Err(StoreError::Conflict(ConflictKind::EmailTaken));
            }
            tx.execute(
                "INSERT INTO counselors (
                     counselor_id, full_name, email, employee_id, specialization,
                     password_hash, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.counselor_id,
                    record.full_name,
                    record.email,
                    record.employee_id,
                    record.specialization,
                    record.password_hash,
                    encode_timestamp(record.created_at),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn fetch_counselor(&self, counselor_id: &str) -> Result<Option<CounselorRecord>, StoreError> {
        let conn = self.lock()?;
        fetch_counselor_where(&conn, "counselor_id = ?1", counselor_id)
    }

    fn fetch_counselor_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CounselorRecord>, StoreError> {
        let conn = self.lock()?;
        fetch_counselor_where(&conn, "email = ?1", email)
    }

    fn list_counselors(&self) -> Result<Vec<CounselorRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT counselor_id, full_name, email, employee_id, specialization,
                    password_hash, created_at
             FROM counselors ORDER BY full_name",
        )?;
        let rows = stmt.query_map([], counselor_row)?;

        let mut counselors = Vec::new();
        for row in rows {
            counselors.push(counselor_from_row(row?)?);
        }
        Ok(counselors)
    }

    fn delete_counselor(&self, counselor_id: &str) -> Result<(), StoreError> {
        self.with_retry(|| {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let booked = tx
                .query_row(
                    "SELECT 1 FROM appointments WHERE counselor_id = ?1 LIMIT 1",
                    params![counselor_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if booked {
                return Err(StoreError::Conflict(ConflictKind::CounselorBooked));
            }
            let deleted = tx.execute(
                "DELETE FROM counselors WHERE counselor_id = ?1",
                params![counselor_id],
            )?;
            if deleted == 0 {
                return Err(StoreError::NotFound(Entity::Counselor));
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn insert_slot(&self, record: &SlotRecord) -> Result<(), StoreError> {
        self.with_retry(|| {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let owner_exists = tx
                .query_row(
                    "SELECT 1 FROM counselors WHERE counselor_id = ?1",
                    params![record.counselor_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !owner_exists {
                return Err(StoreError::NotFound(Entity::Counselor));
            }
            tx.execute(
                "INSERT INTO time_slots (
                     slot_id, counselor_id, slot_date, start_time, end_time, is_available
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.slot_id,
                    record.counselor_id,
                    encode_date(record.date),
                    encode_time(record.start_time),
                    encode_time(record.end_time),
                    record.is_available,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn fetch_slot(
        &self,
        slot_id: &str,
        counselor_id: &str,
    ) -> Result<Option<SlotRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT slot_id, counselor_id, slot_date, start_time, end_time, is_available
                 FROM time_slots WHERE slot_id = ?1 AND counselor_id = ?2",
                params![slot_id, counselor_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, bool>(5)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(slot_id, counselor_id, date, start_time, end_time, is_available)| {
            Ok(SlotRecord {
                slot_id,
                counselor_id,
                date: decode_date(&date)?,
                start_time: decode_time(&start_time)?,
                end_time: decode_time(&end_time)?,
                is_available,
            })
        })
        .transpose()
    }

    fn list_slots(
        &self,
        counselor_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<SlotOverview>, StoreError> {
        let conn = self.lock()?;
        let base = "SELECT ts.slot_id, ts.slot_date, ts.start_time, ts.end_time, ts.is_available,
                           apt.appointment_id, apt.client_full_name, apt.status
                    FROM time_slots ts
                    LEFT JOIN appointments apt ON apt.slot_id = ts.slot_id
                    WHERE ts.counselor_id = ?1";
        let order = "ORDER BY ts.slot_date, ts.start_time";
        let range_encoded = range.map(|(start, end)| (encode_date(start), encode_date(end)));
        let (sql, query_params): (String, Vec<&dyn ToSql>) = match &range_encoded {
            Some((start, end)) => (
                format!("{base} AND ts.slot_date >= ?2 AND ts.slot_date <= ?3 {order}"),
                vec![&counselor_id as &dyn ToSql, start as &dyn ToSql, end as &dyn ToSql],
            ),
            None => (
                format!("{base} {order}"),
                vec![&counselor_id as &dyn ToSql],
            ),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(query_params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut slots = Vec::new();
        for row in rows {
            let (slot_id, date, start_time, end_time, is_available, appointment_id, client, status) =
                row?;
            slots.push(SlotOverview {
                slot_id,
                date: decode_date(&date)?,
                start_time: decode_time(&start_time)?,
                end_time: decode_time(&end_time)?,
                is_available,
                appointment_id,
                client_name: client,
                appointment_status: status.as_deref().map(decode_status).transpose()?,
            });
        }
        Ok(slots)
    }

    fn delete_slot(&self, slot_id: &str) -> Result<(), StoreError> {
        self.with_retry(|| {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let occupied = tx
                .query_row(
                    "SELECT 1 FROM appointments WHERE slot_id = ?1",
                    params![slot_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if occupied {
                return Err(StoreError::Conflict(ConflictKind::SlotOccupied));
            }
            let deleted = tx.execute("DELETE FROM time_slots WHERE slot_id = ?1", params![slot_id])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(Entity::TimeSlot));
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn available_counselors(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<CounselorAvailability>, StoreError> {
        let conn = self.lock()?;
        let base = "SELECT c.counselor_id, c.full_name, c.specialization, c.email,
                           ts.slot_id, ts.slot_date, ts.start_time, ts.end_time
                    FROM counselors c
                    JOIN time_slots ts ON ts.counselor_id = c.counselor_id
                    WHERE ts.is_available = 1";
        let order = "ORDER BY c.full_name, c.counselor_id, ts.slot_date, ts.start_time";
        let date_encoded = date.map(encode_date);
        let (sql, query_params): (String, Vec<&dyn ToSql>) = match &date_encoded {
            Some(target) => (
                format!("{base} AND ts.slot_date = ?1 {order}"),
                vec![target as &dyn ToSql],
            ),
            None => (format!("{base} {order}"), Vec::new()),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(query_params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut counselors: Vec<CounselorAvailability> = Vec::new();
        for row in rows {
            let (counselor_id, full_name, specialization, email, slot_id, date, start, end) = row?;
            let slot = AvailableSlot {
                slot_id,
                date: decode_date(&date)?,
                start_time: decode_time(&start)?,
                end_time: decode_time(&end)?,
            };
            match counselors.last_mut() {
                Some(current) if current.counselor_id == counselor_id => {
                    current.available_slots.push(slot);
                }
                _ => counselors.push(CounselorAvailability {
                    counselor_id,
                    full_name,
                    specialization,
                    email,
                    available_slots: vec![slot],
                }),
            }
        }
        Ok(counselors)
    }

    fn claim_slot(&self, claim: &SlotClaim) -> Result<BookedAppointment, StoreError> {
        self.with_retry(|| {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let slot = tx
                .query_row(
                    "SELECT slot_date, start_time, is_available
                     FROM time_slots WHERE slot_id = ?1 AND counselor_id = ?2",
                    params![claim.slot_id, claim.counselor_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, bool>(2)?,
                        ))
                    },
                )
                .optional()?;
            let Some((slot_date, start_time, is_available)) = slot else {
                return Err(StoreError::NotFound(Entity::TimeSlot));
            };
            if !is_available {
                return Err(StoreError::Conflict(ConflictKind::SlotUnavailable));
            }

            let counselor_name = tx
                .query_row(
                    "SELECT full_name FROM counselors WHERE counselor_id = ?1",
                    params![claim.counselor_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound(Entity::Counselor))?;

            tx.execute(
                "INSERT INTO appointments (
                     appointment_id, submission_id, counselor_id, slot_id,
                     status, scheduled_date, scheduled_time,
                     counselor_notes, rejection_reason,
                     client_full_name, client_email, client_student_id, client_course,
                     client_year_level, client_gender, client_age, client_contact_number,
                     created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', '', ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    claim.appointment_id,
                    claim.submission_id,
                    claim.counselor_id,
                    claim.slot_id,
                    AppointmentStatus::Pending.label(),
                    slot_date,
                    start_time,
                    claim.client.full_name,
                    claim.client.email,
                    claim.client.student_id,
                    claim.client.course,
                    claim.client.year_level,
                    claim.client.gender,
                    i64::from(claim.client.age),
                    claim.client.contact_number,
                    encode_timestamp(claim.created_at),
                ],
            )?;
            tx.execute(
                "UPDATE time_slots SET is_available = 0 WHERE slot_id = ?1",
                params![claim.slot_id],
            )?;
            tx.commit()?;

            Ok(BookedAppointment {
                appointment_id: claim.appointment_id.clone(),
                status: AppointmentStatus::Pending,
                scheduled_date: decode_date(&slot_date)?,
                scheduled_time: decode_time(&start_time)?,
                counselor_name,
            })
        })
    }

    fn appointments_by_client_email(
        &self,
        email: &str,
    ) -> Result<Vec<AppointmentStatusView>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT apt.appointment_id, apt.status, apt.scheduled_date, apt.scheduled_time,
                    apt.created_at, apt.counselor_notes, apt.rejection_reason,
                    c.full_name, c.email
             FROM appointments apt
             JOIN counselors c ON c.counselor_id = apt.counselor_id
             WHERE apt.client_email = ?1
             ORDER BY apt.created_at DESC",
        )?;
        let rows = stmt.query_map(params![email], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut views = Vec::new();
        for row in rows {
            let row: AppointmentRow = row?;
            let (
                appointment_id,
                status,
                scheduled_date,
                scheduled_time,
                created_at,
                notes,
                rejection,
                counselor_name,
                counselor_email,
            ) = row;
            views.push(AppointmentStatusView {
                appointment_id,
                status: decode_status(&status)?,
                scheduled_date: decode_date(&scheduled_date)?,
                scheduled_time: decode_time(&scheduled_time)?,
                counselor_name,
                counselor_email,
                created_at: decode_timestamp(&created_at)?,
                counselor_notes: optional_text(notes),
                rejection_reason: optional_text(rejection),
            });
        }
        Ok(views)
    }

    fn fetch_appointment_detail(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentDetail>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT apt.appointment_id, apt.status, apt.scheduled_date, apt.scheduled_time,
                        apt.created_at, apt.counselor_notes, apt.rejection_reason,
                        apt.client_full_name, apt.client_email, apt.client_student_id,
                        apt.client_course, apt.client_year_level, apt.client_gender,
                        apt.client_age, apt.client_contact_number,
                        c.full_name, c.email,
                        a.submission_id, a.submitted_at,
                        a.section1_answers, a.section2_answers, a.section3_answers,
                        a.section1_score, a.section2_score, a.section3_score, a.overall_score,
                        a.stress_level, a.recommendation
                 FROM appointments apt
                 JOIN counselors c ON c.counselor_id = apt.counselor_id
                 JOIN assessment_submissions a ON a.submission_id = apt.submission_id
                 WHERE apt.appointment_id = ?1",
                params![appointment_id],
                |row| {
                    Ok((
                        (
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                        ),
                        (
                            row.get::<_, String>(7)?,
                            row.get::<_, String>(8)?,
                            row.get::<_, Option<String>>(9)?,
                            row.get::<_, String>(10)?,
                            row.get::<_, String>(11)?,
                            row.get::<_, String>(12)?,
                            row.get::<_, i64>(13)?,
                            row.get::<_, Option<String>>(14)?,
                        ),
                        (row.get::<_, String>(15)?, row.get::<_, String>(16)?),
                        (
                            row.get::<_, String>(17)?,
                            row.get::<_, String>(18)?,
                            row.get::<_, String>(19)?,
                            row.get::<_, String>(20)?,
                            row.get::<_, String>(21)?,
                            row.get::<_, f64>(22)?,
                            row.get::<_, f64>(23)?,
                            row.get::<_, f64>(24)?,
                            row.get::<_, f64>(25)?,
                            row.get::<_, String>(26)?,
                            row.get::<_, String>(27)?,
                        ),
                    ))
                },
            )
            .optional()?;

        let Some((appointment, client, counselor, submission)) = row else {
            return Ok(None);
        };
        let (appointment_id, status, scheduled_date, scheduled_time, created_at, notes, rejection) =
            appointment;
        let (full_name, email, student_id, course, year_level, gender, age, contact_number) =
            client;
        let (counselor_name, counselor_email) = counselor;

        Ok(Some(AppointmentDetail {
            appointment_id,
            status: decode_status(&status)?,
            scheduled_date: decode_date(&scheduled_date)?,
            scheduled_time: decode_time(&scheduled_time)?,
            created_at: decode_timestamp(&created_at)?,
            counselor_notes: optional_text(notes),
            rejection_reason: optional_text(rejection),
            client: ClientDetails {
                full_name,
                email,
                student_id,
                course,
                year_level,
                gender,
                age: age.clamp(0, i64::from(u8::MAX)) as u8,
                contact_number,
            },
            counselor_name,
            counselor_email,
            assessment: submission_from_row(submission)?,
        }))
    }

    fn fetch_appointment_status(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentStatus>, StoreError> {
        let conn = self.lock()?;
        let status = conn
            .query_row(
                "SELECT status FROM appointments WHERE appointment_id = ?1",
                params![appointment_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        status.as_deref().map(decode_status).transpose()
    }

    fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        counselor_notes: &str,
        rejection_reason: &str,
    ) -> Result<(), StoreError> {
        self.with_retry(|| {
            let conn = self.lock()?;
            let updated = conn.execute(
                "UPDATE appointments
                 SET status = ?2, counselor_notes = ?3, rejection_reason = ?4
                 WHERE appointment_id = ?1",
                params![appointment_id, status.label(), counselor_notes, rejection_reason],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(Entity::Appointment));
            }
            Ok(())
        })
    }

    fn appointments_for_counselor(
        &self,
        counselor_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<CounselorAppointment>, StoreError> {
        let conn = self.lock()?;
        let base = "SELECT appointment_id, status, scheduled_date, scheduled_time, created_at,
                           client_full_name, client_email
                    FROM appointments WHERE counselor_id = ?1";
        let order = "ORDER BY scheduled_date DESC, scheduled_time DESC";
        let status_label = status.map(AppointmentStatus::label);
        let (sql, query_params): (String, Vec<&dyn ToSql>) = match &status_label {
            Some(label) => (
                format!("{base} AND status = ?2 {order}"),
                vec![&counselor_id as &dyn ToSql, label as &dyn ToSql],
            ),
            None => (
                format!("{base} {order}"),
                vec![&counselor_id as &dyn ToSql],
            ),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(query_params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut appointments = Vec::new();
        for row in rows {
            let (appointment_id, status, date, time, created_at, client_name, client_email) = row?;
            appointments.push(CounselorAppointment {
                appointment_id,
                status: decode_status(&status)?,
                scheduled_date: decode_date(&date)?,
                scheduled_time: decode_time(&time)?,
                created_at: decode_timestamp(&created_at)?,
                client_full_name: client_name,
                client_email,
            });
        }
        Ok(appointments)
    }

    fn dashboard_stats(&self, counselor_id: &str) -> Result<DashboardStats, StoreError> {
        let conn = self.lock()?;
        let (total, pending, confirmed, rejected, completed) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'Pending' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'Confirmed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'Rejected' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'Completed' THEN 1 ELSE 0 END), 0)
             FROM appointments WHERE counselor_id = ?1",
            params![counselor_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

        let (assessments, low, moderate, high) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN stress_level = 'Low' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN stress_level = 'Moderate' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN stress_level = 'High' THEN 1 ELSE 0 END), 0)
             FROM assessment_submissions",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;

        Ok(DashboardStats {
            total_appointments: total as u64,
            pending_appointments: pending as u64,
            confirmed_appointments: confirmed as u64,
            rejected_appointments: rejected as u64,
            completed_appointments: completed as u64,
            total_assessments: assessments as u64,
            low_stress: low as u64,
            moderate_stress: moderate as u64,
            high_stress: high as u64,
        })
    }
}

type CounselorRow = (String, String, String, String, String, String, String);

fn counselor_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CounselorRow> {
    Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
        row.get::<_, String>(5)?,
        row.get::<_, String>(6)?,
    ))
}

fn counselor_from_row(row: CounselorRow) -> Result<CounselorRecord, StoreError> {
    let (counselor_id, full_name, email, employee_id, specialization, password_hash, created_at) =
        row;
    Ok(CounselorRecord {
        counselor_id,
        full_name,
        email,
        employee_id,
        specialization,
        password_hash,
        created_at: decode_timestamp(&created_at)?,
    })
}

fn fetch_counselor_where(
    conn: &Connection,
    predicate: &str,
    value: &str,
) -> Result<Option<CounselorRecord>, StoreError> {
    let sql = format!(
        "SELECT counselor_id, full_name, email, employee_id, specialization,
                password_hash, created_at
         FROM counselors WHERE {predicate}"
    );
    let row = conn
        .query_row(&sql, params![value], counselor_row)
        .optional()?;
    row.map(counselor_from_row).transpose()
}

type SubmissionRow = (
    String,
    String,
    String,
    String,
    String,
    f64,
    f64,
    f64,
    f64,
    String,
    String,
);

fn submission_from_row(row: SubmissionRow) -> Result<SubmissionRecord, StoreError> {
    let (
        submission_id,
        submitted_at,
        section1,
        section2,
        section3,
        section1_score,
        section2_score,
        section3_score,
        overall_score,
        stress_level,
        recommendation,
    ) = row;
    Ok(SubmissionRecord {
        submission_id,
        submitted_at: decode_timestamp(&submitted_at)?,
        section1_answers: decode_answers(&section1)?,
        section2_answers: decode_answers(&section2)?,
        section3_answers: decode_answers(&section3)?,
        section1_score,
        section2_score,
        section3_score,
        overall_score,
        stress_level: decode_stress(&stress_level)?,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_create_schema_and_are_idempotent() {
        let store = SqliteStore::open_in_memory().expect("store opens");
        let conn = store.lock().expect("lock");
        assert_eq!(schema_version(&conn), 1);
        run_migrations(&conn).expect("re-running migrations is a no-op");
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .expect("count tables");
        assert_eq!(tables, 5);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let store = SqliteStore::open_in_memory().expect("store opens");
        let conn = store.lock().expect("lock");
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("pragma readable");
        assert_eq!(enabled, 1);
    }

    #[test]
    fn busy_errors_are_retried_until_unavailable() {
        let store = SqliteStore::open_in_memory().expect("store opens");
        let mut attempts = 0;
        let result: Result<(), StoreError> = store.with_retry(|| {
            attempts += 1;
            Err(StoreError::Busy("database is locked".to_string()))
        });
        assert_eq!(attempts, MAX_RETRIES);
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let store = SqliteStore::open_in_memory().expect("store opens");
        let mut attempts = 0;
        let result: Result<(), StoreError> = store.with_retry(|| {
            attempts += 1;
            Err(StoreError::NotFound(Entity::TimeSlot))
        });
        assert_eq!(attempts, 1);
        assert_eq!(result, Err(StoreError::NotFound(Entity::TimeSlot)));
    }

    #[test]
    fn timestamp_encoding_is_sortable_and_reversible() {
        use chrono::TimeZone;

        let earlier = Utc
            .timestamp_opt(1_700_000_000, 123_456_000)
            .single()
            .expect("valid timestamp");
        let later = earlier + chrono::Duration::milliseconds(5);
        let encoded_earlier = encode_timestamp(earlier);
        let encoded_later = encode_timestamp(later);
        assert!(encoded_earlier < encoded_later);
        assert_eq!(
            decode_timestamp(&encoded_earlier).expect("round trip"),
            earlier
        );
    }
}
