//! Persistence contract for the service.
//!
//! The store is an explicitly constructed, injected collaborator. The core
//! only relies on unique-key lookup, relationship joins, and transactional
//! write isolation; [`SqliteStore`] is the durable implementation and
//! [`MemoryStore`] the in-process test double.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::assessment::domain::{AnalyticsSummary, SubmissionRecord, SubmissionSummary};
use crate::booking::domain::{
    AppointmentDetail, AppointmentStatus, AppointmentStatusView, BookedAppointment,
    CounselorAppointment, CounselorAvailability, CounselorRecord, DashboardStats, SlotClaim,
    SlotOverview, SlotRecord,
};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Record kinds a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Assessment,
    Counselor,
    TimeSlot,
    Appointment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Assessment => "assessment submission",
            Entity::Counselor => "counselor",
            Entity::TimeSlot => "time slot",
            Entity::Appointment => "appointment",
        };
        f.write_str(name)
    }
}

/// State conflicts that reject a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    SlotUnavailable,
    SlotOccupied,
    CounselorBooked,
    EmailTaken,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ConflictKind::SlotUnavailable => "time slot is no longer available",
            ConflictKind::SlotOccupied => "time slot has an existing appointment",
            ConflictKind::CounselorBooked => "counselor has existing appointments",
            ConflictKind::EmailTaken => "email is already registered",
        };
        f.write_str(reason)
    }
}

/// Store failure taxonomy. `Busy` is internal: the SQLite store retries it
/// with backoff and surfaces `Unavailable` once retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{0}")]
    Conflict(ConflictKind),
    #[error("store busy: {0}")]
    Busy(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Storage abstraction over the four record types and their relationships.
pub trait CounselStore: Send + Sync {
    // Assessment submissions (immutable once created).
    fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), StoreError>;
    fn fetch_submission(&self, submission_id: &str)
        -> Result<Option<SubmissionRecord>, StoreError>;
    fn list_submissions(&self, skip: u32, limit: u32) -> Result<Vec<SubmissionSummary>, StoreError>;
    fn assessment_analytics(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<AnalyticsSummary, StoreError>;

    // Counselor accounts.
    fn insert_counselor(&self, record: &CounselorRecord) -> Result<(), StoreError>;
    fn fetch_counselor(&self, counselor_id: &str) -> Result<Option<CounselorRecord>, StoreError>;
    fn fetch_counselor_by_email(&self, email: &str)
        -> Result<Option<CounselorRecord>, StoreError>;
    fn list_counselors(&self) -> Result<Vec<CounselorRecord>, StoreError>;
    /// Remove a counselor and their unclaimed slots. Fails with
    /// `Conflict(CounselorBooked)` while any appointment references them.
    fn delete_counselor(&self, counselor_id: &str) -> Result<(), StoreError>;

    // Time slots.
    fn insert_slot(&self, record: &SlotRecord) -> Result<(), StoreError>;
    fn fetch_slot(
        &self,
        slot_id: &str,
        counselor_id: &str,
    ) -> Result<Option<SlotRecord>, StoreError>;
    fn list_slots(
        &self,
        counselor_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<SlotOverview>, StoreError>;
    /// Delete an unclaimed slot. Fails with `Conflict(SlotOccupied)` when an
    /// appointment occupies it.
    fn delete_slot(&self, slot_id: &str) -> Result<(), StoreError>;
    fn available_counselors(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<CounselorAvailability>, StoreError>;

    // Appointments.
    /// Atomically re-check the slot's availability, create the appointment
    /// (snapshotting the slot's date and start time), and mark the slot
    /// unavailable. Concurrent claims on one slot yield exactly one success;
    /// the rest fail with `Conflict(SlotUnavailable)`.
    fn claim_slot(&self, claim: &SlotClaim) -> Result<BookedAppointment, StoreError>;
    fn appointments_by_client_email(
        &self,
        email: &str,
    ) -> Result<Vec<AppointmentStatusView>, StoreError>;
    fn fetch_appointment_detail(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentDetail>, StoreError>;
    fn fetch_appointment_status(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentStatus>, StoreError>;
    fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        counselor_notes: &str,
        rejection_reason: &str,
    ) -> Result<(), StoreError>;
    fn appointments_for_counselor(
        &self,
        counselor_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<CounselorAppointment>, StoreError>;
    fn dashboard_stats(&self, counselor_id: &str) -> Result<DashboardStats, StoreError>;
}
