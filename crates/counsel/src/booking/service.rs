use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::store::{CounselStore, Entity, StoreError};

use super::domain::{
    AppointmentDetail, AppointmentStatus, AppointmentStatusView, BookedAppointment,
    BookingRequest, CounselorAppointment, CounselorAvailability, DashboardStats, SlotClaim,
    SlotOverview, SlotRecord, StatusUpdate,
};

/// Decides whether a status transition is legal. Swappable so deployments
/// can tighten the lifecycle without touching the coordinator.
pub type TransitionPolicy = fn(AppointmentStatus, AppointmentStatus) -> bool;

/// Any state may move to any other state. Matches how counselors actually
/// work a queue: corrections and reopenings happen.
pub fn permissive_transitions(_from: AppointmentStatus, _to: AppointmentStatus) -> bool {
    true
}

/// Forward-only lifecycle: Pending resolves to Confirmed or Rejected, and
/// only Confirmed appointments complete.
pub fn strict_transitions(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    matches!(
        (from, to),
        (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            | (AppointmentStatus::Pending, AppointmentStatus::Rejected)
            | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
    )
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("cannot move appointment from {from} to {to}")]
    TransitionDenied {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("slot end time must be after start time")]
    InvalidSlotInterval,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coordinates slot lifecycle and appointment booking on top of the store.
/// The store's claim operation carries the atomicity; the coordinator owns
/// validation and the transition policy.
pub struct BookingCoordinator<S> {
    store: Arc<S>,
    policy: TransitionPolicy,
}

impl<S> BookingCoordinator<S>
where
    S: CounselStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policy(store, permissive_transitions)
    }

    pub fn with_policy(store: Arc<S>, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn available_counselors(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<CounselorAvailability>, BookingError> {
        Ok(self.store.available_counselors(date)?)
    }

    /// Book an appointment against a prior assessment submission. Existence
    /// checks run first so the client gets a precise 404; the availability
    /// race is settled inside the store's claim.
    pub fn book_appointment(
        &self,
        request: BookingRequest,
    ) -> Result<BookedAppointment, BookingError> {
        self.store
            .fetch_submission(&request.submission_id)?
            .ok_or(StoreError::NotFound(Entity::Assessment))?;
        self.store
            .fetch_slot(&request.slot_id, &request.counselor_id)?
            .ok_or(StoreError::NotFound(Entity::TimeSlot))?;

        let claim = SlotClaim {
            appointment_id: Uuid::new_v4().to_string(),
            submission_id: request.submission_id,
            counselor_id: request.counselor_id,
            slot_id: request.slot_id,
            client: request.client_details,
            created_at: Utc::now(),
        };
        let booked = self.store.claim_slot(&claim)?;
        tracing::info!(
            appointment_id = %booked.appointment_id,
            slot_id = %claim.slot_id,
            "appointment booked"
        );
        Ok(booked)
    }

    pub fn status_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<AppointmentStatusView>, BookingError> {
        Ok(self.store.appointments_by_client_email(email)?)
    }

    pub fn appointment_detail(
        &self,
        appointment_id: &str,
    ) -> Result<AppointmentDetail, BookingError> {
        Ok(self
            .store
            .fetch_appointment_detail(appointment_id)?
            .ok_or(StoreError::NotFound(Entity::Appointment))?)
    }

    /// Apply a status change under the configured transition policy. Notes
    /// and rejection reason are overwritten, not merged.
    pub fn update_status(
        &self,
        appointment_id: &str,
        to: AppointmentStatus,
        counselor_notes: &str,
        rejection_reason: &str,
    ) -> Result<StatusUpdate, BookingError> {
        let from = self
            .store
            .fetch_appointment_status(appointment_id)?
            .ok_or(StoreError::NotFound(Entity::Appointment))?;
        if !(self.policy)(from, to) {
            return Err(BookingError::TransitionDenied { from, to });
        }
        self.store
            .update_appointment_status(appointment_id, to, counselor_notes, rejection_reason)?;
        tracing::info!(%appointment_id, %from, %to, "appointment status updated");
        Ok(StatusUpdate {
            appointment_id: appointment_id.to_string(),
            status: to,
        })
    }

    pub fn create_time_slot(
        &self,
        counselor_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<SlotRecord, BookingError> {
        if end_time <= start_time {
            return Err(BookingError::InvalidSlotInterval);
        }
        let record = SlotRecord {
            slot_id: Uuid::new_v4().to_string(),
            counselor_id: counselor_id.to_string(),
            date,
            start_time,
            end_time,
            is_available: true,
        };
        self.store.insert_slot(&record)?;
        Ok(record)
    }

    pub fn list_time_slots(
        &self,
        counselor_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<SlotOverview>, BookingError> {
        Ok(self.store.list_slots(counselor_id, range)?)
    }

    pub fn delete_time_slot(&self, slot_id: &str) -> Result<(), BookingError> {
        Ok(self.store.delete_slot(slot_id)?)
    }

    pub fn counselor_appointments(
        &self,
        counselor_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<CounselorAppointment>, BookingError> {
        Ok(self.store.appointments_for_counselor(counselor_id, status)?)
    }

    pub fn dashboard_stats(&self, counselor_id: &str) -> Result<DashboardStats, BookingError> {
        Ok(self.store.dashboard_stats(counselor_id)?)
    }
}
