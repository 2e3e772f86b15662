//! In-process store used by tests and local development.
//!
//! All state lives behind one mutex, so every operation observes a
//! consistent snapshot and the claim check-then-write runs atomically, the
//! same guarantee the SQLite store gets from immediate transactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::assessment::domain::{AnalyticsSummary, SubmissionRecord, SubmissionSummary};
use crate::assessment::scoring::StressLevel;
use crate::booking::domain::{
    AppointmentDetail, AppointmentStatus, AppointmentStatusView, AvailableSlot, BookedAppointment,
    ClientDetails, CounselorAppointment, CounselorAvailability, CounselorRecord, DashboardStats,
    SlotClaim, SlotOverview, SlotRecord,
};

use super::{ConflictKind, CounselStore, Entity, StoreError};

#[derive(Debug, Clone)]
struct StoredAppointment {
    appointment_id: String,
    submission_id: String,
    counselor_id: String,
    slot_id: String,
    status: AppointmentStatus,
    scheduled_date: NaiveDate,
    scheduled_time: NaiveTime,
    counselor_notes: String,
    rejection_reason: String,
    client: ClientDetails,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    submissions: HashMap<String, SubmissionRecord>,
    counselors: HashMap<String, CounselorRecord>,
    slots: HashMap<String, SlotRecord>,
    appointments: HashMap<String, StoredAppointment>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }
}

fn optional_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

impl CounselStore for MemoryStore {
    fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .submissions
            .insert(record.submission_id.clone(), record.clone());
        Ok(())
    }

    fn fetch_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<SubmissionRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.submissions.get(submission_id).cloned())
    }

    fn list_submissions(&self, skip: u32, limit: u32) -> Result<Vec<SubmissionSummary>, StoreError> {
        let inner = self.lock()?;
        let mut records: Vec<&SubmissionRecord> = inner.submissions.values().collect();
        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(records
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|record| SubmissionSummary {
                submission_id: record.submission_id.clone(),
                submitted_at: record.submitted_at,
                overall_score: record.overall_score,
                stress_level: record.stress_level,
                recommendation: record.recommendation.clone(),
            })
            .collect())
    }

    fn assessment_analytics(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<AnalyticsSummary, StoreError> {
        let inner = self.lock()?;
        let mut summary = AnalyticsSummary {
            total_assessments: 0,
            average_score: 0.0,
            low_stress: 0,
            moderate_stress: 0,
            high_stress: 0,
        };
        let mut score_sum = 0.0;
        for record in inner.submissions.values() {
            if let Some(cutoff) = since {
                if record.submitted_at < cutoff {
                    continue;
                }
            }
            summary.total_assessments += 1;
            score_sum += record.overall_score;
            match record.stress_level {
                StressLevel::Low => summary.low_stress += 1,
                StressLevel::Moderate => summary.moderate_stress += 1,
                StressLevel::High => summary.high_stress += 1,
            }
        }
        if summary.total_assessments > 0 {
            summary.average_score = score_sum / summary.total_assessments as f64;
        }
        Ok(summary)
    }

    fn insert_counselor(&self, record: &CounselorRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner
            .counselors
            .values()
            .any(|existing| existing.email == record.email)
        {
            return Err(StoreError::Conflict(ConflictKind::EmailTaken));
        }
        inner
            .counselors
            .insert(record.counselor_id.clone(), record.clone());
        Ok(())
    }

    fn fetch_counselor(&self, counselor_id: &str) -> Result<Option<CounselorRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.counselors.get(counselor_id).cloned())
    }

    fn fetch_counselor_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CounselorRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .counselors
            .values()
            .find(|record| record.email == email)
            .cloned())
    }

    fn list_counselors(&self) -> Result<Vec<CounselorRecord>, StoreError> {
        let inner = self.lock()?;
        let mut counselors: Vec<CounselorRecord> = inner.counselors.values().cloned().collect();
        counselors.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(counselors)
    }

    fn delete_counselor(&self, counselor_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner
            .appointments
            .values()
            .any(|apt| apt.counselor_id == counselor_id)
        {
            return Err(StoreError::Conflict(ConflictKind::CounselorBooked));
        }
        if inner.counselors.remove(counselor_id).is_none() {
            return Err(StoreError::NotFound(Entity::Counselor));
        }
        inner.slots.retain(|_, slot| slot.counselor_id != counselor_id);
        Ok(())
    }

    fn insert_slot(&self, record: &SlotRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.counselors.contains_key(&record.counselor_id) {
            return Err(StoreError::NotFound(Entity::Counselor));
        }
        inner.slots.insert(record.slot_id.clone(), record.clone());
        Ok(())
    }

    fn fetch_slot(
        &self,
        slot_id: &str,
        counselor_id: &str,
    ) -> Result<Option<SlotRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .slots
            .get(slot_id)
            .filter(|slot| slot.counselor_id == counselor_id)
            .cloned())
    }

    fn list_slots(
        &self,
        counselor_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<SlotOverview>, StoreError> {
        let inner = self.lock()?;
        let mut slots: Vec<SlotOverview> = inner
            .slots
            .values()
            .filter(|slot| slot.counselor_id == counselor_id)
            .filter(|slot| match range {
                Some((start, end)) => slot.date >= start && slot.date <= end,
                None => true,
            })
            .map(|slot| {
                let occupant = inner
                    .appointments
                    .values()
                    .find(|apt| apt.slot_id == slot.slot_id);
                SlotOverview {
                    slot_id: slot.slot_id.clone(),
                    date: slot.date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    is_available: slot.is_available,
                    appointment_id: occupant.map(|apt| apt.appointment_id.clone()),
                    client_name: occupant.map(|apt| apt.client.full_name.clone()),
                    appointment_status: occupant.map(|apt| apt.status),
                }
            })
            .collect();
        slots.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(slots)
    }

    fn delete_slot(&self, slot_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner
            .appointments
            .values()
            .any(|apt| apt.slot_id == slot_id)
        {
            return Err(StoreError::Conflict(ConflictKind::SlotOccupied));
        }
        if inner.slots.remove(slot_id).is_none() {
            return Err(StoreError::NotFound(Entity::TimeSlot));
        }
        Ok(())
    }

    fn available_counselors(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<CounselorAvailability>, StoreError> {
        let inner = self.lock()?;
        let mut counselors = Vec::new();
        for counselor in inner.counselors.values() {
            let mut open: Vec<AvailableSlot> = inner
                .slots
                .values()
                .filter(|slot| {
                    slot.counselor_id == counselor.counselor_id
                        && slot.is_available
                        && date.map_or(true, |target| slot.date == target)
                })
                .map(|slot| AvailableSlot {
                    slot_id: slot.slot_id.clone(),
                    date: slot.date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                })
                .collect();
            if open.is_empty() {
                continue;
            }
            open.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
            counselors.push(CounselorAvailability {
                counselor_id: counselor.counselor_id.clone(),
                full_name: counselor.full_name.clone(),
                specialization: counselor.specialization.clone(),
                email: counselor.email.clone(),
                available_slots: open,
            });
        }
        counselors.sort_by(|a, b| {
            (&a.full_name, &a.counselor_id).cmp(&(&b.full_name, &b.counselor_id))
        });
        Ok(counselors)
    }

    fn claim_slot(&self, claim: &SlotClaim) -> Result<BookedAppointment, StoreError> {
        let mut inner = self.lock()?;
        let counselor_name = inner
            .counselors
            .get(&claim.counselor_id)
            .map(|counselor| counselor.full_name.clone())
            .ok_or(StoreError::NotFound(Entity::Counselor))?;
        let (scheduled_date, scheduled_time) = {
            let slot = inner
                .slots
                .get(&claim.slot_id)
                .filter(|slot| slot.counselor_id == claim.counselor_id)
                .ok_or(StoreError::NotFound(Entity::TimeSlot))?;
            if !slot.is_available {
                return Err(StoreError::Conflict(ConflictKind::SlotUnavailable));
            }
            (slot.date, slot.start_time)
        };

        inner.appointments.insert(
            claim.appointment_id.clone(),
            StoredAppointment {
                appointment_id: claim.appointment_id.clone(),
                submission_id: claim.submission_id.clone(),
                counselor_id: claim.counselor_id.clone(),
                slot_id: claim.slot_id.clone(),
                status: AppointmentStatus::Pending,
                scheduled_date,
                scheduled_time,
                counselor_notes: String::new(),
                rejection_reason: String::new(),
                client: claim.client.clone(),
                created_at: claim.created_at,
            },
        );
        if let Some(slot) = inner.slots.get_mut(&claim.slot_id) {
            slot.is_available = false;
        }

        Ok(BookedAppointment {
            appointment_id: claim.appointment_id.clone(),
            status: AppointmentStatus::Pending,
            scheduled_date,
            scheduled_time,
            counselor_name,
        })
    }

    fn appointments_by_client_email(
        &self,
        email: &str,
    ) -> Result<Vec<AppointmentStatusView>, StoreError> {
        let inner = self.lock()?;
        let mut matching: Vec<&StoredAppointment> = inner
            .appointments
            .values()
            .filter(|apt| apt.client.email == email)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut views = Vec::new();
        for apt in matching {
            let counselor = inner
                .counselors
                .get(&apt.counselor_id)
                .ok_or(StoreError::NotFound(Entity::Counselor))?;
            views.push(AppointmentStatusView {
                appointment_id: apt.appointment_id.clone(),
                status: apt.status,
                scheduled_date: apt.scheduled_date,
                scheduled_time: apt.scheduled_time,
                counselor_name: counselor.full_name.clone(),
                counselor_email: counselor.email.clone(),
                created_at: apt.created_at,
                counselor_notes: optional_text(&apt.counselor_notes),
                rejection_reason: optional_text(&apt.rejection_reason),
            });
        }
        Ok(views)
    }

    fn fetch_appointment_detail(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentDetail>, StoreError> {
        let inner = self.lock()?;
        let Some(apt) = inner.appointments.get(appointment_id) else {
            return Ok(None);
        };
        let counselor = inner
            .counselors
            .get(&apt.counselor_id)
            .ok_or(StoreError::NotFound(Entity::Counselor))?;
        let submission = inner
            .submissions
            .get(&apt.submission_id)
            .ok_or(StoreError::NotFound(Entity::Assessment))?;

        Ok(Some(AppointmentDetail {
            appointment_id: apt.appointment_id.clone(),
            status: apt.status,
            scheduled_date: apt.scheduled_date,
            scheduled_time: apt.scheduled_time,
            created_at: apt.created_at,
            counselor_notes: optional_text(&apt.counselor_notes),
            rejection_reason: optional_text(&apt.rejection_reason),
            client: apt.client.clone(),
            counselor_name: counselor.full_name.clone(),
            counselor_email: counselor.email.clone(),
            assessment: submission.clone(),
        }))
    }

    fn fetch_appointment_status(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentStatus>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.appointments.get(appointment_id).map(|apt| apt.status))
    }

    fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        counselor_notes: &str,
        rejection_reason: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let apt = inner
            .appointments
            .get_mut(appointment_id)
            .ok_or(StoreError::NotFound(Entity::Appointment))?;
        apt.status = status;
        apt.counselor_notes = counselor_notes.to_string();
        apt.rejection_reason = rejection_reason.to_string();
        Ok(())
    }

    fn appointments_for_counselor(
        &self,
        counselor_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<CounselorAppointment>, StoreError> {
        let inner = self.lock()?;
        let mut matching: Vec<&StoredAppointment> = inner
            .appointments
            .values()
            .filter(|apt| apt.counselor_id == counselor_id)
            .filter(|apt| status.map_or(true, |wanted| apt.status == wanted))
            .collect();
        matching.sort_by(|a, b| {
            (b.scheduled_date, b.scheduled_time).cmp(&(a.scheduled_date, a.scheduled_time))
        });

        Ok(matching
            .into_iter()
            .map(|apt| CounselorAppointment {
                appointment_id: apt.appointment_id.clone(),
                status: apt.status,
                scheduled_date: apt.scheduled_date,
                scheduled_time: apt.scheduled_time,
                created_at: apt.created_at,
                client_full_name: apt.client.full_name.clone(),
                client_email: apt.client.email.clone(),
            })
            .collect())
    }

    fn dashboard_stats(&self, counselor_id: &str) -> Result<DashboardStats, StoreError> {
        let inner = self.lock()?;
        let mut stats = DashboardStats {
            total_appointments: 0,
            pending_appointments: 0,
            confirmed_appointments: 0,
            rejected_appointments: 0,
            completed_appointments: 0,
            total_assessments: inner.submissions.len() as u64,
            low_stress: 0,
            moderate_stress: 0,
            high_stress: 0,
        };
        for apt in inner
            .appointments
            .values()
            .filter(|apt| apt.counselor_id == counselor_id)
        {
            stats.total_appointments += 1;
            match apt.status {
                AppointmentStatus::Pending => stats.pending_appointments += 1,
                AppointmentStatus::Confirmed => stats.confirmed_appointments += 1,
                AppointmentStatus::Rejected => stats.rejected_appointments += 1,
                AppointmentStatus::Completed => stats.completed_appointments += 1,
            }
        }
        for record in inner.submissions.values() {
            match record.stress_level {
                StressLevel::Low => stats.low_stress += 1,
                StressLevel::Moderate => stats.moderate_stress += 1,
                StressLevel::High => stats.high_stress += 1,
            }
        }
        Ok(stats)
    }
}
