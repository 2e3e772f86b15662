use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::domain::SubmissionRecord;

/// Lifecycle states of an appointment. Every appointment starts Pending;
/// which transitions are legal is decided by the coordinator's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Rejected => "Rejected",
            AppointmentStatus::Completed => "Completed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Pending" => Some(AppointmentStatus::Pending),
            "Confirmed" => Some(AppointmentStatus::Confirmed),
            "Rejected" => Some(AppointmentStatus::Rejected),
            "Completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Contact and demographic details captured at booking time. Not linked to
/// any user account; assessments stay anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub course: String,
    pub year_level: String,
    pub gender: String,
    pub age: u8,
    #[serde(default)]
    pub contact_number: Option<String>,
}

/// Client request to claim a slot with a counselor for a prior submission.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub submission_id: String,
    pub counselor_id: String,
    pub slot_id: String,
    pub client_details: ClientDetails,
}

/// A counselor account as stored, credential hash included. Exposed views
/// go through [`CounselorProfile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounselorRecord {
    pub counselor_id: String,
    pub full_name: String,
    pub email: String,
    pub employee_id: String,
    pub specialization: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl CounselorRecord {
    pub fn profile(&self) -> CounselorProfile {
        CounselorProfile {
            counselor_id: self.counselor_id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            employee_id: self.employee_id.clone(),
            specialization: self.specialization.clone(),
            created_at: self.created_at,
        }
    }
}

/// Counselor identity without the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounselorProfile {
    pub counselor_id: String,
    pub full_name: String,
    pub email: String,
    pub employee_id: String,
    pub specialization: String,
    pub created_at: DateTime<Utc>,
}

/// A counselor-owned bookable time interval. `is_available` flips to false
/// exactly once, when an appointment claims the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRecord {
    pub slot_id: String,
    pub counselor_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

/// One open slot as shown to clients browsing availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableSlot {
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A counselor together with their currently open slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounselorAvailability {
    pub counselor_id: String,
    pub full_name: String,
    pub specialization: String,
    pub email: String,
    pub available_slots: Vec<AvailableSlot>,
}

/// Everything the store needs to claim a slot atomically. Scheduled date and
/// time are copied from the slot inside the claim transaction, not supplied
/// here.
#[derive(Debug, Clone)]
pub struct SlotClaim {
    pub appointment_id: String,
    pub submission_id: String,
    pub counselor_id: String,
    pub slot_id: String,
    pub client: ClientDetails,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful claim, echoing the snapshot taken from the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookedAppointment {
    pub appointment_id: String,
    pub status: AppointmentStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub counselor_name: String,
}

/// One appointment as shown to the client checking status by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentStatusView {
    pub appointment_id: String,
    pub status: AppointmentStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub counselor_name: String,
    pub counselor_email: String,
    pub created_at: DateTime<Utc>,
    pub counselor_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Full appointment detail for counselors, joined with the originating
/// assessment and the assigned counselor. Both joins are mandatory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentDetail {
    pub appointment_id: String,
    pub status: AppointmentStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub counselor_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub client: ClientDetails,
    pub counselor_name: String,
    pub counselor_email: String,
    pub assessment: SubmissionRecord,
}

/// Listing entry for a counselor reviewing their own appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounselorAppointment {
    pub appointment_id: String,
    pub status: AppointmentStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub client_full_name: String,
    pub client_email: String,
}

/// Slot listing entry for the admin calendar, including the occupying
/// appointment when the slot has been claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOverview {
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub appointment_id: Option<String>,
    pub client_name: Option<String>,
    pub appointment_status: Option<AppointmentStatus>,
}

/// Acknowledgement returned after a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub appointment_id: String,
    pub status: AppointmentStatus,
}

/// Counts for the counselor dashboard: the counselor's appointments by
/// status plus system-wide assessment stress distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_appointments: u64,
    pub pending_appointments: u64,
    pub confirmed_appointments: u64,
    pub rejected_appointments: u64,
    pub completed_appointments: u64,
    pub total_assessments: u64,
    pub low_stress: u64,
    pub moderate_stress: u64,
    pub high_stress: u64,
}
