//! Counselor availability and appointment booking.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    AppointmentDetail, AppointmentStatus, AppointmentStatusView, AvailableSlot, BookedAppointment,
    BookingRequest, ClientDetails, CounselorAppointment, CounselorAvailability, CounselorProfile,
    CounselorRecord, DashboardStats, SlotClaim, SlotOverview, SlotRecord, StatusUpdate,
};
pub use router::appointment_router;
pub use service::{
    permissive_transitions, strict_transitions, BookingCoordinator, BookingError, TransitionPolicy,
};
