//! Authenticated counselor surface: login, assessment review, appointment
//! management, slot calendar, account administration, and analytics.

pub mod router;

pub use router::{admin_router, AdminState};
