//! Core library for the guidance and counseling service.
//!
//! Three surfaces share one store: anonymous stress self-assessments
//! ([`assessment`]), public appointment booking ([`booking`]), and the
//! authenticated counselor console ([`admin`]).

pub mod admin;
pub mod assessment;
pub mod auth;
pub mod booking;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;

pub use error::AppError;
