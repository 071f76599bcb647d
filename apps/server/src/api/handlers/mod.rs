//! Request handlers, grouped by domain.

pub mod appointments;
pub mod auth;
pub mod billing;
pub mod clinical;
pub mod clinics;
pub mod feedback;
pub mod inventory;
pub mod reports;
pub mod users;
