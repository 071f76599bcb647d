//! Ward - clinic/hospital management backend
//!
//! A multi-tenant clinic management server with:
//! - Role-based user provisioning (superAdmin → companyAdmin → staff/patients)
//! - Billing with derived payment status and commission reporting
//! - Inventory with atomic stock consumption
//! - Appointments, consultations, prescriptions, lab tests, vaccinations

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
