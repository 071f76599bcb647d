//! Domain models returned by the API.
//!
//! Enumerated status fields are stored as their wire strings in Postgres and
//! parsed back through `FromStr`; ids are UUIDs and human-readable codes are
//! per-entity sequences (`INV-1001`, `APT-1001`, ...).

pub mod billing;
pub mod clinic;
pub mod clinical;
pub mod feedback;
pub mod inventory;
pub mod scheduling;
pub mod user;

pub use billing::{Bill, BillDetail, BillItem, BillPayment};
pub use clinic::Clinic;
pub use clinical::{
    Consultation, DoseStatus, LabTest, Prescription, PrescriptionLine, VaccinationDose,
};
pub use feedback::{Issue, IssueStatus, ReporterType};
pub use inventory::{Drug, StockItem, StockOut};
pub use scheduling::{Appointment, AppointmentStatus, AppointmentType};
pub use user::User;
