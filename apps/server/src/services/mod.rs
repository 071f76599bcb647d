//! External collaborators and cross-cutting services.

pub mod mail;
pub mod password;
