//! Middleware - request identification and shared tower layers.

pub mod layers;
pub mod request_id;

pub use layers::{compression, cors, trace};
pub use request_id::request_id_middleware;
