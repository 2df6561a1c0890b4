//! Helpdesk Technicians
//!
//! Technician workers that pull tickets from the dispatcher, and the pool that
//! hires and stops them.

pub mod pool;
pub mod technician;

pub use pool::{TechnicianPool, TechnicianStatus};
pub use technician::{Technician, TechnicianStats};
