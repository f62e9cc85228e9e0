//! Scheduler crate: runs scheduling cycles over a reloadable profile.
//!
//! This crate wires the plugins built from configuration into a profile and
//! exposes the per-request entry point used by the endpoint picker.

pub mod profile;
pub mod scheduler;

pub use profile::{SchedulerProfile, SchedulingResult};
pub use scheduler::Scheduler;
