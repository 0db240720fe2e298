//! API endpoint handlers.
//!
//! Handlers parse wire input, ask the policy, and delegate to the scheduler.

pub mod appointments;
pub mod directory;
pub mod health;
