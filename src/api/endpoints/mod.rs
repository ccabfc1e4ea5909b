//! API endpoint handlers.

pub mod health;
pub mod sessions;
pub mod turns;
