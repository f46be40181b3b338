//! API handlers.

pub mod details;
pub mod health;

pub use details::*;
pub use health::*;
