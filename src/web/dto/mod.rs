//! Data Transfer Objects for Web API.

pub mod details;
pub mod validation;

pub use details::*;
pub use validation::ValidatedQuery;
