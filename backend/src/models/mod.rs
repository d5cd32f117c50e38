//! Database models for the Sitebook platform
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
