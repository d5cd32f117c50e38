//! Shared types and models for the Sitebook platform
//!
//! This crate contains types shared between the backend, the browser apps
//! (via WASM), and other components of the platform.

pub mod models;
pub mod sync;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
