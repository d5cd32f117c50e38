//! HTTP handlers for the Sitebook platform API

pub mod auth;
pub mod billing;
pub mod entry;
pub mod health;
pub mod listing;
pub mod medicine;
pub mod organization;
pub mod sync;
pub mod transcription;

pub use auth::*;
pub use billing::*;
pub use entry::*;
pub use health::*;
pub use listing::*;
pub use medicine::*;
pub use organization::*;
pub use sync::*;
pub use transcription::*;
