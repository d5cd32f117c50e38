//! Domain models for the Sitebook platform

mod billing;
mod entry;
mod listing;
mod medicine;
mod user;

pub use billing::*;
pub use entry::*;
pub use listing::*;
pub use medicine::*;
pub use user::*;
