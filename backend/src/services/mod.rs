//! Business logic services for the Sitebook platform

pub mod auth;
pub mod billing;
pub mod entry;
pub mod listing;
pub mod medicine;
pub mod organization;
pub mod sync;

pub use auth::AuthService;
pub use billing::BillingService;
pub use entry::EntryService;
pub use listing::ListingService;
pub use medicine::MedicineService;
pub use organization::OrganizationService;
pub use sync::SyncService;
