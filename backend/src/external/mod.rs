//! External API integrations

pub mod stripe;
pub mod transcription;

pub use stripe::StripeClient;
pub use transcription::TranscriptionClient;
