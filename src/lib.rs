/// FirmaSøk - Norwegian company lookup with EHF capability resolution
///
/// Looks up organizations in Enhetsregisteret and tells whether each one can
/// receive EHF invoices, based on registrations in the Peppol directory.

pub mod api;
pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod metrics;
pub mod rate_limit;
pub mod registry;
pub mod server;

pub use context::AppContext;
pub use error::{AppError, AppResult};
