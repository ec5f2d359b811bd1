//! Domain services built on repositories

pub mod user;

// API key issuing (requires jwt feature)
#[cfg(feature = "jwt")]
pub mod api_key;

pub use user::UserService;

#[cfg(feature = "jwt")]
pub use api_key::{ApiKeyClaims, ApiKeyService};
