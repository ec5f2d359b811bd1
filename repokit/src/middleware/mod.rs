//! Middleware modules for response caching and API key authentication

pub mod cache;

// API key authentication (requires jwt feature)
#[cfg(feature = "jwt")]
pub mod api_key;

pub use cache::{cache_key, CacheStore, MemoryCacheStore, ResponseCache, X_CACHE};

#[cfg(feature = "jwt")]
pub use api_key::{ApiKeyAuth, CredentialLookup};
