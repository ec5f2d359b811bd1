//! Application state management
//!
//! [`AppState`] is the composition root: it owns the configuration, the
//! SQLite client and the repositories built on it, and hands out the
//! middleware state the HTTP layer needs.

use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    model::{ApiKey, ApiKeyDto, User, UserDto},
    repository::GenericRepository,
    service::UserService,
    storage::SqliteClient,
};

#[cfg(feature = "http")]
use crate::middleware::ResponseCache;

#[cfg(feature = "jwt")]
use crate::service::ApiKeyService;

#[cfg(all(feature = "http", feature = "jwt"))]
use crate::middleware::ApiKeyAuth;

/// Repository over the `users` table
pub type UserRepository = GenericRepository<User, UserDto, SqliteClient>;

/// Repository over the `api_keys` table
pub type ApiKeyRepository = GenericRepository<ApiKey, ApiKeyDto, SqliteClient>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: SqliteClient,
    users: Arc<UserRepository>,
    api_keys: Arc<ApiKeyRepository>,
    user_service: Arc<UserService<UserRepository>>,

    #[cfg(feature = "jwt")]
    api_key_service: Option<Arc<ApiKeyService<ApiKeyRepository>>>,

    #[cfg(feature = "http")]
    cache: ResponseCache,
}

impl AppState {
    /// Connect to the configured database and wire every component
    pub async fn build(config: Config) -> Result<Self> {
        let client = SqliteClient::connect(&config.database).await?;
        tracing::info!(
            service = %config.service.name,
            environment = %config.service.environment,
            "Application state initialized"
        );
        Self::with_client(config, client)
    }

    /// Wire every component over an existing client
    pub fn with_client(config: Config, client: SqliteClient) -> Result<Self> {
        let users = Arc::new(UserRepository::new(client.clone()));
        let api_keys = Arc::new(ApiKeyRepository::new(client.clone()));
        let user_service = Arc::new(UserService::new((*users).clone()));

        #[cfg(feature = "jwt")]
        let api_key_service = if config.api_key.secret_key.is_empty() {
            tracing::warn!("API key secret not configured; API key issuing and authentication are disabled");
            None
        } else {
            Some(Arc::new(ApiKeyService::new(
                (*api_keys).clone(),
                &config.api_key,
            )?))
        };

        #[cfg(feature = "http")]
        let cache = ResponseCache::in_memory(&config.cache);

        Ok(Self {
            config: Arc::new(config),
            client,
            users,
            api_keys,
            user_service,
            #[cfg(feature = "jwt")]
            api_key_service,
            #[cfg(feature = "http")]
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared SQLite client
    pub fn client(&self) -> &SqliteClient {
        &self.client
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn api_keys(&self) -> &ApiKeyRepository {
        &self.api_keys
    }

    /// User operations with validation and failure logging
    pub fn user_service(&self) -> &UserService<UserRepository> {
        &self.user_service
    }

    /// API key service, present when a signing secret is configured
    #[cfg(feature = "jwt")]
    pub fn api_key_service(&self) -> Option<&Arc<ApiKeyService<ApiKeyRepository>>> {
        self.api_key_service.as_ref()
    }

    /// Response cache middleware state
    #[cfg(feature = "http")]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// API key middleware state backed by the stored keys
    #[cfg(all(feature = "http", feature = "jwt"))]
    pub fn api_key_auth(&self) -> Result<ApiKeyAuth> {
        let service = self.api_key_service.clone().ok_or_else(|| {
            crate::error::Error::Internal("API key secret is not configured".to_string())
        })?;
        ApiKeyAuth::new(&self.config.api_key, service)
    }
}
