//! # repokit
//!
//! Generic repository layer over SQLite with typed models, composable
//! query specifications and pagination, plus the HTTP middleware a
//! service built on it needs.
//!
//! ## Features
//!
//! - **Repositories**: one [`GenericRepository`](repository::GenericRepository)
//!   serves every storable record through the [`Repository`](repository::Repository) contract
//! - **Specifications**: predicate trees compiled to parameterized SQL
//! - **Pagination**: limit/offset windows and page metadata
//! - **Cancellation**: every data access races a [`Context`](context::Context)
//! - **Response cache**: TTL-bound caching of successful `GET` responses
//! - **Services**: user and API-key operations over the repositories
//! - **API keys**: HS256-signed keys checked against the stored set
//!
//! ## Example
//!
//! ```rust,no_run
//! use repokit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::build(config).await?;
//!     let ctx = Context::background();
//!
//!     let (users, meta) = state
//!         .users()
//!         .find_with_pagination(&ctx, 1, 20, &[Specification::equal("status", "NORMAL")])
//!         .await?;
//!     tracing::info!(total = meta.total_items, returned = users.len(), "Loaded users");
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod observability;
pub mod repository;
pub mod state;
pub mod storage;

#[cfg(feature = "http")]
pub mod middleware;

#[cfg(feature = "http")]
pub mod responses;

pub mod service;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ApiKeyConfig, CacheConfig, Config, DatabaseConfig, ServiceConfig};
    pub use crate::context::{Context, ContextError};
    pub use crate::error::{Error, Result};
    pub use crate::model::{ApiKey, ApiKeyDto, ApiKeyDuration, Metadata, User, UserDto, UserStatus};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        and, or, GenericRepository, Model, Pagination, PaginationMetadata, Repository,
        RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult, Scalar,
        Specification,
    };
    pub use crate::state::{ApiKeyRepository, AppState, UserRepository};
    pub use crate::storage::{PersistenceClient, Query, Record, SqliteClient};

    #[cfg(feature = "http")]
    pub use crate::middleware::{cache_key, CacheStore, MemoryCacheStore, ResponseCache};

    #[cfg(feature = "http")]
    pub use crate::responses::Envelope;

    pub use crate::service::UserService;

    #[cfg(feature = "jwt")]
    pub use crate::service::{ApiKeyClaims, ApiKeyService};

    #[cfg(all(feature = "http", feature = "jwt"))]
    pub use crate::middleware::{ApiKeyAuth, CredentialLookup};

    // Re-export commonly used external types
    #[cfg(feature = "http")]
    pub use axum::{
        extract::{Path, Query as QueryParams, State},
        routing::{delete, get, post, put},
        Json, Router,
    };

    pub use serde::{Deserialize, Serialize};
    pub use tokio;

    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, warn};
}
