//! API key authentication middleware
//!
//! Reads the key from a configurable request header (`X-API-Key` by
//! default), verifies its HS256 signature and expiry, then checks that the
//! key is still on record. The stored key is inserted into the request
//! extensions for downstream handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::config::ApiKeyConfig;
use crate::context::Context;
use crate::error::Error;
use crate::model::ApiKeyDto;
use crate::repository::{Repository, RepositoryResult};
use crate::service::{ApiKeyClaims, ApiKeyService};

/// Lookup of a presented credential against the stored keys
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    /// The live key whose credential is `credential`
    async fn lookup(&self, ctx: &Context, credential: &str) -> RepositoryResult<ApiKeyDto>;
}

#[async_trait]
impl<R> CredentialLookup for ApiKeyService<R>
where
    R: Repository<ApiKeyDto> + 'static,
{
    async fn lookup(&self, ctx: &Context, credential: &str) -> RepositoryResult<ApiKeyDto> {
        self.find_by_token(ctx, credential).await
    }
}

/// API key authentication layer state
#[derive(Clone)]
pub struct ApiKeyAuth {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    header: HeaderName,
    lookup: Arc<dyn CredentialLookup>,
    lookup_timeout: Duration,
}

impl ApiKeyAuth {
    /// Create a new API key authenticator
    pub fn new(config: &ApiKeyConfig, lookup: Arc<dyn CredentialLookup>) -> Result<Self, Error> {
        if config.secret_key.is_empty() {
            return Err(Error::Internal("API key secret is not configured".to_string()));
        }

        let header = HeaderName::try_from(config.header.as_str()).map_err(|e| {
            Error::Internal(format!("Invalid API key header '{}': {}", config.header, e))
        })?;

        // Unlimited keys carry no exp claim
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();

        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret_key.as_bytes())),
            validation,
            header,
            lookup,
            lookup_timeout: config.lookup_timeout(),
        })
    }

    /// Verify the signature and expiry of `key`
    pub fn validate(&self, key: &str) -> Result<ApiKeyClaims, Error> {
        let token_data = decode::<ApiKeyClaims>(key, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Middleware function for API key authentication
    pub async fn middleware(
        State(auth): State<Self>,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response, Error> {
        let key = request
            .headers()
            .get(&auth.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if key.is_empty() {
            return Err(Error::Unauthorized("Unauthorized".to_string()));
        }

        let claims = auth.validate(&key).map_err(|e| {
            tracing::debug!("API key rejected: {}", e);
            Error::Unauthorized("Invalid or expired api key".to_string())
        })?;

        // Dropping the request drops the lookup; the deadline bounds a slow store.
        let ctx = Context::background().with_timeout(auth.lookup_timeout);
        let api_key = match auth.lookup.lookup(&ctx, &key).await {
            Ok(api_key) => api_key,
            Err(e) if e.is_context_error() => {
                tracing::warn!(name = %claims.name, "API key lookup abandoned: {}", e);
                return Err(Error::Repository(e));
            }
            Err(e) => {
                tracing::warn!(name = %claims.name, "API key lookup failed: {}", e);
                return Err(Error::Unauthorized(
                    "API key not found or has been revoked".to_string(),
                ));
            }
        };

        request.extensions_mut().insert(api_key);
        Ok(next.run(request).await)
    }
}
