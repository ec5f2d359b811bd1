//! API key issuing and lookup
//!
//! An API key is an HS256-signed JWT whose claims carry the key's name and,
//! unless the key is unlimited, its expiry. The signed string itself is
//! stored in the `token` column so a presented key can be checked against
//! the live set of keys.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::ApiKeyConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::model::{ApiKeyDto, ApiKeyDuration};
use crate::repository::{Repository, RepositoryError, RepositoryResult, Specification};

/// Claims signed into an API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyClaims {
    /// Key name
    pub name: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch), absent for unlimited keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl ApiKeyClaims {
    /// Claims for a key named `name` issued at `issued_at`
    pub fn new(name: impl Into<String>, duration: ApiKeyDuration, issued_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            iat: issued_at.timestamp(),
            exp: duration.expires_at(issued_at).map(|at| at.timestamp()),
        }
    }
}

/// Issues, lists, looks up and revokes API keys
pub struct ApiKeyService<R> {
    repo: R,
    encoding_key: EncodingKey,
}

impl<R> ApiKeyService<R>
where
    R: Repository<ApiKeyDto>,
{
    /// Create a service signing keys with `config.secret_key`
    pub fn new(repo: R, config: &ApiKeyConfig) -> Result<Self> {
        if config.secret_key.is_empty() {
            return Err(Error::Internal("API key secret is not configured".to_string()));
        }
        Ok(Self {
            repo,
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
        })
    }

    /// Sign a credential for `name` valid for `duration` from `issued_at`
    pub fn issue_token(
        &self,
        name: &str,
        duration: ApiKeyDuration,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = ApiKeyClaims::new(name, duration, issued_at);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Sign a credential for `dto`, store it, and refresh `dto` with the stored row
    pub async fn create(&self, ctx: &Context, dto: &mut ApiKeyDto) -> Result<()> {
        if dto.name.trim().is_empty() {
            return Err(Error::BadRequest("API key name is required".to_string()));
        }

        dto.token = self.issue_token(&dto.name, dto.duration, Utc::now())?;
        self.repo.insert(ctx, dto).await?;

        tracing::info!(
            id = dto.meta.id,
            name = %dto.name,
            duration = dto.duration.as_str(),
            "API key issued"
        );
        Ok(())
    }

    /// Every live key
    pub async fn find_all(&self, ctx: &Context) -> RepositoryResult<Vec<ApiKeyDto>> {
        self.repo.find_all(ctx).await
    }

    /// Key with primary key `id`
    pub async fn find_by_id(&self, ctx: &Context, id: i64) -> RepositoryResult<ApiKeyDto> {
        self.repo.find_by_id(ctx, id).await
    }

    /// Live key whose signed credential is `token`
    pub async fn find_by_token(&self, ctx: &Context, token: &str) -> RepositoryResult<ApiKeyDto> {
        self.repo
            .find_with_limit(ctx, 1, 0, &[Specification::equal("token", token)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::not_found("api_keys", "<token>"))
    }

    /// Revoke the key with primary key `id`
    pub async fn revoke(&self, ctx: &Context, id: i64) -> RepositoryResult<()> {
        self.repo.delete_by_id(ctx, id).await?;
        tracing::info!(id, "API key revoked");
        Ok(())
    }
}
