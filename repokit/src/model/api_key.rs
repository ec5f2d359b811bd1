//! API keys

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;
use crate::repository::{Model, Scalar};
use crate::storage::Record;

/// Validity period of an issued key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum ApiKeyDuration {
    #[serde(rename = "7_DAYS")]
    #[sqlx(rename = "7_DAYS")]
    SevenDays,
    #[default]
    #[serde(rename = "30_DAYS")]
    #[sqlx(rename = "30_DAYS")]
    ThirtyDays,
    #[serde(rename = "90_DAYS")]
    #[sqlx(rename = "90_DAYS")]
    NinetyDays,
    #[serde(rename = "UNLIMITED")]
    #[sqlx(rename = "UNLIMITED")]
    Unlimited,
}

impl ApiKeyDuration {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevenDays => "7_DAYS",
            Self::ThirtyDays => "30_DAYS",
            Self::NinetyDays => "90_DAYS",
            Self::Unlimited => "UNLIMITED",
        }
    }

    /// Length of the period, `None` when the key never expires
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::SevenDays => Some(Duration::days(7)),
            Self::ThirtyDays => Some(Duration::days(30)),
            Self::NinetyDays => Some(Duration::days(90)),
            Self::Unlimited => None,
        }
    }

    /// Expiry of a key issued at `issued_at`
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.period().map(|period| issued_at + period)
    }
}

/// Stored API key row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ApiKey {
    #[sqlx(flatten)]
    pub meta: Metadata,
    pub token: String,
    pub name: String,
    pub duration: ApiKeyDuration,
}

/// API key as exposed to callers
///
/// The signed credential is serialized as `key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyDto {
    #[serde(flatten)]
    pub meta: Metadata,
    #[serde(rename = "key", default)]
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub duration: ApiKeyDuration,
}

impl Model<ApiKeyDto> for ApiKey {
    fn to_value(&self) -> ApiKeyDto {
        ApiKeyDto {
            meta: self.meta.clone(),
            token: self.token.clone(),
            name: self.name.clone(),
            duration: self.duration,
        }
    }

    fn from_value(value: &ApiKeyDto) -> Self {
        Self {
            meta: value.meta.clone(),
            token: value.token.clone(),
            name: value.name.clone(),
            duration: value.duration,
        }
    }
}

impl Record for ApiKey {
    const TABLE: &'static str = "api_keys";
    const SOFT_DELETE: Option<&'static str> = Some(Metadata::SOFT_DELETE_COLUMN);

    fn primary_key(&self) -> Scalar {
        Scalar::Integer(self.meta.id)
    }

    fn columns(&self) -> Vec<(&'static str, Scalar)> {
        let mut columns = self.meta.columns();
        columns.push(("token", self.token.as_str().into()));
        columns.push(("name", self.name.as_str().into()));
        columns.push(("duration", self.duration.as_str().into()));
        columns
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.meta.touch(now);
    }
}
