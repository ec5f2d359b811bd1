//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;
use crate::repository::{Model, Scalar};
use crate::storage::Record;

/// Account state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum UserStatus {
    /// Active account
    #[default]
    Normal,
    /// Temporarily locked
    Locked,
    /// Permanently blocked
    Blocked,
}

impl UserStatus {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Locked => "LOCKED",
            Self::Blocked => "BLOCKED",
        }
    }
}

/// Stored user row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    #[sqlx(flatten)]
    pub meta: Metadata,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
}

/// User as exposed to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(flatten)]
    pub meta: Metadata,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub status: UserStatus,
}

impl Model<UserDto> for User {
    fn to_value(&self) -> UserDto {
        UserDto {
            meta: self.meta.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            status: self.status,
        }
    }

    fn from_value(value: &UserDto) -> Self {
        Self {
            meta: value.meta.clone(),
            username: value.username.clone(),
            first_name: value.first_name.clone(),
            last_name: value.last_name.clone(),
            status: value.status,
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const SOFT_DELETE: Option<&'static str> = Some(Metadata::SOFT_DELETE_COLUMN);

    fn primary_key(&self) -> Scalar {
        Scalar::Integer(self.meta.id)
    }

    fn columns(&self) -> Vec<(&'static str, Scalar)> {
        let mut columns = self.meta.columns();
        columns.push(("username", self.username.as_str().into()));
        columns.push(("first_name", self.first_name.as_str().into()));
        columns.push(("last_name", self.last_name.as_str().into()));
        columns.push(("status", self.status.as_str().into()));
        columns
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.meta.touch(now);
    }
}
