//! Persistence metadata shared by domain records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::Scalar;

/// Primary key, write timestamps and soft-delete marker
///
/// Embedded in records with `#[sqlx(flatten)]` and in value types with
/// `#[serde(flatten)]`. An `id` of 0 means the row has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Primary key
    #[serde(default)]
    pub id: i64,
    /// Set on first write
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set on every write
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Set when the row is soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Soft-delete marker column
    pub const SOFT_DELETE_COLUMN: &'static str = "deleted_at";

    /// Whether the backend has not assigned a key yet
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Stamp a write at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }

    /// Metadata columns to write, leaving out an unassigned key
    pub fn columns(&self) -> Vec<(&'static str, Scalar)> {
        let mut columns = Vec::with_capacity(4);
        if !self.is_new() {
            columns.push(("id", Scalar::Integer(self.id)));
        }
        columns.push(("created_at", self.created_at.into()));
        columns.push(("updated_at", self.updated_at.into()));
        columns.push((Self::SOFT_DELETE_COLUMN, self.deleted_at.into()));
        columns
    }
}
