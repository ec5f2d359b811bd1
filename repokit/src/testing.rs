//! Shared fixtures for unit tests

use chrono::{DateTime, Utc};

use crate::repository::{Model, Scalar};
use crate::storage::{Record, SqliteClient};

const SCHEMA: &[&str] = &[
    "CREATE TABLE products (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        weight INTEGER NOT NULL,
        is_available BOOLEAN NOT NULL
    )",
    "CREATE TABLE tombstones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        deleted_at TEXT
    )",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT,
        username TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE api_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT,
        token TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        duration TEXT NOT NULL
    )",
];

/// In-memory client with every fixture table created
pub(crate) async fn memory_client() -> SqliteClient {
    let client = SqliteClient::in_memory().await.unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(client.pool()).await.unwrap();
    }
    client
}

/// Hard-deleted record with a caller-assigned or generated key
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub(crate) struct Product {
    pub id: i64,
    pub name: String,
    pub weight: i64,
    pub is_available: bool,
}

impl Product {
    pub fn new(id: i64, name: &str, weight: i64, is_available: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            weight,
            is_available,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProductDto {
    pub id: i64,
    pub name: String,
    pub weight: i64,
    pub is_available: bool,
}

impl Model<ProductDto> for Product {
    fn to_value(&self) -> ProductDto {
        ProductDto {
            id: self.id,
            name: self.name.clone(),
            weight: self.weight,
            is_available: self.is_available,
        }
    }

    fn from_value(value: &ProductDto) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            weight: value.weight,
            is_available: value.is_available,
        }
    }
}

impl Record for Product {
    const TABLE: &'static str = "products";

    fn primary_key(&self) -> Scalar {
        self.id.into()
    }

    fn columns(&self) -> Vec<(&'static str, Scalar)> {
        let mut columns = Vec::with_capacity(4);
        if self.id != 0 {
            columns.push(("id", self.id.into()));
        }
        columns.push(("name", self.name.as_str().into()));
        columns.push(("weight", self.weight.into()));
        columns.push(("is_available", self.is_available.into()));
        columns
    }
}

/// Soft-deleted record with a generated key
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub(crate) struct Tombstone {
    pub id: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record for Tombstone {
    const TABLE: &'static str = "tombstones";
    const SOFT_DELETE: Option<&'static str> = Some("deleted_at");

    fn primary_key(&self) -> Scalar {
        self.id.into()
    }

    fn columns(&self) -> Vec<(&'static str, Scalar)> {
        let mut columns = Vec::with_capacity(2);
        if self.id != 0 {
            columns.push(("id", self.id.into()));
        }
        columns.push(("deleted_at", self.deleted_at.into()));
        columns
    }
}
