//! Persistence client abstraction
//!
//! The repository never talks to a database directly. It builds a [`Query`]
//! from compiled specifications and hands it, together with a [`Context`], to
//! a [`PersistenceClient`]. Storable types describe their backend mapping
//! through [`Record`].
//!
//! Implementations must be safe for concurrent use; [`sqlite::SqliteClient`]
//! gets this from its connection pool.

pub mod sqlite;

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use crate::context::Context;
use crate::repository::{Fragment, Pagination, RepositoryResult, Scalar};

pub use sqlite::SqliteClient;

/// Backend mapping of a storable type
///
/// # Example
///
/// ```rust,ignore
/// #[derive(sqlx::FromRow)]
/// struct Product { id: i64, name: String, weight: i64 }
///
/// impl Record for Product {
///     const TABLE: &'static str = "products";
///
///     fn primary_key(&self) -> Scalar {
///         self.id.into()
///     }
///
///     fn columns(&self) -> Vec<(&'static str, Scalar)> {
///         vec![("id", self.id.into()), ("name", self.name.as_str().into()), ("weight", self.weight.into())]
///     }
/// }
/// ```
pub trait Record: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Primary key column
    const PRIMARY_KEY: &'static str = "id";

    /// Soft-delete marker column, if rows are never physically removed
    const SOFT_DELETE: Option<&'static str> = None;

    /// Primary key value
    fn primary_key(&self) -> Scalar;

    /// Columns to write, in order
    ///
    /// Leave the primary key out while it is unassigned so the backend
    /// generates it.
    fn columns(&self) -> Vec<(&'static str, Scalar)>;

    /// Update persistence timestamps before a write
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

/// Chained query description
///
/// Filters are combined with AND. Ordering columns are ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Fragment>,
    window: Pagination,
    order_by: Vec<String>,
}

impl Query {
    /// An unfiltered, unbounded query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter fragment
    #[must_use]
    pub fn filter(mut self, fragment: Fragment) -> Self {
        self.filters.push(fragment);
        self
    }

    /// Cap the number of rows
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.window.limit = Some(limit);
        self
    }

    /// Skip rows
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.window.offset = offset;
        self
    }

    /// Replace the limit/offset window
    #[must_use]
    pub fn paginate(mut self, window: Pagination) -> Self {
        self.window = window;
        self
    }

    /// Order by `column` ascending, after any previous ordering
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Filter fragments
    pub fn filters(&self) -> &[Fragment] {
        &self.filters
    }

    /// Limit/offset window
    pub fn window(&self) -> Pagination {
        self.window
    }

    /// Ordering columns
    pub fn ordering(&self) -> &[String] {
        &self.order_by
    }
}

/// Store the repository runs against
///
/// Every method honours the context: once it is cancelled or past its
/// deadline the call returns a `Cancelled` or `DeadlineExceeded` error.
pub trait PersistenceClient: Send + Sync {
    /// Rows of `E` matching `query`
    fn find<E: Record>(
        &self,
        ctx: &Context,
        query: &Query,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Number of rows of `E` matching the filters of `query`
    ///
    /// The window and ordering are ignored.
    fn count<E: Record>(
        &self,
        ctx: &Context,
        query: &Query,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Row of `E` with primary key `id`, or `NotFound`
    fn first<E: Record>(
        &self,
        ctx: &Context,
        id: &Scalar,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Insert `record` and return the stored row
    fn create<E: Record>(
        &self,
        ctx: &Context,
        record: E,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Insert or replace `record` by primary key and return the stored row
    fn save<E: Record>(
        &self,
        ctx: &Context,
        record: E,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Delete the row of `E` with primary key `id`, returning rows affected
    fn delete<E: Record>(
        &self,
        ctx: &Context,
        id: &Scalar,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Specification;

    #[test]
    fn test_query_chaining() {
        let query = Query::new()
            .filter(Specification::equal("name", "a").compile())
            .filter(Specification::greater_than("weight", 1).compile())
            .limit(10)
            .offset(20)
            .order_by("id");

        assert_eq!(query.filters().len(), 2);
        assert_eq!(query.window().limit, Some(10));
        assert_eq!(query.window().offset, 20);
        assert_eq!(query.ordering(), ["id".to_string()]);
    }

    #[test]
    fn test_paginate_replaces_window() {
        let query = Query::new().limit(3).paginate(Pagination::unbounded());
        assert!(query.window().is_unbounded());
    }
}
