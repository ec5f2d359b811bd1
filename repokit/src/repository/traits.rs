//! Repository trait definitions
//!
//! This module provides the two contracts of the data-access layer using RPITIT
//! (Return Position Impl Trait In Traits), available since Rust 1.75.
//!
//! # Overview
//!
//! - [`Model`]: conversion between a storable record and its value representation
//! - [`Repository`]: typed CRUD, filtered and paginated queries over values
//!
//! Callers only ever see value types. Records stay inside the repository and
//! the persistence client.
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::context::Context;
//! use repokit::repository::{Repository, Specification};
//!
//! async fn heavy_products<R: Repository<ProductDto>>(repo: &R) -> RepositoryResult<Vec<ProductDto>> {
//!     let ctx = Context::background();
//!     repo.find(&ctx, &[Specification::greater_or_equal("weight", 90)]).await
//! }
//! ```

use std::future::Future;

use super::error::RepositoryResult;
use super::pagination::PaginationMetadata;
use super::specification::Specification;
use super::value::Scalar;
use crate::context::Context;

/// Conversion between a storable record and its value representation `V`
///
/// For every value `v`, `Self::from_value(&v).to_value() == v` on every field
/// `V` exposes.
pub trait Model<V>: Sized {
    /// Record to value
    fn to_value(&self) -> V;

    /// Value to record
    fn from_value(value: &V) -> Self;
}

/// Typed data access over value representations
///
/// Every list operation orders rows by ascending primary key. Specifications
/// passed together are combined with AND. Errors from the persistence client
/// are returned unchanged.
pub trait Repository<V>: Send + Sync
where
    V: Send + Sync,
{
    /// Every row
    fn find_all(&self, ctx: &Context) -> impl Future<Output = RepositoryResult<Vec<V>>> + Send;

    /// Rows matching all `specs`
    fn find(
        &self,
        ctx: &Context,
        specs: &[Specification],
    ) -> impl Future<Output = RepositoryResult<Vec<V>>> + Send;

    /// Rows matching all `specs` within a limit/offset window
    ///
    /// A negative `limit` means unlimited and a negative `offset` means no
    /// offset.
    fn find_with_limit(
        &self,
        ctx: &Context,
        limit: i64,
        offset: i64,
        specs: &[Specification],
    ) -> impl Future<Output = RepositoryResult<Vec<V>>> + Send;

    /// One page of rows matching all `specs`, plus page metadata
    ///
    /// Fails with `InvalidArgument` when `page < 1` or `per_page <= 0`.
    fn find_with_pagination(
        &self,
        ctx: &Context,
        page: i64,
        per_page: i64,
        specs: &[Specification],
    ) -> impl Future<Output = RepositoryResult<(Vec<V>, PaginationMetadata)>> + Send;

    /// Number of rows matching all `specs`
    fn count(
        &self,
        ctx: &Context,
        specs: &[Specification],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Row with primary key `id`, or `NotFound`
    fn find_by_id(
        &self,
        ctx: &Context,
        id: impl Into<Scalar> + Send,
    ) -> impl Future<Output = RepositoryResult<V>> + Send;

    /// Persist `value` and refresh it with generated fields
    fn insert(&self, ctx: &Context, value: &mut V) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Upsert `value` by primary key and refresh it with the stored row
    fn update(&self, ctx: &Context, value: &mut V) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Delete the row identified by `value`'s primary key
    fn delete(&self, ctx: &Context, value: &V) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Delete the row with primary key `id`, or `NotFound`
    fn delete_by_id(
        &self,
        ctx: &Context,
        id: impl Into<Scalar> + Send,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: i64,
        body: String,
        revision: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct NoteDto {
        id: i64,
        body: String,
    }

    impl Model<NoteDto> for Note {
        fn to_value(&self) -> NoteDto {
            NoteDto {
                id: self.id,
                body: self.body.clone(),
            }
        }

        fn from_value(value: &NoteDto) -> Self {
            Self {
                id: value.id,
                body: value.body.clone(),
                revision: 0,
            }
        }
    }

    #[test]
    fn test_model_round_trip_keeps_shared_fields() {
        let value = NoteDto {
            id: 4,
            body: "hello".to_string(),
        };
        assert_eq!(Note::from_value(&value).to_value(), value);
    }

    #[test]
    fn test_model_drops_record_only_fields() {
        let note = Note {
            id: 1,
            body: "x".to_string(),
            revision: 9,
        };
        let restored = Note::from_value(&note.to_value());
        assert_eq!(restored.revision, 0);
        assert_eq!(restored.body, note.body);
    }
}
