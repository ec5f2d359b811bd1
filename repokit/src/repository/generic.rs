//! Generic repository over any persistence client
//!
//! [`GenericRepository`] is the single implementation of [`Repository`]. It is
//! generic over the storable record `E`, its value representation `V` and the
//! [`PersistenceClient`] `C`, and holds nothing but the client handle.
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::context::Context;
//! use repokit::repository::{and, GenericRepository, Repository, Specification};
//! use repokit::storage::SqliteClient;
//!
//! let client = SqliteClient::connect(&config.database).await?;
//! let products: GenericRepository<Product, ProductDto, _> = GenericRepository::new(client);
//!
//! let ctx = Context::background();
//! let (page, meta) = products
//!     .find_with_pagination(&ctx, 1, 20, &[Specification::greater_or_equal("weight", 90)])
//!     .await?;
//! ```

use std::fmt;
use std::marker::PhantomData;

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::pagination::{Pagination, PaginationMetadata};
use super::specification::Specification;
use super::traits::{Model, Repository};
use super::value::Scalar;
use crate::context::Context;
use crate::storage::{PersistenceClient, Query, Record};

/// Repository binding record type `E` to value type `V` over client `C`
pub struct GenericRepository<E, V, C> {
    client: C,
    _types: PhantomData<fn() -> (E, V)>,
}

impl<E, V, C> GenericRepository<E, V, C>
where
    E: Record + Model<V>,
    V: Send + Sync,
    C: PersistenceClient,
{
    /// Create a repository over `client`
    pub fn new(client: C) -> Self {
        Self {
            client,
            _types: PhantomData,
        }
    }

    /// Persistence client handle
    pub fn client(&self) -> &C {
        &self.client
    }

    // Each spec becomes its own filter, so specs passed side by side are ANDed.
    fn query(specs: &[Specification]) -> Query {
        specs
            .iter()
            .fold(Query::new(), |query, spec| query.filter(spec.compile()))
            .order_by(E::PRIMARY_KEY)
    }

    fn into_values(records: Vec<E>) -> Vec<V> {
        records.iter().map(Model::to_value).collect()
    }

    async fn remove(&self, ctx: &Context, id: Scalar) -> RepositoryResult<()> {
        let affected = self.client.delete::<E>(ctx, &id).await?;
        if affected == 0 {
            return Err(RepositoryError::not_found(E::TABLE, id.to_string())
                .with_operation(RepositoryOperation::Delete));
        }
        tracing::debug!(table = E::TABLE, id = %id, "Row deleted");
        Ok(())
    }
}

impl<E, V, C> Clone for GenericRepository<E, V, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _types: PhantomData,
        }
    }
}

impl<E, V, C> fmt::Debug for GenericRepository<E, V, C>
where
    E: Record,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("table", &E::TABLE)
            .finish_non_exhaustive()
    }
}

impl<E, V, C> Repository<V> for GenericRepository<E, V, C>
where
    E: Record + Model<V>,
    V: Send + Sync,
    C: PersistenceClient,
{
    async fn find_all(&self, ctx: &Context) -> RepositoryResult<Vec<V>> {
        self.find(ctx, &[]).await
    }

    async fn find(&self, ctx: &Context, specs: &[Specification]) -> RepositoryResult<Vec<V>> {
        self.find_with_limit(ctx, -1, -1, specs).await
    }

    async fn find_with_limit(
        &self,
        ctx: &Context,
        limit: i64,
        offset: i64,
        specs: &[Specification],
    ) -> RepositoryResult<Vec<V>> {
        let query = Self::query(specs).paginate(Pagination::window(limit, offset));
        let records = self.client.find::<E>(ctx, &query).await?;
        Ok(Self::into_values(records))
    }

    async fn find_with_pagination(
        &self,
        ctx: &Context,
        page: i64,
        per_page: i64,
        specs: &[Specification],
    ) -> RepositoryResult<(Vec<V>, PaginationMetadata)> {
        let window = Pagination::page(page, per_page)?;
        let offset = i64::try_from(window.offset).map_err(|_| {
            RepositoryError::invalid_argument(RepositoryOperation::Paginate, "offset out of range")
        })?;

        let items = self.find_with_limit(ctx, per_page, offset, specs).await?;
        let total_items = self.count(ctx, specs).await?;
        let meta = PaginationMetadata::new(page, per_page, total_items)?;

        tracing::debug!(
            table = E::TABLE,
            page = meta.page,
            per_page = meta.per_page,
            total_items = meta.total_items,
            "Page fetched"
        );
        Ok((items, meta))
    }

    async fn count(&self, ctx: &Context, specs: &[Specification]) -> RepositoryResult<u64> {
        self.client.count::<E>(ctx, &Self::query(specs)).await
    }

    async fn find_by_id(&self, ctx: &Context, id: impl Into<Scalar> + Send) -> RepositoryResult<V> {
        let id = id.into();
        let record = self.client.first::<E>(ctx, &id).await?;
        Ok(record.to_value())
    }

    async fn insert(&self, ctx: &Context, value: &mut V) -> RepositoryResult<()> {
        let stored = self.client.create(ctx, E::from_value(value)).await?;
        *value = stored.to_value();
        Ok(())
    }

    async fn update(&self, ctx: &Context, value: &mut V) -> RepositoryResult<()> {
        let stored = self.client.save(ctx, E::from_value(value)).await?;
        *value = stored.to_value();
        Ok(())
    }

    async fn delete(&self, ctx: &Context, value: &V) -> RepositoryResult<()> {
        let id = E::from_value(value).primary_key();
        self.remove(ctx, id).await
    }

    async fn delete_by_id(&self, ctx: &Context, id: impl Into<Scalar> + Send) -> RepositoryResult<()> {
        self.remove(ctx, id.into()).await
    }
}
