//! SQLite persistence client
//!
//! [`SqliteClient`] renders a [`Query`] into SQLite SQL, binds the
//! [`Scalar`] parameters positionally and runs the statement on a shared
//! [`SqlitePool`], racing it against the caller's [`Context`].

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Arguments, SqlitePool};

use super::{PersistenceClient, Query, Record};
use crate::config::DatabaseConfig;
use crate::context::Context;
use crate::error::Result;
use crate::repository::{
    Fragment, RepositoryError, RepositoryOperation, RepositoryResult, Scalar,
};

/// Persistence client over a SQLite connection pool
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Wrap an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `config`
    ///
    /// A failed attempt is retried up to `max_retries` times, waiting
    /// `retry_delay_secs` first and doubling the wait after every failure.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let target = redact_url(&config.url);
        let mut backoff = Duration::from_secs(config.retry_delay_secs);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let error = match open_pool(config).await {
                Ok(pool) => {
                    tracing::info!(
                        url = %target,
                        attempt,
                        max_connections = config.max_connections,
                        "SQLite pool ready"
                    );
                    return Ok(Self::new(pool));
                }
                Err(error) => error,
            };

            if attempt > config.max_retries {
                tracing::error!(
                    url = %target,
                    attempts = attempt,
                    kind = %error.kind,
                    "SQLite pool unavailable: {}",
                    error.message
                );
                return Err(error.into());
            }

            tracing::warn!(
                url = %target,
                attempt,
                kind = %error.kind,
                retry_in = ?backoff,
                "SQLite pool attempt failed: {}",
                error.message
            );
            tokio::time::sleep(backoff).await;
            backoff = backoff.saturating_mul(2);
        }
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> Result<Self> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            max_retries: 0,
            ..DatabaseConfig::default()
        };
        Self::connect(&config).await
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PersistenceClient for SqliteClient {
    async fn find<E: Record>(&self, ctx: &Context, query: &Query) -> RepositoryResult<Vec<E>> {
        let (sql, params) = select_sql::<E>(query);
        tracing::debug!(table = E::TABLE, sql = %sql, params = params.len(), "Executing find");

        let op = RepositoryOperation::Find;
        let args = arguments(op, &params)?;
        run(ctx, op, E::TABLE, sqlx::query_as_with::<_, E, _>(&sql, args).fetch_all(&self.pool)).await
    }

    async fn count<E: Record>(&self, ctx: &Context, query: &Query) -> RepositoryResult<u64> {
        let (sql, params) = count_sql::<E>(query);
        tracing::debug!(table = E::TABLE, sql = %sql, "Executing count");

        let op = RepositoryOperation::Count;
        let args = arguments(op, &params)?;
        let total: i64 = run(
            ctx,
            op,
            E::TABLE,
            sqlx::query_scalar_with::<_, i64, _>(&sql, args).fetch_one(&self.pool),
        )
        .await?;
        Ok(total.unsigned_abs())
    }

    async fn first<E: Record>(&self, ctx: &Context, id: &Scalar) -> RepositoryResult<E> {
        let sql = first_sql::<E>();
        tracing::debug!(table = E::TABLE, id = %id, "Executing first");

        let op = RepositoryOperation::First;
        let args = arguments(op, std::slice::from_ref(id))?;
        run(
            ctx,
            op,
            E::TABLE,
            sqlx::query_as_with::<_, E, _>(&sql, args).fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| RepositoryError::not_found(E::TABLE, id.to_string()))
    }

    async fn create<E: Record>(&self, ctx: &Context, mut record: E) -> RepositoryResult<E> {
        record.touch(Utc::now());
        let columns = record.columns();
        let sql = insert_sql::<E>(&columns);
        tracing::debug!(table = E::TABLE, sql = %sql, "Executing create");

        let op = RepositoryOperation::Create;
        let params: Vec<Scalar> = columns.into_iter().map(|(_, value)| value).collect();
        let args = arguments(op, &params)?;
        run(ctx, op, E::TABLE, sqlx::query_as_with::<_, E, _>(&sql, args).fetch_one(&self.pool)).await
    }

    async fn save<E: Record>(&self, ctx: &Context, mut record: E) -> RepositoryResult<E> {
        record.touch(Utc::now());
        let columns = record.columns();
        let sql = upsert_sql::<E>(&columns);
        tracing::debug!(table = E::TABLE, sql = %sql, "Executing save");

        let op = RepositoryOperation::Save;
        let params: Vec<Scalar> = columns.into_iter().map(|(_, value)| value).collect();
        let args = arguments(op, &params)?;
        run(ctx, op, E::TABLE, sqlx::query_as_with::<_, E, _>(&sql, args).fetch_one(&self.pool)).await
    }

    async fn delete<E: Record>(&self, ctx: &Context, id: &Scalar) -> RepositoryResult<u64> {
        let (sql, params) = delete_sql::<E>(id);
        tracing::debug!(table = E::TABLE, id = %id, soft = E::SOFT_DELETE.is_some(), "Executing delete");

        let op = RepositoryOperation::Delete;
        let args = arguments(op, &params)?;
        let result = run(ctx, op, E::TABLE, sqlx::query_with(&sql, args).execute(&self.pool)).await?;
        Ok(result.rows_affected())
    }
}

async fn run<T, F>(
    ctx: &Context,
    operation: RepositoryOperation,
    table: &'static str,
    statement: F,
) -> RepositoryResult<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match ctx.run(statement).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            let error = RepositoryError::from_sqlx(operation, e);
            tracing::warn!(
                table,
                operation = %operation,
                kind = %error.kind,
                retriable = error.is_retriable(),
                "Statement failed: {}",
                error.message
            );
            Err(error)
        }
        Err(e) => {
            tracing::debug!(table, operation = %operation, "Statement abandoned: {}", e);
            Err(RepositoryError::from_context(operation, e))
        }
    }
}

fn arguments(
    operation: RepositoryOperation,
    params: &[Scalar],
) -> RepositoryResult<SqliteArguments<'static>> {
    let mut args = SqliteArguments::default();
    for param in params {
        let added = match param {
            Scalar::Null => args.add(Option::<i64>::None),
            Scalar::Bool(b) => args.add(*b),
            Scalar::Integer(i) => args.add(*i),
            Scalar::Float(v) => args.add(*v),
            Scalar::Text(s) => args.add(s.clone()),
            Scalar::Timestamp(ts) => args.add(*ts),
        };
        added.map_err(|e| RepositoryError::from_sqlx(operation, sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}

// Fragments are self-contained predicates, so joining them with AND needs no
// extra parentheses.
fn where_clause<E: Record>(filters: &[Fragment], params: &mut Vec<Scalar>) -> String {
    let mut clauses: Vec<String> = Vec::with_capacity(filters.len() + 1);
    for fragment in filters {
        clauses.push(fragment.sql.clone());
        params.extend(fragment.params.iter().cloned());
    }
    if let Some(column) = E::SOFT_DELETE {
        clauses.push(format!("{} IS NULL", column));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn select_sql<E: Record>(query: &Query) -> (String, Vec<Scalar>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT * FROM {}", E::TABLE);
    sql.push_str(&where_clause::<E>(query.filters(), &mut params));

    if !query.ordering().is_empty() {
        let ordering: Vec<String> = query
            .ordering()
            .iter()
            .map(|column| format!("{} ASC", column))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&ordering.join(", "));
    }

    let window = query.window();
    match window.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ?");
            params.push(Scalar::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        // SQLite only accepts OFFSET after a LIMIT.
        None if window.offset > 0 => sql.push_str(" LIMIT -1"),
        None => {}
    }
    if window.offset > 0 {
        sql.push_str(" OFFSET ?");
        params.push(Scalar::Integer(i64::try_from(window.offset).unwrap_or(i64::MAX)));
    }

    (sql, params)
}

fn count_sql<E: Record>(query: &Query) -> (String, Vec<Scalar>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
    sql.push_str(&where_clause::<E>(query.filters(), &mut params));
    (sql, params)
}

fn first_sql<E: Record>() -> String {
    let mut sql = format!("SELECT * FROM {} WHERE {} = ?", E::TABLE, E::PRIMARY_KEY);
    if let Some(column) = E::SOFT_DELETE {
        sql.push_str(&format!(" AND {} IS NULL", column));
    }
    sql.push_str(" LIMIT 1");
    sql
}

fn insert_sql<E: Record>(columns: &[(&'static str, Scalar)]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES RETURNING *", E::TABLE);
    }
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        E::TABLE,
        names.join(", "),
        placeholders
    )
}

fn upsert_sql<E: Record>(columns: &[(&'static str, Scalar)]) -> String {
    if !columns.iter().any(|(name, _)| *name == E::PRIMARY_KEY) {
        return insert_sql::<E>(columns);
    }

    let mut assignments: Vec<String> = columns
        .iter()
        .filter(|(name, _)| *name != E::PRIMARY_KEY)
        .map(|(name, _)| format!("{0} = excluded.{0}", name))
        .collect();
    if assignments.is_empty() {
        assignments.push(format!("{0} = excluded.{0}", E::PRIMARY_KEY));
    }

    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {} RETURNING *",
        E::TABLE,
        names.join(", "),
        placeholders,
        E::PRIMARY_KEY,
        assignments.join(", ")
    )
}

fn delete_sql<E: Record>(id: &Scalar) -> (String, Vec<Scalar>) {
    match E::SOFT_DELETE {
        Some(column) => (
            format!(
                "UPDATE {0} SET {1} = ? WHERE {2} = ? AND {1} IS NULL",
                E::TABLE,
                column,
                E::PRIMARY_KEY
            ),
            vec![Scalar::Timestamp(Utc::now()), id.clone()],
        ),
        None => (
            format!("DELETE FROM {} WHERE {} = ?", E::TABLE, E::PRIMARY_KEY),
            vec![id.clone()],
        ),
    }
}

// Everything after `?` may carry credentials or key material.
fn redact_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

async fn open_pool(config: &DatabaseConfig) -> RepositoryResult<SqlitePool> {
    let op = RepositoryOperation::Connect;
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| RepositoryError::from_sqlx(op, e))?
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs));

    // A private in-memory database lives and dies with its one connection.
    if config.is_in_memory() {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    pool_options
        .connect_with(options)
        .await
        .map_err(|e| RepositoryError::from_sqlx(op, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RepositoryErrorKind, Specification};
    use crate::testing::{memory_client, Product, Tombstone};

    #[test]
    fn test_select_sql_with_filters_order_and_window() {
        let query = Query::new()
            .filter(Specification::greater_or_equal("weight", 90).compile())
            .filter(Specification::equal("is_available", true).compile())
            .order_by("id")
            .limit(5)
            .offset(10);

        let (sql, params) = select_sql::<Product>(&query);
        assert_eq!(
            sql,
            "SELECT * FROM products WHERE weight >= ? AND is_available = ? ORDER BY id ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            params,
            vec![
                Scalar::Integer(90),
                Scalar::Bool(true),
                Scalar::Integer(5),
                Scalar::Integer(10),
            ]
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let (sql, params) = select_sql::<Product>(&Query::new().offset(3));
        assert_eq!(sql, "SELECT * FROM products LIMIT -1 OFFSET ?");
        assert_eq!(params, vec![Scalar::Integer(3)]);
    }

    #[test]
    fn test_soft_delete_filter_is_appended() {
        let (sql, _) = count_sql::<Tombstone>(&Query::new());
        assert_eq!(sql, "SELECT COUNT(*) FROM tombstones WHERE deleted_at IS NULL");
        assert_eq!(
            first_sql::<Tombstone>(),
            "SELECT * FROM tombstones WHERE id = ? AND deleted_at IS NULL LIMIT 1"
        );
    }

    #[test]
    fn test_write_statements() {
        let columns = vec![("id", Scalar::Integer(1)), ("name", Scalar::from("a"))];
        assert_eq!(
            upsert_sql::<Product>(&columns),
            "INSERT INTO products (id, name) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET name = excluded.name RETURNING *"
        );

        let unassigned = vec![("name", Scalar::from("a"))];
        assert_eq!(
            upsert_sql::<Product>(&unassigned),
            "INSERT INTO products (name) VALUES (?) RETURNING *"
        );
        assert_eq!(
            insert_sql::<Product>(&[]),
            "INSERT INTO products DEFAULT VALUES RETURNING *"
        );
    }

    #[test]
    fn test_delete_statements() {
        let (sql, params) = delete_sql::<Product>(&Scalar::Integer(2));
        assert_eq!(sql, "DELETE FROM products WHERE id = ?");
        assert_eq!(params, vec![Scalar::Integer(2)]);

        let (sql, params) = delete_sql::<Tombstone>(&Scalar::Integer(2));
        assert_eq!(
            sql,
            "UPDATE tombstones SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_redact_url_drops_query() {
        assert_eq!(redact_url("sqlite://data.db?mode=rwc&key=secret"), "sqlite://data.db");
        assert_eq!(redact_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}/missing/dir/app.db", dir.path().display()),
            max_connections: 1,
            min_connections: 1,
            connection_timeout_secs: 1,
            max_retries: 2,
            retry_delay_secs: 0,
        };

        let err = SqliteClient::connect(&config).await.unwrap_err();
        match err {
            crate::error::Error::Repository(e) => {
                assert_eq!(e.operation, RepositoryOperation::Connect);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}/app.db", dir.path().display()),
            max_retries: 0,
            ..DatabaseConfig::default()
        };

        let client = SqliteClient::connect(&config).await.unwrap();
        sqlx::query("SELECT 1").execute(client.pool()).await.unwrap();
        assert!(dir.path().join("app.db").exists());
    }

    #[tokio::test]
    async fn test_create_find_and_count() {
        let client = memory_client().await;
        let ctx = Context::background();

        for (id, weight) in [(2, 50), (1, 100)] {
            client
                .create(&ctx, Product::new(id, "p", weight, true))
                .await
                .unwrap();
        }

        let rows: Vec<Product> = client
            .find(&ctx, &Query::new().order_by("id"))
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);

        let heavy = Query::new().filter(Specification::greater_than("weight", 60).compile());
        assert_eq!(client.count::<Product>(&ctx, &heavy).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_missing_row_is_not_found() {
        let client = memory_client().await;
        let err = client
            .first::<Product>(&Context::background(), &Scalar::Integer(99))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.entity_type.as_deref(), Some("products"));
        assert_eq!(err.entity_id.as_deref(), Some("99"));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_constraint_violation() {
        let client = memory_client().await;
        let ctx = Context::background();
        client.create(&ctx, Product::new(1, "a", 1, true)).await.unwrap();

        let err = client
            .create(&ctx, Product::new(1, "b", 2, true))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(err.operation, RepositoryOperation::Create);
    }

    #[tokio::test]
    async fn test_unknown_column_surfaces_at_execution() {
        let client = memory_client().await;
        let query = Query::new().filter(Specification::equal("colour", "red").compile());
        let err = client
            .find::<Product>(&Context::background(), &query)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::DatabaseError);
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_statement() {
        let client = memory_client().await;
        let ctx = Context::background();
        ctx.cancel();

        let err = client
            .find::<Product>(&ctx, &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Cancelled);
        assert_eq!(err.operation, RepositoryOperation::Find);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_row() {
        let client = memory_client().await;
        let ctx = Context::background();
        let stored = client.create(&ctx, Tombstone::default()).await.unwrap();
        let id = Scalar::Integer(stored.id);

        assert_eq!(client.delete::<Tombstone>(&ctx, &id).await.unwrap(), 1);
        assert_eq!(client.delete::<Tombstone>(&ctx, &id).await.unwrap(), 0);
        assert!(client.first::<Tombstone>(&ctx, &id).await.unwrap_err().is_not_found());
        assert_eq!(client.count::<Tombstone>(&ctx, &Query::new()).await.unwrap(), 0);
    }
}
