//! Archivable behavior - soft-hiding records behind a nullable timestamp
//!
//! A null archive timestamp means active. The default scope filters
//! archived rows out of every query; `with_archived` removes that filter
//! and `only_archived` inverts it.

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::error::{ToolsError, ToolsResult};
use crate::model::HasArchiveTimestamp;
use crate::query::QueryBuilder;

/// The global scope hiding archived rows from default queries
pub struct ArchiveScope;

impl ArchiveScope {
    pub const NAME: &'static str = "archive";

    /// Apply the scope: add `archived_at IS NULL` on the qualified column
    pub fn apply<M: HasArchiveTimestamp>(query: QueryBuilder<M>) -> QueryBuilder<M> {
        query
            .where_null(&M::qualified_archived_at_column())
            .tagged(Self::NAME)
    }

    /// Remove the scope from a query it was applied to
    pub fn remove<M: HasArchiveTimestamp>(query: QueryBuilder<M>) -> QueryBuilder<M> {
        query.without_scope(Self::NAME)
    }
}

/// Default query for an archivable model: active rows only
pub fn query<M: HasArchiveTimestamp>() -> QueryBuilder<M> {
    ArchiveScope::apply(QueryBuilder::for_model())
}

/// Query over active and archived rows alike
pub fn with_archived<M: HasArchiveTimestamp>() -> QueryBuilder<M> {
    QueryBuilder::for_model()
}

/// Query over archived rows only
pub fn only_archived<M: HasArchiveTimestamp>() -> QueryBuilder<M> {
    QueryBuilder::for_model().where_not_null(&M::qualified_archived_at_column())
}

/// True iff the record carries an archive timestamp
pub fn is_archived<M: HasArchiveTimestamp>(model: &M) -> bool {
    model.archived_at().is_some()
}

/// Send a record to the archive: stamp it with the current time and persist,
/// bypassing the default scope. Re-archiving simply resets the timestamp.
pub async fn archive<M: HasArchiveTimestamp>(
    pool: &Pool<Postgres>,
    model: &mut M,
) -> ToolsResult<()> {
    let pk = model.primary_key().ok_or(ToolsError::MissingPrimaryKey)?;
    let now = Utc::now();

    let sql = format!(
        "UPDATE {} SET {} = $1 WHERE {} = $2",
        M::table_name(),
        M::archived_at_column(),
        M::primary_key_name()
    );

    sqlx::query(&sql)
        .bind(now)
        .bind(pk.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            ToolsError::Database(format!("Failed to archive {}: {}", M::table_name(), e))
        })?;

    // The instance only reflects the archive once the row does
    model.set_archived_at(Some(now));
    tracing::debug!("archived {} record {}", M::table_name(), pk);
    Ok(())
}

/// Restore a record from the archive: clear the timestamp and persist.
/// Restoring an active record is a harmless null-to-null write.
pub async fn restore<M: HasArchiveTimestamp>(
    pool: &Pool<Postgres>,
    model: &mut M,
) -> ToolsResult<()> {
    let pk = model.primary_key().ok_or(ToolsError::MissingPrimaryKey)?;

    let sql = format!(
        "UPDATE {} SET {} = NULL WHERE {} = $1",
        M::table_name(),
        M::archived_at_column(),
        M::primary_key_name()
    );

    sqlx::query(&sql)
        .bind(pk.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            ToolsError::Database(format!("Failed to restore {}: {}", M::table_name(), e))
        })?;

    model.set_archived_at(None);
    tracing::debug!("restored {} record {}", M::table_name(), pk);
    Ok(())
}
