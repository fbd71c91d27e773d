//! Metadata store - polymorphic key/value records attached to any owner
//!
//! Any model implementing [`MetaOwner`] can read and write metadata through
//! [`HasMetaInfo`]. Values for keys the owner declares sensitive are stored
//! encrypted and flagged; reads decrypt transparently and always degrade to
//! the raw value if decryption fails.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};

use crate::encryption::Encrypter;
use crate::error::{ToolsError, ToolsResult};
use crate::model::{MetaOwner, Model};
use crate::query::UpsertBuilder;

/// A row in the `meta_information` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub id: Option<i64>,
    pub owner_type: String,
    pub owner_id: i64,
    pub key: String,
    value: String,
    pub is_encrypted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Meta {
    /// The stored value, decrypted when flagged. Decryption failure on this
    /// path never raises; the raw value is returned instead.
    pub fn value(&self, encrypter: &dyn Encrypter) -> String {
        if self.is_encrypted {
            match encrypter.decrypt(&self.value) {
                Ok(plaintext) => plaintext,
                Err(err) => {
                    tracing::warn!("meta value for key '{}' failed to decrypt: {}", self.key, err);
                    self.value.clone()
                }
            }
        } else {
            self.value.clone()
        }
    }

    /// The value exactly as stored
    pub fn raw_value(&self) -> &str {
        &self.value
    }

    #[cfg(test)]
    pub(crate) fn for_test(key: &str, value: &str, is_encrypted: bool) -> Self {
        Self {
            id: Some(1),
            owner_type: "tests".to_string(),
            owner_id: 1,
            key: key.to_string(),
            value: value.to_string(),
            is_encrypted,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Model for Meta {
    type PrimaryKey = i64;

    fn table_name() -> &'static str {
        "meta_information"
    }

    fn primary_key(&self) -> Option<i64> {
        self.id
    }

    fn set_primary_key(&mut self, key: i64) {
        self.id = Some(key);
    }

    fn uses_timestamps() -> bool {
        true
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn set_created_at(&mut self, timestamp: DateTime<Utc>) {
        self.created_at = Some(timestamp);
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_updated_at(&mut self, timestamp: DateTime<Utc>) {
        self.updated_at = Some(timestamp);
    }

    fn from_row(row: &sqlx::postgres::PgRow) -> ToolsResult<Self> {
        Ok(Meta {
            id: row.try_get("id").map_err(ToolsError::from)?,
            owner_type: row.try_get("owner_type").map_err(ToolsError::from)?,
            owner_id: row.try_get("owner_id").map_err(ToolsError::from)?,
            key: row.try_get("key").map_err(ToolsError::from)?,
            value: row.try_get("value").map_err(ToolsError::from)?,
            is_encrypted: row.try_get("is_encrypted").map_err(ToolsError::from)?,
            created_at: row.try_get("created_at").map_err(ToolsError::from)?,
            updated_at: row.try_get("updated_at").map_err(ToolsError::from)?,
        })
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        if let Some(id) = self.id {
            fields.insert("id".to_string(), Value::from(id));
        }
        fields.insert("owner_type".to_string(), Value::String(self.owner_type.clone()));
        fields.insert("owner_id".to_string(), Value::from(self.owner_id));
        fields.insert("key".to_string(), Value::String(self.key.clone()));
        fields.insert("value".to_string(), Value::String(self.value.clone()));
        fields.insert("is_encrypted".to_string(), Value::Bool(self.is_encrypted));
        fields
    }
}

/// Decide how a value is stored for a key: `(stored_value, is_encrypted)`.
/// Keys the owner declares sensitive are encrypted and flagged.
pub fn meta_write_for<M: MetaOwner>(
    encrypter: &dyn Encrypter,
    key: &str,
    value: &str,
) -> ToolsResult<(String, bool)> {
    if M::encrypted_meta_keys().contains(&key) {
        Ok((encrypter.encrypt(value)?, true))
    } else {
        Ok((value.to_string(), false))
    }
}

/// Planned write for one meta key
enum MetaWrite {
    /// No value: the record is removed
    Delete,
    /// Upsert keyed on `(owner_type, owner_id, key)`
    Upsert {
        statement: UpsertBuilder,
        is_encrypted: bool,
    },
}

fn plan_meta_write<M: MetaOwner>(
    encrypter: &dyn Encrypter,
    owner_id: i64,
    key: &str,
    value: Option<&str>,
) -> ToolsResult<MetaWrite> {
    let value = match value {
        Some(value) => value,
        None => return Ok(MetaWrite::Delete),
    };

    let (stored, is_encrypted) = meta_write_for::<M>(encrypter, key, value)?;
    let statement = UpsertBuilder::into_table(Meta::table_name())
        .set("owner_type", M::meta_owner_type())
        .set("owner_id", owner_id)
        .set("key", key)
        .set("value", stored)
        .set("is_encrypted", is_encrypted)
        .set_raw("created_at", "NOW()")
        .set_raw("updated_at", "NOW()")
        .on_conflict(&["owner_type", "owner_id", "key"])
        .update_from_inserted("value")
        .update_from_inserted("is_encrypted")
        .update_raw("updated_at", "NOW()");

    Ok(MetaWrite::Upsert {
        statement,
        is_encrypted,
    })
}

/// Metadata operations available on every [`MetaOwner`]
pub trait HasMetaInfo: MetaOwner + Sized {
    /// Fetch the current metadata record for a key, if any
    async fn find_meta(&self, pool: &Pool<Postgres>, key: &str) -> ToolsResult<Option<Meta>> {
        let owner_id = self.meta_owner_id().ok_or(ToolsError::MissingPrimaryKey)?;

        let sql = "SELECT * FROM meta_information \
                   WHERE owner_type = $1 AND owner_id = $2 AND key = $3 LIMIT 1";

        let row = sqlx::query(sql)
            .bind(Self::meta_owner_type())
            .bind(owner_id)
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(|e| ToolsError::Database(format!("Failed to fetch meta '{}': {}", key, e)))?;

        row.map(|row| Meta::from_row(&row)).transpose()
    }

    /// True iff a current record with the key exists for this owner
    async fn has_meta(&self, pool: &Pool<Postgres>, key: &str) -> ToolsResult<bool> {
        Ok(self.find_meta(pool, key).await?.is_some())
    }

    /// The stored value for a key (decrypted if flagged), or the default
    async fn get_meta(
        &self,
        pool: &Pool<Postgres>,
        encrypter: &dyn Encrypter,
        key: &str,
        default: Option<&str>,
    ) -> ToolsResult<Option<String>> {
        match self.find_meta(pool, key).await? {
            Some(meta) => Ok(Some(meta.value(encrypter))),
            None => Ok(default.map(str::to_string)),
        }
    }

    /// Store a value under a key. A `None` value deletes the record. After
    /// this call exactly one current record exists per `(owner, key)`; the
    /// unique index on `(owner_type, owner_id, key)` makes the upsert safe
    /// under concurrent writers.
    async fn set_meta(
        &self,
        pool: &Pool<Postgres>,
        encrypter: &dyn Encrypter,
        key: &str,
        value: Option<&str>,
    ) -> ToolsResult<()> {
        let owner_id = self.meta_owner_id().ok_or(ToolsError::MissingPrimaryKey)?;

        let (statement, is_encrypted) =
            match plan_meta_write::<Self>(encrypter, owner_id, key, value)? {
                MetaWrite::Delete => {
                    self.delete_meta(pool, key).await?;
                    return Ok(());
                }
                MetaWrite::Upsert {
                    statement,
                    is_encrypted,
                } => (statement, is_encrypted),
            };

        let (sql, params) = statement.to_sql_with_params();

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_value(query, param);
        }

        query
            .execute(pool)
            .await
            .map_err(|e| ToolsError::Database(format!("Failed to set meta '{}': {}", key, e)))?;

        tracing::debug!(
            "set meta '{}' for {} {} (encrypted: {})",
            key,
            Self::meta_owner_type(),
            owner_id,
            is_encrypted
        );
        Ok(())
    }

    /// Remove all metadata records for a key; returns how many were deleted
    async fn delete_meta(&self, pool: &Pool<Postgres>, key: &str) -> ToolsResult<u64> {
        let owner_id = self.meta_owner_id().ok_or(ToolsError::MissingPrimaryKey)?;

        let sql = "DELETE FROM meta_information \
                   WHERE owner_type = $1 AND owner_id = $2 AND key = $3";

        let result = sqlx::query(sql)
            .bind(Self::meta_owner_type())
            .bind(owner_id)
            .bind(key)
            .execute(pool)
            .await
            .map_err(|e| ToolsError::Database(format!("Failed to delete meta '{}': {}", key, e)))?;

        tracing::debug!(
            "deleted {} meta record(s) for key '{}' on {} {}",
            result.rows_affected(),
            key,
            Self::meta_owner_type(),
            owner_id
        );
        Ok(result.rows_affected())
    }
}

// Every MetaOwner gets the metadata operations
impl<T: MetaOwner> HasMetaInfo for T {}

/// Bind a JSON value to a query parameter
fn bind_value<'a>(
    query: sqlx::query::Query<'a, Postgres, sqlx::postgres::PgArguments>,
    value: &Value,
) -> sqlx::query::Query<'a, Postgres, sqlx::postgres::PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value.clone())),
    }
}
