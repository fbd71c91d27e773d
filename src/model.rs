//! Model trait and capability traits for behavior composition
//!
//! Defines the core [`Model`] trait (table metadata, primary key handling,
//! field mapping) and the narrow capability traits a model implements to
//! opt into individual behaviors. Behaviors never require a shared base
//! class; each one operates over exactly the capability it needs.

use std::collections::HashMap;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolsResult;
use crate::query::OrderDirection;

/// Core trait for database models
pub trait Model: Send + Sync + Debug + Serialize + for<'de> Deserialize<'de> {
    /// The type used for this model's primary key
    type PrimaryKey: Clone + Send + Sync + Debug + std::fmt::Display + Default;

    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key field name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Get the primary key value for this model instance
    fn primary_key(&self) -> Option<Self::PrimaryKey>;

    /// Set the primary key value for this model instance
    fn set_primary_key(&mut self, key: Self::PrimaryKey);

    /// Check if this model uses timestamps (created_at, updated_at)
    fn uses_timestamps() -> bool {
        false
    }

    /// Get created_at timestamp if available
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Set created_at timestamp
    fn set_created_at(&mut self, _timestamp: DateTime<Utc>) {}

    /// Get updated_at timestamp if available
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Set updated_at timestamp
    fn set_updated_at(&mut self, _timestamp: DateTime<Utc>) {}

    /// Create a model instance from a database row
    fn from_row(row: &sqlx::postgres::PgRow) -> ToolsResult<Self>
    where
        Self: Sized;

    /// Convert model to field-value pairs for database operations
    fn to_fields(&self) -> HashMap<String, Value>;

    /// Column name qualified by this model's table
    fn qualified_column(column: &str) -> String {
        format!("{}.{}", Self::table_name(), column)
    }
}

/// Capability: the model carries a nullable archive timestamp column.
///
/// Active records have a null archive timestamp; archived records carry the
/// time they were sent to the archive.
pub trait HasArchiveTimestamp: Model {
    /// Archive timestamp column name
    fn archived_at_column() -> &'static str {
        "archived_at"
    }

    /// Archive column qualified by table name
    fn qualified_archived_at_column() -> String {
        Self::qualified_column(Self::archived_at_column())
    }

    fn archived_at(&self) -> Option<DateTime<Utc>>;

    fn set_archived_at(&mut self, timestamp: Option<DateTime<Utc>>);
}

/// Capability: the model carries a textual UUID column.
pub trait HasUuidColumn: Model {
    /// UUID column name
    fn uuid_column() -> &'static str {
        "uuid"
    }

    /// UUID column qualified by table name
    fn qualified_uuid_column() -> String {
        Self::qualified_column(Self::uuid_column())
    }

    fn uuid_value(&self) -> Option<String>;

    fn set_uuid_value(&mut self, value: String);
}

/// Capability: the model carries a packed 16-byte binary UUID column.
pub trait HasBinaryUuidColumn: Model {
    /// UUID column name
    fn uuid_column() -> &'static str {
        "uuid"
    }

    /// UUID column qualified by table name
    fn qualified_uuid_column() -> String {
        Self::qualified_column(Self::uuid_column())
    }

    fn uuid_bytes(&self) -> Option<Vec<u8>>;

    fn set_uuid_bytes(&mut self, bytes: Vec<u8>);
}

/// Capability: a subset of the model's attributes is confidential and must
/// be ciphertext at rest.
pub trait HasEncryptableAttributes: Model {
    /// Attribute names that are encrypted before persistence and decrypted
    /// after reads
    fn encryptable_attributes() -> &'static [&'static str];

    /// Whether decryption failures degrade to the raw stored value instead
    /// of propagating
    fn safe_decrypt() -> bool {
        true
    }
}

/// Capability: the model can own records in the polymorphic metadata store.
pub trait MetaOwner: Model {
    /// Type tag stored in the `owner_type` column
    fn meta_owner_type() -> &'static str {
        Self::table_name()
    }

    /// Meta keys whose values must be stored encrypted
    fn encrypted_meta_keys() -> &'static [&'static str] {
        &[]
    }

    /// Primary key mapped to the numeric `owner_id` column
    fn meta_owner_id(&self) -> Option<i64>;
}

/// Capability: every query against the model gets a deterministic default
/// sort order.
pub trait HasDefaultOrder: Model {
    /// Ordered column/direction pairs appended to every query
    fn default_order() -> &'static [(&'static str, OrderDirection)];
}

/// Target of a searchable relation: the related table and the foreign key
/// column on it that points back at the owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationTarget {
    pub table: &'static str,
    pub foreign_key: &'static str,
}

/// Capability: the model supports free-text search over declared fields.
pub trait Searchable: Model {
    /// Searchable fields: bare column names, or `relation.column` paths
    /// searched through an existential sub-query against the relation
    fn searchable_fields() -> &'static [&'static str];

    /// Resolve a relation name from a dotted field path to its target
    fn search_relation(_name: &str) -> Option<RelationTarget> {
        None
    }
}

/// Capability: the model's date-valued attributes accept the widened set of
/// ISO-8601 string formats.
pub trait SupportsIso8601Dates: Model {
    /// Attribute names holding date values
    fn date_attributes() -> &'static [&'static str];
}
