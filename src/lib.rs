//! # ormtools: Behavioral extensions for SQL-backed models
//!
//! A collection of small, composable behaviors that attach to plain model
//! structs: soft archiving, UUID primary-key handling (text and binary),
//! transparent attribute encryption, default query ordering, free-text
//! LIKE search across columns and relations, ISO-8601 date coercion, and
//! a polymorphic key/value metadata store.
//!
//! Models opt into behaviors by implementing narrow capability traits
//! (`HasArchiveTimestamp`, `HasUuidColumn`, `MetaOwner`, ...); the behaviors
//! themselves are free functions and scope types that operate over those
//! traits and a fluent [`QueryBuilder`].

pub mod archive;
pub mod dates;
pub mod default_order;
pub mod encryptable;
pub mod encryption;
pub mod error;
pub mod meta;
pub mod model;
pub mod query;
pub mod schema;
pub mod search;
pub mod uuid_codec;
pub mod uuid_key;

#[cfg(test)]
mod tests;

// Re-export core traits and types
pub use archive::ArchiveScope;
pub use encryption::{default_encrypter, set_default_encrypter, AesGcmEncrypter, Encrypter};
pub use error::*;
pub use meta::{HasMetaInfo, Meta};
pub use model::*;
pub use query::*;
pub use schema::{Grammar, SchemaBuilder, TableBuilder};
