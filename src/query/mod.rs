//! Query Builder Module - fluent SELECT builder used by the behaviors
//!
//! Scopes (archiving, default ordering, search) compose by pushing
//! conditions into the builder; SQL generation renders the clause tree.

pub mod builder;
pub mod ordering;
pub mod sql;
pub mod types;
pub mod upsert;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use types::{Conjunction, OrderDirection, Predicate, QueryOperator, WhereClause, WhereCondition};
pub use upsert::UpsertBuilder;
pub use where_clause::GroupBuilder;
