//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use super::types::*;
use crate::model::Model;

/// Fluent builder for SELECT queries
#[derive(Debug)]
pub struct QueryBuilder<M = ()> {
    pub(crate) select_fields: Vec<String>,
    pub(crate) from_table: Option<String>,
    pub(crate) where_clauses: Vec<WhereClause>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
    _phantom: PhantomData<M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            select_fields: self.select_fields.clone(),
            from_table: self.from_table.clone(),
            where_clauses: self.where_clauses.clone(),
            order_by: self.order_by.clone(),
            limit_count: self.limit_count,
            offset_value: self.offset_value,
            _phantom: PhantomData,
        }
    }
}

impl<M> Default for QueryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> QueryBuilder<M> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            select_fields: Vec::new(),
            from_table: None,
            where_clauses: Vec::new(),
            order_by: Vec::new(),
            limit_count: None,
            offset_value: None,
            _phantom: PhantomData,
        }
    }

    /// Add SELECT fields to the query
    pub fn select(mut self, fields: &str) -> Self {
        if fields == "*" {
            self.select_fields.push("*".to_string());
        } else {
            self.select_fields
                .extend(fields.split(',').map(|f| f.trim().to_string()));
        }
        self
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.from_table = Some(table.to_string());
        self
    }

    /// Set the LIMIT
    pub fn limit(mut self, count: i64) -> Self {
        self.limit_count = Some(count);
        self
    }

    /// Set the OFFSET
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset_value = Some(offset);
        self
    }

    /// Tag the most recently added WHERE clause with a scope name so it can
    /// be removed later with [`without_scope`](Self::without_scope)
    pub fn tagged(mut self, scope: &'static str) -> Self {
        if let Some(last) = self.where_clauses.last_mut() {
            last.scope = Some(scope);
        }
        self
    }

    /// Remove every WHERE clause that was applied under the given scope name
    pub fn without_scope(mut self, scope: &'static str) -> Self {
        self.where_clauses.retain(|clause| clause.scope != Some(scope));
        self
    }
}

impl<M: Model> QueryBuilder<M> {
    /// Create a `SELECT * FROM <model table>` builder
    pub fn for_model() -> Self {
        Self::new().select("*").from(M::table_name())
    }
}
