//! Query Builder WHERE clause operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    fn push_condition(&mut self, conjunction: Conjunction, condition: WhereCondition) {
        self.where_clauses
            .push(WhereClause::new(conjunction, Predicate::Condition(condition)));
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.push_condition(
            Conjunction::And,
            WhereCondition {
                column: column.to_string(),
                operator: QueryOperator::Equal,
                value: Some(value.into()),
                values: Vec::new(),
            },
        );
        self
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.push_condition(
            Conjunction::And,
            WhereCondition {
                column: column.to_string(),
                operator: QueryOperator::NotEqual,
                value: Some(value.into()),
                values: Vec::new(),
            },
        );
        self
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(mut self, column: &str, pattern: &str) -> Self {
        self.push_condition(
            Conjunction::And,
            WhereCondition {
                column: column.to_string(),
                operator: QueryOperator::Like,
                value: Some(Value::String(pattern.to_string())),
                values: Vec::new(),
            },
        );
        self
    }

    /// Add WHERE condition with IN
    pub fn where_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.push_condition(
            Conjunction::And,
            WhereCondition {
                column: column.to_string(),
                operator: QueryOperator::In,
                value: None,
                values: values.into_iter().map(|v| v.into()).collect(),
            },
        );
        self
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(mut self, column: &str) -> Self {
        self.push_condition(
            Conjunction::And,
            WhereCondition {
                column: column.to_string(),
                operator: QueryOperator::IsNull,
                value: None,
                values: Vec::new(),
            },
        );
        self
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.push_condition(
            Conjunction::And,
            WhereCondition {
                column: column.to_string(),
                operator: QueryOperator::IsNotNull,
                value: None,
                values: Vec::new(),
            },
        );
        self
    }

    /// Add raw WHERE condition for complex cases
    pub fn where_raw(mut self, raw_condition: &str) -> Self {
        self.where_clauses.push(WhereClause::new(
            Conjunction::And,
            Predicate::Raw(raw_condition.to_string()),
        ));
        self
    }

    /// Add a parenthesized group of conditions joined to the chain with AND
    pub fn where_group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        let group = build(GroupBuilder::new());
        if !group.clauses.is_empty() {
            self.where_clauses.push(WhereClause::new(
                Conjunction::And,
                Predicate::Group(group.clauses),
            ));
        }
        self
    }

    /// Add an EXISTS sub-query condition joined with AND
    pub fn where_exists<T>(mut self, subquery: QueryBuilder<T>) -> Self {
        self.where_clauses.push(WhereClause::new(
            Conjunction::And,
            Predicate::Exists(subquery.to_sql()),
        ));
        self
    }

    /// Add an EXISTS sub-query condition joined with OR
    pub fn or_where_exists<T>(mut self, subquery: QueryBuilder<T>) -> Self {
        self.where_clauses.push(WhereClause::new(
            Conjunction::Or,
            Predicate::Exists(subquery.to_sql()),
        ));
        self
    }
}

/// Builder for a parenthesized condition group; conditions added here are
/// OR'd together inside the group
#[derive(Debug, Default)]
pub struct GroupBuilder {
    pub(crate) clauses: Vec<WhereClause>,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    fn push(&mut self, condition: WhereCondition) {
        // The leading conjunction of the first group member is not rendered
        self.clauses
            .push(WhereClause::new(Conjunction::Or, Predicate::Condition(condition)));
    }

    /// OR an equality condition into the group
    pub fn or_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            value: Some(value.into()),
            values: Vec::new(),
        });
        self
    }

    /// OR a LIKE condition into the group
    pub fn or_like(mut self, column: &str, pattern: &str) -> Self {
        self.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::Like,
            value: Some(Value::String(pattern.to_string())),
            values: Vec::new(),
        });
        self
    }

    /// OR a raw SQL fragment into the group
    pub fn or_raw(mut self, raw_condition: &str) -> Self {
        self.clauses.push(WhereClause::new(
            Conjunction::Or,
            Predicate::Raw(raw_condition.to_string()),
        ));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_ne_renders_not_equal() {
        let sql = QueryBuilder::<()>::new()
            .select("*")
            .from("posts")
            .where_ne("status", "draft")
            .to_sql();
        assert_eq!(sql, "SELECT * FROM posts WHERE status != 'draft'");
    }

    #[test]
    fn test_group_members_or_together_inside_parentheses() {
        let sql = QueryBuilder::<()>::new()
            .select("*")
            .from("posts")
            .where_group(|group| {
                group
                    .or_eq("status", "draft")
                    .or_like("title", "%intro%")
                    .or_raw("author_id IS NULL")
            })
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM posts WHERE \
             (status = 'draft' OR title LIKE '%intro%' OR author_id IS NULL)"
        );
    }

    #[test]
    fn test_empty_group_adds_no_clause() {
        let sql = QueryBuilder::<()>::new()
            .select("*")
            .from("posts")
            .where_group(|group| group)
            .to_sql();
        assert_eq!(sql, "SELECT * FROM posts");
    }
}
