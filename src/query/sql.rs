//! Query Builder SQL generation

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    /// Convert the query to a SQL string with values rendered inline
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        sql.push_str("SELECT ");
        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        if let Some(table) = &self.from_table {
            sql.push_str(" FROM ");
            sql.push_str(table);
        }

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_clauses_inline(&self.where_clauses));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(&order_clauses.join(", "));
        }

        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Generate SQL with `$n` placeholders and return the parameters
    pub fn to_sql_with_params(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();

        sql.push_str("SELECT ");
        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        if let Some(table) = &self.from_table {
            sql.push_str(" FROM ");
            sql.push_str(table);
        }

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_clauses_params(&self.where_clauses, &mut params));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(&order_clauses.join(", "));
        }

        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        (sql, params)
    }
}

fn render_clauses_inline(clauses: &[WhereClause]) -> String {
    let mut sql = String::new();
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            sql.push_str(&format!(" {} ", clause.conjunction));
        }
        match &clause.predicate {
            Predicate::Condition(condition) => sql.push_str(&render_condition_inline(condition)),
            Predicate::Group(inner) => {
                sql.push('(');
                sql.push_str(&render_clauses_inline(inner));
                sql.push(')');
            }
            Predicate::Exists(subquery) => sql.push_str(&format!("EXISTS ({})", subquery)),
            Predicate::Raw(raw) => sql.push_str(raw),
        }
    }
    sql
}

fn render_condition_inline(condition: &WhereCondition) -> String {
    match condition.operator {
        QueryOperator::IsNull | QueryOperator::IsNotNull => {
            format!("{} {}", condition.column, condition.operator)
        }
        QueryOperator::In | QueryOperator::NotIn => {
            let values: Vec<String> = condition.values.iter().map(format_value).collect();
            format!(
                "{} {} ({})",
                condition.column,
                condition.operator,
                values.join(", ")
            )
        }
        _ => match &condition.value {
            Some(value) => format!(
                "{} {} {}",
                condition.column,
                condition.operator,
                format_value(value)
            ),
            None => format!("{} {} NULL", condition.column, condition.operator),
        },
    }
}

fn render_clauses_params(clauses: &[WhereClause], params: &mut Vec<Value>) -> String {
    let mut sql = String::new();
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            sql.push_str(&format!(" {} ", clause.conjunction));
        }
        match &clause.predicate {
            Predicate::Condition(condition) => {
                sql.push_str(&render_condition_params(condition, params));
            }
            Predicate::Group(inner) => {
                sql.push('(');
                sql.push_str(&render_clauses_params(inner, params));
                sql.push(')');
            }
            // Sub-queries are rendered when the EXISTS clause is added
            Predicate::Exists(subquery) => sql.push_str(&format!("EXISTS ({})", subquery)),
            Predicate::Raw(raw) => sql.push_str(raw),
        }
    }
    sql
}

fn render_condition_params(condition: &WhereCondition, params: &mut Vec<Value>) -> String {
    match condition.operator {
        QueryOperator::IsNull | QueryOperator::IsNotNull => {
            format!("{} {}", condition.column, condition.operator)
        }
        QueryOperator::In | QueryOperator::NotIn => {
            let placeholders: Vec<String> = condition
                .values
                .iter()
                .map(|value| {
                    params.push(value.clone());
                    format!("${}", params.len())
                })
                .collect();
            format!(
                "{} {} ({})",
                condition.column,
                condition.operator,
                placeholders.join(", ")
            )
        }
        _ => match &condition.value {
            Some(value) => {
                params.push(value.clone());
                format!("{} {} ${}", condition.column, condition.operator, params.len())
            }
            None => format!("{} {} NULL", condition.column, condition.operator),
        },
    }
}

/// Format a value for inline SQL
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        _ => "NULL".to_string(), // Arrays and objects not supported inline
    }
}
