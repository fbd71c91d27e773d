//! Query Builder UPSERT operations (INSERT ... ON CONFLICT DO UPDATE)

use serde_json::Value;

/// A column assignment: a bindable value or a raw SQL expression
#[derive(Debug, Clone)]
enum Assignment {
    Value(Value),
    Raw(String),
}

/// Builder for UPSERT statements
#[derive(Debug, Clone)]
pub struct UpsertBuilder {
    table: String,
    columns: Vec<(String, Assignment)>,
    conflict_columns: Vec<String>,
    update_columns: Vec<String>,
    update_raw: Vec<(String, String)>,
}

impl UpsertBuilder {
    /// Start an upsert into the given table
    pub fn into_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            conflict_columns: Vec::new(),
            update_columns: Vec::new(),
            update_raw: Vec::new(),
        }
    }

    /// Set a column to a bindable value
    pub fn set<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.columns
            .push((column.to_string(), Assignment::Value(value.into())));
        self
    }

    /// Set a column to a raw SQL expression
    pub fn set_raw(mut self, column: &str, expression: &str) -> Self {
        self.columns
            .push((column.to_string(), Assignment::Raw(expression.to_string())));
        self
    }

    /// Declare the conflict target columns
    pub fn on_conflict(mut self, columns: &[&str]) -> Self {
        self.conflict_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// On conflict, overwrite the column with the incoming row's value
    pub fn update_from_inserted(mut self, column: &str) -> Self {
        self.update_columns.push(column.to_string());
        self
    }

    /// On conflict, set the column to a raw SQL expression
    pub fn update_raw(mut self, column: &str, expression: &str) -> Self {
        self.update_raw
            .push((column.to_string(), expression.to_string()));
        self
    }

    /// Generate SQL with `$n` placeholders and return the parameters
    pub fn to_sql_with_params(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();

        let column_names: Vec<&str> = self.columns.iter().map(|(c, _)| c.as_str()).collect();
        let placeholders: Vec<String> = self
            .columns
            .iter()
            .map(|(_, assignment)| match assignment {
                Assignment::Value(value) => {
                    params.push(value.clone());
                    format!("${}", params.len())
                }
                Assignment::Raw(expression) => expression.clone(),
            })
            .collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            column_names.join(", "),
            placeholders.join(", ")
        );

        if !self.conflict_columns.is_empty() {
            sql.push_str(&format!(
                " ON CONFLICT ({})",
                self.conflict_columns.join(", ")
            ));

            let mut updates: Vec<String> = self
                .update_columns
                .iter()
                .map(|column| format!("{} = EXCLUDED.{}", column, column))
                .collect();
            updates.extend(
                self.update_raw
                    .iter()
                    .map(|(column, expression)| format!("{} = {}", column, expression)),
            );

            if updates.is_empty() {
                sql.push_str(" DO NOTHING");
            } else {
                sql.push_str(&format!(" DO UPDATE SET {}", updates.join(", ")));
            }
        }

        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_generation() {
        let (sql, params) = UpsertBuilder::into_table("counters")
            .set("name", "visits")
            .set("count", 1)
            .set_raw("updated_at", "NOW()")
            .on_conflict(&["name"])
            .update_from_inserted("count")
            .update_raw("updated_at", "NOW()")
            .to_sql_with_params();

        assert_eq!(
            sql,
            "INSERT INTO counters (name, count, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (name) DO UPDATE SET count = EXCLUDED.count, updated_at = NOW()"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_upsert_without_updates_does_nothing() {
        let (sql, _) = UpsertBuilder::into_table("tags")
            .set("name", "rust")
            .on_conflict(&["name"])
            .to_sql_with_params();

        assert!(sql.ends_with("ON CONFLICT (name) DO NOTHING"));
    }
}
