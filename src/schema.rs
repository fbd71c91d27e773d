//! Schema builder - grammar-aware DDL generation
//!
//! A small fluent DSL for the table shapes the behaviors in this crate
//! expect. Column types render per [`Grammar`]; the packed binary uuid
//! column only exists for the MySQL and SQLite grammars and requesting it
//! elsewhere surfaces [`crate::error::ToolsError::UnsupportedGrammar`]
//! when the statement is rendered.

use std::fmt;

use crate::error::{ToolsError, ToolsResult};

/// SQL grammar the generated DDL targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    MySql,
    Sqlite,
    Postgres,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::MySql => write!(f, "MySqlGrammar"),
            Grammar::Sqlite => write!(f, "SqliteGrammar"),
            Grammar::Postgres => write!(f, "PostgresGrammar"),
        }
    }
}

/// Builder for a CREATE TABLE statement
pub struct TableBuilder {
    name: String,
    grammar: Grammar,
    columns: Vec<String>,
    constraints: Vec<String>,
    error: Option<ToolsError>,
}

impl TableBuilder {
    fn new(name: &str, grammar: Grammar) -> Self {
        Self {
            name: name.to_string(),
            grammar,
            columns: Vec::new(),
            constraints: Vec::new(),
            error: None,
        }
    }

    /// Auto-incrementing big integer primary key named `id`
    pub fn id(mut self) -> Self {
        let definition = match self.grammar {
            Grammar::MySql => "id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY",
            Grammar::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
            Grammar::Postgres => "id BIGSERIAL PRIMARY KEY",
        };
        self.columns.push(definition.to_string());
        self
    }

    /// Variable-length string column
    pub fn string(mut self, name: &str, length: Option<u32>) -> Self {
        let length = length.unwrap_or(255);
        self.columns.push(format!("{} VARCHAR({}) NOT NULL", name, length));
        self
    }

    /// Unbounded text column
    pub fn text(mut self, name: &str) -> Self {
        self.columns.push(format!("{} TEXT NOT NULL", name));
        self
    }

    /// Signed 64-bit integer column
    pub fn big_integer(mut self, name: &str) -> Self {
        self.columns.push(format!("{} BIGINT NOT NULL", name));
        self
    }

    /// Boolean column with a default
    pub fn boolean_default(mut self, name: &str, default: bool) -> Self {
        self.columns
            .push(format!("{} BOOLEAN NOT NULL DEFAULT {}", name, default));
        self
    }

    /// `created_at` and `updated_at` timestamp columns
    pub fn timestamps(mut self) -> Self {
        self.columns.push("created_at TIMESTAMP NULL".to_string());
        self.columns.push("updated_at TIMESTAMP NULL".to_string());
        self
    }

    /// Nullable timestamp column
    pub fn nullable_timestamp(mut self, name: &str) -> Self {
        self.columns.push(format!("{} TIMESTAMP NULL", name));
        self
    }

    /// Packed 16-byte binary uuid column. Only the MySQL and SQLite
    /// grammars have a suitable column type; any other grammar makes the
    /// statement unrenderable.
    pub fn binary_uuid(mut self, name: &str) -> Self {
        match self.grammar {
            Grammar::MySql | Grammar::Sqlite => {
                self.columns.push(format!("{} BINARY(16) NOT NULL", name));
            }
            grammar => {
                if self.error.is_none() {
                    self.error = Some(ToolsError::UnsupportedGrammar {
                        grammar: grammar.to_string(),
                    });
                }
            }
        }
        self
    }

    /// Composite unique constraint
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.constraints
            .push(format!("UNIQUE ({})", columns.join(", ")));
        self
    }

    /// Render the CREATE TABLE statement
    pub fn to_sql(self) -> ToolsResult<String> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut parts = self.columns;
        parts.extend(self.constraints);
        Ok(format!("CREATE TABLE {} ({})", self.name, parts.join(", ")))
    }
}

/// Builder collecting DDL statements for one migration
pub struct SchemaBuilder {
    grammar: Grammar,
    statements: Vec<ToolsResult<String>>,
}

impl SchemaBuilder {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            statements: Vec::new(),
        }
    }

    /// Add a CREATE TABLE built through the closure
    pub fn create_table<F>(mut self, name: &str, build: F) -> Self
    where
        F: FnOnce(TableBuilder) -> TableBuilder,
    {
        let table = build(TableBuilder::new(name, self.grammar));
        self.statements.push(table.to_sql());
        self
    }

    /// Add a CREATE INDEX statement
    pub fn create_index(mut self, name: &str, table: &str, columns: &[&str]) -> Self {
        self.statements.push(Ok(format!(
            "CREATE INDEX {} ON {} ({})",
            name,
            table,
            columns.join(", ")
        )));
        self
    }

    /// Add a DROP TABLE statement
    pub fn drop_table(mut self, name: &str) -> Self {
        self.statements
            .push(Ok(format!("DROP TABLE IF EXISTS {}", name)));
        self
    }

    /// Render all statements, surfacing the first recorded error
    pub fn build(self) -> ToolsResult<Vec<String>> {
        self.statements.into_iter().collect()
    }
}

/// DDL for the polymorphic metadata table, including the unique index the
/// metadata upsert relies on
pub fn meta_information_schema(grammar: Grammar) -> ToolsResult<Vec<String>> {
    SchemaBuilder::new(grammar)
        .create_table("meta_information", |table| {
            table
                .id()
                .string("owner_type", None)
                .big_integer("owner_id")
                .string("key", None)
                .text("value")
                .boolean_default("is_encrypted", false)
                .timestamps()
                .unique(&["owner_type", "owner_id", "key"])
        })
        .create_index(
            "meta_information_owner_index",
            "meta_information",
            &["owner_type", "owner_id"],
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_uuid_renders_for_mysql_and_sqlite() {
        for grammar in [Grammar::MySql, Grammar::Sqlite] {
            let sql = TableBuilder::new("devices", grammar)
                .id()
                .binary_uuid("uuid")
                .to_sql()
                .unwrap();
            assert!(sql.contains("uuid BINARY(16) NOT NULL"), "grammar: {}", grammar);
        }
    }

    #[test]
    fn test_binary_uuid_rejects_other_grammars_by_name() {
        let result = TableBuilder::new("devices", Grammar::Postgres)
            .id()
            .binary_uuid("uuid")
            .to_sql();

        match result {
            Err(ToolsError::UnsupportedGrammar { grammar }) => {
                assert_eq!(grammar, "PostgresGrammar");
            }
            other => panic!("expected UnsupportedGrammar, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_grammar_message_names_the_grammar() {
        let error = TableBuilder::new("devices", Grammar::Postgres)
            .binary_uuid("uuid")
            .to_sql()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Only the MySQL and SQLite grammars support binary uuid columns. \
             [PostgresGrammar] was used"
        );
    }

    #[test]
    fn test_create_table_sql() {
        let statements = SchemaBuilder::new(Grammar::Postgres)
            .create_table("posts", |table| {
                table.id().string("title", None).nullable_timestamp("archived_at")
            })
            .build()
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE TABLE posts (id BIGSERIAL PRIMARY KEY, \
                 title VARCHAR(255) NOT NULL, archived_at TIMESTAMP NULL)"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_schema_build_surfaces_table_errors() {
        let result = SchemaBuilder::new(Grammar::Postgres)
            .create_table("devices", |table| table.id().binary_uuid("uuid"))
            .build();
        assert!(matches!(result, Err(ToolsError::UnsupportedGrammar { .. })));
    }

    #[test]
    fn test_meta_information_schema() {
        let statements = meta_information_schema(Grammar::Postgres).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("UNIQUE (owner_type, owner_id, key)"));
        assert!(statements[1].starts_with("CREATE INDEX meta_information_owner_index"));
    }
}
