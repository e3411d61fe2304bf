//! Schema context data model
//!
//! A `SchemaContext` is a read-only projection of the full schema produced
//! per request by a `SchemaResolver` collaborator. It is never mutated.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(name: &str, columns: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(n, t)| ColumnInfo {
                    name: n.to_string(),
                    data_type: t.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaContext {
    pub relevant_tables: Vec<TableInfo>,
}

impl SchemaContext {
    pub fn new(relevant_tables: Vec<TableInfo>) -> Self {
        Self { relevant_tables }
    }

    pub fn is_empty(&self) -> bool {
        self.relevant_tables.is_empty()
    }

    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.relevant_tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.relevant_tables.iter().map(|t| t.name.clone()).collect()
    }

    /// All column names across the relevant tables, lowercased.
    pub fn known_columns_lower(&self) -> Vec<String> {
        self.relevant_tables
            .iter()
            .flat_map(|t| t.columns.iter().map(|c| c.name.to_lowercase()))
            .collect()
    }

    /// Render tables and columns for inclusion in an LLM prompt.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "(no relevant tables found)".to_string();
        }
        self.relevant_tables
            .iter()
            .map(|t| {
                let cols: Vec<String> = t
                    .columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.data_type))
                    .collect();
                format!("- {} ({})", t.name, cols.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
