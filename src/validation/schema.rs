//! Schema compliance check
//!
//! Extracts table and column identifiers from the SQL text with regexes,
//! checks tables against the naming convention and the known schema, and
//! sanity-checks join structure. Near-miss table names become "did you
//! mean" suggestions via Jaro-Winkler similarity.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::error::Result;
use crate::schema::SchemaContext;

const SUGGESTION_THRESHOLD: f64 = 0.9;

lazy_static! {
    static ref TABLE_RE: Regex =
        Regex::new(r"(?i)\b(?:from|join)\s+\[?([A-Za-z_][A-Za-z0-9_.]*)\]?")
            .expect("table extraction regex");
    static ref IDENT_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier naming regex");
    static ref SELECT_LIST_RE: Regex =
        Regex::new(r"(?is)\bselect\s+(?:top\s+\d+\s+)?(.*?)\s+\bfrom\b")
            .expect("select list regex");
    static ref WORD_RE: Regex =
        Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("word regex");
    static ref ALIAS_RE: Regex =
        Regex::new(r"(?i)\bas\s+[A-Za-z_][A-Za-z0-9_]*").expect("alias regex");
}

const SQL_FUNCTIONS_AND_KEYWORDS: &[&str] = &[
    "count", "sum", "avg", "max", "min", "distinct", "as", "case", "when", "then", "else", "end",
    "cast", "convert", "coalesce", "top", "null", "and", "or", "not",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierCheck {
    pub is_valid: bool,
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinCheck {
    pub is_valid: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCompliance {
    pub table_validation: IdentifierCheck,
    pub column_validation: IdentifierCheck,
    pub join_validation: JoinCheck,
    pub compliance_score: f64,
    pub warnings: Vec<String>,
}

impl SchemaCompliance {
    pub(crate) fn fallback() -> Self {
        Self {
            table_validation: IdentifierCheck {
                is_valid: true,
                ..Default::default()
            },
            column_validation: IdentifierCheck {
                is_valid: true,
                ..Default::default()
            },
            join_validation: JoinCheck {
                is_valid: true,
                reason: "not checked".to_string(),
            },
            compliance_score: super::STAGE_FALLBACK_SCORE,
            warnings: vec!["schema compliance stage unavailable, neutral score applied".to_string()],
        }
    }
}

/// Table identifiers referenced after FROM/JOIN, deduplicated in order of
/// first appearance. Schema prefixes (`dbo.Players`) are stripped.
pub(crate) fn extract_tables(sql: &str) -> Vec<String> {
    TABLE_RE
        .captures_iter(sql)
        .map(|c| {
            let raw = c[1].to_string();
            match raw.rsplit_once('.') {
                Some((_, name)) => name.to_string(),
                None => raw,
            }
        })
        .unique_by(|t| t.to_lowercase())
        .collect()
}

/// Candidate column identifiers from the select list.
fn extract_columns(sql: &str) -> Vec<String> {
    let Some(captures) = SELECT_LIST_RE.captures(sql) else {
        return Vec::new();
    };
    let select_list = ALIAS_RE.replace_all(&captures[1], "").to_string();
    if select_list.trim() == "*" {
        return Vec::new();
    }

    WORD_RE
        .find_iter(&select_list)
        .map(|m| m.as_str().to_string())
        .filter(|w| {
            !SQL_FUNCTIONS_AND_KEYWORDS.contains(&w.to_lowercase().as_str())
        })
        .unique_by(|w| w.to_lowercase())
        .collect()
}

pub fn check_compliance(sql: &str, schema: Option<&SchemaContext>) -> Result<SchemaCompliance> {
    let tables = extract_tables(sql);
    let known_tables: Vec<String> = schema.map(|s| s.table_names()).unwrap_or_default();

    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    let mut suggestions = Vec::new();
    let mut warnings = Vec::new();

    for table in &tables {
        let well_named = IDENT_RE.is_match(table);
        let known = if known_tables.is_empty() {
            // No schema collaborator available: naming rule only.
            true
        } else {
            known_tables.iter().any(|k| k.eq_ignore_ascii_case(table))
        };

        if well_named && known {
            valid.push(table.clone());
        } else {
            invalid.push(table.clone());
            if !known {
                if let Some(suggestion) = closest_table(table, &known_tables) {
                    suggestions.push(format!("unknown table '{table}', did you mean '{suggestion}'?"));
                } else {
                    suggestions.push(format!("table '{table}' is not part of the known schema"));
                }
            } else {
                suggestions.push(format!("table '{table}' violates the naming convention"));
            }
        }
    }

    let compliance_score = if tables.is_empty() {
        warnings.push("no table identifiers found in SQL".to_string());
        0.5
    } else {
        valid.len() as f64 / tables.len() as f64
    };

    let table_validation = IdentifierCheck {
        is_valid: invalid.is_empty(),
        valid,
        invalid,
        suggestions: suggestions.clone(),
    };

    let column_validation = check_columns(sql, schema);
    let join_validation = check_joins(sql, tables.len());

    Ok(SchemaCompliance {
        table_validation,
        column_validation,
        join_validation,
        compliance_score,
        warnings,
    })
}

fn check_columns(sql: &str, schema: Option<&SchemaContext>) -> IdentifierCheck {
    let columns = extract_columns(sql);
    let Some(schema) = schema.filter(|s| !s.is_empty()) else {
        return IdentifierCheck {
            is_valid: true,
            valid: columns,
            ..Default::default()
        };
    };

    let known = schema.known_columns_lower();
    let table_names: Vec<String> = schema
        .table_names()
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    let mut suggestions = Vec::new();

    for column in columns {
        let lowered = column.to_lowercase();
        // Table aliases and table-qualified names show up as bare words too.
        if known.contains(&lowered) || table_names.contains(&lowered) || lowered.len() <= 2 {
            valid.push(column);
        } else {
            suggestions.push(format!("column '{column}' not found in the relevant tables"));
            invalid.push(column);
        }
    }

    IdentifierCheck {
        is_valid: invalid.is_empty(),
        valid,
        invalid,
        suggestions,
    }
}

fn check_joins(sql: &str, table_count: usize) -> JoinCheck {
    if table_count <= 1 {
        return JoinCheck {
            is_valid: true,
            reason: "single-table query".to_string(),
        };
    }
    let lowered = sql.to_lowercase();
    let has_join_condition = lowered.contains(" join ") && lowered.contains(" on ");
    let has_where_equality = lowered.contains(" where ") && lowered.contains('=');
    if has_join_condition || has_where_equality {
        JoinCheck {
            is_valid: true,
            reason: "join condition present".to_string(),
        }
    } else {
        JoinCheck {
            is_valid: false,
            reason: "multiple tables referenced without a join condition".to_string(),
        }
    }
}

fn closest_table(table: &str, known: &[String]) -> Option<String> {
    known
        .iter()
        .map(|k| (jaro_winkler(&table.to_lowercase(), &k.to_lowercase()), k))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, k)| k.clone())
}
