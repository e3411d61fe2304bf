//! Business-logic rule checks
//!
//! Flat rule list over the SQL text: `SELECT *` and unfiltered writes are
//! violations; unfiltered scans of known-large tables produce
//! recommendations. Each violation costs 0.2 of the compliance score.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tables known to be too large for unfiltered scans.
pub const LARGE_TABLES: &[&str] = &["tbl_daily_actions", "tbl_daily_actions_players", "transactions"];

pub const SELECT_STAR_VIOLATION: &str = "SELECT * may impact performance";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessLogicCheck {
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
    pub compliance_score: f64,
}

impl BusinessLogicCheck {
    pub(crate) fn fallback() -> Self {
        Self {
            violations: Vec::new(),
            recommendations: vec![
                "business logic stage unavailable, neutral score applied".to_string()
            ],
            compliance_score: super::STAGE_FALLBACK_SCORE,
        }
    }
}

pub fn check_rules(sql: &str) -> Result<BusinessLogicCheck> {
    let lowered = sql.to_lowercase();
    let mut violations = Vec::new();
    let mut recommendations = Vec::new();

    if lowered.contains("select *") {
        violations.push(SELECT_STAR_VIOLATION.to_string());
        recommendations.push("List only the columns the report needs".to_string());
    }

    let has_where = lowered.contains(" where ") || lowered.ends_with(" where");
    if lowered.contains("delete ") && !has_where {
        violations.push("DELETE without a WHERE clause affects every row".to_string());
    }
    if lowered.contains("update ") && !lowered.contains(" where ") {
        violations.push("UPDATE without a WHERE clause affects every row".to_string());
    }

    if !has_where {
        for table in LARGE_TABLES {
            if lowered.contains(table) {
                recommendations.push(format!(
                    "Unfiltered scan of large table '{table}'; add a WHERE or date filter"
                ));
            }
        }
    }

    let compliance_score = (1.0 - 0.2 * violations.len() as f64).max(0.0);

    Ok(BusinessLogicCheck {
        violations,
        recommendations,
        compliance_score,
    })
}
