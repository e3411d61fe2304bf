//! Semantic alignment check
//!
//! Heuristic overlap between natural-language keywords and the SQL
//! constructs that should answer them. Each matched pair is worth 0.2,
//! capped at 1.0. A query with no alignment keywords has nothing to check
//! and scores 1.0.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticAlignment {
    pub score: f64,
    pub is_valid: bool,
    pub reason: String,
}

impl SemanticAlignment {
    pub(crate) fn fallback() -> Self {
        Self {
            score: super::STAGE_FALLBACK_SCORE,
            is_valid: true,
            reason: "semantic alignment stage unavailable, neutral score applied".to_string(),
        }
    }
}

/// (NL keywords, SQL constructs, description of the missing construct)
const ALIGNMENT_PAIRS: &[(&[&str], &[&str], &str)] = &[
    (
        &["top ", "bottom ", "first "],
        &["limit", "top ", "fetch first"],
        "ranking requested but no LIMIT/TOP clause",
    ),
    (
        &["count", "how many"],
        &["count("],
        "count requested but no COUNT aggregate",
    ),
    (
        &["sum", "total"],
        &["sum("],
        "sum requested but no SUM aggregate",
    ),
    (
        &["average", "avg", "mean "],
        &["avg("],
        "average requested but no AVG aggregate",
    ),
    (
        &["per ", "group", "breakdown", "by each"],
        &["group by"],
        "grouping requested but no GROUP BY clause",
    ),
    (
        &["order", "sort", "rank"],
        &["order by"],
        "ordering requested but no ORDER BY clause",
    ),
];

pub fn check_alignment(original_query: &str, sql: &str) -> Result<SemanticAlignment> {
    let query = original_query.to_lowercase();
    let sql = sql.to_lowercase();

    let mut expected = 0u32;
    let mut matched = 0u32;
    let mut missing = Vec::new();

    for (nl_keywords, sql_constructs, description) in ALIGNMENT_PAIRS {
        if !nl_keywords.iter().any(|k| query.contains(k)) {
            continue;
        }
        expected += 1;
        if sql_constructs.iter().any(|c| sql.contains(c)) {
            matched += 1;
        } else {
            missing.push(*description);
        }
    }

    if expected == 0 {
        return Ok(SemanticAlignment {
            score: 1.0,
            is_valid: true,
            reason: "no alignment keywords to check".to_string(),
        });
    }

    let score = (0.2 * f64::from(matched)).min(1.0);
    let is_valid = score >= 0.4;
    let reason = if missing.is_empty() {
        format!("all {} alignment pairs matched", matched)
    } else {
        missing.join("; ")
    };

    Ok(SemanticAlignment {
        score,
        is_valid,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_pairs_accumulate_score() {
        let alignment = check_alignment(
            "Top 10 players by total deposits",
            "SELECT TOP 10 Name, SUM(Amount) FROM Players GROUP BY Name ORDER BY SUM(Amount) DESC",
        )
        .unwrap();
        // top -> TOP, total -> SUM( both matched
        assert!((alignment.score - 0.4).abs() < 1e-9);
        assert!(alignment.is_valid);
    }

    #[test]
    fn test_missing_constructs_lower_score() {
        let alignment =
            check_alignment("Top 10 players by total deposits", "SELECT Name FROM Players")
                .unwrap();
        assert!((alignment.score - 0.0).abs() < 1e-9);
        assert!(!alignment.is_valid);
        assert!(alignment.reason.contains("LIMIT"));
        assert!(alignment.reason.contains("SUM"));
    }

    #[test]
    fn test_no_keywords_is_vacuously_aligned() {
        let alignment = check_alignment("show revenue", "SELECT Revenue FROM Daily").unwrap();
        assert!((alignment.score - 1.0).abs() < 1e-9);
        assert!(alignment.is_valid);
    }

    #[test]
    fn test_score_is_capped_at_one() {
        let alignment = check_alignment(
            "top count sum average per order of players",
            "SELECT TOP 5 COUNT(*), SUM(a), AVG(a) FROM t GROUP BY b ORDER BY 1",
        )
        .unwrap();
        assert!(alignment.score <= 1.0);
    }
}
