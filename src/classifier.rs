//! Query Classifier
//!
//! Pure keyword/heuristic classification of a natural-language query into a
//! category, a complexity tier and an estimated join count. Deterministic and
//! total: classification never fails, empty input gets a neutral default.

use serde::{Deserialize, Serialize};

use crate::schema::SchemaContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryCategory {
    Lookup,
    Aggregation,
    Trend,
    Comparison,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryClassification {
    pub category: QueryCategory,
    pub complexity: Complexity,
    pub required_joins: u32,
    pub confidence_score: f64,
}

pub(crate) const AGGREGATION_KEYWORDS: &[&str] = &[
    "count", "sum", "total", "average", "avg", "maximum", "minimum", "max ", "min ", "how many",
];

pub(crate) const TREND_KEYWORDS: &[&str] = &[
    "trend",
    "over time",
    "growth",
    "month over month",
    "per month",
    "per week",
    "monthly",
    "weekly",
];

pub(crate) const COMPARISON_KEYWORDS: &[&str] =
    &["compare", "versus", " vs ", " vs.", "difference between"];

pub(crate) const RANKING_KEYWORDS: &[&str] =
    &["top ", "bottom ", "highest", "lowest", "best", "worst"];

pub(crate) const JOIN_KEYWORDS: &[&str] = &[
    "join",
    "with their",
    "and their",
    "along with",
    "together with",
    "combined with",
];

pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

pub(crate) fn has_aggregation_keywords(text: &str) -> bool {
    contains_any(&text.to_lowercase(), AGGREGATION_KEYWORDS)
}

#[derive(Debug, Default)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify from text alone. Total: empty input yields an `Unknown`
    /// category with `Medium` complexity rather than an error.
    pub fn classify(&self, text: &str) -> QueryClassification {
        self.classify_with_schema(text, None)
    }

    /// Classify with a schema context available; the join count is refined
    /// to at least `relevant_tables - 1`, since every additional relevant
    /// table implies one join.
    pub fn classify_with_schema(
        &self,
        text: &str,
        schema: Option<&SchemaContext>,
    ) -> QueryClassification {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return QueryClassification {
                category: QueryCategory::Unknown,
                complexity: Complexity::Medium,
                required_joins: 0,
                confidence_score: 0.0,
            };
        }

        let category = if contains_any(&normalized, COMPARISON_KEYWORDS) {
            QueryCategory::Comparison
        } else if contains_any(&normalized, TREND_KEYWORDS) {
            QueryCategory::Trend
        } else if contains_any(&normalized, AGGREGATION_KEYWORDS) {
            QueryCategory::Aggregation
        } else {
            QueryCategory::Lookup
        };

        let keyword_joins = JOIN_KEYWORDS
            .iter()
            .filter(|k| normalized.contains(*k))
            .count() as u32;
        let schema_joins = schema
            .map(|s| s.relevant_tables.len().saturating_sub(1) as u32)
            .unwrap_or(0);
        let required_joins = keyword_joins.max(schema_joins);

        let aggregating = contains_any(&normalized, AGGREGATION_KEYWORDS);
        let ranking = contains_any(&normalized, RANKING_KEYWORDS);

        let complexity = if required_joins > 2 || (required_joins >= 1 && (aggregating || ranking))
        {
            Complexity::High
        } else if required_joins >= 1 || aggregating {
            Complexity::Medium
        } else {
            Complexity::Low
        };

        // Confidence grows with each recognized signal.
        let mut signals = 0u32;
        if category != QueryCategory::Lookup {
            signals += 1;
        }
        if aggregating {
            signals += 1;
        }
        if ranking {
            signals += 1;
        }
        if required_joins > 0 {
            signals += 1;
        }
        let confidence_score = (0.5 + 0.1 * f64::from(signals)).min(0.9);

        QueryClassification {
            category,
            complexity,
            required_joins,
            confidence_score,
        }
    }
}
