//! Semantic analysis data model
//!
//! Produced once per request by a `SemanticAnalyzer` collaborator and
//! immutable afterwards.

use serde::{Deserialize, Serialize};

/// High-level intent detected in a natural-language query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    General,
    Aggregation,
    Trend,
    Comparison,
    Ranking,
    Filtering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Table,
    Column,
    Metric,
    TimeRange,
    Value,
}

/// A span of the original query text recognized as meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub entity_type: EntityType,
    /// Byte offsets (start, end) into the original query text.
    pub span: (usize, usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticAnalysis {
    pub query: String,
    pub entities: Vec<Entity>,
    pub intent: Intent,
    pub confidence: f64,
}

impl SemanticAnalysis {
    /// Minimal analysis used when the analyzer collaborator is unavailable.
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            entities: Vec::new(),
            intent: Intent::General,
            confidence: 0.0,
        }
    }
}
