//! Built-in keyword collaborators
//!
//! Keyword-based implementations of the semantic-analysis and
//! schema-resolution contracts so the pipeline runs end to end without
//! external services. Real deployments swap these for dedicated services.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use strsim::jaro_winkler;

use crate::analysis::{Entity, EntityType, Intent, SemanticAnalysis};
use crate::classifier::{
    contains_any, AGGREGATION_KEYWORDS, COMPARISON_KEYWORDS, RANKING_KEYWORDS, TREND_KEYWORDS,
};
use crate::contracts::{SchemaResolver, SemanticAnalyzer};
use crate::error::Result;
use crate::schema::{SchemaContext, TableInfo};

const TABLE_MATCH_THRESHOLD: f64 = 0.85;

lazy_static! {
    static ref TIME_RANGE_RE: Regex =
        Regex::new(r"(?i)\b(last|past|previous)\s+\d+\s+(day|week|month|year)s?\b")
            .expect("time range regex");
    static ref NUMBER_RE: Regex = Regex::new(r"\b\d+(\.\d+)?\b").expect("number regex");
    static ref TOKEN_RE: Regex = Regex::new(r"[A-Za-z_]+").expect("token regex");
}

fn singular(token: &str) -> &str {
    token.strip_suffix('s').unwrap_or(token)
}

fn detect_intent(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    if contains_any(&lowered, COMPARISON_KEYWORDS) {
        Intent::Comparison
    } else if contains_any(&lowered, TREND_KEYWORDS) {
        Intent::Trend
    } else if contains_any(&lowered, RANKING_KEYWORDS) {
        Intent::Ranking
    } else if contains_any(&lowered, AGGREGATION_KEYWORDS) {
        Intent::Aggregation
    } else if lowered.contains(" where ") || lowered.contains(" with ") || lowered.contains(" from the ")
    {
        Intent::Filtering
    } else {
        Intent::General
    }
}

/// Entity extraction by vocabulary match plus time-range and numeric
/// literal detection.
pub struct KeywordSemanticAnalyzer {
    /// Known table and column names matched against query tokens.
    vocabulary: Vec<(String, EntityType)>,
}

impl KeywordSemanticAnalyzer {
    pub fn new(vocabulary: Vec<(String, EntityType)>) -> Self {
        Self { vocabulary }
    }

    pub fn from_schema(tables: &[TableInfo]) -> Self {
        let mut vocabulary = Vec::new();
        for table in tables {
            vocabulary.push((table.name.clone(), EntityType::Table));
            for column in &table.columns {
                vocabulary.push((column.name.clone(), EntityType::Column));
            }
        }
        Self::new(vocabulary)
    }

    fn match_vocabulary(&self, token: &str) -> Option<(String, EntityType)> {
        let token_lower = singular(&token.to_lowercase()).to_string();
        for (word, entity_type) in &self.vocabulary {
            let word_lower = singular(&word.to_lowercase()).to_string();
            if token_lower == word_lower
                || jaro_winkler(&token_lower, &word_lower) >= TABLE_MATCH_THRESHOLD
            {
                return Some((word.clone(), *entity_type));
            }
        }
        None
    }
}

#[async_trait]
impl SemanticAnalyzer for KeywordSemanticAnalyzer {
    async fn analyze(&self, text: &str) -> Result<SemanticAnalysis> {
        if text.trim().is_empty() {
            return Ok(SemanticAnalysis::empty(text));
        }

        let mut entities = Vec::new();

        for token in TOKEN_RE.find_iter(text) {
            if token.as_str().len() < 3 {
                continue;
            }
            if let Some((matched, entity_type)) = self.match_vocabulary(token.as_str()) {
                entities.push(Entity {
                    text: matched,
                    entity_type,
                    span: (token.start(), token.end()),
                });
            }
        }

        if let Some(range) = TIME_RANGE_RE.find(text) {
            entities.push(Entity {
                text: range.as_str().to_string(),
                entity_type: EntityType::TimeRange,
                span: (range.start(), range.end()),
            });
        }

        for number in NUMBER_RE.find_iter(text) {
            entities.push(Entity {
                text: number.as_str().to_string(),
                entity_type: EntityType::Value,
                span: (number.start(), number.end()),
            });
        }

        let intent = detect_intent(text);
        let confidence = (0.4 + 0.1 * entities.len() as f64).min(0.9);

        Ok(SemanticAnalysis {
            query: text.to_string(),
            entities,
            intent,
            confidence,
        })
    }
}

/// Ranks the full schema's tables by token overlap with the query and
/// returns the best-matching subset as the relevant schema context.
pub struct KeywordSchemaResolver {
    full_schema: Vec<TableInfo>,
    max_tables: usize,
}

impl KeywordSchemaResolver {
    pub fn new(full_schema: Vec<TableInfo>) -> Self {
        Self {
            full_schema,
            max_tables: 5,
        }
    }

    pub fn with_max_tables(mut self, max_tables: usize) -> Self {
        self.max_tables = max_tables;
        self
    }

    /// Relevance of one table: strongest similarity between any query token
    /// and the table name, with a smaller credit for column-name hits.
    fn table_relevance(table: &TableInfo, tokens: &[String]) -> (f64, usize) {
        let name = singular(&table.name.to_lowercase()).to_string();
        let mut best = 0.0f64;
        let mut first_hit = usize::MAX;

        for (position, token) in tokens.iter().enumerate() {
            let token = singular(token);
            let score = if token == name {
                1.0
            } else {
                jaro_winkler(token, &name)
            };
            if score >= TABLE_MATCH_THRESHOLD && score > best {
                best = score;
                first_hit = first_hit.min(position);
            }

            for column in &table.columns {
                let column_lower = singular(&column.name.to_lowercase()).to_string();
                if *token == column_lower && best < 0.5 {
                    best = 0.5;
                    first_hit = first_hit.min(position);
                }
            }
        }

        (best, first_hit)
    }
}

#[async_trait]
impl SchemaResolver for KeywordSchemaResolver {
    async fn relevant_schema(&self, text: &str) -> Result<SchemaContext> {
        let tokens: Vec<String> = TOKEN_RE
            .find_iter(&text.to_lowercase())
            .map(|m| m.as_str().to_string())
            .filter(|t| t.len() >= 3)
            .collect();

        let mut scored: Vec<(f64, usize, &TableInfo)> = self
            .full_schema
            .iter()
            .map(|table| {
                let (score, first_hit) = Self::table_relevance(table, &tokens);
                (score, first_hit, table)
            })
            .filter(|(score, _, _)| *score > 0.0)
            .collect();

        // Strongest match first; ties resolved by earliest mention in the
        // query so the primary table leads the context.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.name.cmp(&b.2.name))
        });

        Ok(SchemaContext::new(
            scored
                .into_iter()
                .take(self.max_tables)
                .map(|(_, _, table)| table.clone())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_schema() -> Vec<TableInfo> {
        vec![
            TableInfo::new(
                "Players",
                &[("PlayerID", "int"), ("Status", "varchar"), ("CreatedAt", "datetime")],
            ),
            TableInfo::new("Deposits", &[("PlayerID", "int"), ("Amount", "decimal")]),
            TableInfo::new("Withdrawals", &[("PlayerID", "int"), ("Amount", "decimal")]),
        ]
    }

    #[tokio::test]
    async fn test_analyzer_handles_empty_input() {
        let analyzer = KeywordSemanticAnalyzer::new(Vec::new());
        let analysis = analyzer.analyze("").await.unwrap();
        assert_eq!(analysis.intent, Intent::General);
        assert!(analysis.entities.is_empty());
        assert_eq!(analysis.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_analyzer_extracts_tables_and_time_range() {
        let analyzer = KeywordSemanticAnalyzer::from_schema(&full_schema());
        let analysis = analyzer
            .analyze("Show me all blocked players from the last 7 days")
            .await
            .unwrap();
        assert!(analysis
            .entities
            .iter()
            .any(|e| e.text == "Players" && e.entity_type == EntityType::Table));
        assert!(analysis
            .entities
            .iter()
            .any(|e| e.entity_type == EntityType::TimeRange));
    }

    #[tokio::test]
    async fn test_analyzer_detects_ranking_intent() {
        let analyzer = KeywordSemanticAnalyzer::from_schema(&full_schema());
        let analysis = analyzer
            .analyze("Top 10 players by deposits in the last 7 days")
            .await
            .unwrap();
        assert_eq!(analysis.intent, Intent::Ranking);
    }

    #[tokio::test]
    async fn test_resolver_returns_mentioned_tables_primary_first() {
        let resolver = KeywordSchemaResolver::new(full_schema());
        let context = resolver
            .relevant_schema("Top 10 players by deposits in the last 7 days")
            .await
            .unwrap();
        let names = context.table_names();
        assert_eq!(names, vec!["Players".to_string(), "Deposits".to_string()]);
    }

    #[tokio::test]
    async fn test_resolver_may_return_empty_context() {
        let resolver = KeywordSchemaResolver::new(full_schema());
        let context = resolver.relevant_schema("weather forecast tomorrow").await.unwrap();
        assert!(context.is_empty());
    }
}
