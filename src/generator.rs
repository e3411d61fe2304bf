//! Candidate Generator & Optimizer
//!
//! Delegates SQL text generation to the LLM collaborator, scores each
//! returned candidate heuristically, and selects the best one. Generation
//! failures are loud (`Err`): the final safe-SQL fallback belongs to the
//! query processor, not here.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{Intent, SemanticAnalysis};
use crate::contracts::{CompletionClient, CompletionOptions};
use crate::decomposer::QueryDecomposition;
use crate::error::{PipelineError, Result};
use crate::prompts;
use crate::schema::SchemaContext;

/// One generated SQL text competing with alternatives for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlCandidate {
    pub sql: String,
    pub explanation: String,
    pub confidence: Option<f64>,
}

/// The selected candidate plus the remainder as alternatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedQuery {
    pub candidate: SqlCandidate,
    pub confidence_score: f64,
    pub alternatives: Vec<SqlCandidate>,
}

/// Keywords that should never appear in generated read queries.
pub(crate) const DANGEROUS_KEYWORDS: &[&str] = &[
    "drop ", "truncate ", "alter ", "create ", "grant ", "revoke ", "exec ", "execute ",
];

#[derive(Debug, Deserialize)]
struct RawCandidate {
    sql: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct CandidateGenerator {
    llm: Arc<dyn CompletionClient>,
}

impl CandidateGenerator {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Generate at least one SQL candidate and pick the best by heuristic
    /// score. Errors when the collaborator fails or produces nothing usable.
    pub async fn generate(
        &self,
        analysis: &SemanticAnalysis,
        schema: &SchemaContext,
        decomposition: &QueryDecomposition,
    ) -> Result<OptimizedQuery> {
        let prompt = prompts::build_generation_prompt(analysis, schema, decomposition);
        let raw = self
            .llm
            .complete(&prompt, &CompletionOptions::default())
            .await
            .map_err(|e| PipelineError::Generation(format!("completion failed: {e}")))?;

        let candidates = parse_candidates(&raw)?;
        debug!(count = candidates.len(), "parsed SQL candidates");

        let mut scored: Vec<SqlCandidate> = candidates
            .into_iter()
            .map(|mut c| {
                let score = score_candidate(&c.sql, analysis, schema);
                c.confidence = Some(score);
                c
            })
            .collect();
        scored.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let candidate = scored.remove(0);
        let confidence_score = candidate.confidence.unwrap_or(0.0);
        Ok(OptimizedQuery {
            candidate,
            confidence_score,
            alternatives: scored,
        })
    }
}

/// Strip markdown fences and a leading `sql` language tag from an LLM
/// response.
pub fn sanitize_response(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
        if let Some(rest) = text.strip_prefix("sql") {
            text = rest;
        } else if let Some(rest) = text.strip_prefix("json") {
            text = rest;
        }
        if let Some(end) = text.rfind("```") {
            text = &text[..end];
        }
    }
    text.trim().to_string()
}

/// Accepts a JSON array of candidates, a single JSON object, or a bare SQL
/// statement. Anything else is a generation failure.
fn parse_candidates(raw: &str) -> Result<Vec<SqlCandidate>> {
    let cleaned = sanitize_response(raw);
    if cleaned.is_empty() {
        return Err(PipelineError::Generation(
            "LLM returned an empty completion".to_string(),
        ));
    }

    if let Ok(list) = serde_json::from_str::<Vec<RawCandidate>>(&cleaned) {
        let candidates: Vec<SqlCandidate> = list
            .into_iter()
            .filter(|c| !c.sql.trim().is_empty())
            .map(into_candidate)
            .collect();
        if candidates.is_empty() {
            return Err(PipelineError::Generation(
                "LLM returned no usable candidates".to_string(),
            ));
        }
        return Ok(candidates);
    }

    if let Ok(single) = serde_json::from_str::<RawCandidate>(&cleaned) {
        if !single.sql.trim().is_empty() {
            return Ok(vec![into_candidate(single)]);
        }
    }

    let lowered = cleaned.to_lowercase();
    if lowered.starts_with("select") || lowered.starts_with("with") {
        return Ok(vec![SqlCandidate {
            sql: cleaned,
            explanation: "Generated SQL (unstructured response)".to_string(),
            confidence: None,
        }]);
    }

    Err(PipelineError::Generation(format!(
        "unparseable LLM response: {}",
        truncate(&cleaned, 120)
    )))
}

fn into_candidate(raw: RawCandidate) -> SqlCandidate {
    SqlCandidate {
        sql: raw.sql.trim().to_string(),
        explanation: raw
            .explanation
            .unwrap_or_else(|| "Generated SQL candidate".to_string()),
        confidence: raw.confidence,
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Heuristic candidate score in [0, 1]: required clauses for the detected
/// intent present, known schema tables referenced, dangerous keywords
/// absent.
pub(crate) fn score_candidate(sql: &str, analysis: &SemanticAnalysis, schema: &SchemaContext) -> f64 {
    let lowered = sql.to_lowercase();
    let mut score: f64 = 0.0;

    if lowered.starts_with("select") || lowered.starts_with("with") {
        score += 0.3;
    }
    if lowered.contains(" from ") {
        score += 0.1;
    }

    score += match analysis.intent {
        Intent::Aggregation => {
            let has_aggregate = ["count(", "sum(", "avg(", "max(", "min("]
                .iter()
                .any(|f| lowered.contains(f));
            let has_grouping = lowered.contains("group by");
            match (has_aggregate, has_grouping) {
                (true, true) => 0.2,
                (true, false) | (false, true) => 0.1,
                (false, false) => 0.0,
            }
        }
        Intent::Ranking => {
            let mut bonus = 0.0;
            if lowered.contains("order by") {
                bonus += 0.1;
            }
            if lowered.contains("limit") || lowered.contains("top ") {
                bonus += 0.1;
            }
            bonus
        }
        Intent::Trend => {
            if lowered.contains("group by") {
                0.2
            } else {
                0.0
            }
        }
        Intent::Filtering => {
            if lowered.contains(" where ") {
                0.2
            } else {
                0.0
            }
        }
        Intent::Comparison => {
            if lowered.contains("group by") || lowered.contains("case ") || lowered.contains("union")
            {
                0.2
            } else {
                0.0
            }
        }
        Intent::General => 0.1,
    };

    let references_known_table = schema
        .relevant_tables
        .iter()
        .any(|t| lowered.contains(&t.name.to_lowercase()));
    if references_known_table {
        score += 0.2;
    }

    let dangerous_hits = DANGEROUS_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .count();
    score -= 0.3 * dangerous_hits as f64;

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SemanticAnalysis;
    use crate::schema::TableInfo;

    fn analysis_with_intent(query: &str, intent: Intent) -> SemanticAnalysis {
        SemanticAnalysis {
            query: query.to_string(),
            entities: Vec::new(),
            intent,
            confidence: 0.8,
        }
    }

    fn players_schema() -> SchemaContext {
        SchemaContext::new(vec![TableInfo::new(
            "Players",
            &[("PlayerID", "int"), ("Name", "varchar")],
        )])
    }

    #[test]
    fn test_parse_json_array_of_candidates() {
        let raw = r#"[{"sql": "SELECT Name FROM Players", "explanation": "player names"}]"#;
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].sql, "SELECT Name FROM Players");
    }

    #[test]
    fn test_parse_fenced_bare_sql() {
        let raw = "```sql\nSELECT Name FROM Players\n```";
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates[0].sql, "SELECT Name FROM Players");
    }

    #[test]
    fn test_empty_response_is_an_error() {
        assert!(parse_candidates("").is_err());
        assert!(parse_candidates("```\n```").is_err());
    }

    #[test]
    fn test_prose_response_is_an_error() {
        assert!(parse_candidates("I cannot answer that question.").is_err());
    }

    #[test]
    fn test_score_rewards_intent_clauses() {
        let analysis = analysis_with_intent("total deposits per player", Intent::Aggregation);
        let schema = players_schema();
        let with_agg = score_candidate(
            "SELECT PlayerID, SUM(Amount) FROM Players GROUP BY PlayerID",
            &analysis,
            &schema,
        );
        let without_agg = score_candidate("SELECT PlayerID FROM Players", &analysis, &schema);
        assert!(with_agg > without_agg);
    }

    #[test]
    fn test_score_penalizes_dangerous_keywords() {
        let analysis = analysis_with_intent("show players", Intent::General);
        let schema = players_schema();
        let safe = score_candidate("SELECT Name FROM Players", &analysis, &schema);
        let dangerous = score_candidate("SELECT Name FROM Players; DROP TABLE Players", &analysis, &schema);
        assert!(safe > dangerous);
    }

    #[test]
    fn test_score_bounds() {
        let analysis = analysis_with_intent("anything", Intent::General);
        let schema = SchemaContext::default();
        for sql in ["", "DROP TABLE x; TRUNCATE y;", "SELECT 1"] {
            let score = score_candidate(sql, &analysis, &schema);
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
