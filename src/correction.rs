//! Self-Correction Loop
//!
//! Single-shot correction for results in the correctable band: one
//! structured prompt enumerating every failed dimension, one corrected-SQL
//! request, one re-validation. The revision replaces the original only on
//! strict score improvement. The `depth` bound is explicit so the loop can
//! never re-enter correction on an already-corrected result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contracts::{CompletionClient, CompletionOptions};
use crate::error::{PipelineError, Result};
use crate::generator::sanitize_response;
use crate::prompts;
use crate::schema::SchemaContext;
use crate::validation::{LayeredValidator, ValidationResult};

pub const MAX_CORRECTION_DEPTH: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfCorrectionAttempt {
    pub original_sql: String,
    pub corrected_sql: String,
    pub correction_reason: String,
    pub improvement_score: f64,
    pub was_successful: bool,
    pub issues_addressed: Vec<String>,
}

/// Outcome of one correction attempt: the validation result and SQL the
/// pipeline should continue with, plus the attempt record.
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    pub result: ValidationResult,
    pub sql: String,
    pub attempt: SelfCorrectionAttempt,
}

pub struct CorrectionEngine {
    llm: Arc<dyn CompletionClient>,
    validator: Arc<LayeredValidator>,
}

impl CorrectionEngine {
    pub fn new(llm: Arc<dyn CompletionClient>, validator: Arc<LayeredValidator>) -> Self {
        Self { llm, validator }
    }

    /// Attempt one correction. Returns the original result unchanged when
    /// the depth bound is reached, the result is not correctable, or the
    /// revision does not strictly improve the score.
    pub async fn correct(
        &self,
        sql: &str,
        original_query: &str,
        schema: Option<&SchemaContext>,
        original: &ValidationResult,
        depth: u8,
    ) -> Result<CorrectionOutcome> {
        if depth >= MAX_CORRECTION_DEPTH {
            return Ok(Self::rejected(
                sql,
                original,
                String::new(),
                "correction depth exhausted",
            ));
        }
        if !original.can_self_correct {
            return Ok(Self::rejected(
                sql,
                original,
                String::new(),
                "result is not in the correctable band",
            ));
        }

        let issues = original.failed_dimensions();
        let prompt = prompts::build_correction_prompt(original_query, sql, &issues);
        let raw = self
            .llm
            .complete(&prompt, &CompletionOptions::default())
            .await
            .map_err(|e| PipelineError::Correction(format!("correction request failed: {e}")))?;

        let corrected_sql = sanitize_response(&raw);
        if corrected_sql.is_empty() {
            return Err(PipelineError::Correction(
                "correction request returned an empty completion".to_string(),
            ));
        }

        let corrected = self
            .validator
            .validate(&corrected_sql, original_query, schema);
        let improvement = corrected.overall_score - original.overall_score;

        if improvement > 0.0 {
            info!(
                improvement,
                corrected_score = corrected.overall_score,
                "self-correction accepted"
            );
            let mut accepted = corrected;
            accepted.is_self_corrected = true;
            accepted.original_sql = Some(sql.to_string());
            Ok(CorrectionOutcome {
                result: accepted,
                sql: corrected_sql.clone(),
                attempt: SelfCorrectionAttempt {
                    original_sql: sql.to_string(),
                    corrected_sql,
                    correction_reason: issues.join("; "),
                    improvement_score: improvement,
                    was_successful: true,
                    issues_addressed: issues,
                },
            })
        } else {
            warn!(
                corrected_score = corrected.overall_score,
                original_score = original.overall_score,
                "self-correction rejected, no strict improvement"
            );
            Ok(Self::rejected(
                sql,
                original,
                corrected_sql,
                "corrected SQL did not strictly improve the validation score",
            ))
        }
    }

    fn rejected(
        sql: &str,
        original: &ValidationResult,
        corrected_sql: String,
        reason: &str,
    ) -> CorrectionOutcome {
        CorrectionOutcome {
            result: original.clone(),
            sql: sql.to_string(),
            attempt: SelfCorrectionAttempt {
                original_sql: sql.to_string(),
                corrected_sql,
                correction_reason: reason.to_string(),
                improvement_score: 0.0,
                was_successful: false,
                issues_addressed: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::SecurityValidator;
    use crate::schema::TableInfo;
    use crate::validation::RegexSecurityValidator;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| PipelineError::Llm("no scripted response left".to_string()))
        }
    }

    fn schema_context() -> SchemaContext {
        SchemaContext::new(vec![
            TableInfo::new("Players", &[("PlayerID", "int"), ("Name", "varchar")]),
            TableInfo::new("Deposits", &[("PlayerID", "int"), ("Amount", "decimal")]),
        ])
    }

    fn validator() -> Arc<LayeredValidator> {
        let security: Arc<dyn SecurityValidator> = Arc::new(RegexSecurityValidator::new());
        Arc::new(LayeredValidator::new(security))
    }

    const QUERY: &str = "top 10 players by total deposits";
    const BAD_SQL: &str = "SELECT Name FROM Playerz";
    const GOOD_SQL: &str = "SELECT TOP 10 p.Name, SUM(d.Amount) AS TotalDeposits FROM Players p JOIN Deposits d ON p.PlayerID = d.PlayerID GROUP BY p.Name ORDER BY TotalDeposits DESC";

    #[tokio::test]
    async fn test_accepted_correction_replaces_result() {
        let validator = validator();
        let schema = schema_context();
        let original = validator.validate(BAD_SQL, QUERY, Some(&schema));
        assert!(original.can_self_correct);

        let engine = CorrectionEngine::new(Arc::new(ScriptedLlm::new(&[GOOD_SQL])), validator);
        let outcome = engine
            .correct(BAD_SQL, QUERY, Some(&schema), &original, 0)
            .await
            .unwrap();

        assert!(outcome.attempt.was_successful);
        assert!(outcome.result.is_self_corrected);
        assert_eq!(outcome.result.original_sql.as_deref(), Some(BAD_SQL));
        assert!(outcome.result.overall_score > original.overall_score);
        assert_eq!(outcome.sql, GOOD_SQL);
    }

    #[tokio::test]
    async fn test_non_improving_correction_keeps_original() {
        let validator = validator();
        let schema = schema_context();
        let original = validator.validate(BAD_SQL, QUERY, Some(&schema));

        // Revision is no better than the original.
        let engine = CorrectionEngine::new(Arc::new(ScriptedLlm::new(&[BAD_SQL])), validator);
        let outcome = engine
            .correct(BAD_SQL, QUERY, Some(&schema), &original, 0)
            .await
            .unwrap();

        assert!(!outcome.attempt.was_successful);
        assert!(!outcome.result.is_self_corrected);
        assert!(outcome.result.original_sql.is_none());
        assert!((outcome.result.overall_score - original.overall_score).abs() < 1e-9);
        assert_eq!(outcome.sql, BAD_SQL);
    }

    #[tokio::test]
    async fn test_depth_bound_blocks_reentry() {
        let validator = validator();
        let schema = schema_context();
        let original = validator.validate(BAD_SQL, QUERY, Some(&schema));

        let engine = CorrectionEngine::new(Arc::new(ScriptedLlm::new(&[GOOD_SQL])), validator);
        let outcome = engine
            .correct(BAD_SQL, QUERY, Some(&schema), &original, MAX_CORRECTION_DEPTH)
            .await
            .unwrap();

        assert!(!outcome.attempt.was_successful);
        assert_eq!(outcome.attempt.correction_reason, "correction depth exhausted");
        assert_eq!(outcome.sql, BAD_SQL);
    }

    #[tokio::test]
    async fn test_llm_failure_surfaces_as_correction_error() {
        let validator = validator();
        let schema = schema_context();
        let original = validator.validate(BAD_SQL, QUERY, Some(&schema));

        let engine = CorrectionEngine::new(Arc::new(ScriptedLlm::new(&[])), validator);
        let result = engine
            .correct(BAD_SQL, QUERY, Some(&schema), &original, 0)
            .await;
        assert!(matches!(result, Err(PipelineError::Correction(_))));
    }
}
