//! Query Processor
//!
//! Primary entry point of the pipeline: semantic analysis → schema context
//! → classification → decomposition → candidate generation → layered
//! validation → bounded self-correction. `process_query` never fails except
//! for cancellation; internal failures degrade into a low-confidence result
//! carrying a safe fallback SQL.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{Entity, SemanticAnalysis};
use crate::classifier::{QueryClassification, QueryClassifier};
use crate::contracts::{CompletionClient, SchemaResolver, SecurityValidator, SemanticAnalyzer};
use crate::correction::CorrectionEngine;
use crate::decomposer::{QueryDecomposer, QueryDecomposition};
use crate::error::{PipelineError, Result};
use crate::generator::{CandidateGenerator, SqlCandidate};
use crate::schema::SchemaContext;
use crate::validation::{LayeredValidator, ValidationResult};

/// SQL returned when generation fails beyond recovery.
pub const FALLBACK_SQL: &str = "SELECT 'Error processing query' AS ErrorMessage";
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Final output of the pipeline, ready for an HTTP layer to marshal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedQuery {
    pub id: Uuid,
    pub sql: String,
    pub explanation: String,
    pub confidence: f64,
    pub alternatives: Vec<SqlCandidate>,
    pub entities: Vec<Entity>,
    pub classification: QueryClassification,
    pub decomposition: QueryDecomposition,
    pub used_schema: SchemaContext,
    pub validation: Option<ValidationResult>,
    pub warnings: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

pub struct QueryProcessor {
    analyzer: Arc<dyn SemanticAnalyzer>,
    schema_resolver: Arc<dyn SchemaResolver>,
    classifier: QueryClassifier,
    decomposer: QueryDecomposer,
    generator: CandidateGenerator,
    validator: Arc<LayeredValidator>,
    corrector: CorrectionEngine,
}

impl QueryProcessor {
    pub fn new(
        analyzer: Arc<dyn SemanticAnalyzer>,
        schema_resolver: Arc<dyn SchemaResolver>,
        llm: Arc<dyn CompletionClient>,
        security: Arc<dyn SecurityValidator>,
    ) -> Self {
        let validator = Arc::new(LayeredValidator::new(security));
        Self {
            analyzer,
            schema_resolver,
            classifier: QueryClassifier::new(),
            decomposer: QueryDecomposer::new(),
            generator: CandidateGenerator::new(Arc::clone(&llm)),
            corrector: CorrectionEngine::new(llm, Arc::clone(&validator)),
            validator,
        }
    }

    /// Process a natural-language query end to end. `Err` only on
    /// cancellation; every other failure degrades into a structured result.
    pub async fn process_query(
        &self,
        nl_query: &str,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessedQuery> {
        let query_id = Uuid::new_v4();
        info!(%query_id, user_id, "processing natural-language query");

        ensure_active(cancel)?;
        let analysis = match self.analyzer.analyze(nl_query).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(%query_id, "semantic analysis failed, continuing without entities: {e}");
                SemanticAnalysis::empty(nl_query)
            }
        };

        ensure_active(cancel)?;
        let schema = match self.schema_resolver.relevant_schema(nl_query).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(%query_id, "schema resolution failed, continuing without schema: {e}");
                SchemaContext::default()
            }
        };

        let classification = self.classifier.classify_with_schema(nl_query, Some(&schema));
        let decomposition = self.decomposer.decompose(nl_query, &schema, &classification);
        info!(
            %query_id,
            category = ?classification.category,
            complexity = ?classification.complexity,
            components = decomposition.components.len(),
            "query classified and decomposed"
        );

        ensure_active(cancel)?;
        let optimized = match self
            .generator
            .generate(&analysis, &schema, &decomposition)
            .await
        {
            Ok(optimized) => optimized,
            Err(e) => {
                warn!(%query_id, "generation failed, returning degraded result: {e}");
                return Ok(Self::degraded(
                    query_id,
                    analysis,
                    classification,
                    decomposition,
                    schema,
                    &e,
                ));
            }
        };

        ensure_active(cancel)?;
        let mut validation = self
            .validator
            .validate(&optimized.candidate.sql, nl_query, Some(&schema));
        let mut final_sql = optimized.candidate.sql.clone();

        if validation.can_self_correct {
            ensure_active(cancel)?;
            match self
                .corrector
                .correct(&final_sql, nl_query, Some(&schema), &validation, 0)
                .await
            {
                Ok(outcome) => {
                    if outcome.attempt.was_successful {
                        info!(%query_id, "accepted self-corrected SQL");
                    }
                    validation = outcome.result;
                    final_sql = outcome.sql;
                }
                Err(e) => {
                    warn!(%query_id, "self-correction failed, keeping original result: {e}");
                }
            }
        }

        let confidence = (optimized.confidence_score * validation.overall_score).clamp(0.0, 1.0);
        let warnings = collect_warnings(&validation);

        Ok(ProcessedQuery {
            id: query_id,
            sql: final_sql,
            explanation: optimized.candidate.explanation.clone(),
            confidence,
            alternatives: optimized.alternatives,
            entities: analysis.entities,
            classification,
            decomposition,
            used_schema: schema,
            validation: Some(validation),
            warnings,
            processed_at: Utc::now(),
        })
    }

    /// Validation-only entry point for callers that already hold SQL.
    pub fn validate_sql(
        &self,
        sql: &str,
        original_query: &str,
        schema: Option<&SchemaContext>,
        user_id: Option<&str>,
    ) -> ValidationResult {
        info!(user_id = user_id.unwrap_or("anonymous"), "validating SQL");
        self.validator.validate(sql, original_query, schema)
    }

    fn degraded(
        query_id: Uuid,
        analysis: SemanticAnalysis,
        classification: QueryClassification,
        decomposition: QueryDecomposition,
        schema: SchemaContext,
        error: &PipelineError,
    ) -> ProcessedQuery {
        ProcessedQuery {
            id: query_id,
            sql: FALLBACK_SQL.to_string(),
            explanation: format!("Query generation failed: {error}"),
            confidence: FALLBACK_CONFIDENCE,
            alternatives: Vec::new(),
            entities: analysis.entities,
            classification,
            decomposition,
            used_schema: schema,
            validation: None,
            warnings: vec!["generation failed, fallback SQL returned".to_string()],
            processed_at: Utc::now(),
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

fn collect_warnings(validation: &ValidationResult) -> Vec<String> {
    let mut warnings = validation.security.warnings.clone();
    warnings.extend(validation.schema.warnings.iter().cloned());
    warnings.extend(validation.schema.table_validation.suggestions.iter().cloned());
    warnings.extend(validation.schema.column_validation.suggestions.iter().cloned());
    warnings.extend(validation.business.violations.iter().cloned());
    warnings.extend(validation.business.recommendations.iter().cloned());
    if !validation.semantic.is_valid {
        warnings.push(validation.semantic.reason.clone());
    }
    warnings
}
