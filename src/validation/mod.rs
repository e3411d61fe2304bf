//! Layered Validator
//!
//! Four independent checks — security, semantic alignment, schema
//! compliance, business logic — combined into one weighted score and
//! validity verdict. Stages always run in order and a stage failure is
//! caught per-stage with a neutral fallback (allow over block), so an
//! infrastructure fault in one dimension never blocks all queries.

pub mod business;
pub mod schema;
pub mod security;
pub mod semantic;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contracts::{SecurityCheck, SecurityValidator};
use crate::schema::SchemaContext;

pub use business::BusinessLogicCheck;
pub use schema::{IdentifierCheck, JoinCheck, SchemaCompliance};
pub use security::RegexSecurityValidator;
pub use semantic::SemanticAlignment;

pub const SECURITY_WEIGHT: f64 = 0.4;
pub const SEMANTIC_WEIGHT: f64 = 0.3;
pub const SCHEMA_WEIGHT: f64 = 0.2;
pub const BUSINESS_WEIGHT: f64 = 0.1;

pub const VALIDITY_THRESHOLD: f64 = 0.6;
pub const CORRECTION_THRESHOLD: f64 = 0.4;

/// Neutral score substituted when a stage collaborator fails.
pub const STAGE_FALLBACK_SCORE: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub security: SecurityCheck,
    pub semantic: SemanticAlignment,
    pub schema: SchemaCompliance,
    pub business: BusinessLogicCheck,
    pub overall_score: f64,
    pub is_valid: bool,
    pub can_self_correct: bool,
    pub is_self_corrected: bool,
    pub original_sql: Option<String>,
}

impl ValidationResult {
    /// Itemized reasons for every failed dimension, used to build the
    /// correction prompt and caller-facing warnings.
    pub fn failed_dimensions(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.security.is_valid {
            for warning in &self.security.warnings {
                issues.push(format!("security: {warning}"));
            }
        }
        if !self.semantic.is_valid {
            issues.push(format!("semantic alignment: {}", self.semantic.reason));
        }
        if !self.schema.table_validation.is_valid {
            for suggestion in &self.schema.table_validation.suggestions {
                issues.push(format!("schema: {suggestion}"));
            }
        }
        if !self.schema.column_validation.is_valid {
            for suggestion in &self.schema.column_validation.suggestions {
                issues.push(format!("schema: {suggestion}"));
            }
        }
        if !self.schema.join_validation.is_valid {
            issues.push(format!("schema: {}", self.schema.join_validation.reason));
        }
        for violation in &self.business.violations {
            issues.push(format!("business rule: {violation}"));
        }
        issues
    }
}

pub struct LayeredValidator {
    security: Arc<dyn SecurityValidator>,
}

impl LayeredValidator {
    pub fn new(security: Arc<dyn SecurityValidator>) -> Self {
        Self { security }
    }

    /// Run all four dimensions in order and combine them. Always returns a
    /// result; stage errors degrade to neutral fallbacks.
    pub fn validate(
        &self,
        sql: &str,
        original_query: &str,
        schema: Option<&SchemaContext>,
    ) -> ValidationResult {
        let security = match self.security.validate(sql) {
            Ok(check) => check,
            Err(e) => {
                warn!("security validation stage failed, failing open: {e}");
                SecurityCheck {
                    is_valid: true,
                    warnings: vec!["security stage unavailable, not enforced".to_string()],
                }
            }
        };

        let semantic = match semantic::check_alignment(original_query, sql) {
            Ok(alignment) => alignment,
            Err(e) => {
                warn!("semantic alignment stage failed, failing open: {e}");
                SemanticAlignment::fallback()
            }
        };

        let schema_compliance = match schema::check_compliance(sql, schema) {
            Ok(compliance) => compliance,
            Err(e) => {
                warn!("schema compliance stage failed, failing open: {e}");
                SchemaCompliance::fallback()
            }
        };

        let business = match business::check_rules(sql) {
            Ok(check) => check,
            Err(e) => {
                warn!("business logic stage failed, failing open: {e}");
                BusinessLogicCheck::fallback()
            }
        };

        Self::combine(security, semantic, schema_compliance, business)
    }

    fn combine(
        security: SecurityCheck,
        semantic: SemanticAlignment,
        schema: SchemaCompliance,
        business: BusinessLogicCheck,
    ) -> ValidationResult {
        let security_score = if security.is_valid { 1.0 } else { 0.0 };
        let overall_score = SECURITY_WEIGHT * security_score
            + SEMANTIC_WEIGHT * semantic.score
            + SCHEMA_WEIGHT * schema.compliance_score
            + BUSINESS_WEIGHT * business.compliance_score;

        // A security failure is never valid and never correctable,
        // whatever the other dimensions say.
        let is_valid = security.is_valid && overall_score >= VALIDITY_THRESHOLD;
        let can_self_correct = security.is_valid
            && overall_score >= CORRECTION_THRESHOLD
            && overall_score < VALIDITY_THRESHOLD;

        ValidationResult {
            security,
            semantic,
            schema,
            business,
            overall_score,
            is_valid,
            can_self_correct,
            is_self_corrected: false,
            original_sql: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, Result};
    use crate::schema::TableInfo;

    struct FailingSecurity;

    impl SecurityValidator for FailingSecurity {
        fn validate(&self, _sql: &str) -> Result<SecurityCheck> {
            Err(PipelineError::Validation(
                "security service unreachable".to_string(),
            ))
        }
    }

    fn schema_context() -> SchemaContext {
        SchemaContext::new(vec![
            TableInfo::new("Players", &[("PlayerID", "int"), ("Name", "varchar")]),
            TableInfo::new("Deposits", &[("PlayerID", "int"), ("Amount", "decimal")]),
        ])
    }

    #[test]
    fn test_overall_score_is_weighted_sum() {
        let validator = LayeredValidator::new(Arc::new(RegexSecurityValidator::new()));
        let result = validator.validate(
            "SELECT Name FROM Players WHERE Status = 'Blocked'",
            "show blocked players",
            Some(&schema_context()),
        );
        let expected = SECURITY_WEIGHT * 1.0
            + SEMANTIC_WEIGHT * result.semantic.score
            + SCHEMA_WEIGHT * result.schema.compliance_score
            + BUSINESS_WEIGHT * result.business.compliance_score;
        assert!((result.overall_score - expected).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&result.overall_score));
    }

    #[test]
    fn test_security_failure_forces_invalid() {
        let validator = LayeredValidator::new(Arc::new(RegexSecurityValidator::new()));
        let result = validator.validate("DROP TABLE Players", "show players", Some(&schema_context()));
        assert!(!result.security.is_valid);
        assert!(!result.is_valid);
        assert!(!result.can_self_correct);
        assert!(result.overall_score <= 1.0 - SECURITY_WEIGHT + 1e-9);
    }

    #[test]
    fn test_failing_security_stage_fails_open() {
        let validator = LayeredValidator::new(Arc::new(FailingSecurity));
        let result = validator.validate(
            "SELECT Name FROM Players",
            "show players",
            Some(&schema_context()),
        );
        assert!(result.security.is_valid);
        assert!(!result.security.warnings.is_empty());
        assert!(result.overall_score > 0.0);
    }

    #[test]
    fn test_correctable_band() {
        let validator = LayeredValidator::new(Arc::new(RegexSecurityValidator::new()));
        // Unknown table tanks the schema dimension; ranking/sum keywords
        // with no matching constructs tank the semantic dimension.
        let result = validator.validate(
            "SELECT Name FROM Playerz",
            "top 10 players by total deposits",
            Some(&schema_context()),
        );
        assert!((result.overall_score - 0.5).abs() < 1e-9);
        assert!(!result.is_valid);
        assert!(result.can_self_correct);
    }
}
