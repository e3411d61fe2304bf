//! External collaborator contracts
//!
//! The pipeline consumes four narrow interfaces; their implementations
//! (semantic extraction service, schema metadata store, LLM provider,
//! SQL-safety service) live outside this crate. Built-in keyword-based
//! implementations for the first two are in [`crate::heuristics`], a
//! reqwest-backed `CompletionClient` in [`crate::llm`], and a regex
//! security validator in [`crate::validation::security`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::SemanticAnalysis;
use crate::error::Result;
use crate::schema::SchemaContext;

/// Tuning knobs forwarded to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 1000,
        }
    }
}

/// Extracts entities, intent and confidence from free text.
///
/// Implementations must not error on empty input; they return a
/// low-confidence `General` analysis instead.
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SemanticAnalysis>;
}

/// Returns the subset of the full schema relevant to a query.
/// The returned table list may be empty.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    async fn relevant_schema(&self, text: &str) -> Result<SchemaContext>;
}

/// Prompt-completion seam to the LLM provider.
///
/// May fail on timeout or provider errors; an empty string is a valid
/// "no answer" and is handled downstream.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}

/// Outcome of the external SQL-safety check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityCheck {
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

impl SecurityCheck {
    pub fn passed() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
        }
    }
}

/// SQL-safety validator. No false negatives are tolerated for
/// destructive statements.
pub trait SecurityValidator: Send + Sync {
    fn validate(&self, sql: &str) -> Result<SecurityCheck>;
}
