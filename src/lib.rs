//! queryforge — natural-language to SQL pipeline with layered validation
//! and bounded self-correction.
//!
//! Control flow: a natural-language query enters the [`processor::QueryProcessor`],
//! which obtains semantic analysis and a schema context, classifies and
//! decomposes the query, generates and scores SQL candidates, validates the
//! selected candidate along four independent dimensions, and runs a single
//! bounded self-correction attempt when the verdict is invalid but
//! correctable.

pub mod analysis;
pub mod classifier;
pub mod contracts;
pub mod correction;
pub mod decomposer;
pub mod error;
pub mod generator;
pub mod heuristics;
pub mod llm;
pub mod processor;
pub mod prompts;
pub mod schema;
pub mod validation;

pub use analysis::{Entity, EntityType, Intent, SemanticAnalysis};
pub use classifier::{Complexity, QueryCategory, QueryClassification, QueryClassifier};
pub use contracts::{
    CompletionClient, CompletionOptions, SchemaResolver, SecurityCheck, SecurityValidator,
    SemanticAnalyzer,
};
pub use correction::{CorrectionEngine, SelfCorrectionAttempt, MAX_CORRECTION_DEPTH};
pub use decomposer::{ComponentType, QueryComponent, QueryDecomposer, QueryDecomposition};
pub use error::{PipelineError, Result};
pub use generator::{CandidateGenerator, OptimizedQuery, SqlCandidate};
pub use processor::{ProcessedQuery, QueryProcessor, FALLBACK_SQL};
pub use schema::{ColumnInfo, SchemaContext, TableInfo};
pub use validation::{LayeredValidator, RegexSecurityValidator, ValidationResult};
