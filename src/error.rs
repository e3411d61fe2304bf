use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Semantic analysis error: {0}")]
    SemanticAnalysis(String),

    #[error("Schema resolution error: {0}")]
    SchemaResolution(String),

    #[error("SQL generation error: {0}")]
    Generation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Self-correction error: {0}")]
    Correction(String),

    #[error("Decomposition error: {0}")]
    Decomposition(String),

    #[error("Query processing was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
