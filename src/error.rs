use async_openai::error::OpenAIError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and scoring response pairs
#[derive(Debug, Error)]
pub enum EvalError {
    /// One or more expected input files do not exist
    #[error("response files not found: {}", display_paths(.expected))]
    MissingFile { expected: Vec<PathBuf> },

    #[error("malformed row in {} (line {line}): {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Errors from the embedding provider
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("environment variable {var} not found")]
    MissingApiKey { var: String },

    #[error("embedding request failed: {0}")]
    Request(#[from] OpenAIError),

    #[error("embedding response contained no vectors")]
    EmptyResponse,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
