//! Sentence embeddings for the `embedding-server` tool.
//!
//! The request/response handling here is model-agnostic and works against
//! any [`Embedder`]; [`onnx_model::SentenceEmbedder`] is the production
//! implementation backed by all-MiniLM-L6-v2.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Resolution of model and tokenizer files on disk or from the Hub.
pub mod model_files;
/// ONNX Runtime sentence-transformer wrapper.
pub mod onnx_model;

pub use model_files::ModelFiles;
pub use onnx_model::SentenceEmbedder;

pub const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const EMBEDDING_DIMENSIONS: usize = 384;
pub const MAX_SEQUENCE_LENGTH: usize = 256;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid input: expected a JSON object")]
    NotAnObject,

    #[error("No texts provided")]
    NoTexts,

    #[error("Invalid texts: expected an array of strings")]
    InvalidTexts,

    #[error("{0}")]
    Config(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Failed to generate embeddings: {0}")]
    Generation(String),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// A batch sentence encoder with a fixed output dimensionality.
pub trait Embedder {
    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Encodes all `texts` in one call, returning one vector per text in
    /// input order.
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Successful stdout payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub dimensions: usize,
}

/// Failure stdout payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&EmbeddingError> for ErrorResponse {
    fn from(err: &EmbeddingError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Extracts the text list from a `{"texts": [...]}` document.
pub fn parse_request(raw: &str) -> Result<Vec<String>, EmbeddingError> {
    let document: Value = serde_json::from_str(raw)?;
    let object = document.as_object().ok_or(EmbeddingError::NotAnObject)?;

    let texts = match object.get("texts") {
        None | Some(Value::Null) => return Err(EmbeddingError::NoTexts),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(EmbeddingError::InvalidTexts),
    };
    if texts.is_empty() {
        return Err(EmbeddingError::NoTexts);
    }

    texts
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(EmbeddingError::InvalidTexts)
        })
        .collect()
}

/// Runs one batch encode and checks the result shape against the embedder's
/// declared dimensionality.
pub fn generate<E: Embedder + ?Sized>(
    embedder: &mut E,
    texts: &[String],
) -> Result<EmbeddingResponse, EmbeddingError> {
    let embeddings = embedder.embed_batch(texts)?;
    let dimensions = embedder.dimensions();

    if embeddings.len() != texts.len() {
        return Err(EmbeddingError::Generation(format!(
            "model returned {} vectors for {} texts",
            embeddings.len(),
            texts.len()
        )));
    }
    if let Some((index, vector)) = embeddings
        .iter()
        .enumerate()
        .find(|(_, vector)| vector.len() != dimensions)
    {
        return Err(EmbeddingError::Generation(format!(
            "vector {index} has {} dimensions (expected {dimensions})",
            vector.len()
        )));
    }

    Ok(EmbeddingResponse {
        embeddings,
        model: embedder.model_name().to_string(),
        dimensions,
    })
}
