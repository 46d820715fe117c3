//! all-MiniLM-L6-v2 on ONNX Runtime.
//!
//! The exported graph yields token-level hidden states `[batch, seq, 384]`.
//! Sentence vectors are produced the same way the sentence-transformers
//! pipeline does it: attention-masked mean pooling followed by L2
//! normalization.

use anyhow::{Context, Result, anyhow, bail};
use ndarray::{Array2, ArrayView2, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::embeddings::{Embedder, EmbeddingError, ModelFiles};

const INTRA_THREADS: usize = 4;

pub struct SentenceEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    model_name: String,
    dimensions: usize,
}

impl std::fmt::Debug for SentenceEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceEmbedder")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl SentenceEmbedder {
    /// Loads the ONNX graph and tokenizer, then runs one validation pass to
    /// confirm the hidden size matches `dimensions`.
    pub fn load(
        model_name: impl Into<String>,
        files: &ModelFiles,
        dimensions: usize,
        max_length: usize,
    ) -> Result<Self, EmbeddingError> {
        let model_name = model_name.into();
        info!("Loading model {model_name}...");
        let embedder = Self::try_load(model_name, files, dimensions, max_length)
            .map_err(|err| EmbeddingError::ModelLoad(format!("{err:#}")))?;
        info!("Model loaded");
        Ok(embedder)
    }

    fn try_load(
        model_name: String,
        files: &ModelFiles,
        dimensions: usize,
        max_length: usize,
    ) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(INTRA_THREADS)
            .context("Failed to set intra threads")?
            .commit_from_file(&files.model)
            .with_context(|| format!("Failed to load ONNX model from {}", files.model.display()))?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|err| anyhow!("Failed to load tokenizer: {err}"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|err| anyhow!("Failed to configure truncation: {err}"))?;
        tokenizer.with_padding(None);

        let mut embedder = Self {
            session,
            tokenizer,
            model_name,
            dimensions,
        };

        let probe = embedder
            .encode(&["validation test".to_string()])
            .context("Validation inference failed")?;
        if probe.first().map(Vec::len) != Some(dimensions) {
            bail!(
                "Model outputs unexpected dimensions: {:?} (expected {dimensions})",
                probe.first().map(Vec::len)
            );
        }

        Ok(embedder)
    }

    fn encode(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|err| anyhow!("Tokenization failed: {err}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch = texts.len();

        let mut input_ids = Vec::with_capacity(batch * max_len);
        let mut attention_mask = Vec::with_capacity(batch * max_len);
        for encoding in &encodings {
            let ids = encoding.get_ids();
            let padding = max_len - ids.len();
            input_ids.extend(ids.iter().map(|&id| i64::from(id)));
            input_ids.extend(std::iter::repeat_n(0i64, padding));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| i64::from(m)));
            attention_mask.extend(std::iter::repeat_n(0i64, padding));
        }
        let token_type_ids = vec![0i64; batch * max_len];
        debug!(batch, max_len, "running embedding inference");

        let input_ids_array = Array2::from_shape_vec((batch, max_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((batch, max_len), attention_mask.clone())
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((batch, max_len), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Output names differ between exports; the hidden states are always first.
        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        if hidden.ndim() != 3 {
            bail!(
                "Model outputs unexpected shape: {:?} (expected [batch, seq_len, hidden])",
                hidden.shape()
            );
        }

        let mut embeddings = Vec::with_capacity(batch);
        for (index, mask) in attention_mask.chunks(max_len.max(1)).take(batch).enumerate() {
            let item = hidden
                .index_axis(Axis(0), index)
                .into_dimensionality::<ndarray::Ix2>()
                .context("Failed to view hidden states")?;
            let mut pooled = mean_pool(item, mask);
            l2_normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

impl Embedder for SentenceEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.encode(texts)
            .map_err(|err| EmbeddingError::Generation(format!("{err:#}")))
    }
}

/// Averages token vectors, weighting each by its attention mask value so
/// padding does not contribute.
pub fn mean_pool(hidden: ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    let hidden_dim = hidden.ncols();
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut mask_sum = 0.0f32;

    for (row, &mask_value) in hidden.outer_iter().zip(mask) {
        let weight = mask_value as f32;
        if weight == 0.0 {
            continue;
        }
        mask_sum += weight;
        for (acc, value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value * weight;
        }
    }

    let denominator = mask_sum.max(1e-9);
    for value in &mut pooled {
        *value /= denominator;
    }
    pooled
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{l2_normalize, mean_pool};
    use ndarray::array;

    #[test]
    fn mean_pool_ignores_padding() {
        let hidden = array![[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]];
        let pooled = mean_pool(hidden.view(), &[1, 1, 0]);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn mean_pool_with_empty_mask_is_zero() {
        let hidden = array![[1.0f32, 2.0]];
        assert_eq!(mean_pool(hidden.view(), &[0]), vec![0.0, 0.0]);
    }

    #[test]
    fn l2_normalize_produces_unit_vector() {
        let mut vector = vec![3.0f32, 4.0];
        l2_normalize(&mut vector);
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector() {
        let mut vector = vec![0.0f32; 4];
        l2_normalize(&mut vector);
        assert_eq!(vector, vec![0.0; 4]);
    }
}
