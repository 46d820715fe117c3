use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;
use tracing::info;

use crate::embeddings::EmbeddingError;

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const HUB_MODEL_FILE: &str = "onnx/model.onnx";

/// Paths to the ONNX graph and its Hugging Face tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Uses a local export, accepting either `dir/model.onnx` or the Hub
    /// layout `dir/onnx/model.onnx`.
    pub fn from_dir(dir: &Path) -> Result<Self, EmbeddingError> {
        let model = [dir.join(MODEL_FILE), dir.join(HUB_MODEL_FILE)]
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                EmbeddingError::ModelLoad(format!(
                    "ONNX model file not found in '{}'",
                    dir.display()
                ))
            })?;

        let tokenizer = dir.join(TOKENIZER_FILE);
        if !tokenizer.is_file() {
            return Err(EmbeddingError::ModelLoad(format!(
                "Tokenizer file not found: {}",
                tokenizer.display()
            )));
        }

        Ok(Self { model, tokenizer })
    }

    /// Downloads (or reuses from the local Hub cache) the ONNX export of
    /// `model_id`.
    pub fn fetch(model_id: &str) -> Result<Self, EmbeddingError> {
        info!("Fetching {model_id} from the Hugging Face Hub cache");
        let hub_error =
            |err: hf_hub::api::sync::ApiError| EmbeddingError::ModelLoad(format!("{model_id}: {err}"));

        let api = Api::new().map_err(hub_error)?;
        let repo = api.model(model_id.to_string());
        let model = repo.get(HUB_MODEL_FILE).map_err(hub_error)?;
        let tokenizer = repo.get(TOKENIZER_FILE).map_err(hub_error)?;

        Ok(Self { model, tokenizer })
    }
}

#[cfg(test)]
mod tests {
    use super::ModelFiles;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("chatbot-model-{label}-{nanos}"));
        fs::create_dir_all(&dir).expect("scratch dir should be creatable");
        dir
    }

    #[test]
    fn finds_flat_layout() {
        let dir = scratch_dir("flat");
        fs::write(dir.join("model.onnx"), b"").expect("write model");
        fs::write(dir.join("tokenizer.json"), b"{}").expect("write tokenizer");

        let files = ModelFiles::from_dir(&dir).expect("files should resolve");
        assert_eq!(files.model, dir.join("model.onnx"));
        assert_eq!(files.tokenizer, dir.join("tokenizer.json"));
    }

    #[test]
    fn finds_hub_layout() {
        let dir = scratch_dir("hub");
        fs::create_dir_all(dir.join("onnx")).expect("create onnx dir");
        fs::write(dir.join("onnx").join("model.onnx"), b"").expect("write model");
        fs::write(dir.join("tokenizer.json"), b"{}").expect("write tokenizer");

        let files = ModelFiles::from_dir(&dir).expect("files should resolve");
        assert_eq!(files.model, dir.join("onnx").join("model.onnx"));
    }

    #[test]
    fn missing_tokenizer_is_reported() {
        let dir = scratch_dir("no-tokenizer");
        fs::write(dir.join("model.onnx"), b"").expect("write model");

        let err = ModelFiles::from_dir(&dir).expect_err("missing tokenizer should fail");
        assert!(err.to_string().contains("Tokenizer file not found"));
    }

    #[test]
    fn missing_model_is_reported() {
        let dir = scratch_dir("empty");
        let err = ModelFiles::from_dir(&dir).expect_err("missing model should fail");
        assert!(err.to_string().starts_with("Failed to load model: ONNX model file not found"));
    }
}
