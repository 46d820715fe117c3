use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use crate::commands::LogArgs;
use crate::config;
use crate::embeddings::{
    self, EMBEDDING_DIMENSIONS, EmbeddingError, EmbeddingResponse, ErrorResponse, MAX_SEQUENCE_LENGTH,
    ModelFiles, SentenceEmbedder,
};

#[derive(Debug, Args, Clone)]
pub struct EmbedArgs {
    /// Directory holding model.onnx (or onnx/model.onnx) and tokenizer.json [env: CHATBOT_MODEL_DIR]
    #[arg(long)]
    pub model_dir: Option<PathBuf>,
    /// Profile name from the config file
    #[arg(long)]
    pub profile: Option<String>,
    #[command(flatten)]
    pub log: LogArgs,
}

/// Reads `{"texts": [...]}` from stdin and writes the embedding payload to
/// stdout.
///
/// Every failure is reported as `{"error": ...}` on stdout before the error
/// is returned, so callers only need to set the exit status.
pub fn run(args: EmbedArgs) -> Result<(), String> {
    args.log.init("info");

    match execute(&args) {
        Ok(response) => {
            let body = serde_json::to_string(&response)
                .map_err(|err| report(&EmbeddingError::Generation(err.to_string())))?;
            println!("{body}");
            Ok(())
        }
        Err(err) => Err(report(&err)),
    }
}

fn execute(args: &EmbedArgs) -> Result<EmbeddingResponse, EmbeddingError> {
    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;

    // Validate before touching the model so bad input fails fast.
    let texts = embeddings::parse_request(&raw)?;
    debug!(count = texts.len(), "embedding request parsed");

    let settings = config::resolve_embedding(args.model_dir.clone(), args.profile.as_deref())
        .map_err(EmbeddingError::Config)?;
    let files = match &settings.model_dir {
        Some(dir) => ModelFiles::from_dir(dir)?,
        None => ModelFiles::fetch(&settings.model_id)?,
    };

    let mut embedder = SentenceEmbedder::load(
        settings.model_id,
        &files,
        EMBEDDING_DIMENSIONS,
        MAX_SEQUENCE_LENGTH,
    )?;
    embeddings::generate(&mut embedder, &texts)
}

fn report(err: &EmbeddingError) -> String {
    let payload = ErrorResponse::from(err);
    match serde_json::to_string(&payload) {
        Ok(body) => println!("{body}"),
        Err(_) => println!(r#"{{"error": "Unexpected error"}}"#),
    }
    err.to_string()
}
