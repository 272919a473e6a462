use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use assist_core::{
    faq, load_config_json, load_entries_jsonl, load_smalltalk_json, EmbeddingProvider,
    HashEmbeddingProvider, MiniLmEmbeddingProvider, Resolver, ResolverConfig, SmallTalkTable,
};

#[derive(Debug, Parser)]
#[command(name = "assist-server")]
#[command(about = "HTTP chat endpoint for the student-platform FAQ assistant")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0:5000")]
    addr: SocketAddr,

    /// Path to the all-MiniLM-L6-v2 .safetensors file; requires
    /// --tokenizer-path. Without both, a deterministic hash embedder is used.
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Path to the matching tokenizer.json.
    #[arg(long)]
    tokenizer_path: Option<PathBuf>,

    /// Precomputed index (JSONL of embedded entries); defaults to embedding
    /// the built-in FAQ at startup.
    #[arg(long)]
    index: Option<PathBuf>,

    /// Small-talk table JSON; defaults to the built-in table.
    #[arg(long)]
    smalltalk: Option<PathBuf>,

    /// Resolver config JSON (similarity threshold, fallback reply).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the similarity threshold from --config or the default.
    #[arg(long)]
    threshold: Option<f32>,
}

type SharedResolver = Arc<Resolver<Box<dyn EmbeddingProvider>>>;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// An absent field resolves as the empty utterance, not a 4xx.
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(resolver): State<SharedResolver>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    match resolver.resolve(&request.message) {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse { reply })).into_response(),
        Err(err) => {
            error!(error = ?err, "chat resolution failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "resolution failed").into_response()
        }
    }
}

fn build_resolver(args: &Args) -> Result<SharedResolver> {
    let embedder: Box<dyn EmbeddingProvider> = match (&args.model_path, &args.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            info!(model = %model.display(), "loading MiniLM embedding model");
            Box::new(MiniLmEmbeddingProvider::load(model, tokenizer)?)
        }
        (None, None) => Box::new(HashEmbeddingProvider::default()),
        _ => bail!("--model-path and --tokenizer-path must both be provided"),
    };

    let smalltalk = match &args.smalltalk {
        Some(path) => load_smalltalk_json(path)?,
        None => SmallTalkTable::builtin(),
    };

    let mut config = match &args.config {
        Some(path) => load_config_json(path)?,
        None => ResolverConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.similarity_threshold = threshold;
    }

    let resolver = match &args.index {
        Some(path) => Resolver::from_entries(load_entries_jsonl(path)?, smalltalk, embedder, config)?,
        None => Resolver::build(faq::builtin(), smalltalk, embedder, config)?,
    };

    Ok(Arc::new(resolver))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let resolver = build_resolver(&args)?;
    info!(
        entries = resolver.entries().len(),
        threshold = resolver.config().similarity_threshold,
        "resolver ready"
    );

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .with_state(resolver);

    info!("Starting chat endpoint on {}", args.addr);
    axum::Server::bind(&args.addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_message_field_defaults_to_empty() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.message, "");

        let req: ChatRequest = serde_json::from_str("{\"message\":\"hi\"}").unwrap();
        assert_eq!(req.message, "hi");
    }

    #[test]
    fn response_serializes_to_the_wire_shape() {
        let body = serde_json::to_string(&ChatResponse {
            reply: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(body, "{\"reply\":\"hello\"}");
    }
}
