//! Minimal example: build a client from the environment and print completions.
//!
//! ```sh
//! LM_BACKEND=tgi TGI_MODEL=meta-llama/Llama-2-7b-hf TGI_URL=http://localhost TGI_PORTS=8080 \
//!     cargo run --example complete -- "The capital of France is"
//! ```

use lm_clients::{
    BackendConfig, BackendType, ClientFactory, GenerationOverrides, LanguageModel, Recorder,
    TgiClient, DEFAULT_TGI_URL,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "The capital of France is".to_string());

    let config = BackendConfig::from_env()?;
    let model: Box<dyn LanguageModel> = match config.backend_type {
        // repeated prompts in a session are served from memory
        BackendType::Tgi => Box::new(
            TgiClient::new(config.model.clone(), config.ports.clone())?
                .with_url(config.url.as_deref().unwrap_or(DEFAULT_TGI_URL))
                .with_default_caches(),
        ),
        BackendType::Anyscale => ClientFactory::create(&config)?,
    };
    let model = Recorder::new(model);

    let overrides = GenerationOverrides::new().with_max_tokens(32);
    for text in model.complete(&prompt, &overrides).await? {
        println!("AI: {text}");
    }

    // second call hits the cache for TGI
    model.complete(&prompt, &overrides).await?;
    println!("{} calls recorded", model.history().len());

    Ok(())
}
