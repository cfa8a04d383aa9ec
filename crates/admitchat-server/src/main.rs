#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use admitchat_ai::OpenAIClient;
use admitchat_server::{AppState, CompletionRelay, ServerConfig, build_router, prompt};

const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,admitchat_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting AdmitChat relay");

    let config = ServerConfig::load()?;
    let system_prompt = prompt::load_system_prompt(config.system_prompt_path.as_deref())?;

    let api_key = std::env::var(API_KEY_ENV).unwrap_or_else(|_| {
        tracing::warn!("{} is not set; provider requests will be rejected", API_KEY_ENV);
        String::new()
    });
    let llm = OpenAIClient::new(api_key)
        .with_model(config.model.clone())
        .with_base_url(config.provider_base_url.clone());

    tracing::info!(model = %config.model, base_url = %config.provider_base_url, "Provider configured");

    let state = AppState::new(CompletionRelay::new(Arc::new(llm), system_prompt));
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to bind to {}: {}", addr, err))?;

    tracing::info!("AdmitChat relay running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
