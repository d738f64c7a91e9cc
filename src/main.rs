use anyhow::{anyhow, Result};
use std::env;
use std::path::Path;
use std::sync::Arc;

use agriverse_client::auth::AuthClient;
use agriverse_client::config::Config;
use agriverse_client::predict::format_confidence;
use agriverse_client::requests::{ChatThread, RequestsClient};
use agriverse_client::workflow::DetectionWorkflow;
use agriverse_client::ApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    let api = Arc::new(ApiClient::new(&config.api).await);

    if let (Ok(email), Ok(password)) = (env::var("AGRIVERSE_EMAIL"), env::var("AGRIVERSE_PASSWORD"))
    {
        let auth = AuthClient::new(api.clone());
        auth.login(&email, &password)
            .await
            .map_err(|e| anyhow!("Login failed: {}", e))?;
    } else if api.token().await.is_none() {
        tracing::warn!("No credentials and no cached token; calls may be rejected");
    }

    let image_path = env::var("AGRIVERSE_IMAGE")
        .map_err(|_| anyhow!("AGRIVERSE_IMAGE must point to a leaf image"))?;
    let species = env::var("AGRIVERSE_CROP").unwrap_or_else(|_| "rice".to_string());

    let mut workflow = DetectionWorkflow::new(api.clone(), &config, species);

    workflow.select_image(Path::new(&image_path)).await?;
    let region = workflow.default_region()?;
    workflow.crop(&region)?;
    workflow.predict().await?;

    let prediction = workflow
        .prediction()
        .cloned()
        .ok_or_else(|| anyhow!("No prediction after a successful predict"))?;
    println!("Prediction: {}", prediction.label);
    println!("Confidence: {}", format_confidence(prediction.confidence));
    for alt in &prediction.topk {
        println!("  {:<30} {}", alt.label, format_confidence(Some(alt.score)));
    }

    match workflow.fetch_advice().await {
        Ok(()) => {
            if let Some(advice) = workflow.advice_text() {
                println!("\nAdvice:\n{}", advice);
            }
        }
        Err(e) => tracing::warn!("{} ({})", workflow.status().message, e),
    }

    let forward_enabled = env::var("AGRIVERSE_FORWARD")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    if forward_enabled {
        if !workflow.can_forward() {
            tracing::warn!("Forwarding skipped: advice is not ready");
            return Ok(());
        }

        let state = env::var("AGRIVERSE_STATE").ok();
        let district = env::var("AGRIVERSE_DISTRICT").ok();
        let outcome = workflow
            .forward(state.as_deref(), district.as_deref())
            .await?;
        println!("\nForwarded to a govt officer: {}", outcome.chat_path());

        // Navigation target: tail the new request's chat thread.
        let mut chat = ChatThread::new(
            RequestsClient::new(api.clone()),
            outcome.request_id,
            &config.chat,
        );
        println!("--- chat for request {} (Ctrl-C to exit) ---", outcome.request_id);
        tokio::select! {
            result = chat.run(|m| println!("[{}] {}", m.sender_username, m.message)) => {
                result.map_err(|e| anyhow!("Chat polling failed: {}", e))?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Leaving chat");
            }
        }
    }

    Ok(())
}
