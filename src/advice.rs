//! Client for the third-party advisory webhook.
//!
//! The webhook lives on a different network boundary than the backend:
//! it is unauthenticated and may answer with non-JSON content, in which
//! case the body is taken as raw text. Advice is best-effort, so every
//! failure maps to [`WorkflowError::AdviceUnavailable`] for the
//! controller to surface as a failed (not loading) advisory status.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Result, WorkflowError};

#[derive(Debug, Deserialize)]
struct AdviceResponse {
    #[serde(default)]
    answer: Option<String>,
}

pub struct AdvisoryClient {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl AdvisoryClient {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Fetch remediation advice for a crop/disease pair.
    ///
    /// `Ok(None)` means the webhook completed but had no answer; the
    /// controller substitutes a localized placeholder and still counts
    /// the advisory as ready.
    pub async fn fetch_advice(
        &self,
        crop_name: &str,
        disease_name: &str,
    ) -> Result<Option<String>> {
        let url = self.webhook_url.as_deref().ok_or_else(|| {
            WorkflowError::AdviceUnavailable("Advice webhook is not configured".to_string())
        })?;

        let response = self
            .http
            .post(url)
            .json(&json!({
                "crop_name": crop_name,
                "disease_name": disease_name,
            }))
            .send()
            .await
            .map_err(|e| {
                warn!("Advice webhook unreachable: {}", e);
                WorkflowError::AdviceUnavailable(format!("Webhook unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::AdviceUnavailable(format!(
                "Webhook returned HTTP {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|e| {
            WorkflowError::AdviceUnavailable(format!("Failed to read webhook body: {}", e))
        })?;

        if content_type.starts_with("application/json") {
            let parsed: AdviceResponse = serde_json::from_str(&body).map_err(|e| {
                WorkflowError::AdviceUnavailable(format!("Unparseable webhook body: {}", e))
            })?;
            debug!("Advice webhook answered (json, {} bytes)", body.len());
            Ok(parsed.answer.filter(|a| !a.trim().is_empty()))
        } else {
            // Content-type says not JSON; take the body as the answer.
            debug!("Advice webhook answered ({}, {} bytes)", content_type, body.len());
            if body.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(body))
            }
        }
    }
}
