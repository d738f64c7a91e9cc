//! Client for the remote leaf-disease inference service.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api_client::ApiClient;
use crate::crop_tool::CroppedArtifact;
use crate::error::{Result, WorkflowError};

/// At most this many ranked alternatives are kept, in server order.
pub const TOPK_DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopKEntry {
    pub label: String,
    pub score: f64,
}

/// Raw wire shape of `POST /api/ml/predict`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MlPrediction {
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub topk: Option<Vec<TopKEntry>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A validated prediction: the label is guaranteed non-empty.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub crop_species: String,
    pub label: String,
    pub confidence: Option<f64>,
    pub topk: Vec<TopKEntry>,
}

pub struct PredictionClient {
    api: Arc<ApiClient>,
}

impl PredictionClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn predict(
        &self,
        crop_species: &str,
        artifact: &CroppedArtifact,
    ) -> Result<PredictionResult> {
        let image_part = Part::bytes(artifact.as_bytes().to_vec())
            .file_name("leaf.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        let form = Form::new()
            .text("crop", crop_species.to_string())
            .part("image", image_part);

        let raw: MlPrediction = self.api.post_multipart("/api/ml/predict", form).await?;
        let result = Self::validate(raw, crop_species)?;

        info!(
            "Prediction for {}: {} (confidence: {})",
            result.crop_species,
            result.label,
            format_confidence(result.confidence)
        );
        Ok(result)
    }

    /// Map the wire shape to a validated result. A 2xx body carrying an
    /// `error` field is a model error and its message is kept verbatim.
    fn validate(raw: MlPrediction, crop_species: &str) -> Result<PredictionResult> {
        if let Some(error) = raw.error {
            return Err(WorkflowError::Model(error));
        }

        let label = raw
            .prediction
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| WorkflowError::Model("Prediction missing from response".to_string()))?;

        let mut topk = raw.topk.unwrap_or_default();
        topk.truncate(TOPK_DISPLAY_LIMIT);

        Ok(PredictionResult {
            crop_species: raw.crop.unwrap_or_else(|| crop_species.to_string()),
            label,
            confidence: raw.confidence,
            topk,
        })
    }
}

/// Render a confidence score for display. Absent or non-finite scores
/// show as a placeholder, never as `NaN%` or `0%`.
pub fn format_confidence(confidence: Option<f64>) -> String {
    match confidence {
        Some(c) if c.is_finite() => format!("{:.2}%", c * 100.0),
        _ => "—".to_string(),
    }
}
