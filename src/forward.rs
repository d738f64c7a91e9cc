//! Client that packages a finished detection into a new support
//! request addressed to a government officer.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::api_client::ApiClient;
use crate::crop_tool::CroppedArtifact;
use crate::error::{Result, WorkflowError};

/// Identifier of the created support request; the rest of the created
/// payload is only needed by the request views, not by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub request_id: i64,
}

impl ForwardOutcome {
    /// Navigation target after a successful forward.
    pub fn chat_path(&self) -> String {
        format!("/requests/{}", self.request_id)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRequest {
    id: i64,
}

pub struct ForwardingClient {
    api: Arc<ApiClient>,
}

impl ForwardingClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn forward(
        &self,
        crop_label: &str,
        disease_label: &str,
        advice: &str,
        artifact: &CroppedArtifact,
        state: Option<&str>,
        district: Option<&str>,
    ) -> Result<ForwardOutcome> {
        let image_part = Part::bytes(artifact.as_bytes().to_vec())
            .file_name("leaf.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        let mut form = Form::new()
            .text("crop", crop_label.to_string())
            .text("diseaseName", disease_label.to_string())
            .text("advice", advice.to_string())
            .part("image", image_part);

        if let Some(state) = state {
            form = form.text("state", state.to_string());
        }
        if let Some(district) = district {
            form = form.text("district", district.to_string());
        }

        let created: CreatedRequest = self.api.post_multipart("/api/ml/forward", form).await?;
        info!("Forwarded detection as request {}", created.id);

        Ok(ForwardOutcome {
            request_id: created.id,
        })
    }
}
