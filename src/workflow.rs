//! Detection workflow controller.
//!
//! Drives the crop -> predict -> advise -> forward pipeline, gating
//! each step on the completion of the previous one. All step state
//! lives in a single tagged enum so combinations like "advice ready
//! without a prediction" cannot be represented. Every failure is
//! recovered here into a status line; nothing propagates past the
//! controller un-mapped.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::advice::AdvisoryClient;
use crate::api_client::ApiClient;
use crate::config::Config;
use crate::crop_tool::{CropRegion, CroppedArtifact, LeafImage};
use crate::error::{Result, WorkflowError};
use crate::forward::{ForwardOutcome, ForwardingClient};
use crate::i18n::Messages;
use crate::predict::{PredictionClient, PredictionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVariant {
    Default,
    Success,
    Error,
    Loading,
}

/// What the presentation layer shows for the current step.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub message: String,
    pub variant: StatusVariant,
}

impl StatusLine {
    fn empty() -> Self {
        Self {
            message: String::new(),
            variant: StatusVariant::Default,
        }
    }
}

/// Workflow step state. Downstream results travel inside the variants,
/// so clearing a step clears everything after it.
#[derive(Debug, Clone)]
pub enum DetectionState {
    Idle,
    ImageLoaded,
    Cropped,
    Predicting,
    Predicted {
        prediction: PredictionResult,
    },
    AdviceLoading {
        prediction: PredictionResult,
    },
    AdviceReady {
        prediction: PredictionResult,
        advice: String,
    },
    AdviceFailed {
        prediction: PredictionResult,
        reason: String,
    },
    Forwarding {
        prediction: PredictionResult,
        advice: String,
    },
    Forwarded {
        request_id: i64,
    },
}

impl DetectionState {
    pub fn name(&self) -> &'static str {
        match self {
            DetectionState::Idle => "Idle",
            DetectionState::ImageLoaded => "ImageLoaded",
            DetectionState::Cropped => "Cropped",
            DetectionState::Predicting => "Predicting",
            DetectionState::Predicted { .. } => "Predicted",
            DetectionState::AdviceLoading { .. } => "AdviceLoading",
            DetectionState::AdviceReady { .. } => "AdviceReady",
            DetectionState::AdviceFailed { .. } => "AdviceFailed",
            DetectionState::Forwarding { .. } => "Forwarding",
            DetectionState::Forwarded { .. } => "Forwarded",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            DetectionState::Predicting
                | DetectionState::AdviceLoading { .. }
                | DetectionState::Forwarding { .. }
        )
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            DetectionState::Predicted { prediction }
            | DetectionState::AdviceLoading { prediction }
            | DetectionState::AdviceReady { prediction, .. }
            | DetectionState::AdviceFailed { prediction, .. }
            | DetectionState::Forwarding { prediction, .. } => Some(prediction),
            _ => None,
        }
    }

    pub fn advice(&self) -> Option<&str> {
        match self {
            DetectionState::AdviceReady { advice, .. }
            | DetectionState::Forwarding { advice, .. } => Some(advice),
            _ => None,
        }
    }
}

pub struct DetectionWorkflow {
    crop_species: String,
    image: Option<LeafImage>,
    artifact: Option<CroppedArtifact>,
    state: DetectionState,
    status: StatusLine,
    /// Token for the single operation allowed in flight. Taken before
    /// any busy transition; a second trigger while it is live gets
    /// `Busy` without touching state or the network.
    in_flight: Option<Uuid>,
    predict_client: PredictionClient,
    advisory_client: AdvisoryClient,
    forwarding_client: ForwardingClient,
    messages: &'static Messages,
}

impl DetectionWorkflow {
    pub fn new(api: Arc<ApiClient>, config: &Config, crop_species: impl Into<String>) -> Self {
        Self {
            crop_species: crop_species.into(),
            image: None,
            artifact: None,
            state: DetectionState::Idle,
            status: StatusLine::empty(),
            in_flight: None,
            predict_client: PredictionClient::new(api.clone()),
            advisory_client: AdvisoryClient::new(config.advice.webhook_url.clone()),
            forwarding_client: ForwardingClient::new(api),
            messages: Messages::for_locale(config.locale),
        }
    }

    // Accessors for the presentation layer.

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn crop_species(&self) -> &str {
        &self.crop_species
    }

    pub fn set_crop_species(&mut self, species: impl Into<String>) {
        self.crop_species = species.into();
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.state.prediction()
    }

    pub fn advice_text(&self) -> Option<&str> {
        self.state.advice()
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.image.as_ref().map(|img| img.preview_path())
    }

    pub fn default_region(&self) -> Result<CropRegion> {
        self.image
            .as_ref()
            .map(|img| img.default_region())
            .ok_or(WorkflowError::CropUnavailable)
    }

    // Control-enabling predicates; each is a pure function of state.

    pub fn can_crop(&self) -> bool {
        self.image.is_some() && !self.is_busy()
    }

    pub fn can_predict(&self) -> bool {
        self.artifact.is_some() && !self.is_busy()
    }

    pub fn can_advise(&self) -> bool {
        self.state.prediction().is_some() && !self.is_busy()
    }

    pub fn can_forward(&self) -> bool {
        matches!(self.state, DetectionState::AdviceReady { .. }) && !self.is_busy()
    }

    fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.state.is_busy()
    }

    /// Replace the current source image. Allowed from any settled
    /// state; drops the previous preview and every downstream artifact
    /// so no stale result can be shown against the new image.
    pub async fn select_image(&mut self, path: &Path) -> Result<()> {
        if self.is_busy() {
            return Err(WorkflowError::Busy);
        }

        match LeafImage::select(path).await {
            Ok(image) => {
                self.image = Some(image);
                self.artifact = None;
                self.set_state(DetectionState::ImageLoaded);
                self.set_status(self.messages.image_loaded, StatusVariant::Default);
                Ok(())
            }
            Err(e) => {
                self.set_status(e.to_string(), StatusVariant::Error);
                Err(e)
            }
        }
    }

    /// Discard the current image and all downstream state.
    pub fn clear_image(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(WorkflowError::Busy);
        }
        self.image = None;
        self.artifact = None;
        self.set_state(DetectionState::Idle);
        self.status = StatusLine::empty();
        Ok(())
    }

    /// Rasterize `region` into the session's cropped artifact.
    /// Re-cropping invalidates any prediction or advisory from the
    /// previous artifact.
    pub fn crop(&mut self, region: &CropRegion) -> Result<()> {
        if self.is_busy() {
            return Err(WorkflowError::Busy);
        }
        self.set_status(self.messages.cropping, StatusVariant::Loading);

        let result = self
            .image
            .as_ref()
            .ok_or(WorkflowError::CropUnavailable)
            .and_then(|image| image.crop_to_artifact(region));

        match result {
            Ok(artifact) => {
                self.artifact = Some(artifact);
                self.set_state(DetectionState::Cropped);
                self.set_status(self.messages.crop_done, StatusVariant::Success);
                Ok(())
            }
            Err(e) => {
                // Stay put; the previous artifact (if any) remains valid.
                self.set_status(self.messages.crop_failed, StatusVariant::Error);
                Err(e)
            }
        }
    }

    /// Send the cropped artifact to the inference service. Requires a
    /// cropped artifact; clears any previous prediction and advisory
    /// before the call, and returns to `Cropped` on failure.
    pub async fn predict(&mut self) -> Result<()> {
        let token = self.begin()?;
        let Some(artifact) = self.artifact.clone() else {
            self.finish(token);
            return Err(WorkflowError::CropUnavailable);
        };

        self.set_state(DetectionState::Predicting);
        self.set_status(
            self.messages.predicting(&self.crop_species),
            StatusVariant::Loading,
        );

        let result = self
            .predict_client
            .predict(&self.crop_species, &artifact)
            .await;
        self.finish(token);

        match result {
            Ok(prediction) => {
                self.set_state(DetectionState::Predicted { prediction });
                self.set_status(self.messages.prediction_done, StatusVariant::Success);
                Ok(())
            }
            Err(e) => {
                warn!("Prediction failed: {}", e);
                self.set_state(DetectionState::Cropped);
                self.set_status(self.failure_message(&e, self.messages.prediction_failed), StatusVariant::Error);
                Err(e)
            }
        }
    }

    /// Fetch best-effort advice for the predicted disease. Requires a
    /// prediction; failure marks the advisory failed without touching
    /// the prediction, and retrying is always allowed.
    pub async fn fetch_advice(&mut self) -> Result<()> {
        let token = self.begin()?;
        let Some(prediction) = self.state.prediction().cloned() else {
            self.finish(token);
            return Err(WorkflowError::Precondition("advice requires a prediction"));
        };

        self.set_state(DetectionState::AdviceLoading {
            prediction: prediction.clone(),
        });
        self.set_status(self.messages.advice_loading, StatusVariant::Loading);

        let result = self
            .advisory_client
            .fetch_advice(&self.crop_species, &prediction.label)
            .await;
        self.finish(token);

        match result {
            Ok(answer) => {
                let advice =
                    answer.unwrap_or_else(|| self.messages.advice_no_answer.to_string());
                self.set_state(DetectionState::AdviceReady { prediction, advice });
                self.set_status(self.messages.advice_done, StatusVariant::Success);
                Ok(())
            }
            Err(e) => {
                warn!("Advisory fetch failed: {}", e);
                self.set_state(DetectionState::AdviceFailed {
                    prediction,
                    reason: e.to_string(),
                });
                self.set_status(self.messages.advice_failed, StatusVariant::Error);
                Err(e)
            }
        }
    }

    /// Package image, prediction and advice into a new support request.
    /// Requires a ready advisory; failure returns to `AdviceReady` so
    /// the forward can be retried without repeating earlier steps.
    pub async fn forward(
        &mut self,
        state: Option<&str>,
        district: Option<&str>,
    ) -> Result<ForwardOutcome> {
        let token = self.begin()?;
        let DetectionState::AdviceReady { prediction, advice } = self.state.clone() else {
            self.finish(token);
            return Err(WorkflowError::Precondition("forward requires ready advice"));
        };
        let Some(artifact) = self.artifact.clone() else {
            self.finish(token);
            return Err(WorkflowError::CropUnavailable);
        };

        self.set_state(DetectionState::Forwarding {
            prediction: prediction.clone(),
            advice: advice.clone(),
        });
        self.set_status(self.messages.forwarding, StatusVariant::Loading);

        let result = self
            .forwarding_client
            .forward(
                &self.crop_species,
                &prediction.label,
                &advice,
                &artifact,
                state,
                district,
            )
            .await;
        self.finish(token);

        match result {
            Ok(outcome) => {
                self.set_state(DetectionState::Forwarded {
                    request_id: outcome.request_id,
                });
                self.set_status(self.messages.forward_done, StatusVariant::Success);
                Ok(outcome)
            }
            Err(e) => {
                warn!("Forward failed: {}", e);
                self.set_state(DetectionState::AdviceReady { prediction, advice });
                self.set_status(self.failure_message(&e, self.messages.forward_failed), StatusVariant::Error);
                Err(e)
            }
        }
    }

    fn begin(&mut self) -> Result<Uuid> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        let token = Uuid::new_v4();
        self.in_flight = Some(token);
        Ok(token)
    }

    fn finish(&mut self, token: Uuid) {
        if self.in_flight == Some(token) {
            self.in_flight = None;
        }
    }

    fn set_state(&mut self, next: DetectionState) {
        info!("Workflow state: {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    fn set_status(&mut self, message: impl Into<String>, variant: StatusVariant) {
        self.status = StatusLine {
            message: message.into(),
            variant,
        };
    }

    /// Model errors carry a server-provided message worth showing
    /// verbatim; transport errors fall back to the localized text.
    fn failure_message(&self, error: &WorkflowError, fallback: &str) -> String {
        match error {
            WorkflowError::Model(msg) => msg.clone(),
            _ => format!("{}: {}", fallback, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdviceConfig, ApiConfig, ChatConfig};
    use crate::i18n::Locale;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                // Unreachable on purpose; any network attempt fails fast
                // with a transport error instead of a precondition one.
                base_url: "http://127.0.0.1:1".to_string(),
                token_file: None,
            },
            advice: AdviceConfig { webhook_url: None },
            chat: ChatConfig {
                poll_interval_secs: 1,
                page_size: 50,
            },
            locale: Locale::En,
        }
    }

    async fn workflow() -> DetectionWorkflow {
        let config = test_config();
        let api = Arc::new(ApiClient::new(&config.api).await);
        DetectionWorkflow::new(api, &config, "rice")
    }

    fn sample_image(dir: &Path, name: &str) -> PathBuf {
        let mut img = RgbImage::new(96, 96);
        for (_, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([30, (y % 256) as u8, 60]);
        }
        let path = dir.join(name);
        img.save(&path).expect("write sample image");
        path
    }

    #[tokio::test]
    async fn test_predict_without_artifact_is_crop_unavailable() {
        let mut wf = workflow().await;
        assert!(!wf.can_predict());

        let err = wf.predict().await.unwrap_err();
        assert!(matches!(err, WorkflowError::CropUnavailable));
        // The guard was released; the workflow is not stuck busy.
        assert!(!wf.is_busy());
        assert_eq!(wf.state().name(), "Idle");
    }

    #[tokio::test]
    async fn test_forward_requires_ready_advice() {
        let mut wf = workflow().await;
        let err = wf.forward(None, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_advice_requires_prediction() {
        let mut wf = workflow().await;
        let err = wf.fetch_advice().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Precondition(_)));
        assert!(!wf.can_advise());
    }

    #[tokio::test]
    async fn test_select_and_crop_unlock_predict() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "leaf.png");

        let mut wf = workflow().await;
        assert!(!wf.can_crop());

        wf.select_image(&path).await.unwrap();
        assert_eq!(wf.state().name(), "ImageLoaded");
        assert!(wf.can_crop());
        assert!(!wf.can_predict());

        let region = wf.default_region().unwrap();
        wf.crop(&region).unwrap();
        assert_eq!(wf.state().name(), "Cropped");
        assert!(wf.can_predict());
        assert_eq!(wf.status().variant, StatusVariant::Success);
    }

    #[tokio::test]
    async fn test_new_image_revokes_previous_preview() {
        let dir = tempfile::tempdir().unwrap();
        let first = sample_image(dir.path(), "a.png");
        let second = sample_image(dir.path(), "b.png");

        let mut wf = workflow().await;
        wf.select_image(&first).await.unwrap();
        let old_preview = wf.preview_path().unwrap().to_path_buf();
        assert!(old_preview.exists());

        let region = wf.default_region().unwrap();
        wf.crop(&region).unwrap();

        wf.select_image(&second).await.unwrap();
        assert!(!old_preview.exists());
        assert_eq!(wf.state().name(), "ImageLoaded");
        assert!(!wf.can_predict());
        assert!(wf.prediction().is_none());
        assert!(wf.advice_text().is_none());
    }

    #[tokio::test]
    async fn test_clear_image_resets_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "leaf.png");

        let mut wf = workflow().await;
        wf.select_image(&path).await.unwrap();
        wf.clear_image().unwrap();
        assert_eq!(wf.state().name(), "Idle");
        assert!(wf.status().message.is_empty());
    }

    #[tokio::test]
    async fn test_crop_without_image_errors_and_stays_put() {
        let mut wf = workflow().await;
        let region = CropRegion {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let err = wf.crop(&region).unwrap_err();
        assert!(matches!(err, WorkflowError::CropUnavailable));
        assert_eq!(wf.state().name(), "Idle");
        assert_eq!(wf.status().variant, StatusVariant::Error);
    }

    #[tokio::test]
    async fn test_in_flight_guard_refuses_second_trigger() {
        let mut wf = workflow().await;
        let token = wf.begin().unwrap();
        assert!(matches!(wf.begin(), Err(WorkflowError::Busy)));
        assert!(matches!(
            wf.clear_image(),
            Err(WorkflowError::Busy)
        ));
        wf.finish(token);
        assert!(wf.begin().is_ok());
    }
}
