pub mod advice;
pub mod api_client;
pub mod auth;
pub mod config;
pub mod crop_tool;
pub mod error;
pub mod forum;
pub mod forward;
pub mod i18n;
pub mod predict;
pub mod requests;
pub mod workflow;

// Re-export commonly used types for easier testing
pub use crate::api_client::ApiClient;
pub use crate::auth::{AuthClient, AuthSession, UserProfile};
pub use crate::config::Config;
pub use crate::crop_tool::{CropRegion, CroppedArtifact, LeafImage, CROP_TARGET_SIZE};
pub use crate::error::{Result, WorkflowError};
pub use crate::forward::ForwardOutcome;
pub use crate::predict::{format_confidence, MlPrediction, PredictionResult, TopKEntry};
pub use crate::requests::{ChatThread, Page, RequestMessage, RequestsClient, UserRequest};
pub use crate::workflow::{DetectionState, DetectionWorkflow, StatusLine, StatusVariant};
