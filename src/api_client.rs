//! Authenticated HTTP client for the AgriVerse backend.
//!
//! Attaches the cached bearer token to every request and treats a 401
//! as an expired session: the token cache is cleared and the caller
//! gets [`WorkflowError::SessionExpired`], the terminal analogue of
//! being redirected to the login screen.

use reqwest::multipart::Form;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{Result, WorkflowError};

pub struct ApiClient {
    base_url: String,
    token: RwLock<Option<String>>,
    token_file: Option<PathBuf>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client, loading any token cached by a previous session.
    pub async fn new(config: &ApiConfig) -> Self {
        let token = match &config.token_file {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(contents) => {
                    let trimmed = contents.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        debug!("Loaded cached token from {:?}", path);
                        Some(trimmed.to_string())
                    }
                }
                Err(_) => None,
            },
            None => None,
        };

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            token_file: config.token_file.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: &str) {
        *self.token.write().await = Some(token.to_string());
        if let Some(path) = &self.token_file {
            if let Err(e) = tokio::fs::write(path, token).await {
                warn!("Failed to cache token to {:?}: {}", path, e);
            }
        }
    }

    pub async fn clear_token(&self) {
        *self.token.write().await = None;
        if let Some(path) = &self.token_file {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let builder = self.http.get(self.url(path)).query(query);
        let response = self.authorize(builder).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let builder = self.http.post(self.url(path)).json(body);
        let response = self.authorize(builder).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let builder = self.http.post(self.url(path)).multipart(form);
        let response = self.authorize(builder).await.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.clear_token().await;
            return Err(WorkflowError::SessionExpired);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Server {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WorkflowError::Network(format!("Invalid response body: {}", e)))
    }
}
