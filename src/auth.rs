use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api_client::ApiClient;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

/// Login against the backend and keep the bearer token cached for all
/// subsequent calls.
pub struct AuthClient {
    api: Arc<ApiClient>,
}

impl AuthClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session: AuthSession = self
            .api
            .post_json(
                "/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await?;

        self.api.set_token(&session.token).await;
        info!("Logged in as {}", session.user.username);
        Ok(session)
    }

    pub async fn logout(&self) {
        self.api.clear_token().await;
    }
}
