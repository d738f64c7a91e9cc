//! Support-request lists and the polling chat thread.
//!
//! The chat thread a forwarded detection lands in has no push channel;
//! new messages are picked up by polling the paginated message
//! endpoint on a fixed interval and de-duplicating by message id.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::api_client::ApiClient;
use crate::config::ChatConfig;
use crate::error::Result;

/// Spring-style page envelope shared by the request and forum lists.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(rename = "totalElements")]
    pub total_elements: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    pub number: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Open,
    InProgress,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub id: i64,
    #[serde(default)]
    pub created_by_username: Option<String>,
    #[serde(default)]
    pub assigned_officer_username: Option<String>,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    pub status: RequestStatus,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub taken_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub archived_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub id: i64,
    pub request_id: i64,
    pub sender_username: String,
    #[serde(default)]
    pub sender_role: Option<String>,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Clone)]
pub struct RequestsClient {
    api: Arc<ApiClient>,
}

impl RequestsClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn my_requests(&self, page: u32, size: u32) -> Result<Page<UserRequest>> {
        self.api
            .get_json(
                "/api/requests/mine",
                &[("page", page.to_string()), ("size", size.to_string())],
            )
            .await
    }

    pub async fn get(&self, id: i64) -> Result<UserRequest> {
        self.api
            .get_json(&format!("/api/requests/{}", id), &[])
            .await
    }

    pub async fn messages(
        &self,
        id: i64,
        page: u32,
        size: u32,
    ) -> Result<Page<RequestMessage>> {
        self.api
            .get_json(
                &format!("/api/requests/{}/messages", id),
                &[("page", page.to_string()), ("size", size.to_string())],
            )
            .await
    }

    pub async fn send_message(&self, id: i64, message: &str) -> Result<RequestMessage> {
        self.api
            .post_json(
                &format!("/api/requests/{}/messages", id),
                &json!({ "message": message }),
            )
            .await
    }
}

/// One request's message thread, fed by polling.
pub struct ChatThread {
    client: RequestsClient,
    request_id: i64,
    poll_interval: Duration,
    page_size: u32,
    seen: HashSet<i64>,
}

impl ChatThread {
    pub fn new(client: RequestsClient, request_id: i64, config: &ChatConfig) -> Self {
        Self {
            client,
            request_id,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            page_size: config.page_size,
            seen: HashSet::new(),
        }
    }

    pub fn request_id(&self) -> i64 {
        self.request_id
    }

    /// Fetch the first page of messages and return only the ones not
    /// seen before, in server order.
    pub async fn poll_once(&mut self) -> Result<Vec<RequestMessage>> {
        let page = self
            .client
            .messages(self.request_id, 0, self.page_size)
            .await?;

        let fresh: Vec<RequestMessage> = page
            .content
            .into_iter()
            .filter(|m| self.seen.insert(m.id))
            .collect();

        if !fresh.is_empty() {
            debug!(
                "Request {}: {} new message(s)",
                self.request_id,
                fresh.len()
            );
        }
        Ok(fresh)
    }

    /// Poll forever, handing each newly seen message to `on_message`.
    /// Runs until a poll fails; callers typically race this against a
    /// shutdown signal.
    pub async fn run<F>(&mut self, mut on_message: F) -> Result<()>
    where
        F: FnMut(&RequestMessage),
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            for message in self.poll_once().await? {
                on_message(&message);
            }
        }
    }
}
