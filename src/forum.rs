//! Read side of the discussion forum: paginated topic, post and
//! comment lists with optional post search.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api_client::ApiClient;
use crate::error::Result;
use crate::requests::Page;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub post_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    #[serde(default)]
    pub topic_name: Option<String>,
    pub title: String,
    pub content: String,
    pub author_username: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub comment_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_username: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

pub struct ForumClient {
    api: Arc<ApiClient>,
}

impl ForumClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.api.get_json("/api/forum/topics", &[]).await
    }

    /// List a topic's posts, optionally filtered by a search term.
    /// A blank term is treated as no search.
    pub async fn list_posts(
        &self,
        topic_id: i64,
        page: u32,
        size: u32,
        search: Option<&str>,
    ) -> Result<Page<Post>> {
        let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(q) = search.map(str::trim).filter(|q| !q.is_empty()) {
            query.push(("q", q.to_string()));
        }
        self.api
            .get_json(&format!("/api/forum/topics/{}/posts", topic_id), &query)
            .await
    }

    pub async fn list_comments(
        &self,
        post_id: i64,
        page: u32,
        size: u32,
    ) -> Result<Page<Comment>> {
        self.api
            .get_json(
                &format!("/api/forum/posts/{}/comments", post_id),
                &[("page", page.to_string()), ("size", size.to_string())],
            )
            .await
    }
}
