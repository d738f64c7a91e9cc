use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::i18n::Locale;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub advice: AdviceConfig,
    pub chat: ChatConfig,
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Where the bearer token is cached between runs, if anywhere.
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceConfig {
    /// Third-party advisory webhook. Advice is best-effort when unset.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub poll_interval_secs: u64,
    pub page_size: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        let base_url = env::var("AGRIVERSE_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let token_file = env::var("AGRIVERSE_TOKEN_FILE").ok().map(PathBuf::from);

        let webhook_url = env::var("AGRIVERSE_ADVICE_WEBHOOK")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(format!("{}/api/ml/advice", base_url.trim_end_matches('/'))));

        let poll_interval_secs = env::var("AGRIVERSE_CHAT_POLL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let page_size = env::var("AGRIVERSE_CHAT_PAGE_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let locale = Locale::from_tag(
            &env::var("AGRIVERSE_LOCALE").unwrap_or_else(|_| "en".to_string()),
        );

        Ok(Self {
            api: ApiConfig {
                base_url,
                token_file,
            },
            advice: AdviceConfig { webhook_url },
            chat: ChatConfig {
                poll_interval_secs,
                page_size,
            },
            locale,
        })
    }
}
