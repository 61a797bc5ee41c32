pub mod article;
pub mod document;
pub mod fallback;
pub mod inject;
pub mod meta;

use std::time::Duration;

use anyhow::{Context, Result};
use news_meta_core::config::NewsConfig;

/// HTTP client shared by the article fetch and the base document self-fetch. Sends an
/// identifying `User-Agent` so platform bot filters let it through.
pub fn build_client(config: &NewsConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}
