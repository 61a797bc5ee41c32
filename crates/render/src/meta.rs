use std::sync::Arc;

use news_meta_core::{
    config::{DefaultsConfig, NewsConfig},
    util::UrlExt,
};
use serde::Serialize;
use url::Url;

use crate::article::{ArticleRecord, find_article, parse_articles};

/// Maximum length of a preview description, in characters.
pub const DESCRIPTION_LIMIT: usize = 200;

/// Link preview metadata for a single page. All fields are non-empty.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
}

/// Site-wide metadata used whenever an article can't be resolved.
/// Built once at startup and only ever cloned from.
#[derive(Debug, Clone)]
pub struct DefaultMetadata {
    title: String,
    description: String,
    image: Url,
    origin: Url,
}

impl DefaultMetadata {
    pub fn new(defaults: &DefaultsConfig, origin: Url) -> Self {
        let image = defaults.image.clone().unwrap_or_else(|| origin.with_path("/logo.png"));
        Self {
            title: defaults.title.clone(),
            description: truncate_chars(&defaults.description, DESCRIPTION_LIMIT).to_string(),
            image,
            origin,
        }
    }

    pub fn origin(&self) -> &Url { &self.origin }

    /// Default record, pointing at `page_url` if known or the site root otherwise.
    pub fn record(&self, page_url: Option<&Url>) -> MetadataRecord {
        MetadataRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            image: self.image.to_string(),
            url: page_url.unwrap_or(&self.origin).to_string(),
        }
    }

    /// Canonical URL of an article page.
    pub fn article_url(&self, id: &str) -> Url { self.origin.with_segments(["news", id]) }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub meta: MetadataRecord,
    /// Whether the article was found upstream.
    pub found: bool,
}

pub struct Resolver {
    client: reqwest::Client,
    api_url: Url,
    image_base_url: String,
    defaults: Arc<DefaultMetadata>,
}

impl Resolver {
    pub fn new(
        client: reqwest::Client,
        config: &NewsConfig,
        defaults: Arc<DefaultMetadata>,
    ) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            image_base_url: config.image_base_url.clone(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &DefaultMetadata { &self.defaults }

    /// Fetches the full article list. The API has no lookup by ID.
    /// Any failure is logged and reported as no data.
    pub async fn fetch_articles(&self) -> Option<Vec<ArticleRecord>> {
        let response = match self.client.get(self.api_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch news data from {}: {e}", self.api_url);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!("Failed to fetch news data: {}", response.status());
            return None;
        }
        let data = match response.bytes().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to read news data: {e}");
                return None;
            }
        };
        match parse_articles(&data) {
            Ok(articles) => Some(articles),
            Err(e) => {
                tracing::warn!("Failed to parse news data: {e:#}");
                None
            }
        }
    }

    /// Resolves metadata for an article. Never fails; falls back to the defaults.
    pub async fn resolve(&self, id: &str, page_url: Option<&Url>) -> Resolution {
        let id = id.trim();
        if id.is_empty() {
            return Resolution { meta: self.defaults.record(page_url), found: false };
        }
        let articles = self.fetch_articles().await;
        self.resolve_from(id, articles.as_deref(), page_url)
    }

    /// Resolves metadata against an already fetched article list.
    pub fn resolve_from(
        &self,
        id: &str,
        articles: Option<&[ArticleRecord]>,
        page_url: Option<&Url>,
    ) -> Resolution {
        let Some(articles) = articles else {
            return Resolution { meta: self.defaults.record(page_url), found: false };
        };
        match find_article(articles, id) {
            Some(article) => {
                Resolution { meta: self.article_record(article, id, page_url), found: true }
            }
            None => {
                tracing::info!("News article {id} not found, using default metadata");
                Resolution { meta: self.defaults.record(page_url), found: false }
            }
        }
    }

    /// Builds the record for a matched article, filling absent fields from the defaults.
    pub fn article_record(
        &self,
        article: &ArticleRecord,
        id: &str,
        page_url: Option<&Url>,
    ) -> MetadataRecord {
        let defaults = &self.defaults;
        let title = match article.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => defaults.title.clone(),
        };
        let description = match article.description.as_deref() {
            Some(description) if !description.trim().is_empty() => {
                truncate_chars(description, DESCRIPTION_LIMIT).to_string()
            }
            _ => defaults.description.clone(),
        };
        let image = match article.first_image_path() {
            Some(path) => self.image_url(path),
            None => defaults.image.to_string(),
        };
        let url = match page_url {
            Some(url) => url.to_string(),
            None => defaults.article_url(id).to_string(),
        };
        MetadataRecord { title, description, image, url }
    }

    /// Absolute URL for an upstream image path.
    pub fn image_url(&self, path: &str) -> String {
        let path = path.trim();
        if path.starts_with("https://") || path.starts_with("http://") {
            return path.to_string();
        }
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}{}", self.image_base_url, path)
    }
}

/// Prefix of `s` at most `limit` characters long.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
