use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Article as served by the upstream news API. Only the fields used for link previews are
/// modelled; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleRecord {
    pub id: ArticleId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub news_images: Option<Vec<NewsImage>>,
}

impl ArticleRecord {
    /// Path of the first attached image, if it has one.
    pub fn first_image_path(&self) -> Option<&str> {
        self.news_images
            .as_deref()
            .and_then(<[NewsImage]>::first)
            .and_then(|image| image.path.as_deref())
            .filter(|path| !path.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsImage {
    #[serde(default)]
    pub path: Option<String>,
}

/// Upstream IDs are numbers, request IDs are strings. This is where the two are reconciled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArticleId {
    Number(serde_json::Number),
    Text(String),
}

impl ArticleId {
    /// Whether a requested ID refers to this article.
    ///
    /// Numeric IDs compare numerically, so `"7"`, `"07"` and `"7.0"` all match `7`.
    /// Textual IDs compare as trimmed strings.
    pub fn matches(&self, requested: &str) -> bool {
        let requested = requested.trim();
        if requested.is_empty() {
            return false;
        }
        match self {
            Self::Number(id) => match (id.as_f64(), requested.parse::<f64>()) {
                (Some(id), Ok(requested)) => id == requested,
                _ => id.to_string() == requested,
            },
            Self::Text(id) => id.trim() == requested,
        }
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => fmt::Display::fmt(id, f),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Parses the article list. Entries that are not valid articles are skipped rather than
/// failing the whole list.
pub fn parse_articles(data: &[u8]) -> Result<Vec<ArticleRecord>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_slice(data).context("Article list is not a JSON array")?;
    let total = values.len();
    let articles = values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ArticleRecord>(value).ok())
        .collect::<Vec<_>>();
    if articles.len() != total {
        tracing::debug!("Skipped {} malformed articles", total - articles.len());
    }
    Ok(articles)
}

/// First article matching the requested ID.
pub fn find_article<'a>(articles: &'a [ArticleRecord], id: &str) -> Option<&'a ArticleRecord> {
    articles.iter().find(|article| article.id.matches(id))
}
