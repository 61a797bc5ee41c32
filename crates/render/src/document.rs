use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use futures_util::future::BoxFuture;
use news_meta_core::{
    config::{DocumentConfig, DocumentStrategy},
    util::{UrlExt, join_normalized},
};
use url::Url;

/// Pending response body of the downstream static file service.
pub type Downstream<'a> = BoxFuture<'a, Result<String>>;

/// Obtains the unmodified entry document of the single-page app.
pub struct DocumentProvider {
    client: reqwest::Client,
    strategies: Vec<DocumentStrategy>,
    candidates: Vec<PathBuf>,
    index_url: Url,
}

impl DocumentProvider {
    pub fn new(
        client: reqwest::Client,
        config: &DocumentConfig,
        dist: impl AsRef<Path>,
        origin: &Url,
    ) -> Self {
        let mut candidates = vec![join_normalized(dist, "index.html")];
        for candidate in &config.candidates {
            let candidate = PathBuf::from(candidate);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        Self {
            client,
            strategies: config.strategies.clone(),
            candidates,
            index_url: origin.with_path("/index.html"),
        }
    }

    pub fn strategies(&self) -> &[DocumentStrategy] { &self.strategies }

    /// Tries each configured strategy in order and returns the first document obtained.
    pub async fn acquire(&self, mut downstream: Option<Downstream<'_>>) -> Result<String> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let result = match strategy {
                DocumentStrategy::Filesystem => self.read_filesystem().await,
                DocumentStrategy::SelfFetch => self.self_fetch().await,
                DocumentStrategy::Downstream => match downstream.take() {
                    Some(future) => future.await.context("Downstream document"),
                    None => Err(anyhow!("No downstream handler")),
                },
            };
            match result {
                Ok(document) => return Ok(document),
                Err(e) => {
                    tracing::debug!("Base document strategy {:?} failed: {e:#}", strategy);
                    attempts.push(format!("{strategy:?}: {e:#}"));
                }
            }
        }
        bail!("No base document available ({})", attempts.join("; "))
    }

    async fn read_filesystem(&self) -> Result<String> {
        for path in &self.candidates {
            match tokio::fs::read_to_string(path).await {
                Ok(document) => {
                    tracing::trace!("Read base document from {}", path.display());
                    return Ok(document);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!("Failed to read {}: {e}", path.display());
                }
            }
        }
        bail!("No entry document in {} candidate paths", self.candidates.len())
    }

    async fn self_fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(self.index_url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.index_url))?;
        if !response.status().is_success() {
            bail!("Failed to fetch {}: {}", self.index_url, response.status());
        }
        response.text().await.with_context(|| format!("Failed to read {}", self.index_url))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::SocketAddr,
        path::{Path, PathBuf},
    };

    use axum::{Router, http::StatusCode, routing::get};
    use futures_util::FutureExt;
    use news_meta_core::config::{DocumentConfig, DocumentStrategy};
    use tokio::net::TcpListener;
    use url::Url;

    use super::DocumentProvider;

    const INDEX: &str = "<html><head><title>App</title></head><body></body></html>";

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("news-meta-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn provider(strategies: &[DocumentStrategy], dist: &Path, origin: &str) -> DocumentProvider {
        let config = DocumentConfig { strategies: strategies.to_vec(), candidates: vec![] };
        DocumentProvider::new(reqwest::Client::new(), &config, dist, &Url::parse(origin).unwrap())
    }

    #[tokio::test]
    async fn test_filesystem_first() {
        let dist = temp_dir("fs-first");
        std::fs::write(dist.join("index.html"), INDEX).unwrap();
        let provider = provider(
            &[DocumentStrategy::Filesystem, DocumentStrategy::SelfFetch],
            &dist,
            "http://127.0.0.1:9",
        );
        assert_eq!(provider.acquire(None).await.unwrap(), INDEX);
    }

    #[tokio::test]
    async fn test_self_fetch_when_no_file() {
        let addr = serve(Router::new().route("/index.html", get(|| async { INDEX }))).await;
        let dist = temp_dir("self-fetch");
        let provider = provider(
            &[DocumentStrategy::Filesystem, DocumentStrategy::SelfFetch],
            &dist,
            &format!("http://{addr}"),
        );
        assert_eq!(provider.acquire(None).await.unwrap(), INDEX);
    }

    #[tokio::test]
    async fn test_downstream() {
        let dist = temp_dir("downstream");
        let provider = provider(&[DocumentStrategy::Downstream], &dist, "http://127.0.0.1:9");
        let downstream = async { Ok::<_, anyhow::Error>(INDEX.to_string()) }.boxed();
        assert_eq!(provider.acquire(Some(downstream)).await.unwrap(), INDEX);
        assert!(provider.acquire(None).await.is_err());
    }

    #[tokio::test]
    async fn test_all_strategies_exhausted() {
        let addr = serve(
            Router::new().route("/index.html", get(|| async { StatusCode::INTERNAL_SERVER_ERROR })),
        )
        .await;
        let dist = temp_dir("exhausted");
        let provider = provider(
            &[DocumentStrategy::Filesystem, DocumentStrategy::SelfFetch],
            &dist,
            &format!("http://{addr}"),
        );
        let err = provider.acquire(None).await.unwrap_err().to_string();
        assert!(err.contains("Filesystem"), "{err}");
        assert!(err.contains("SelfFetch"), "{err}");
    }
}
