use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub news: NewsConfig,
    pub document: DocumentConfig,
    pub defaults: DefaultsConfig,
}

impl Config {
    /// Reads the YAML config at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()));
            }
        };
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { port: 3000 } }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public origin of the site. Overridden by `SITE_URL` / `VERCEL_URL`.
    pub origin: Option<Url>,
    /// Built single-page app, served as static files.
    pub dist: String,
}

impl Default for SiteConfig {
    fn default() -> Self { Self { origin: None, dist: "dist".to_string() } }
}

impl SiteConfig {
    /// Public origin of the site, from the environment when deployed.
    pub fn resolve_origin(&self) -> Url {
        self.resolve_origin_with(|key| std::env::var(key).ok())
    }

    fn resolve_origin_with(&self, env: impl Fn(&str) -> Option<String>) -> Url {
        let from_env = env("SITE_URL")
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| Url::parse(v.trim()).ok())
            .or_else(|| {
                env("VERCEL_URL")
                    .filter(|v| !v.trim().is_empty())
                    .and_then(|host| Url::parse(&format!("https://{}", host.trim())).ok())
            });
        let mut origin = from_env.or_else(|| self.origin.clone()).unwrap_or_else(|| {
            Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL")
        });
        // Keep only scheme and authority
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Endpoint returning the full list of articles as a JSON array.
    pub api_url: Url,
    /// Prefix joined with each article image path.
    pub image_base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("https://backend.ascww.org/api/news").expect("valid URL"),
            image_base_url: "https://backend.ascww.org/api/news/image/".to_string(),
            user_agent: concat!("news-meta/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStrategy {
    /// Read the entry document from one of the candidate paths.
    Filesystem,
    /// Fetch `{origin}/index.html` over HTTP.
    SelfFetch,
    /// Patch the response of the downstream static file service.
    Downstream,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub strategies: Vec<DocumentStrategy>,
    pub candidates: Vec<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            strategies: vec![DocumentStrategy::Filesystem, DocumentStrategy::SelfFetch],
            candidates: vec![
                "dist/index.html".to_string(),
                "build/index.html".to_string(),
                "public/index.html".to_string(),
                "index.html".to_string(),
            ],
        }
    }
}

impl DocumentConfig {
    pub fn uses_downstream(&self) -> bool {
        self.strategies.contains(&DocumentStrategy::Downstream)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub title: String,
    pub description: String,
    /// Absolute image URL. Defaults to `{origin}/logo.png`.
    pub image: Option<Url>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            title: "شركة مياه الشرب والصرف الصحي بأسيوط والوادي الجديد".to_string(),
            description: "الموقع الرسمي لشركة مياه الشرب والصرف الصحي بأسيوط والوادي الجديد - تابع أحدث الأخبار والخدمات".to_string(),
            image: None,
        }
    }
}
