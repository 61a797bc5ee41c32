use anyhow::{Context, bail};
use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderName, Method, header},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;
use news_meta_core::{AppError, FullUri};
use news_meta_render::{inject::inject, meta::Resolution};
use serde::Deserialize;

use crate::{AppState, handlers::compose};

/// Upper bound on the entry document read from the downstream service.
const MAX_DOCUMENT_SIZE: usize = 8 * 1024 * 1024;

const DOWNSTREAM_STRIPPED_HEADERS: [HeaderName; 4] =
    [header::IF_MODIFIED_SINCE, header::IF_NONE_MATCH, header::IF_RANGE, header::RANGE];

#[derive(Deserialize)]
pub struct NewsParams {
    id: String,
}

#[derive(Deserialize)]
pub struct SsrQuery {
    id: Option<String>,
}

pub async fn get_news(
    Path(params): Path<NewsParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    render_article(&state, &params.id).await
}

pub async fn get_news_by_query(
    Query(query): Query<SsrQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    render_article(&state, query.id.as_deref().unwrap_or_default()).await
}

async fn render_article(state: &AppState, id: &str) -> Result<Response, AppError> {
    let id = id.trim();
    let (resolution, document) =
        tokio::join!(state.resolver.resolve(id, None), state.documents.acquire(None));
    let requested_path =
        (!id.is_empty()).then(|| state.defaults.article_url(id).path().to_string());
    finish(state, resolution, document, requested_path.as_deref())
}

/// Patches the SPA response for `/news/{id}` on its way out, using the request's own URL as
/// the canonical URL.
pub async fn edge_middleware(
    State(state): State<AppState>,
    full_uri: FullUri,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(id) = article_id_from_path(request.uri().path()).map(str::to_string) else {
        return Ok(next.run(request).await);
    };
    if *request.method() != Method::GET {
        return Ok(next.run(request).await);
    }
    let page_url = full_uri.to_url();
    let requested_path = request.uri().path().to_string();
    // The full entry document is needed, not a 304 or a byte range of it
    for name in DOWNSTREAM_STRIPPED_HEADERS {
        request.headers_mut().remove(name);
    }
    let downstream = async move { read_document(next.run(request).await).await }.boxed();
    let (resolution, document) = tokio::join!(
        state.resolver.resolve(&id, page_url.as_ref()),
        state.documents.acquire(Some(downstream))
    );
    finish(&state, resolution, document, Some(&requested_path))
}

fn finish(
    state: &AppState,
    resolution: Resolution,
    document: anyhow::Result<String>,
    requested_path: Option<&str>,
) -> Result<Response, AppError> {
    match document.and_then(|document| inject(&document, &resolution.meta)) {
        Ok(html) => Ok(compose::document(html)),
        Err(e) => {
            tracing::error!("Failed to render preview page for {:?}: {e:#}", requested_path);
            compose::fallback(&resolution.meta, state.defaults.origin(), requested_path)
        }
    }
}

fn article_id_from_path(path: &str) -> Option<&str> {
    let id = path.strip_prefix("/news/")?.trim_end_matches('/');
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

async fn read_document(response: Response) -> anyhow::Result<String> {
    if !response.status().is_success() {
        bail!("Downstream responded with {}", response.status());
    }
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if !is_html {
        bail!("Downstream response is not HTML");
    }
    let body = axum::body::to_bytes(response.into_body(), MAX_DOCUMENT_SIZE)
        .await
        .context("Failed to read downstream response")?;
    String::from_utf8(body.to_vec()).context("Downstream document is not UTF-8")
}
