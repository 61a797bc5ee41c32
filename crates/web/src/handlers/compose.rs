use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use news_meta_core::AppError;
use news_meta_render::meta::{DefaultMetadata, MetadataRecord};
use url::Url;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
/// Served from the edge cache for a second, then revalidated in the background.
pub const PAGE_CACHE_CONTROL: &str = "s-maxage=1, stale-while-revalidate";
pub const FALLBACK_CACHE_CONTROL: &str = "no-cache";

/// Successful response carrying the patched document.
pub fn document(html: String) -> Response {
    (
        [(header::CONTENT_TYPE, HTML_CONTENT_TYPE), (header::CACHE_CONTROL, PAGE_CACHE_CONTROL)],
        html,
    )
        .into_response()
}

/// Standalone redirect page with the given metadata. Still a `200` so crawlers keep the
/// preview; only failing to build the page itself is an error.
pub fn fallback(
    meta: &MetadataRecord,
    origin: &Url,
    requested_path: Option<&str>,
) -> Result<Response, AppError> {
    let page = news_meta_render::fallback::render(meta, origin, requested_path)?;
    Ok((
        [
            (header::CONTENT_TYPE, HTML_CONTENT_TYPE),
            (header::CACHE_CONTROL, FALLBACK_CACHE_CONTROL),
        ],
        page.into_string(),
    )
        .into_response())
}

/// Fallback page with the site defaults, for when nothing about the request is known.
pub fn defaults_fallback(defaults: &DefaultMetadata) -> Response {
    fallback(&defaults.record(None), defaults.origin(), None)
        .unwrap_or_else(IntoResponse::into_response)
}
