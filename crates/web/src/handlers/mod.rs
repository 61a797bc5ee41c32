use std::path::PathBuf;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware,
    routing::get,
};
use news_meta_core::util::join_normalized;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::services::{ServeDir, ServeFile};

use crate::AppState;

pub mod compose;
mod news;

pub fn build_router(state: AppState) -> Router {
    let dist = PathBuf::from(&state.config.site.dist);
    let assets = <ServeDir as ServiceExt<Request>>::map_response(
        ServeDir::new(join_normalized(&dist, "assets")),
        |mut response| {
            // Cache bundled (hashed) files for a year, mark immutable
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=31536000, immutable"),
            );
            response
        },
    );
    // Unknown paths get the app's entry document so client-side routes resolve
    let site = <ServeDir<ServeFile> as ServiceExt<Request>>::map_response(
        ServeDir::new(&dist).fallback(ServeFile::new(join_normalized(&dist, "index.html"))),
        |mut response| {
            // Cache non-hashed public files for a day, mark must-revalidate
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=86400, must-revalidate"),
            );
            response
        },
    );

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/ssr", get(news::get_news_by_query))
        .nest_service("/assets", assets);
    let router = if state.config.document.uses_downstream() {
        let edge = ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(state.clone(), news::edge_middleware))
            .service(site);
        router.fallback_service(edge)
    } else {
        router.route("/news/{id}", get(news::get_news)).fallback_service(site)
    };
    router.with_state(state)
}

async fn healthz() -> &'static str { "ok" }
