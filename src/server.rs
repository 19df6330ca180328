//! HTTP surface: the current artwork and a JSON status document.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};

use crate::state::{ArtStore, PublishedMeta};

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<ArtStore>,
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub topic: String,
    pub last_update_epoch: f64,
    pub meta: Option<PublishedMeta>,
    pub albumart_path: String,
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/albumart.jpg", get(serve_album_art))
        .route("/", get(status))
        .route("/status", get(status))
        .with_state(ctx)
}

pub async fn run(host: &str, port: u16, ctx: AppContext) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("cannot bind HTTP server to {host}:{port}"))?;
    info!("HTTP server listening on {}:{}", host, port);
    axum::serve(listener, router(ctx))
        .await
        .context("HTTP server stopped")
}

async fn serve_album_art(State(ctx): State<AppContext>) -> Response {
    let etag = ctx.store.snapshot().etag();
    match tokio::fs::read(ctx.store.path()).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/jpeg".to_string()),
                (header::CACHE_CONTROL, "no-cache, must-revalidate".to_string()),
                (header::ETAG, etag),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Cannot read {}: {}", ctx.store.path().display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    let snapshot = ctx.store.snapshot();
    let path = ctx.store.path();
    let albumart_path = std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string();

    Json(StatusResponse {
        topic: ctx.topic.clone(),
        last_update_epoch: snapshot.last_update_epoch(),
        meta: snapshot.meta,
        albumart_path,
    })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::models::TrackMetadata;
    use crate::state::PLACEHOLDER_JPEG;

    fn context(dir: &tempfile::TempDir) -> AppContext {
        AppContext {
            store: Arc::new(ArtStore::open(dir.path().join("albumart.jpg")).unwrap()),
            topic: "media/gym".to_string(),
        }
    }

    async fn get_path(ctx: AppContext, uri: &str) -> Response {
        router(ctx)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_placeholder_before_first_update() {
        let dir = tempfile::tempdir().unwrap();
        let resp = get_path(context(&dir), "/albumart.jpg").await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(
            resp.headers()[header::CACHE_CONTROL],
            "no-cache, must-revalidate"
        );
        assert_eq!(resp.headers()[header::ETAG], "0");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], PLACEHOLDER_JPEG);
    }

    #[tokio::test]
    async fn test_serves_published_art() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let snap = ctx
            .store
            .publish(&TrackMetadata::default(), b"\xff\xd8fresh")
            .unwrap();

        let resp = get_path(ctx, "/albumart.jpg").await;
        assert_eq!(resp.headers()[header::ETAG], snap.etag().as_str());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"\xff\xd8fresh");
    }

    #[tokio::test]
    async fn test_status_document() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        ctx.store
            .publish(
                &TrackMetadata {
                    state: Some("playing".to_string()),
                    title: Some("Song X".to_string()),
                    artist: Some("The Beat".to_string()),
                    album: None,
                },
                b"img",
            )
            .unwrap();

        for uri in ["/", "/status"] {
            let resp = get_path(ctx.clone(), uri).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

            assert_eq!(json["topic"], "media/gym");
            assert!(json["last_update_epoch"].as_f64().unwrap() > 0.0);
            assert_eq!(json["meta"]["title"], "Song X");
            assert_eq!(json["meta"]["state"], "playing");
            assert!(json["albumart_path"]
                .as_str()
                .unwrap()
                .ends_with("albumart.jpg"));
        }
    }

    #[tokio::test]
    async fn test_status_before_first_update() {
        let dir = tempfile::tempdir().unwrap();
        let resp = get_path(context(&dir), "/status").await;
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["last_update_epoch"], 0.0);
        assert!(json["meta"].is_null());
    }
}
