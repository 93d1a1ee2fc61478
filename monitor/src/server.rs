use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::ObservationStore;

const INDEX_HTML: &str = include_str!("../assets/index.html");
const APP_JS: &str = include_str!("../assets/app.js");
const STYLE_CSS: &str = include_str!("../assets/style.css");

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub store: ObservationStore,
    pub capture_interval_ms: u64,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Status {
    motion: bool,
}

#[derive(Debug, Serialize)]
struct ViewerConfig {
    capture_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind to {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /frame.jpg — latest captured still
async fn frame(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.store.snapshot();
    match &snapshot.frame {
        Some(frame) => (
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            frame.jpeg.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "No frame available").into_response(),
    }
}

/// GET /status — `{"motion": bool}`
async fn status(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(Status {
        motion: state.store.snapshot().motion,
    })
}

/// GET /config — polling interval for the viewer page
async fn viewer_config(State(state): State<Arc<AppState>>) -> Json<ViewerConfig> {
    Json(ViewerConfig {
        capture_interval_ms: state.capture_interval_ms,
    })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], APP_JS)
}

async fn style_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/app.js", get(app_js))
        .route("/style.css", get(style_css))
        .route("/frame.jpg", get(frame))
        .route("/status", get(status))
        .route("/config", get(viewer_config))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(addr.to_string(), e))?;
    info!(addr, "viewer available");
    axum::serve(listener, router(state))
        .await
        .map_err(ServerError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Observation;
    use axum::body::Body;
    use axum::http::Request;
    use motion_watch_common::frame::CapturedFrame;
    use tower::ServiceExt;

    fn app() -> (ObservationStore, Router) {
        let store = ObservationStore::new();
        let state = Arc::new(AppState {
            store: store.clone(),
            capture_interval_ms: 750,
        });
        (store, router(state))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, body.to_vec())
    }

    #[tokio::test]
    async fn frame_before_first_capture_is_404() {
        let (_store, app) = app();
        let (status, _, body) = get(&app, "/frame.jpg").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"No frame available");
    }

    #[tokio::test]
    async fn frame_returns_latest_bytes() {
        let (store, app) = app();
        store.publish(Observation {
            frame: Some(CapturedFrame::new(vec![0xFF, 0xD8, 0xFF, 0xD9], 0, 1)),
            motion: false,
        });
        let (status, content_type, body) = get(&app, "/frame.jpg?t=123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(body, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[tokio::test]
    async fn status_reflects_motion_flag() {
        let (store, app) = app();
        let (status, content_type, body) = get(&app, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, br#"{"motion":false}"#);

        store.publish(Observation {
            frame: Some(CapturedFrame::new(vec![1], 0, 1)),
            motion: true,
        });
        let (_, _, body) = get(&app, "/status").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["motion"], true);
    }

    #[tokio::test]
    async fn config_exposes_interval() {
        let (_store, app) = app();
        let (status, _, body) = get(&app, "/config").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["capture_interval_ms"], 750);
    }

    #[tokio::test]
    async fn viewer_assets_served() {
        let (_store, app) = app();
        let (status, content_type, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(String::from_utf8(body).unwrap().contains("app.js"));

        let (_, content_type, _) = get(&app, "/app.js").await;
        assert_eq!(content_type.as_deref(), Some("application/javascript"));
        let (_, content_type, _) = get(&app, "/style.css").await;
        assert_eq!(content_type.as_deref(), Some("text/css"));
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (_store, app) = app();
        let (status, _, body) = get(&app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"Not found");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_see_whole_frames() {
        let (store, app) = app();
        store.publish(Observation {
            frame: Some(CapturedFrame::new(vec![0u8; 4096], 0, 0)),
            motion: false,
        });

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for seq in 1..=200u64 {
                    store.publish(Observation {
                        frame: Some(CapturedFrame::new(vec![seq as u8; 4096], 0, seq)),
                        motion: seq % 2 == 1,
                    });
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..8 {
            let app = app.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let (status, _, body) = get(&app, "/frame.jpg").await;
                    assert_eq!(status, StatusCode::OK);
                    assert_eq!(body.len(), 4096);
                    assert!(body.iter().all(|&b| b == body[0]));
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
