//! HTTP surface of the relay.
//!
//! | Route           | Purpose                                      |
//! |-----------------|----------------------------------------------|
//! | `GET /`         | signer page, client script inlined           |
//! | `GET /events`   | push channel (server-sent events)            |
//! | `POST /response`| browser result for one request id            |
//! | `GET /status`   | connection state and pending count           |

use crate::domain::config::CorsConfig;
use crate::domain::protocol::ResponseBody;
use crate::middleware::{create_cors_layer, TracingLayer};
use crate::session::RelaySession;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{debug, warn};

const PAGE_TEMPLATE: &str = include_str!("../assets/signer.html");
const CLIENT_SCRIPT: &str = include_str!("../assets/signer.js");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RelaySession>,
}

/// Signer page with the client script inlined.
pub fn signer_page() -> String {
    PAGE_TEMPLATE.replace("{{CLIENT_SCRIPT}}", CLIENT_SCRIPT)
}

/// Build the relay router for `session`.
pub fn build_router(session: Arc<RelaySession>, cors: &CorsConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TracingLayer::new())
        .layer(create_cors_layer(cors));

    Router::new()
        .route("/", get(serve_page))
        .route("/events", get(attach_channel))
        .route("/response", post(submit_result))
        .route("/status", get(status))
        .layer(middleware)
        .with_state(AppState { session })
}

async fn serve_page() -> Html<String> {
    Html(signer_page())
}

async fn attach_channel(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state.session.attach();
    debug!(generation = stream.generation(), "Push channel opened");
    Sse::new(stream.map(|message| Event::default().json_data(message)))
        .keep_alive(KeepAlive::default())
}

async fn submit_result(State(state): State<AppState>, body: Bytes) -> Response {
    let body: ResponseBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Malformed response body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let id = body.id;
    if !state.session.submit(body) {
        debug!(request_id = %id, "Response ignored, id no longer pending");
    }
    Json(json!({ "success": true })).into_response()
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot())
}
