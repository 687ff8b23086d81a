use super::handler::HashService;
use crate::server::telemetry::{increment_request_errors, increment_requests, record_request_duration};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use hashgate_core::Error;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub const HASH_PATH: &str = "/hash";
pub const HEALTH_PATH: &str = "/healthz";

pub fn router(service: HashService) -> Router {
    Router::new()
        .route(HASH_PATH, post(hash))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn hash(State(service): State<HashService>, body: Bytes) -> Response {
    let start = Instant::now();
    increment_requests();

    let encoded = service.handle(&body).await.and_then(|response| {
        serde_json::to_vec(&response).map_err(|e| Error::Encode(e.to_string()))
    });
    record_request_duration(start.elapsed().as_secs_f64() * 1000.0);

    match encoded {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_ENCODING, "utf-8"),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            increment_request_errors();
            tracing::warn!("Hash request failed: {e}");
            e.into_response()
        }
    }
}

async fn health(State(service): State<HashService>) -> (StatusCode, &'static str) {
    if service.is_serving() {
        (StatusCode::OK, "SERVING")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT_SERVING")
    }
}
