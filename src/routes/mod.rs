// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod callback;

pub use callback::CallbackState;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Build the loopback listener's router, serving the redirect at `callback_path`.
pub fn create_router(callback_path: &str, state: Arc<CallbackState>) -> Router {
    Router::new()
        .merge(callback::routes(callback_path))
        .layer(
            TraceLayer::new_for_http()
                // Path only: the query holds the authorization code.
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
