// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth redirect handler for the loopback authorization listener.

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use url::Url;

const COMPLETE_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Strava connected</title></head>\
<body><p>Authorization received. You can close this window.</p></body></html>";

const ALREADY_USED_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Strava authorization</title></head>\
<body><p>This authorization request has already been handled.</p></body></html>";

/// State for one authorization attempt: where to hand the redirect off.
pub struct CallbackState {
    redirect_base: Url,
    sender: Mutex<Option<oneshot::Sender<Url>>>,
}

impl CallbackState {
    /// `redirect_base` is the registered redirect URI; the query Strava sends
    /// is attached to it before delivery.
    pub fn new(redirect_base: Url, sender: oneshot::Sender<Url>) -> Self {
        Self {
            redirect_base,
            sender: Mutex::new(Some(sender)),
        }
    }

    fn take_sender(&self) -> Option<oneshot::Sender<Url>> {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Callback routes, mounted at the redirect URI's path.
pub fn routes(path: &str) -> Router<Arc<CallbackState>> {
    Router::new().route(path, get(handle_callback))
}

/// Deliver the first redirect to the waiting agent.
async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(sender) = state.take_sender() else {
        tracing::warn!("Ignoring repeated Strava authorization callback");
        return (StatusCode::GONE, Html(ALREADY_USED_PAGE)).into_response();
    };

    let mut callback = state.redirect_base.clone();
    callback.set_query(query.as_deref());

    // The query carries the authorization code, so only note the arrival.
    tracing::info!("Received Strava authorization callback");

    if sender.send(callback).is_err() {
        tracing::warn!("Authorization callback arrived after the wait ended");
        return (StatusCode::GONE, Html(ALREADY_USED_PAGE)).into_response();
    }

    Html(COMPLETE_PAGE).into_response()
}
