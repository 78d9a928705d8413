// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization agent that receives the Strava redirect on a local HTTP
//! listener bound to the redirect URI's host and port.

use crate::error::{Error, Result};
use crate::routes::{create_router, CallbackState};
use crate::services::authorization::{AuthorizationAgent, AuthorizationSession, CallbackOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use url::Url;

/// Default upper bound on how long to wait for the user.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

type Presenter = Box<dyn Fn(&Url) + Send + Sync>;

/// Presents the authorization URL and waits for the redirect on loopback.
///
/// The wait ends with [`CallbackOutcome::Cancelled`] on timeout or when the
/// handle from [`LoopbackAgent::cancel_handle`] is notified.
pub struct LoopbackAgent {
    presenter: Presenter,
    timeout: Duration,
    cancel: Arc<Notify>,
}

impl LoopbackAgent {
    /// `presenter` shows the URL to the user (print it, open a browser, ...).
    pub fn new(presenter: impl Fn(&Url) + Send + Sync + 'static) -> Self {
        Self {
            presenter: Box::new(presenter),
            timeout: DEFAULT_CALLBACK_TIMEOUT,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Call `notify_one()` on the handle to abandon the wait.
    pub fn cancel_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.cancel)
    }
}

#[async_trait]
impl AuthorizationAgent for LoopbackAgent {
    async fn authenticate(&self, session: &AuthorizationSession) -> Result<CallbackOutcome> {
        let redirect = Url::parse(session.redirect_uri())
            .map_err(|e| Error::Config(format!("invalid redirect URI: {}", e)))?;
        if redirect.scheme() != "http" || session.callback_scheme() != "http" {
            return Err(Error::Config(
                "loopback authorization requires an http redirect URI".to_string(),
            ));
        }

        let host = redirect
            .host()
            .ok_or_else(|| Error::Config("redirect URI has no host".to_string()))?;
        let port = redirect.port_or_known_default().unwrap_or(80);
        let addr = format!("{}:{}", host, port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            Error::Config(format!("failed to bind callback listener on {}: {}", addr, e))
        })?;
        tracing::info!(address = %addr, path = redirect.path(), "Waiting for Strava redirect");

        let mut redirect_base = redirect.clone();
        redirect_base.set_query(None);
        redirect_base.set_fragment(None);

        let (callback_tx, callback_rx) = oneshot::channel();
        let app = create_router(
            redirect.path(),
            Arc::new(CallbackState::new(redirect_base, callback_tx)),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async move {
                shutdown_rx.await.ok();
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::warn!(error = %e, "Callback listener failed");
            }
        });

        (self.presenter)(session.url());

        let outcome = tokio::select! {
            received = callback_rx => match received {
                Ok(url) => CallbackOutcome::Redirected(url),
                Err(_) => CallbackOutcome::Cancelled,
            },
            _ = self.cancel.notified() => {
                tracing::info!("Authorization wait cancelled");
                CallbackOutcome::Cancelled
            }
            _ = tokio::time::sleep(self.timeout) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Timed out waiting for Strava redirect");
                CallbackOutcome::Cancelled
            }
        };

        // Listener already gone is fine.
        let _ = shutdown_tx.send(());
        Ok(outcome)
    }
}
