// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization session and the caller-side authorization agent boundary.
//!
//! The token manager builds the authorization URL; an [`AuthorizationAgent`]
//! presents it to the user and reports back the redirect Strava sent, or a
//! cancellation. The session checks the callback before the code is used.

use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;
use url::Url;

/// Bytes of randomness in the anti-forgery `state` parameter.
const STATE_BYTES: usize = 32;

/// How an authorization attempt ended, as seen by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Strava redirected back to this URL.
    Redirected(Url),
    /// The user closed the authorization UI or the wait was cancelled.
    Cancelled,
}

/// Presents the authorization URL to the end user and waits for the redirect.
#[async_trait]
pub trait AuthorizationAgent: Send + Sync {
    /// Must resolve (with `Cancelled` if need be) rather than hang forever.
    async fn authenticate(&self, session: &AuthorizationSession) -> Result<CallbackOutcome>;
}

/// Transient state for one authorization attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationSession {
    url: Url,
    redirect_uri: String,
    callback_scheme: String,
    state: String,
}

impl AuthorizationSession {
    /// Start a session for `authorization_url`, adding a fresh `state`.
    pub fn new(
        mut authorization_url: Url,
        redirect_uri: &str,
        callback_scheme: Option<&str>,
    ) -> Result<Self> {
        let callback_scheme = match callback_scheme {
            Some(scheme) => scheme.to_string(),
            None => Url::parse(redirect_uri)
                .map_err(|e| Error::Config(format!("invalid redirect URI: {}", e)))?
                .scheme()
                .to_string(),
        };

        let state = generate_state()?;
        authorization_url
            .query_pairs_mut()
            .append_pair("state", &state);

        Ok(Self {
            url: authorization_url,
            redirect_uri: redirect_uri.to_string(),
            callback_scheme,
            state,
        })
    }

    /// The URL to present to the user.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Scheme of the redirect the agent should listen for.
    pub fn callback_scheme(&self) -> &str {
        &self.callback_scheme
    }

    /// The anti-forgery value Strava echoes back on the redirect.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Validate a redirect and pull out the authorization code.
    pub fn extract_code(&self, callback: &Url) -> Result<String> {
        if !callback.scheme().eq_ignore_ascii_case(&self.callback_scheme) {
            return Err(Error::InvalidCallback(format!(
                "expected {} callback, got {}",
                self.callback_scheme,
                callback.scheme()
            )));
        }

        let mut code = None;
        let mut state = None;
        for (key, value) in callback.query_pairs() {
            match key.as_ref() {
                "error" => {
                    return Err(Error::InvalidCallback(format!(
                        "Strava returned error: {}",
                        value
                    )))
                }
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        let state = state.ok_or_else(|| Error::InvalidCallback("missing state".to_string()))?;
        if !bool::from(state.as_bytes().ct_eq(self.state.as_bytes())) {
            return Err(Error::InvalidCallback("state mismatch".to_string()));
        }

        code.filter(|c| !c.is_empty())
            .ok_or_else(|| Error::InvalidCallback("missing code".to_string()))
    }
}

/// Random URL-safe token for the `state` parameter.
fn generate_state() -> Result<String> {
    let mut bytes = [0u8; STATE_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| Error::Config("system random number generator unavailable".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthorizationSession {
        let url = Url::parse("https://www.strava.com/oauth/authorize?client_id=abc").unwrap();
        AuthorizationSession::new(url, "http://localhost:8765/callback", None).unwrap()
    }

    fn callback(query: &str) -> Url {
        Url::parse(&format!("http://localhost:8765/callback?{}", query)).unwrap()
    }

    #[test]
    fn test_state_appended_and_unique() {
        let a = session();
        let b = session();

        assert_ne!(a.state(), b.state());
        assert!(!a.state().contains('+'));
        assert!(!a.state().contains('='));
        let pairs: Vec<_> = a.url().query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("state".to_string(), a.state().to_string())));
    }

    #[test]
    fn test_callback_scheme_defaults_to_redirect() {
        assert_eq!(session().callback_scheme(), "http");

        let url = Url::parse("https://www.strava.com/oauth/authorize").unwrap();
        let custom =
            AuthorizationSession::new(url, "https://example.com/cb", Some("strive")).unwrap();
        assert_eq!(custom.callback_scheme(), "strive");
    }

    #[test]
    fn test_extract_code() {
        let s = session();
        let code = s
            .extract_code(&callback(&format!("state={}&code=abc123&scope=read", s.state())))
            .unwrap();
        assert_eq!(code, "abc123");
    }

    #[test]
    fn test_extract_code_rejects_forged_state() {
        let s = session();
        let err = s
            .extract_code(&callback("state=forged&code=abc123"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCallback(ref m) if m == "state mismatch"));
    }

    #[test]
    fn test_extract_code_reports_denial() {
        let s = session();
        let err = s
            .extract_code(&callback(&format!("state={}&error=access_denied", s.state())))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCallback(ref m) if m.contains("access_denied")));
    }

    #[test]
    fn test_extract_code_missing_code() {
        let s = session();
        let err = s
            .extract_code(&callback(&format!("state={}", s.state())))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCallback(_)));
    }

    #[test]
    fn test_extract_code_wrong_scheme() {
        let s = session();
        let url = Url::parse(&format!("strive://callback?state={}&code=x", s.state())).unwrap();
        assert!(s.extract_code(&url).is_err());
    }
}
