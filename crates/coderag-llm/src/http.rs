//! Shared HTTP client construction for answer-generation providers.

use std::time::Duration;

/// Request timeout applied when the caller does not configure one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client with the standard coderag configuration and the
/// given request timeout.
///
/// Config: 30s connect timeout (capped at `timeout`), rustls TLS,
/// `coderag/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .user_agent(concat!("coderag/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("HTTP client construction must not fail")
}

/// Client with the default 60s request timeout.
#[must_use]
pub fn default_client() -> reqwest::Client {
    client_with_timeout(DEFAULT_TIMEOUT)
}
