//! Remote bundle fetch with bounded retries.

use crate::auth::TokenProvider;
use crate::error::StoreError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Outcome classes of a single fetch attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Timeouts, connection failures, 5xx and 429.
    #[error("{0}")]
    Retryable(String),

    /// The service rejected the token as invalid or expired; a fresh token may succeed.
    #[error("access token rejected")]
    TokenRejected,

    /// Not authorized (401 without `invalid_token`) or forbidden (403).
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Fatal(String),
}

/// One bundle fetch attempt.
pub trait BundleSync: Send + Sync {
    fn fetch(&self, bundle_id: &str, token: Option<&str>) -> Result<Vec<u8>, SyncError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

pub trait BackoffPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 500,
        }
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Fetch with up to `retry.max_attempts` attempts.
///
/// Retryable failures back off linearly. A rejected token is invalidated and the next attempt asks
/// the provider again without sleeping. Auth and fatal failures stop immediately.
pub fn fetch_with_retry(
    sync: &dyn BundleSync,
    tokens: &dyn TokenProvider,
    bundle_id: &str,
    retry: &RetryPolicy,
) -> Result<Vec<u8>, StoreError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let token = tokens.valid_token()?;
        info!(bundle_id, attempt, max_attempts, "fetching policy bundle");

        let err = match sync.fetch(bundle_id, token.as_deref()) {
            Ok(bytes) => return Ok(bytes),
            Err(err) => err,
        };
        let last = attempt >= max_attempts;

        match err {
            SyncError::TokenRejected => {
                warn!(bundle_id, attempt, "bundle service rejected the access token");
                tokens.invalidate();
                if last {
                    return Err(StoreError::Auth {
                        message: "access token rejected by the bundle service; check credentials"
                            .to_string(),
                    });
                }
            }
            SyncError::Retryable(message) => {
                warn!(bundle_id, attempt, error = %message, "bundle fetch failed");
                if last {
                    return Err(StoreError::Network {
                        message: format!("{message} (after {attempt} attempts)"),
                        retryable: true,
                    });
                }
                thread::sleep(retry.delay_for_attempt(attempt));
            }
            SyncError::Auth(message) => return Err(StoreError::Auth { message }),
            SyncError::Fatal(message) => {
                return Err(StoreError::Network {
                    message,
                    retryable: false,
                });
            }
        }
    }
}

/// `GET {base_url}/{bundle_id}` with a bearer token.
#[derive(Clone, Debug)]
pub struct HttpBundleSync {
    base_url: String,
    client: Client,
}

impl HttpBundleSync {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("imagegate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Network {
                message: format!("cannot build HTTP client: {e}"),
                retryable: false,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url_for(&self, bundle_id: &str) -> String {
        format!("{}/{}", self.base_url, bundle_id)
    }
}

impl BundleSync for HttpBundleSync {
    fn fetch(&self, bundle_id: &str, token: Option<&str>) -> Result<Vec<u8>, SyncError> {
        let url = self.url_for(bundle_id);
        let mut req = self.client.get(&url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                SyncError::Retryable(format!("request to {url} failed: {e}"))
            } else {
                SyncError::Fatal(format!("request to {url} failed: {e}"))
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| SyncError::Retryable(format!("reading response from {url}: {e}")));
        }

        let challenge = resp
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().unwrap_or_default();
        Err(classify_status(status, &challenge, &body, &url))
    }
}

fn classify_status(status: StatusCode, challenge: &str, body: &str, url: &str) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED
            if challenge.contains("invalid_token") || body.contains("invalid_token") =>
        {
            SyncError::TokenRejected
        }
        StatusCode::UNAUTHORIZED => SyncError::Auth(
            "not authorized to fetch the policy bundle; check credentials".to_string(),
        ),
        StatusCode::FORBIDDEN => SyncError::Auth(
            "access denied to the policy bundle; check credentials and access tier".to_string(),
        ),
        StatusCode::NOT_FOUND => SyncError::Fatal(format!("no policy bundle at {url}")),
        StatusCode::TOO_MANY_REQUESTS => SyncError::Retryable(format!("{url} returned {status}")),
        s if s.is_server_error() => SyncError::Retryable(format!("{url} returned {status}")),
        _ => SyncError::Fatal(format!("{url} returned {status}")),
    }
}
