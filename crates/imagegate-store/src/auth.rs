use crate::error::StoreError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of bearer tokens for bundle sync.
///
/// `valid_token` returns `Ok(None)` for anonymous access. After `invalidate`, a provider either
/// returns a fresh token or fails with re-authentication guidance.
pub trait TokenProvider: Send + Sync {
    fn valid_token(&self) -> Result<Option<String>, StoreError>;
    fn invalidate(&self);
}

/// Reads the token from an environment variable on every call.
#[derive(Debug)]
pub struct EnvTokenProvider {
    var: String,
    rejected: AtomicBool,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            rejected: AtomicBool::new(false),
        }
    }
}

impl TokenProvider for EnvTokenProvider {
    fn valid_token(&self) -> Result<Option<String>, StoreError> {
        if self.rejected.load(Ordering::SeqCst) {
            return Err(StoreError::Auth {
                message: format!(
                    "the token in ${} was rejected as invalid; re-authenticate and update it",
                    self.var
                ),
            });
        }
        Ok(std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    fn invalidate(&self) {
        self.rejected.store(true, Ordering::SeqCst);
    }
}

/// A fixed list of tokens, for tests and scripted use.
#[derive(Debug)]
pub struct StaticTokenProvider {
    tokens: std::sync::Mutex<Vec<String>>,
}

impl StaticTokenProvider {
    /// Tokens are handed out in order, advancing on each `invalidate`.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        tokens.reverse();
        Self {
            tokens: std::sync::Mutex::new(tokens),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn valid_token(&self) -> Result<Option<String>, StoreError> {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens
            .last()
            .cloned()
            .map(Some)
            .ok_or_else(|| StoreError::Auth {
                message: "no valid token left; re-authenticate".to_string(),
            })
    }

    fn invalidate(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.pop();
    }
}
