use camino::Utf8PathBuf;
use imagegate_domain::BundleError;
use imagegate_settings::PolicyParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("image name '{name}' is ambiguous: matches {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("{path} is corrupt: {message}")]
    Corrupt { path: Utf8PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle sync failed: {message}")]
    Network { message: String, retryable: bool },

    #[error("{message}")]
    Auth { message: String },

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("invalid policy file {path}: {source}")]
    Policy {
        path: Utf8PathBuf,
        #[source]
        source: PolicyParseError,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Network {
                retryable: true,
                ..
            }
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, StoreError::Auth { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
