//! Error types shared by the settings loader, the REST client and the importer.

use reqwest::StatusCode;
use std::path::PathBuf;

/// Startup configuration problems. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    #[error("required setting {0} is empty")]
    Empty(&'static str),

    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// Failures while opening an authenticated session.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("login rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("login response did not contain a usable session: {0}")]
    MalformedResponse(String),
}

/// Failures of a single REST call. Returned instead of a synthetic 500 response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Http {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ApiError {
    /// HTTP status for errors the server answered, `None` for local failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why one CSV row did not produce a user. Never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("missing column `{0}`")]
    MissingColumn(&'static str),

    #[error("unreadable row: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failures that stop the whole batch before (or instead of) row processing.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV header row: {0}")]
    Header(#[source] csv::Error),
}
