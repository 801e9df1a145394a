//!
//! src/errors.rs  Oct 2nd, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the orchestrator uses
//!
//!

use std::fmt;
use thiserror::Error;

/// Failure of an external collaborator (suggestion provider, catalog, etc.)
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("auth error: {0}")]
    Auth(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Transient failures are worth trying another strategy for,
    /// everything else means the provider will not answer this request
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimited(_) => true,
            ProviderError::Status { status, .. } => *status >= 500,
            ProviderError::Auth(_) | ProviderError::Parse(_) => false
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Auth(format!("status {status}: {body}")),
            429 => ProviderError::RateLimited(body),
            _ => ProviderError::Status { status, body }
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self { ProviderError::Parse(e.to_string()) }
}

/// Pipeline stage an unrecovered failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Suggest,
    Publish
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Suggest => "suggest",
            Stage::Publish => "publish"
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
#[error("pipeline failed at {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: ProviderError
}

impl PipelineError {
    pub fn new(stage: Stage, source: ProviderError) -> Self {
        Self { stage, source }
    }
}

#[derive(Error, Debug)]
pub enum PlaymakerError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for PlaymakerError {
    fn from(e: reqwest::Error) -> Self { PlaymakerError::Provider(e.into()) }
}

impl From<serde_json::Error> for PlaymakerError {
    fn from(e: serde_json::Error) -> Self { PlaymakerError::Provider(e.into()) }
}

impl From<sqlx::Error> for PlaymakerError {
    fn from(e: sqlx::Error) -> Self { PlaymakerError::Db(e.to_string()) }
}
