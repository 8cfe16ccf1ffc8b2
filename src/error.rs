use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{Field, InstrumentKind};

/// Top-level error carried out of `app::run`: an exit code plus a message.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Pipeline failures, from fetch through persistence.
///
/// `ExtractionEmpty` and `MalformedField` are normally recovered locally (logged,
/// counted) and only become fatal when the caller decides so.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("network error fetching {url}: {reason}")]
    Network {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("redirect limit ({limit}) exceeded starting from {url}")]
    RedirectLoop { url: String, limit: usize },

    #[error("run exceeded its wall-clock budget of {}s", budget.as_secs())]
    Timeout { budget: Duration },

    #[error("no {} records extracted (upstream markup may have changed)", family.label())]
    ExtractionEmpty { family: InstrumentKind },

    #[error("malformed {} field {field:?} '{value}': {reason}", family.label())]
    MalformedField {
        family: InstrumentKind,
        field: Field,
        value: String,
        reason: String,
    },

    #[error("failed to write snapshot '{}': {reason}", path.display())]
    Serialization { path: PathBuf, reason: String },
}

impl ScrapeError {
    pub(crate) fn network(url: &str, reason: impl Into<String>) -> Self {
        ScrapeError::Network {
            url: url.to_string(),
            status: None,
            reason: reason.into(),
        }
    }

    /// Whether another attempt against the same URL could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Network { status: None, .. } => true,
            ScrapeError::Network {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ScrapeError::Network { .. } | ScrapeError::RedirectLoop { .. } | ScrapeError::Timeout { .. } => 4,
            ScrapeError::ExtractionEmpty { .. } | ScrapeError::MalformedField { .. } => 3,
            ScrapeError::Serialization { .. } => 2,
        }
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}
