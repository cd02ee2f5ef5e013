use crate::format::FormatChoice;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no URL given")]
    EmptyUrlList,

    #[error("unknown quality label for {format}: {label}")]
    UnknownQualityLabel { format: FormatChoice, label: String },

    #[error("unknown format: {0}")]
    UnknownFormat(String),

    #[error("a download batch is already running")]
    BatchInProgress,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("external tool is missing: {tool}")]
    ExternalToolMissing { tool: String },

    #[error("external tool failed: {tool} (code={code:?}) {stderr}")]
    ExternalToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors the user caused by their input; a batch never starts on these.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            EngineError::EmptyUrlList
                | EngineError::UnknownQualityLabel { .. }
                | EngineError::UnknownFormat(_)
                | EngineError::BatchInProgress
                | EngineError::InvalidUrl(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
