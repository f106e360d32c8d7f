use std::path::PathBuf;
use thiserror::Error;

use crate::model::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum ShrineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("embedded asset is missing: {0}")]
    MissingAsset(String),

    #[error("failed to parse {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("external tool failed: {tool} (code={code:?}) {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("tool output is not valid metadata: {0}")]
    InvalidMetadata(String),

    #[error("unknown job id: {0}")]
    UnknownJob(JobId),

    #[error("job {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("dns error: {0}")]
    Dns(String),

    #[error("operation timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, ShrineError>;
