use std::fmt;

use serde::{Deserialize, Serialize};

/// Row identifier for a job, stable for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the user asked the downloader to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFormat {
    /// Merged video container (MP4 by default)
    Video,
    /// Audio extracted to MP3
    Audio,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 2] = [MediaFormat::Video, MediaFormat::Audio];

    pub fn label(self) -> &'static str {
        match self {
            MediaFormat::Video => "Video (MP4)",
            MediaFormat::Audio => "Audio (MP3)",
        }
    }
}

/// Represents the current state of a download job.
///
/// Jobs only ever move `Queued -> Downloading -> Completed | Error`,
/// with one shortcut: a job whose metadata lookup fails goes straight
/// from `Queued` to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// How a single run of the external tool ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { file_name: String },
    Failure { reason: String },
}

impl Outcome {
    /// Exit code 0 is success, anything else (including a missing code
    /// when the process was killed by a signal) is an error.
    pub fn from_exit(code: Option<i32>, file_name: String) -> Self {
        match code {
            Some(0) => Outcome::Success { file_name },
            Some(code) => Outcome::Failure {
                reason: format!("exit code {code}"),
            },
            None => Outcome::Failure {
                reason: "terminated by signal".to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// One row of the download queue
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub format: MediaFormat,
    /// Resolution key into the format map; `None` for audio jobs
    pub resolution: Option<String>,
    pub status: JobStatus,
    /// Filled in once the metadata worker reports back
    pub title: Option<String>,
    /// Percentage, 0..=100
    pub progress: u8,
    /// Set while the tool is merging streams after the transfer
    pub merging: bool,
    /// Final file name on success, failure reason on error
    pub detail: Option<String>,
}

impl Job {
    /// Text for the "details" column, e.g. `Video (MP4) | 720p`
    pub fn details(&self) -> String {
        format!(
            "{} | {}",
            self.format.label(),
            self.resolution.as_deref().unwrap_or("N/A")
        )
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}
