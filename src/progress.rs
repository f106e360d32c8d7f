use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[download\]\s+([0-9.]+)%").expect("valid regex"));
static MERGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[Merger\] Merging formats into "(.+?)""#).expect("valid regex"));
static EXTRACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[ExtractAudio\] Destination: (.+)$").expect("valid regex"));
static DESTINATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[download\] Destination: (.+)$").expect("valid regex"));

/// Something the downloader told us on one line of output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Whole-number percentage of the current stream
    Progress(u8),
    /// Streams are being merged into the final container
    Merging,
    /// Path of the file being written; merge and audio-extract paths are final
    Destination { path: PathBuf, is_final: bool },
}

pub fn parse_progress_from_line(line: &str) -> Option<u8> {
    let caps = PERCENT_RE.captures(line)?;
    let value = caps[1].parse::<f32>().ok()?;
    Some(value.clamp(0.0, 100.0) as u8)
}

/// Scans one line; a single line may carry more than one event
/// (a merge line is both `Merging` and a final `Destination`).
pub fn scan_line(line: &str) -> Vec<OutputEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut events = Vec::new();

    if let Some(pct) = parse_progress_from_line(line) {
        events.push(OutputEvent::Progress(pct));
    }
    if line.contains("[Merger]") {
        events.push(OutputEvent::Merging);
    }
    if let Some(caps) = MERGE_RE.captures(line) {
        events.push(OutputEvent::Destination {
            path: PathBuf::from(&caps[1]),
            is_final: true,
        });
    }
    if let Some(caps) = EXTRACT_RE.captures(line) {
        events.push(OutputEvent::Destination {
            path: PathBuf::from(caps[1].trim()),
            is_final: true,
        });
    }
    if let Some(caps) = DESTINATION_RE.captures(line) {
        events.push(OutputEvent::Destination {
            path: PathBuf::from(caps[1].trim()),
            is_final: false,
        });
    }
    events
}

/// Tracks the best-known output path across the lines of one run
#[derive(Debug, Default)]
pub struct DestinationTracker {
    path: Option<PathBuf>,
    is_final: bool,
}

impl DestinationTracker {
    pub fn observe(&mut self, event: &OutputEvent) {
        if let OutputEvent::Destination { path, is_final } = event {
            // a plain download destination never overrides a merge/extract result
            if *is_final || !self.is_final {
                self.path = Some(path.clone());
                self.is_final = *is_final;
            }
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}
