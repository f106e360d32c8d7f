use std::path::Path;
use std::process::Stdio;

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, info, warn};

use crate::command::DownloadCommand;
use crate::model::{JobId, Outcome};
use crate::process;
use crate::progress::{scan_line, DestinationTracker, OutputEvent};

/// What a running download reports back to the session
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Started { job: JobId },
    Progress { job: JobId, percent: u8 },
    Merging { job: JobId },
    /// Raw tool output, shown as an in-progress log line
    Output { job: JobId, line: String },
    Finished { job: JobId, outcome: Outcome },
}

/// Forwards each output line, splitting `\r` redraws as well as `\n`.
///
/// Bytes are decoded lossily and the pipe is drained until EOF even if
/// nobody listens any more: a closed pipe would kill the tool mid-download.
async fn forward_lines<R>(reader: R, tx: UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                for line in text.split(['\r', '\n']).filter(|l| !l.trim().is_empty()) {
                    let _ = tx.send(line.to_string());
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to read downloader output");
                break;
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs one download to completion, streaming events into `events`.
///
/// Never returns an error: spawn and read failures are reported as a
/// `Finished` event carrying `Outcome::Failure`.
pub async fn spawn_download(job: JobId, cmd: DownloadCommand, events: UnboundedSender<WorkerEvent>) -> Outcome {
    info!(%job, program = %cmd.program.display(), "starting download");
    let _ = events.send(WorkerEvent::Started { job });

    let outcome = match run(job, &cmd, &events).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(%job, error = %e, "download worker failed");
            Outcome::Failure { reason: e.to_string() }
        }
    };

    info!(%job, success = outcome.is_success(), "download finished");
    let _ = events.send(WorkerEvent::Finished {
        job,
        outcome: outcome.clone(),
    });
    outcome
}

async fn run(job: JobId, cmd: &DownloadCommand, events: &UnboundedSender<WorkerEvent>) -> std::io::Result<Outcome> {
    let mut child = process::command(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // stdout and stderr are read together so the log keeps the tool's order
    let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel();
    if let Some(out) = child.stdout.take() {
        tokio::spawn(forward_lines(out, line_tx.clone()));
    }
    if let Some(err) = child.stderr.take() {
        tokio::spawn(forward_lines(err, line_tx.clone()));
    }
    drop(line_tx);

    let mut destination = DestinationTracker::default();
    while let Some(line) = line_rx.recv().await {
        debug!(%job, "yt-dlp> {}", line);
        for event in scan_line(&line) {
            destination.observe(&event);
            match event {
                OutputEvent::Progress(percent) => {
                    let _ = events.send(WorkerEvent::Progress { job, percent });
                }
                OutputEvent::Merging => {
                    let _ = events.send(WorkerEvent::Merging { job });
                }
                OutputEvent::Destination { .. } => {}
            }
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let _ = events.send(WorkerEvent::Output {
                job,
                line: trimmed.to_string(),
            });
        }
    }

    let status = child.wait().await?;
    let file_name = match destination.path() {
        Some(path) => file_name_of(path),
        None => file_name_of(Path::new(&cmd.output_template)),
    };
    Ok(Outcome::from_exit(status.code(), file_name))
}
