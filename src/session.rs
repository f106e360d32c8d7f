//! One downloader session: the queue, the activity log and every worker
//! the UI has started.
//!
//! Workers never touch session state. They send events over channels and
//! the UI thread applies them in [`Session::pump`], which is also where
//! the queue advances to its next job.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::activity_log::{ActivityLog, LogEntry, LogLevel};
use crate::command::{bundled_ffmpeg, locate_ytdlp, DownloadCommand};
use crate::config::Settings;
use crate::dns;
use crate::downloader::{spawn_download, WorkerEvent};
use crate::error::Result;
use crate::i18n::{Languages, DEFAULT_LANGUAGE};
use crate::metadata::{fetch_video_info, VideoInfo};
use crate::model::{Job, JobId, JobStatus, MediaFormat, Outcome};
use crate::queue::{DownloadQueue, QueueSummary};
use crate::system;
use crate::thumbnail::{fetch_thumbnail, Thumbnail};

/// Results from the short-lived lookup workers
#[derive(Debug)]
pub enum SessionEvent {
    Metadata {
        job: JobId,
        result: std::result::Result<VideoInfo, String>,
    },
    Thumbnail {
        job: JobId,
        result: std::result::Result<Thumbnail, String>,
    },
    Dns {
        server: String,
        result: std::result::Result<Ipv4Addr, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsState {
    Inactive,
    Checking,
    Active,
    Failed,
}

pub struct Session {
    settings: Settings,
    languages: Languages,
    lang: String,
    queue: DownloadQueue,
    log: ActivityLog,
    runtime: Handle,
    ytdlp: PathBuf,
    ffmpeg: Option<PathBuf>,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    download_tx: UnboundedSender<WorkerEvent>,
    download_rx: UnboundedReceiver<WorkerEvent>,
    running: bool,
    shutdown_when_done: bool,
    thumbnails: HashMap<JobId, Thumbnail>,
    dns_state: DnsState,
}

impl Session {
    pub fn new(settings: Settings, languages: Languages, runtime: Handle) -> Result<Self> {
        let log = ActivityLog::create()?;
        Ok(Self::with_log(settings, languages, runtime, log))
    }

    pub fn with_log(settings: Settings, languages: Languages, runtime: Handle, log: ActivityLog) -> Self {
        let ytdlp = locate_ytdlp(&settings.video);
        let ffmpeg = bundled_ffmpeg();
        info!(ytdlp = %ytdlp.display(), ffmpeg = ?ffmpeg, "session ready");
        let (events_tx, events_rx) = unbounded_channel();
        let (download_tx, download_rx) = unbounded_channel();
        Self {
            settings,
            languages,
            lang: DEFAULT_LANGUAGE.to_string(),
            queue: DownloadQueue::new(),
            log,
            runtime,
            ytdlp,
            ffmpeg,
            events_tx,
            events_rx,
            download_tx,
            download_rx,
            running: false,
            shutdown_when_done: false,
            thumbnails: HashMap::new(),
            dns_state: DnsState::Inactive,
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn jobs(&self) -> &[Job] {
        self.queue.jobs()
    }

    pub fn summary(&self) -> QueueSummary {
        self.queue.summary()
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        self.log.entries()
    }

    pub fn log_path(&self) -> PathBuf {
        self.log.path().to_path_buf()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn dns_state(&self) -> DnsState {
        self.dns_state
    }

    pub fn language(&self) -> &str {
        &self.lang
    }

    pub fn set_language(&mut self, lang: &str) {
        self.lang = lang.to_string();
    }

    pub fn set_shutdown_when_done(&mut self, enabled: bool) {
        self.shutdown_when_done = enabled;
    }

    pub fn shutdown_when_done(&self) -> bool {
        self.shutdown_when_done
    }

    pub fn t(&self, key: &str) -> String {
        self.languages.t(&self.lang, key)
    }

    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.languages.t_args(&self.lang, key, args)
    }

    /// Localised status column text for a row
    pub fn status_text(&self, job: &Job) -> String {
        let key = match job.status {
            JobStatus::Queued if job.title.is_none() => "status_fetching",
            JobStatus::Queued => "status_queued",
            JobStatus::Downloading if job.merging => "status_merging",
            JobStatus::Downloading => "status_downloading",
            JobStatus::Completed => "status_completed",
            JobStatus::Error => "status_error",
        };
        self.t(key)
    }

    /// Hands newly decoded thumbnails to the UI, which owns the textures
    pub fn take_thumbnails(&mut self) -> Vec<(JobId, Thumbnail)> {
        self.thumbnails.drain().collect()
    }

    fn log(&mut self, status: LogLevel, message: impl Into<String>) {
        self.log.push(status, message);
    }

    pub fn log_key(&mut self, status: LogLevel, key: &str) {
        let message = self.t(key);
        self.log(status, message);
    }

    // --- queue -----------------------------------------------------------

    /// Queues each URL with the current format choice and starts a
    /// metadata lookup per row.
    pub fn add_urls(&mut self, urls: &[String], format: MediaFormat, resolution: Option<&str>) -> Vec<JobId> {
        let mut ids = Vec::with_capacity(urls.len());
        for url in urls {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            let id = self.queue.enqueue(url, format, resolution);
            debug!(%id, url, "job queued");
            self.spawn_metadata(id, url.to_string());
            ids.push(id);
        }
        ids
    }

    fn spawn_metadata(&self, job: JobId, url: String) {
        let tx = self.events_tx.clone();
        let ytdlp = self.ytdlp.clone();
        self.runtime.spawn(async move {
            let result = fetch_video_info(&ytdlp, &url).await.map_err(|e| e.to_string());
            let thumb_url = result.as_ref().ok().and_then(|info| info.thumbnail.clone());
            let _ = tx.send(SessionEvent::Metadata { job, result });

            if let Some(thumb_url) = thumb_url {
                let result = match tokio::task::spawn_blocking(move || fetch_thumbnail(&thumb_url)).await {
                    Ok(fetched) => fetched.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                let _ = tx.send(SessionEvent::Thumbnail { job, result });
            }
        });
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        info!("queue started");
        self.running = true;
        self.advance();
    }

    /// Lets the current download finish but starts nothing after it
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        info!("queue stopped");
        if self.queue.active().is_some() {
            self.log_key(LogLevel::Retry, "msg_queue_stopped");
        }
    }

    pub fn clear_finished(&mut self) -> usize {
        self.queue.clear_finished()
    }

    /// Applies every pending worker event, then moves the queue on.
    /// Returns `true` when anything visible changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.download_rx.try_recv() {
            self.on_worker_event(event);
            changed = true;
        }
        while let Ok(event) = self.events_rx.try_recv() {
            self.on_session_event(event);
            changed = true;
        }
        self.advance() || changed
    }

    fn advance(&mut self) -> bool {
        if !self.running || self.queue.active().is_some() {
            return false;
        }
        match self.queue.next_queued().map(|job| job.id) {
            Some(id) => {
                self.start_job(id);
            }
            None => {
                self.running = false;
                info!(summary = ?self.queue.summary(), "queue drained");
                self.log_key(LogLevel::Success, "msg_queue_done");
                if self.shutdown_when_done {
                    self.log_key(LogLevel::Retry, "log_shutdown");
                    if let Err(e) = system::initiate_shutdown() {
                        self.log(LogLevel::Error, e.to_string());
                    }
                }
            }
        }
        true
    }

    fn start_job(&mut self, id: JobId) {
        let job = match self.queue.begin(id) {
            Ok(job) => job.clone(),
            Err(e) => {
                warn!(error = %e, "could not start job");
                return;
            }
        };
        if let Some((current, total)) = self.queue.position(id) {
            let (current, total) = (current.to_string(), total.to_string());
            let msg = self.t_args(
                "msg_batch_start",
                &[("current", current.as_str()), ("total", total.as_str())],
            );
            self.log(LogLevel::Success, msg);
        }
        self.log_key(LogLevel::Retry, "log_download_start");

        let cmd = DownloadCommand::build(
            &self.ytdlp,
            &self.settings.video,
            &job,
            &self.settings.output_dir,
            self.ffmpeg.as_deref(),
        );
        debug!(%id, args = ?cmd.args, "downloader command");
        self.runtime.spawn(spawn_download(id, cmd, self.download_tx.clone()));
    }

    fn on_worker_event(&mut self, event: WorkerEvent) {
        let applied = match event {
            WorkerEvent::Started { .. } => Ok(()),
            WorkerEvent::Progress { job, percent } => self.queue.set_progress(job, percent),
            WorkerEvent::Merging { job } => self.queue.set_merging(job),
            WorkerEvent::Output { line, .. } => {
                self.log(LogLevel::Retry, line);
                Ok(())
            }
            WorkerEvent::Finished { job, outcome } => self.on_finished(job, outcome),
        };
        if let Err(e) = applied {
            warn!(error = %e, "dropped worker event");
        }
    }

    fn on_finished(&mut self, job: JobId, outcome: Outcome) -> Result<()> {
        self.queue.finish(job, &outcome)?;
        match outcome {
            Outcome::Success { file_name } => {
                let msg = format!("{} ➤ {}", self.t("log_download_success"), file_name);
                self.log(LogLevel::Success, msg);
            }
            Outcome::Failure { reason } => {
                let msg = format!("{} ({})", self.t("log_download_error"), reason);
                self.log(LogLevel::Error, msg);
            }
        }
        Ok(())
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Metadata { job, result: Ok(info) } => {
                if let Err(e) = self.queue.set_title(job, &info.title) {
                    warn!(error = %e, "metadata for a removed job");
                    return;
                }
                let found = self.t_args("log_title_found", &[("title", info.title.as_str())]);
                self.log(LogLevel::Retry, found);
                let (res, dur) = (info.resolution_label(), info.duration_label());
                let preview = self.t_args("log_preview_found", &[("res", res.as_str()), ("dur", dur.as_str())]);
                self.log(LogLevel::Retry, preview);
                if info.thumbnail.is_none() {
                    self.log_key(LogLevel::Error, "log_thumb_fail");
                }
            }
            SessionEvent::Metadata { job, result: Err(error) } => {
                if let Err(e) = self.queue.fail_metadata(job, &error) {
                    warn!(error = %e, "metadata failure for a removed job");
                }
                let msg = self.t_args("log_meta_fail", &[("error", error.as_str())]);
                self.log(LogLevel::Error, msg);
            }
            SessionEvent::Thumbnail { job, result: Ok(thumb) } => {
                self.thumbnails.insert(job, thumb);
                self.log_key(LogLevel::Success, "log_thumb_success");
            }
            SessionEvent::Thumbnail { job, result: Err(error) } => {
                debug!(%job, %error, "thumbnail fetch failed");
                self.log_key(LogLevel::Error, "log_thumb_fail");
            }
            SessionEvent::Dns { server, result } => self.on_dns(server, result),
        }
    }

    // --- extras ----------------------------------------------------------

    pub fn probe_dns(&mut self) {
        if self.dns_state == DnsState::Checking {
            self.log_key(LogLevel::Retry, "log_dns_busy");
            return;
        }
        self.dns_state = DnsState::Checking;
        let server = self.settings.dns.dns_server.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = dns::probe(&server).await.map_err(|e| e.to_string());
            let _ = tx.send(SessionEvent::Dns { server, result });
        });
    }

    fn on_dns(&mut self, server: String, result: std::result::Result<Ipv4Addr, String>) {
        match result {
            Ok(ip) => {
                debug!(%ip, "dns probe resolved");
                self.dns_state = DnsState::Active;
                self.settings.dns.dns_active = true;
                let label = self.settings.dns.dns_label.clone();
                let msg = self.t_args("log_dns_active", &[("label", label.as_str()), ("server", server.as_str())]);
                self.log(LogLevel::Success, msg);
            }
            Err(error) => {
                self.dns_state = DnsState::Failed;
                self.settings.dns.dns_active = false;
                let msg = self.t_args("log_dns_failed", &[("server", server.as_str()), ("error", error.as_str())]);
                self.log(LogLevel::Error, msg);
            }
        }
    }

    pub fn change_dns(&mut self, server: &str) {
        let path = self.settings.dns_path();
        match self.settings.dns.set_custom_server(server, &path) {
            Ok(()) => {
                self.dns_state = DnsState::Inactive;
                let msg = self.t_args("log_dns_changed", &[("server", server.trim())]);
                self.log(LogLevel::Success, msg);
            }
            Err(e) => self.log(LogLevel::Error, e.to_string()),
        }
    }

    pub fn set_output_dir(&mut self, dir: PathBuf) {
        info!(dir = %dir.display(), "output folder changed");
        self.settings.output_dir = dir;
    }

    pub fn open_output_folder(&mut self) {
        let path = self.settings.output_dir.clone();
        let path_text = path.display().to_string();
        match system::open_folder(&path) {
            Ok(()) => {
                let msg = self.t_args("log_folder_open", &[("path", path_text.as_str())]);
                self.log(LogLevel::Success, msg);
            }
            Err(e) => {
                let error = e.to_string();
                let msg = self.t_args("log_folder_fail", &[("error", error.as_str())]);
                self.log(LogLevel::Error, msg);
            }
        }
    }

    pub fn reset_log(&mut self) {
        if let Err(e) = self.log.reset() {
            warn!(error = %e, "failed to reset activity log");
        }
    }
}
