//! Session download queue: an ordered list of jobs processed one at a time.

use crate::error::{Result, ShrineError};
use crate::model::{Job, JobId, JobStatus, MediaFormat, Outcome};

/// Splits the batch text box into URLs, one per non-blank line
pub fn parse_batch(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-status counts for the queue header
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueSummary {
    pub queued: usize,
    pub downloading: usize,
    pub completed: usize,
    pub error: usize,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.queued + self.downloading + self.completed + self.error
    }
}

#[derive(Debug, Default)]
pub struct DownloadQueue {
    jobs: Vec<Job>,
    next_id: u64,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn get_mut(&mut self, id: JobId) -> Result<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(ShrineError::UnknownJob(id))
    }

    pub fn enqueue(&mut self, url: &str, format: MediaFormat, resolution: Option<&str>) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        let resolution = match format {
            MediaFormat::Video => resolution.map(str::to_string),
            MediaFormat::Audio => None,
        };
        self.jobs.push(Job {
            id,
            url: url.trim().to_string(),
            format,
            resolution,
            status: JobStatus::Queued,
            title: None,
            progress: 0,
            merging: false,
            detail: None,
        });
        id
    }

    /// First job, in insertion order, that has not started yet
    pub fn next_queued(&self) -> Option<&Job> {
        self.jobs.iter().find(|j| j.status == JobStatus::Queued)
    }

    /// The job currently handed to the downloader, if any
    pub fn active(&self) -> Option<&Job> {
        self.jobs.iter().find(|j| j.status == JobStatus::Downloading)
    }

    /// 1-based position of `id` among the jobs of this run, for the
    /// "item N/M" log line
    pub fn position(&self, id: JobId) -> Option<(usize, usize)> {
        let idx = self.jobs.iter().position(|j| j.id == id)?;
        Some((idx + 1, self.jobs.len()))
    }

    pub fn begin(&mut self, id: JobId) -> Result<&Job> {
        if let Some(active) = self.active() {
            if active.id != id {
                return Err(ShrineError::InvalidTransition {
                    id,
                    from: JobStatus::Queued,
                    to: JobStatus::Downloading,
                });
            }
        }
        let job = self.get_mut(id)?;
        if job.status != JobStatus::Queued {
            return Err(ShrineError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Downloading,
            });
        }
        job.status = JobStatus::Downloading;
        job.progress = 0;
        job.merging = false;
        Ok(job)
    }

    /// Progress lines arriving after the job finished are ignored.
    pub fn set_progress(&mut self, id: JobId, percent: u8) -> Result<()> {
        let job = self.get_mut(id)?;
        if job.status == JobStatus::Downloading {
            job.progress = percent.min(100);
        }
        Ok(())
    }

    pub fn set_merging(&mut self, id: JobId) -> Result<()> {
        let job = self.get_mut(id)?;
        if job.status == JobStatus::Downloading {
            job.merging = true;
        }
        Ok(())
    }

    pub fn set_title(&mut self, id: JobId, title: &str) -> Result<()> {
        self.get_mut(id)?.title = Some(title.to_string());
        Ok(())
    }

    pub fn finish(&mut self, id: JobId, outcome: &Outcome) -> Result<&Job> {
        let job = self.get_mut(id)?;
        let to = if outcome.is_success() {
            JobStatus::Completed
        } else {
            JobStatus::Error
        };
        if job.status != JobStatus::Downloading {
            return Err(ShrineError::InvalidTransition {
                id,
                from: job.status,
                to,
            });
        }
        job.status = to;
        job.merging = false;
        match outcome {
            Outcome::Success { file_name } => {
                job.progress = 100;
                job.detail = Some(file_name.clone());
            }
            Outcome::Failure { reason } => {
                job.progress = 0;
                job.detail = Some(reason.clone());
            }
        }
        Ok(job)
    }

    /// Returns `true` when the job was still waiting and is now `Error`.
    pub fn fail_metadata(&mut self, id: JobId, reason: &str) -> Result<bool> {
        let job = self.get_mut(id)?;
        if job.status != JobStatus::Queued {
            return Ok(false);
        }
        job.status = JobStatus::Error;
        job.detail = Some(reason.to_string());
        Ok(true)
    }

    pub fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Queued => summary.queued += 1,
                JobStatus::Downloading => summary.downloading += 1,
                JobStatus::Completed => summary.completed += 1,
                JobStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Drops completed and failed rows; returns how many were removed
    pub fn clear_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !j.status.is_finished());
        before - self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> Outcome {
        Outcome::Success {
            file_name: "a.mp4".into(),
        }
    }

    #[test]
    fn batch_text_skips_blank_lines() {
        let urls = parse_batch("  https://a \n\n\thttps://b\n   \nhttps://c");
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        assert!(parse_batch(" \n \n").is_empty());
    }

    #[test]
    fn audio_jobs_drop_resolution() {
        let mut q = DownloadQueue::new();
        let id = q.enqueue("https://a", MediaFormat::Audio, Some("720p"));
        assert_eq!(q.get(id).unwrap().resolution, None);
        let id = q.enqueue("https://b", MediaFormat::Video, Some("720p"));
        assert_eq!(q.get(id).unwrap().resolution.as_deref(), Some("720p"));
    }

    #[test]
    fn jobs_run_in_insertion_order() {
        let mut q = DownloadQueue::new();
        let a = q.enqueue("https://a", MediaFormat::Video, Some("720p"));
        let b = q.enqueue("https://b", MediaFormat::Video, Some("720p"));

        assert_eq!(q.next_queued().map(|j| j.id), Some(a));
        q.begin(a).unwrap();
        assert_eq!(q.next_queued().map(|j| j.id), Some(b));
        q.finish(a, &success()).unwrap();
        q.begin(b).unwrap();
        q.finish(b, &Outcome::Failure { reason: "exit code 1".into() })
            .unwrap();

        assert!(q.next_queued().is_none());
        assert_eq!(q.get(a).unwrap().status, JobStatus::Completed);
        assert_eq!(q.get(a).unwrap().progress, 100);
        assert_eq!(q.get(b).unwrap().status, JobStatus::Error);
    }

    #[test]
    fn only_one_job_downloads_at_a_time() {
        let mut q = DownloadQueue::new();
        let a = q.enqueue("https://a", MediaFormat::Video, None);
        let b = q.enqueue("https://b", MediaFormat::Video, None);
        q.begin(a).unwrap();
        assert!(matches!(
            q.begin(b),
            Err(ShrineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn finishing_a_queued_job_is_rejected() {
        let mut q = DownloadQueue::new();
        let a = q.enqueue("https://a", MediaFormat::Video, None);
        let err = q.finish(a, &success()).unwrap_err();
        assert!(matches!(
            err,
            ShrineError::InvalidTransition {
                from: JobStatus::Queued,
                to: JobStatus::Completed,
                ..
            }
        ));
        q.begin(a).unwrap();
        q.finish(a, &success()).unwrap();
        assert!(q.finish(a, &success()).is_err());
        assert!(q.begin(a).is_err());
    }

    #[test]
    fn progress_is_ignored_outside_downloading() {
        let mut q = DownloadQueue::new();
        let a = q.enqueue("https://a", MediaFormat::Video, None);
        q.set_progress(a, 40).unwrap();
        assert_eq!(q.get(a).unwrap().progress, 0);
        q.begin(a).unwrap();
        q.set_progress(a, 40).unwrap();
        q.set_merging(a).unwrap();
        assert_eq!(q.get(a).unwrap().progress, 40);
        assert!(q.get(a).unwrap().merging);
        q.finish(a, &success()).unwrap();
        q.set_progress(a, 10).unwrap();
        assert_eq!(q.get(a).unwrap().progress, 100);
        assert!(!q.get(a).unwrap().merging);
    }

    #[test]
    fn metadata_failure_only_hits_waiting_jobs() {
        let mut q = DownloadQueue::new();
        let a = q.enqueue("https://a", MediaFormat::Video, None);
        let b = q.enqueue("https://b", MediaFormat::Video, None);
        q.begin(a).unwrap();

        assert!(!q.fail_metadata(a, "boom").unwrap());
        assert_eq!(q.get(a).unwrap().status, JobStatus::Downloading);
        assert!(q.fail_metadata(b, "boom").unwrap());
        assert_eq!(q.get(b).unwrap().status, JobStatus::Error);
        assert!(q.next_queued().is_none());
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut q = DownloadQueue::new();
        assert!(matches!(
            q.set_title(JobId(42), "x"),
            Err(ShrineError::UnknownJob(JobId(42)))
        ));
    }

    #[test]
    fn summary_and_clear_finished() {
        let mut q = DownloadQueue::new();
        let a = q.enqueue("https://a", MediaFormat::Video, None);
        let b = q.enqueue("https://b", MediaFormat::Video, None);
        q.enqueue("https://c", MediaFormat::Audio, None);
        q.begin(a).unwrap();
        q.finish(a, &success()).unwrap();
        q.fail_metadata(b, "no such video").unwrap();

        let summary = q.summary();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(q.position(b), Some((2, 3)));

        assert_eq!(q.clear_finished(), 2);
        assert_eq!(q.jobs().len(), 1);
    }
}
