use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use shared::errors::RenderQueueError;
use shared::results::FinishedJob;
use tracing::{debug, info, trace, warn};

use crate::remote::{FetchStatus, FileId, JobId, JobStatus, Project, RenderQueueService};
use crate::submission::SubmittedJob;


/// Blocking wait between two polls.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

#[derive(Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PollProgress {
    pub queued: usize,
    pub rendering: usize,
    pub finished: usize,
}


/// Polls submitted jobs until all of them are downloaded and the project reports `Finished`.
pub struct RenderWaiter<'a, S: RenderQueueService + ?Sized> {
    service: &'a mut S,
    pause: &'a mut dyn Pause,
    poll_interval: Duration,
    timeout: Duration,
}

impl<'a, S: RenderQueueService + ?Sized> RenderWaiter<'a, S> {
    pub fn new(
        service: &'a mut S,
        pause: &'a mut dyn Pause,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            pause,
            poll_interval,
            timeout,
        }
    }

    /// Downloads each job's image and log into `output_directory` as soon as it finishes.
    ///
    /// Gives up with [`RenderQueueError::PollTimeout`] once the total time spent pausing
    /// reaches the timeout. Nothing is cancelled remotely in that case, and files downloaded
    /// so far stay in `output_directory`.
    pub fn wait_for_jobs(
        &mut self,
        project: &mut Project,
        jobs: Vec<SubmittedJob>,
        output_directory: &Path,
    ) -> Result<Vec<FinishedJob>, RenderQueueError> {
        let batch_size = jobs.len();
        let mut pending = jobs;
        let mut finished: Vec<FinishedJob> = Vec::with_capacity(batch_size);
        let mut waited = Duration::ZERO;

        loop {
            self.service
                .refresh_project(project)
                .map_err(RenderQueueError::remote)?;

            pending = self.poll_pending_jobs(pending, output_directory, &mut finished)?;

            let progress = summarize(&pending, batch_size);
            info!(
                project = %project.name,
                queued = progress.queued,
                rendering = progress.rendering,
                finished = progress.finished,
                total = batch_size,
                "Render progress."
            );

            if pending.is_empty() {
                if project.is_finished() {
                    info!(project = %project.name, "All render jobs finished.");
                    return Ok(finished);
                }

                warn!(
                    project = %project.name,
                    project_status = %project.status,
                    "Every job is finished, but the project is not. Waiting for it to catch up."
                );
            }

            if waited >= self.timeout {
                return Err(RenderQueueError::PollTimeout {
                    waited,
                    pending: pending.len(),
                });
            }

            trace!(interval = ?self.poll_interval, "Waiting before next poll.");
            self.pause.pause(self.poll_interval);
            waited += self.poll_interval;
        }
    }

    fn poll_pending_jobs(
        &mut self,
        pending: Vec<SubmittedJob>,
        output_directory: &Path,
        finished: &mut Vec<FinishedJob>,
    ) -> Result<Vec<SubmittedJob>, RenderQueueError> {
        let mut still_pending = Vec::with_capacity(pending.len());

        for mut submitted in pending {
            self.service
                .refresh_image(&mut submitted.job)
                .map_err(RenderQueueError::remote)?;

            if submitted.job.is_finished() {
                finished.push(self.download_finished_job(submitted, output_directory)?);
            } else {
                still_pending.push(submitted);
            }
        }

        Ok(still_pending)
    }

    fn download_finished_job(
        &mut self,
        submitted: SubmittedJob,
        output_directory: &Path,
    ) -> Result<FinishedJob, RenderQueueError> {
        let job = submitted.job;

        let image_path = job
            .render_image_id
            .map(|file_id| self.download_file(job.id, file_id, output_directory))
            .transpose()?;

        let log_path = job
            .log_file_id
            .map(|file_id| self.download_file(job.id, file_id, output_directory))
            .transpose()?;

        if job.error_code != 0 {
            warn!(
                job_id = job.id,
                source = %submitted.source.display(),
                error_code = job.error_code,
                "Render job finished with an error."
            );
        } else {
            info!(
                job_id = job.id,
                source = %submitted.source.display(),
                "Render job finished."
            );
        }

        Ok(FinishedJob {
            job_id: job.id,
            source: submitted.source,
            error_code: job.error_code,
            image_path,
            log_path,
            downloaded_at: Utc::now(),
        })
    }

    fn download_file(
        &mut self,
        job_id: JobId,
        file_id: FileId,
        output_directory: &Path,
    ) -> Result<PathBuf, RenderQueueError> {
        let download_failure =
            |reason: &str, source: Option<miette::Report>| RenderQueueError::DownloadFailure {
                job_id,
                file_id,
                reason: reason.to_string(),
                source: source.map(Into::into),
            };

        let metadata = self
            .service
            .file_metadata(file_id)
            .map_err(|error| download_failure("could not query file metadata", Some(error)))?;

        let fetched = self
            .service
            .fetch_file(file_id, output_directory, &metadata.md5sum)
            .map_err(|error| download_failure("could not fetch file", Some(error)))?;

        match fetched.status {
            FetchStatus::Downloaded => {
                debug!(
                    job_id,
                    file_id,
                    path = %fetched.local_path.display(),
                    "Downloaded file."
                );
                Ok(fetched.local_path)
            }
            FetchStatus::Failed { reason } => Err(download_failure(&reason, None)),
        }
    }
}

fn summarize(pending: &[SubmittedJob], batch_size: usize) -> PollProgress {
    let count = |status: JobStatus| {
        pending
            .iter()
            .filter(|submitted| submitted.job.status == status)
            .count()
    };

    PollProgress {
        queued: count(JobStatus::Queued),
        rendering: count(JobStatus::Rendering),
        finished: batch_size - pending.len(),
    }
}
