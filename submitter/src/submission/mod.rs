pub mod retry;

use std::path::{Path, PathBuf};

use shared::config::SubmitterConfig;
use shared::errors::RenderQueueError;
use shared::packaging::{package_render_input, PackagingOptions};
use tracing::{debug, error, info, warn};

use crate::remote::{Project, RenderJob, RenderQueueService};
use crate::submission::retry::{
    decide_retry,
    CreationAttemptState,
    FailedFileCounter,
    RemediationStrategy,
    RetryDecision,
    RetryPolicy,
};


/// A remote job together with the render input it was created from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedJob {
    pub job: RenderJob,
    pub source: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbandonedFile {
    pub file: PathBuf,
    pub state: CreationAttemptState,
}

/// Result of submitting a batch. `jobs` is never empty.
#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub jobs: Vec<SubmittedJob>,
    pub abandoned: Vec<AbandonedFile>,
    /// Set when too many files in a row failed and the rest of the batch was skipped.
    pub aborted_early: bool,
}

enum FileSubmission {
    Created(SubmittedJob),
    Abandoned(CreationAttemptState),
}


/// Packages and uploads render inputs one at a time.
pub struct JobSubmitter<'a, S: RenderQueueService + ?Sized> {
    service: &'a mut S,
    config: &'a SubmitterConfig,
}

impl<'a, S: RenderQueueService + ?Sized> JobSubmitter<'a, S> {
    pub fn new(service: &'a mut S, config: &'a SubmitterConfig) -> Self {
        Self { service, config }
    }

    pub fn create_jobs(
        &mut self,
        project: &Project,
        files: &[PathBuf],
        remediation: &mut dyn RemediationStrategy,
    ) -> Result<SubmissionOutcome, RenderQueueError> {
        let policy = RetryPolicy {
            max_attempts: self.config.max_creation_attempts,
        };
        let mut failed_files = FailedFileCounter::new(self.config.max_failed_files);

        let mut jobs: Vec<SubmittedJob> = Vec::with_capacity(files.len());
        let mut abandoned: Vec<AbandonedFile> = Vec::new();
        let mut aborted_early = false;

        for (file_index, file) in files.iter().enumerate() {
            info!(
                file = %file.display(),
                "Submitting render input {}/{}.",
                file_index + 1,
                files.len()
            );

            match self.submit_file(project, file, &policy, remediation)? {
                FileSubmission::Created(submitted) => {
                    failed_files.record_success();
                    jobs.push(submitted);
                }
                FileSubmission::Abandoned(state) => {
                    warn!(
                        file = %file.display(),
                        attempts = state.attempts,
                        "{}",
                        RenderQueueError::JobCreationFailure {
                            file: file.clone(),
                            attempts: state.attempts,
                            reason: state.last_error_or_unknown().to_string(),
                        }
                    );

                    abandoned.push(AbandonedFile {
                        file: file.clone(),
                        state,
                    });

                    if failed_files.record_failure() {
                        error!(
                            failed_files = failed_files.consecutive_failures(),
                            skipped = files.len() - file_index - 1,
                            "Too many input files in a row failed, not submitting the rest of the batch."
                        );
                        aborted_early = true;
                        break;
                    }
                }
            }
        }

        if jobs.is_empty() {
            return Err(if aborted_early {
                RenderQueueError::TooManyFailedFiles {
                    failed_files: failed_files.consecutive_failures(),
                }
            } else {
                RenderQueueError::NoJobsCreated
            });
        }

        info!(
            created = jobs.len(),
            abandoned = abandoned.len(),
            "Finished submitting render inputs."
        );

        Ok(SubmissionOutcome {
            jobs,
            abandoned,
            aborted_early,
        })
    }

    fn submit_file(
        &mut self,
        project: &Project,
        file: &Path,
        policy: &RetryPolicy,
        remediation: &mut dyn RemediationStrategy,
    ) -> Result<FileSubmission, RenderQueueError> {
        let options = PackagingOptions {
            work_directory: &self.config.work_directory,
            archive_path: &self.config.archive_path,
            archive_owner: &self.config.archive_owner,
            width: self.config.image_width,
            height: self.config.image_height,
        };

        // Dropping `archive` deletes it, whatever happens below.
        let (manifest, archive) = package_render_input(file, &options)
            .map_err(|report| RenderQueueError::packaging(file, report))?;

        debug!(
            scene = %manifest.scene,
            outfile = %manifest.outfile,
            archive = %archive.path().display(),
            "Packaged render input."
        );

        let mut state = CreationAttemptState::default();

        loop {
            match self.service.create_image(project.id, archive.path()) {
                Ok(Some(job_id)) => {
                    let job = self
                        .service
                        .query_image(job_id)
                        .map_err(RenderQueueError::remote)?;

                    info!(
                        file = %file.display(),
                        job_id,
                        attempts = state.attempts + 1,
                        "Created render job."
                    );

                    return Ok(FileSubmission::Created(SubmittedJob {
                        job,
                        source: file.to_path_buf(),
                    }));
                }
                Ok(None) => state.record_failure("the render queue rejected the archive"),
                Err(error) => state.record_failure(error.to_string()),
            }

            warn!(
                file = %file.display(),
                attempt = state.attempts,
                reason = state.last_error_or_unknown(),
                "Could not create render job."
            );

            let decision = decide_retry(&state, policy, |state| remediation.choose(file, state))
                .map_err(RenderQueueError::operator_input)?;

            match decision {
                RetryDecision::ResetAndRetry => {
                    let reset = self
                        .service
                        .reset_project(project)
                        .map_err(RenderQueueError::remote)?;

                    if reset {
                        info!(project = %project.name, "Project reset, retrying.");
                    } else {
                        warn!(project = %project.name, "Project reset was refused, retrying anyway.");
                    }
                }
                RetryDecision::GiveUp => return Ok(FileSubmission::Abandoned(state)),
            }
        }
    }
}
