use std::fs::create_dir_all;
use std::path::Path;

use chrono::Utc;
use shared::config::SubmitterConfig;
use shared::errors::RenderQueueError;
use shared::jobs::SubmissionBatch;
use shared::results::RenderReport;
use tracing::{error, info, warn};

use crate::console::OperatorConsole;
use crate::remote::RenderQueueService;
use crate::selector::{clear_stale_state, resolve_project, ProjectSelection};
use crate::submission::retry::{ConsoleRemediation, RemediationStrategy};
use crate::submission::JobSubmitter;
use crate::waiter::{Pause, RenderWaiter, ThreadSleep};


/// Runs one batch from login to the last download.
///
/// Still images and animations go through the same path; the batch's kind decides which
/// projects are acceptable.
pub struct RenderQueueOrchestrator<'a, S: RenderQueueService> {
    service: &'a mut S,
    console: &'a mut dyn OperatorConsole,
    config: &'a SubmitterConfig,
    pause: Box<dyn Pause + 'a>,
    remediation: Option<Box<dyn RemediationStrategy + 'a>>,
}

impl<'a, S: RenderQueueService> RenderQueueOrchestrator<'a, S> {
    pub fn new(
        service: &'a mut S,
        console: &'a mut dyn OperatorConsole,
        config: &'a SubmitterConfig,
    ) -> Self {
        Self {
            service,
            console,
            config,
            pause: Box::new(ThreadSleep),
            remediation: None,
        }
    }

    pub fn with_pause<P: Pause + 'a>(mut self, pause: P) -> Self {
        self.pause = Box::new(pause);
        self
    }

    /// Replaces the console prompt shown when a job cannot be created.
    pub fn with_remediation<R: RemediationStrategy + 'a>(mut self, remediation: R) -> Self {
        self.remediation = Some(Box::new(remediation));
        self
    }

    /// Like [`Self::run`], but only reports whether everything succeeded.
    pub fn submit_and_wait(&mut self, batch: &SubmissionBatch, output_directory: &Path) -> bool {
        match self.run(batch, output_directory) {
            Ok(report) => {
                let failed = report.failed_jobs().count();
                if failed > 0 {
                    warn!(failed, "Some render jobs finished with a non-zero error code.");
                }
                true
            }
            Err(RenderQueueError::UserAbort) => {
                info!("Submission aborted by operator.");
                false
            }
            Err(error) => {
                error!(error = ?error, "Submission failed: {}", error);
                false
            }
        }
    }

    pub fn run(
        &mut self,
        batch: &SubmissionBatch,
        output_directory: &Path,
    ) -> Result<RenderReport, RenderQueueError> {
        let started_at = Utc::now();

        info!(
            kind = %batch.kind(),
            files = batch.len(),
            "Submitting render batch."
        );

        // Results must be storable before anything is created remotely.
        create_dir_all(output_directory)?;

        /*
         * Log in.
         */
        let logged_in = self
            .service
            .login()
            .map_err(RenderQueueError::remote)?;
        if !logged_in {
            return Err(RenderQueueError::AuthenticationFailure);
        }
        info!("Logged in to the render queue service.");

        /*
         * Pick the project and clear what earlier runs left behind.
         */
        let selection = resolve_project(
            &mut *self.service,
            &mut *self.console,
            self.config.project_name.as_deref(),
            batch.kind(),
        )?;
        let mut project = match selection {
            ProjectSelection::Selected(project) => project,
            ProjectSelection::Aborted => return Err(RenderQueueError::UserAbort),
        };

        clear_stale_state(&mut *self.service, &project);

        /*
         * Package and upload every render input.
         */
        let mut console_remediation;
        let remediation: &mut dyn RemediationStrategy = match self.remediation.as_mut() {
            Some(remediation) => remediation.as_mut(),
            None => {
                console_remediation = ConsoleRemediation::new(&mut *self.console);
                &mut console_remediation
            }
        };

        let outcome = JobSubmitter::new(&mut *self.service, self.config).create_jobs(
            &project,
            batch.files(),
            remediation,
        )?;

        /*
         * Start rendering and wait for the results.
         */
        let started = self
            .service
            .start_rendering(&project)
            .map_err(RenderQueueError::remote)?;
        if !started {
            return Err(RenderQueueError::RemoteModeSwitchFailure {
                project: project.name.clone(),
            });
        }
        info!(project = %project.name, jobs = outcome.jobs.len(), "Rendering started.");

        let finished_jobs = RenderWaiter::new(
            &mut *self.service,
            self.pause.as_mut(),
            self.config.poll_interval(),
            self.config.timeout(),
        )
        .wait_for_jobs(&mut project, outcome.jobs, output_directory)?;

        let report = RenderReport {
            project_id: project.id,
            project_name: project.name.clone(),
            kind: batch.kind(),
            batch_size: batch.len(),
            abandoned_files: outcome
                .abandoned
                .into_iter()
                .map(|abandoned| abandoned.file)
                .collect(),
            jobs: finished_jobs,
            started_at,
            finished_at: Utc::now(),
        };

        if let Some(report_file) = &self.config.report_file {
            match report.save_to_file(report_file) {
                Ok(()) => info!(path = %report_file.display(), "Wrote render report."),
                Err(report_error) => warn!(
                    path = %report_file.display(),
                    error = ?report_error,
                    "Could not write render report."
                ),
            }
        }

        Ok(report)
    }
}
