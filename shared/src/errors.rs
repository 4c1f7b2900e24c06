use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Every way a submit-and-wait run can stop short of a full render.
///
/// Recoverable variants (`ProjectKindMismatch`, `OutOfRangeSelection`, `JobCreationFailure`,
/// `StaleStateClearFailure`) are produced and handled inside their stage; the rest end the run.
#[derive(Error, Diagnostic, Debug)]
pub enum RenderQueueError {
    #[error("Could not log in to the render queue service.")]
    #[diagnostic(code(rq::authentication_failure))]
    AuthenticationFailure,

    #[error("Project selection aborted by the operator.")]
    #[diagnostic(code(rq::user_abort))]
    UserAbort,

    #[error("No project named {name:?} exists on the render queue service.")]
    #[diagnostic(code(rq::project_not_found))]
    ProjectNotFound { name: String },

    #[error("Project {name:?} is of kind {actual}, but a {expected} project is required.")]
    #[diagnostic(code(rq::project_kind_mismatch))]
    ProjectKindMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Selection {selection} is out of range (1..={available}, or 0 to abort).")]
    #[diagnostic(code(rq::out_of_range_selection))]
    OutOfRangeSelection { selection: String, available: usize },

    #[error("Could not clear stale images on project {project:?}.")]
    #[diagnostic(code(rq::stale_state_clear_failure), severity(Warning))]
    StaleStateClearFailure { project: String },

    #[error("Could not create a render job for {file:?} after {attempts} attempt(s): {reason}")]
    #[diagnostic(code(rq::job_creation_failure))]
    JobCreationFailure {
        file: PathBuf,
        attempts: u32,
        reason: String,
    },

    #[error("Could not package render input {file:?}.")]
    #[diagnostic(code(rq::packaging_failure))]
    Packaging {
        file: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Aborting submission: {failed_files} input files in a row failed to produce a job.")]
    #[diagnostic(code(rq::too_many_failed_files))]
    TooManyFailedFiles { failed_files: u32 },

    #[error("No render jobs were created for the batch.")]
    #[diagnostic(code(rq::no_jobs_created))]
    NoJobsCreated,

    #[error("The render queue refused to start rendering project {project:?}.")]
    #[diagnostic(code(rq::remote_mode_switch_failure))]
    RemoteModeSwitchFailure { project: String },

    #[error("Timed out after {waited:?} with {pending} job(s) still pending.")]
    #[diagnostic(
        code(rq::poll_timeout),
        help("Submitted jobs keep running remotely; already downloaded results stay on disk.")
    )]
    PollTimeout { waited: Duration, pending: usize },

    #[error("Could not download file {file_id} for job {job_id}: {reason}")]
    #[diagnostic(code(rq::download_failure))]
    DownloadFailure {
        job_id: u64,
        file_id: u64,
        reason: String,
        /// Transport error from the gateway; `None` when the service reported the failure itself.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("Render input {path:?} does not exist or is not a readable file.")]
    #[diagnostic(code(rq::missing_input))]
    MissingInput { path: PathBuf },

    #[error("Submission batch is empty.")]
    #[diagnostic(code(rq::empty_batch))]
    EmptyBatch,

    #[error("Render queue service error.")]
    #[diagnostic(code(rq::remote))]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Could not read operator input.")]
    #[diagnostic(code(rq::operator_input))]
    OperatorInput(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Local I/O error.")]
    #[diagnostic(code(rq::io))]
    Io(#[from] std::io::Error),
}

impl RenderQueueError {
    /// Wraps an error coming back from the remote gateway.
    pub fn remote(report: miette::Report) -> Self {
        Self::Remote(report.into())
    }

    pub fn operator_input(report: miette::Report) -> Self {
        Self::OperatorInput(report.into())
    }

    pub fn packaging(file: &std::path::Path, report: miette::Report) -> Self {
        Self::Packaging {
            file: file.to_path_buf(),
            source: report.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProjectKindMismatch { .. }
                | Self::OutOfRangeSelection { .. }
                | Self::StaleStateClearFailure { .. }
                | Self::JobCreationFailure { .. }
        )
    }
}
