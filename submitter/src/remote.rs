//! The render queue service as seen from the submitter.
//!
//! Session handling, the project/image/file API and the transport all live behind
//! [`RenderQueueService`]; this crate only sequences calls against it.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use miette::Result;
use shared::jobs::ProjectKind;

pub type ProjectId = u64;
pub type JobId = u64;
pub type FileId = u64;

/// Literal project status reported once every image of a project has been rendered.
pub const PROJECT_FINISHED_STATUS: &str = "Finished";


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub kind: ProjectKind,
    pub status: String,
}

impl Project {
    pub fn is_finished(&self) -> bool {
        self.status == PROJECT_FINISHED_STATUS
    }
}


#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Rendering,
    Finished,
    Other(String),
}

impl From<&str> for JobStatus {
    fn from(status: &str) -> Self {
        match status {
            "Queued" => JobStatus::Queued,
            "Rendering" => JobStatus::Rendering,
            "Finished" => JobStatus::Finished,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Rendering => write!(f, "Rendering"),
            JobStatus::Finished => write!(f, "Finished"),
            JobStatus::Other(other) => write!(f, "{other}"),
        }
    }
}


/// Local snapshot of a remote image (one render job).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderJob {
    pub id: JobId,
    pub status: JobStatus,
    /// Only meaningful once `status` is `Finished`.
    pub error_code: i64,
    pub render_image_id: Option<FileId>,
    pub log_file_id: Option<FileId>,
}

impl RenderJob {
    pub fn new_queued(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            error_code: 0,
            render_image_id: None,
            log_file_id: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    pub fn error_code(&self) -> Option<i64> {
        self.is_finished().then_some(self.error_code)
    }
}


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub md5sum: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchStatus {
    Downloaded,
    Failed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedFile {
    pub status: FetchStatus,
    pub local_path: PathBuf,
}


/// Calls the submitter makes against the remote render queue.
///
/// Transport failures come back as `Err` and are propagated by the callers; they are
/// never retried here.
pub trait RenderQueueService {
    fn login(&mut self) -> Result<bool>;

    fn query_all_projects(&mut self) -> Result<Vec<Project>>;

    /// Discards queued and failed images left over from earlier runs.
    fn clear_images(&mut self, project: &Project) -> Result<bool>;

    /// Switches the project into render mode.
    fn start_rendering(&mut self, project: &Project) -> Result<bool>;

    fn reset_project(&mut self, project: &Project) -> Result<bool>;

    /// Re-reads the project's aggregate status.
    fn refresh_project(&mut self, project: &mut Project) -> Result<()>;

    /// Uploads an archive as a new image. `None` means the service rejected it.
    fn create_image(&mut self, project_id: ProjectId, archive_path: &Path) -> Result<Option<JobId>>;

    fn query_image(&mut self, id: JobId) -> Result<RenderJob>;

    fn refresh_image(&mut self, job: &mut RenderJob) -> Result<()>;

    fn file_metadata(&mut self, file_id: FileId) -> Result<FileMetadata>;

    fn fetch_file(&mut self, file_id: FileId, directory: &Path, md5sum: &str) -> Result<FetchedFile>;
}
