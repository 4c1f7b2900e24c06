use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use miette::{miette, Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use crate::jobs::ProjectKind;


/// A render job that reached `Finished` and whose files were downloaded.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FinishedJob {
    pub job_id: u64,

    /// Render input the job was created from.
    pub source: PathBuf,

    /// Zero means the remote renderer reported success.
    pub error_code: i64,

    pub image_path: Option<PathBuf>,

    pub log_path: Option<PathBuf>,

    pub downloaded_at: DateTime<Utc>,
}

impl FinishedJob {
    pub fn succeeded(&self) -> bool {
        self.error_code == 0
    }
}


#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RenderReport {
    pub project_id: u64,

    pub project_name: String,

    pub kind: ProjectKind,

    /// Number of render inputs in the submitted batch.
    pub batch_size: usize,

    /// Inputs for which no job could be created.
    pub abandoned_files: Vec<PathBuf>,

    /// Finished jobs in the order they were downloaded.
    pub jobs: Vec<FinishedJob>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl RenderReport {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &FinishedJob> {
        self.jobs.iter().filter(|job| !job.succeeded())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            create_dir_all(parent)
                .into_diagnostic()
                .wrap_err_with(|| miette!("Could not create report directory."))?;
        }

        let serialized = serde_json::to_string_pretty(self)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not serialize render report."))?;

        write(path, serialized)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not write render report to {:?}.", path))
    }
}
