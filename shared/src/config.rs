use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ARCHIVE_OWNER: &str = "rayqueue";
pub const DEFAULT_ARCHIVE_FILE_NAME: &str = "rq_upload.tar.gz";

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_timeout_seconds() -> u64 {
    3600
}

fn default_max_creation_attempts() -> u32 {
    3
}

fn default_max_failed_files() -> u32 {
    3
}

fn default_image_width() -> u32 {
    640
}

fn default_image_height() -> u32 {
    480
}

fn default_work_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_archive_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_ARCHIVE_FILE_NAME)
}

fn default_archive_owner() -> String {
    String::from(DEFAULT_ARCHIVE_OWNER)
}


/// Settings for one submit-and-wait run, usually loaded from a TOML file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SubmitterConfig {
    /// When set, the project is looked up by exact name instead of asking the operator.
    #[serde(default)]
    pub project_name: Option<String>,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Total time the render waiter sleeps before giving up on pending jobs.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Creation attempts per input file (first attempt included).
    #[serde(default = "default_max_creation_attempts")]
    pub max_creation_attempts: u32,

    /// Input files in a row that may fail to produce a job before the batch is abandoned.
    #[serde(default = "default_max_failed_files")]
    pub max_failed_files: u32,

    #[serde(default = "default_image_width")]
    pub image_width: u32,

    #[serde(default = "default_image_height")]
    pub image_height: u32,

    /// Directory the `scene.ini` manifest is written into.
    #[serde(default = "default_work_directory")]
    pub work_directory: PathBuf,

    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,

    /// Owner and group name written into every archive entry.
    #[serde(default = "default_archive_owner")]
    pub archive_owner: String,

    /// If set, the render report is written here as JSON after a successful run.
    #[serde(default)]
    pub report_file: Option<PathBuf>,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            poll_interval_seconds: default_poll_interval_seconds(),
            timeout_seconds: default_timeout_seconds(),
            max_creation_attempts: default_max_creation_attempts(),
            max_failed_files: default_max_failed_files(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            work_directory: default_work_directory(),
            archive_path: default_archive_path(),
            archive_owner: default_archive_owner(),
            report_file: None,
        }
    }
}

impl SubmitterConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() && !path.is_file() {
            return Err(miette!("Path exists, but it is not a file!"));
        } else if !path.exists() {
            return Err(miette!("No such file: {:?}", path));
        }

        let file_contents = read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not read configuration from file."))?;

        Self::from_toml_str(&file_contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not parse TOML contents of configuration file."))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(miette!("poll_interval_seconds must be at least 1."));
        }

        if self.max_creation_attempts == 0 {
            return Err(miette!("max_creation_attempts must be at least 1."));
        }

        if self.max_failed_files == 0 {
            return Err(miette!("max_failed_files must be at least 1."));
        }

        if self.image_width == 0 || self.image_height == 0 {
            return Err(miette!(
                "Image dimensions must be non-zero (got {}x{}).",
                self.image_width,
                self.image_height
            ));
        }

        if self.archive_owner.is_empty() {
            return Err(miette!("archive_owner must not be empty."));
        }

        if let Some(name) = &self.project_name {
            if name.trim().is_empty() {
                return Err(miette!("project_name is set, but empty."));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not serialize configuration to TOML."))
    }
}
