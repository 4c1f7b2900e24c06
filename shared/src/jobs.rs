use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use miette::{miette, Result};
use serde::{Deserialize, Serialize};

use crate::errors::RenderQueueError;

pub const FRAME_FILE_EXTENSION: &str = "pov";


/// What a remote project renders, and therefore what kind of batch it accepts.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Debug)]
pub enum ProjectKind {
    Image,
    Animation,
}

impl Display for ProjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectKind::Image => write!(f, "image"),
            ProjectKind::Animation => write!(f, "animation"),
        }
    }
}

impl FromStr for ProjectKind {
    type Err = miette::Report;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ProjectKind::Image),
            "animation" => Ok(ProjectKind::Animation),
            other => Err(miette!("Unknown project kind: {}", other)),
        }
    }
}


/// The ordered, validated list of render inputs for one orchestration run.
///
/// Construction checks that every input is an existing, readable file. The batch
/// cannot be changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionBatch {
    kind: ProjectKind,
    files: Vec<PathBuf>,
}

impl SubmissionBatch {
    pub fn new(kind: ProjectKind, files: Vec<PathBuf>) -> Result<Self, RenderQueueError> {
        if files.is_empty() {
            return Err(RenderQueueError::EmptyBatch);
        }

        for file in &files {
            ensure_readable_file(file)?;
        }

        Ok(Self { kind, files })
    }

    pub fn single_image<P: Into<PathBuf>>(file: P) -> Result<Self, RenderQueueError> {
        Self::new(ProjectKind::Image, vec![file.into()])
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn ensure_readable_file(path: &Path) -> Result<(), RenderQueueError> {
    let missing = || RenderQueueError::MissingInput {
        path: path.to_path_buf(),
    };

    if !path.is_file() {
        return Err(missing());
    }

    File::open(path).map(|_| ()).map_err(|_| missing())
}


/// Collects animation frame files before they are submitted as one batch.
///
/// Frames are named `<directory>/<prefix><frame:05>.pov`, counting from zero.
pub struct AnimationBatchBuilder {
    directory: PathBuf,
    name_prefix: String,
    frames: Vec<PathBuf>,
}

impl AnimationBatchBuilder {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(directory: P, name_prefix: S) -> Self {
        Self {
            directory: directory.into(),
            name_prefix: name_prefix.into(),
            frames: Vec::new(),
        }
    }

    pub fn frame_path(&self, frame_index: usize) -> PathBuf {
        self.directory.join(format!(
            "{}{:05}.{}",
            self.name_prefix, frame_index, FRAME_FILE_EXTENSION
        ))
    }

    /// Records the next frame (as written by a scene generator) and returns its path.
    pub fn push_next_frame(&mut self) -> PathBuf {
        let path = self.frame_path(self.frames.len());
        self.frames.push(path.clone());
        path
    }

    pub fn push_frame<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.frames.push(path.into());
        self
    }

    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        for _ in 0..frame_count {
            self.push_next_frame();
        }
        self
    }

    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    pub fn build(self) -> Result<SubmissionBatch, RenderQueueError> {
        SubmissionBatch::new(ProjectKind::Animation, self.frames)
    }
}
