#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use miette::{miette, Result};
use shared::config::SubmitterConfig;
use shared::jobs::ProjectKind;
use submitter::remote::{
    FetchStatus,
    FetchedFile,
    FileId,
    FileMetadata,
    JobId,
    JobStatus,
    Project,
    ProjectId,
    RenderJob,
    RenderQueueService,
};
use submitter::waiter::Pause;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Login,
    QueryAllProjects,
    ClearImages(ProjectId),
    StartRendering(ProjectId),
    ResetProject(ProjectId),
    RefreshProject(ProjectId),
    CreateImage {
        project_id: ProjectId,
        archive_existed: bool,
    },
    QueryImage(JobId),
    RefreshImage(JobId),
    FileMetadata(FileId),
    FetchFile(FileId),
}

/// One state a job reports on a `refresh_image` call.
#[derive(Clone, Debug)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub error_code: i64,
    pub render_image_id: Option<FileId>,
    pub log_file_id: Option<FileId>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status,
            error_code: 0,
            render_image_id: None,
            log_file_id: None,
        }
    }

    pub fn finished(render_image_id: Option<FileId>, log_file_id: Option<FileId>) -> Self {
        Self {
            status: JobStatus::Finished,
            error_code: 0,
            render_image_id,
            log_file_id,
        }
    }

    pub fn with_error_code(mut self, error_code: i64) -> Self {
        self.error_code = error_code;
        self
    }
}


/// In-memory render queue driven by prepared answers. Records every call.
pub struct ScriptedRenderQueue {
    pub login_result: bool,
    pub projects: Vec<Project>,
    pub clear_images_result: Result<bool, String>,
    pub start_rendering_result: bool,
    pub reset_result: bool,
    /// Answers for successive `create_image` calls; once empty, ids come from `next_job_id`.
    pub create_results: VecDeque<Option<JobId>>,
    pub next_job_id: JobId,
    /// Per job, the states returned by successive refreshes. The last one repeats.
    pub job_updates: HashMap<JobId, VecDeque<JobUpdate>>,
    /// Statuses returned by successive project refreshes. The last one repeats.
    pub project_statuses: VecDeque<String>,
    pub failing_downloads: HashSet<FileId>,
    /// Files whose metadata lookup fails with a transport error.
    pub unreachable_files: HashSet<FileId>,
    pub calls: Vec<Call>,
}

impl ScriptedRenderQueue {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            login_result: true,
            projects,
            clear_images_result: Ok(true),
            start_rendering_result: true,
            reset_result: true,
            create_results: VecDeque::new(),
            next_job_id: 1,
            job_updates: HashMap::new(),
            project_statuses: VecDeque::from([String::from("Finished")]),
            failing_downloads: HashSet::new(),
            unreachable_files: HashSet::new(),
            calls: Vec::new(),
        }
    }

    pub fn script_job<I: IntoIterator<Item = JobUpdate>>(&mut self, job_id: JobId, updates: I) {
        self.job_updates.insert(job_id, updates.into_iter().collect());
    }

    pub fn script_project_statuses<I: IntoIterator<Item = &'static str>>(&mut self, statuses: I) {
        self.project_statuses = statuses.into_iter().map(String::from).collect();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|recorded| *recorded == call).count()
    }

    pub fn count_matching<F: Fn(&Call) -> bool>(&self, predicate: F) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|recorded| recorded == call)
    }
}

fn next_in_script<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

impl RenderQueueService for ScriptedRenderQueue {
    fn login(&mut self) -> Result<bool> {
        self.calls.push(Call::Login);
        Ok(self.login_result)
    }

    fn query_all_projects(&mut self) -> Result<Vec<Project>> {
        self.calls.push(Call::QueryAllProjects);
        Ok(self.projects.clone())
    }

    fn clear_images(&mut self, project: &Project) -> Result<bool> {
        self.calls.push(Call::ClearImages(project.id));
        self.clear_images_result
            .clone()
            .map_err(|message| miette!("{}", message))
    }

    fn start_rendering(&mut self, project: &Project) -> Result<bool> {
        self.calls.push(Call::StartRendering(project.id));
        Ok(self.start_rendering_result)
    }

    fn reset_project(&mut self, project: &Project) -> Result<bool> {
        self.calls.push(Call::ResetProject(project.id));
        Ok(self.reset_result)
    }

    fn refresh_project(&mut self, project: &mut Project) -> Result<()> {
        self.calls.push(Call::RefreshProject(project.id));
        if let Some(status) = next_in_script(&mut self.project_statuses) {
            project.status = status;
        }
        Ok(())
    }

    fn create_image(&mut self, project_id: ProjectId, archive_path: &Path) -> Result<Option<JobId>> {
        self.calls.push(Call::CreateImage {
            project_id,
            archive_existed: archive_path.is_file(),
        });

        Ok(match self.create_results.pop_front() {
            Some(result) => result,
            None => {
                let id = self.next_job_id;
                self.next_job_id += 1;
                Some(id)
            }
        })
    }

    fn query_image(&mut self, id: JobId) -> Result<RenderJob> {
        self.calls.push(Call::QueryImage(id));
        Ok(RenderJob::new_queued(id))
    }

    fn refresh_image(&mut self, job: &mut RenderJob) -> Result<()> {
        self.calls.push(Call::RefreshImage(job.id));

        let update = self
            .job_updates
            .get_mut(&job.id)
            .and_then(next_in_script)
            .ok_or_else(|| miette!("No script for job {}.", job.id))?;

        job.status = update.status;
        job.error_code = update.error_code;
        job.render_image_id = update.render_image_id;
        job.log_file_id = update.log_file_id;
        Ok(())
    }

    fn file_metadata(&mut self, file_id: FileId) -> Result<FileMetadata> {
        self.calls.push(Call::FileMetadata(file_id));
        if self.unreachable_files.contains(&file_id) {
            return Err(miette!("connection reset by peer"));
        }
        Ok(FileMetadata {
            md5sum: format!("md5-{file_id}"),
        })
    }

    fn fetch_file(&mut self, file_id: FileId, directory: &Path, md5sum: &str) -> Result<FetchedFile> {
        self.calls.push(Call::FetchFile(file_id));
        let local_path = directory.join(format!("file-{file_id}.bin"));

        if self.failing_downloads.contains(&file_id) {
            return Ok(FetchedFile {
                status: FetchStatus::Failed {
                    reason: String::from("checksum mismatch"),
                },
                local_path,
            });
        }

        fs::write(&local_path, md5sum).map_err(|error| miette!("{}", error))?;
        Ok(FetchedFile {
            status: FetchStatus::Downloaded,
            local_path,
        })
    }
}


/// Records requested pauses instead of sleeping.
#[derive(Clone, Default)]
pub struct RecordingPause {
    pauses: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingPause {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}


pub fn project(id: ProjectId, name: &str, kind: ProjectKind) -> Project {
    Project {
        id,
        name: name.to_string(),
        kind,
        status: String::from("Created"),
    }
}

pub fn test_config(directory: &Path) -> SubmitterConfig {
    SubmitterConfig {
        poll_interval_seconds: 5,
        timeout_seconds: 60,
        work_directory: directory.to_path_buf(),
        archive_path: directory.join("upload.tar.gz"),
        ..SubmitterConfig::default()
    }
}

pub fn write_scenes(directory: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = directory.join(name);
            fs::write(&path, format!("// {name}\nsphere {{ <0,0,0>, 1 }}\n")).expect("write scene");
            path
        })
        .collect()
}
