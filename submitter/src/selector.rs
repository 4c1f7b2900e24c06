use shared::errors::RenderQueueError;
use shared::jobs::ProjectKind;
use tracing::{debug, info, warn};

use crate::console::OperatorConsole;
use crate::remote::{Project, RenderQueueService};

pub const SELECTION_PROMPT: &str = "Select a project (0 to abort): ";


#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectSelection {
    Selected(Project),
    Aborted,
}


/// Decides which remote project receives the batch.
///
/// With a configured `project_name` the project is looked up by exact name. That path does
/// not compare the project kind against `expected_kind`: a mismatch is only logged. Without a
/// name, the operator picks from a numbered list until they choose a project of the right kind
/// or enter `0`.
pub fn resolve_project<S>(
    service: &mut S,
    console: &mut dyn OperatorConsole,
    project_name: Option<&str>,
    expected_kind: ProjectKind,
) -> Result<ProjectSelection, RenderQueueError>
where
    S: RenderQueueService + ?Sized,
{
    let projects = service
        .query_all_projects()
        .map_err(RenderQueueError::remote)?;

    debug!(count = projects.len(), "Queried projects.");

    match project_name {
        Some(name) => find_project_by_name(projects, name, expected_kind),
        None => select_project_interactively(&projects, console, expected_kind),
    }
}

fn find_project_by_name(
    projects: Vec<Project>,
    name: &str,
    expected_kind: ProjectKind,
) -> Result<ProjectSelection, RenderQueueError> {
    let project = projects
        .into_iter()
        .find(|project| project.name == name)
        .ok_or_else(|| RenderQueueError::ProjectNotFound {
            name: name.to_string(),
        })?;

    if project.kind != expected_kind {
        warn!(
            project = %project.name,
            project_kind = %project.kind,
            expected_kind = %expected_kind,
            "Configured project has a different kind than the batch; using it anyway."
        );
    }

    info!(project = %project.name, project_id = project.id, "Using configured project.");
    Ok(ProjectSelection::Selected(project))
}

fn select_project_interactively(
    projects: &[Project],
    console: &mut dyn OperatorConsole,
    expected_kind: ProjectKind,
) -> Result<ProjectSelection, RenderQueueError> {
    loop {
        console.show(&format!("Available projects ({expected_kind} required):"));
        for (index, project) in projects.iter().enumerate() {
            console.show(&format!(
                "  {:>3}: {} [{}, {}]",
                index + 1,
                project.name,
                project.kind,
                project.status
            ));
        }

        let answer = console
            .prompt(SELECTION_PROMPT)
            .map_err(RenderQueueError::operator_input)?;

        match check_selection(projects, answer.trim(), expected_kind) {
            Ok(None) => {
                info!("Project selection aborted by operator.");
                return Ok(ProjectSelection::Aborted);
            }
            Ok(Some(project)) => {
                info!(project = %project.name, project_id = project.id, "Project selected.");
                return Ok(ProjectSelection::Selected(project.clone()));
            }
            Err(error) if error.is_recoverable() => {
                warn!(error = %error, "Invalid project selection.");
                console.show(&error.to_string());
            }
            Err(error) => return Err(error),
        }
    }
}

/// `Ok(None)` is an explicit abort; errors are recoverable and lead to a new prompt.
fn check_selection<'p>(
    projects: &'p [Project],
    answer: &str,
    expected_kind: ProjectKind,
) -> Result<Option<&'p Project>, RenderQueueError> {
    let out_of_range = || RenderQueueError::OutOfRangeSelection {
        selection: answer.to_string(),
        available: projects.len(),
    };

    let selection: usize = answer.parse().map_err(|_| out_of_range())?;
    if selection == 0 {
        return Ok(None);
    }

    let project = projects.get(selection - 1).ok_or_else(out_of_range)?;
    if project.kind != expected_kind {
        return Err(RenderQueueError::ProjectKindMismatch {
            name: project.name.clone(),
            expected: expected_kind.to_string(),
            actual: project.kind.to_string(),
        });
    }

    Ok(Some(project))
}


/// Asks the service to drop images left over on `project`. Failure is only a warning.
pub fn clear_stale_state<S>(service: &mut S, project: &Project) -> bool
where
    S: RenderQueueService + ?Sized,
{
    let failure = RenderQueueError::StaleStateClearFailure {
        project: project.name.clone(),
    };

    match service.clear_images(project) {
        Ok(true) => {
            info!(project = %project.name, "Cleared stale images.");
            true
        }
        Ok(false) => {
            warn!(project = %project.name, "{}", failure);
            false
        }
        Err(error) => {
            warn!(project = %project.name, error = ?error, "{}", failure);
            false
        }
    }
}
