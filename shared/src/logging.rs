use std::path::{Path, PathBuf};

use miette::Result;
use miette::{miette, Context, IntoDiagnostic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_DIRECTIVES: &str = "info";


struct LogFileTarget {
    directory_path: PathBuf,
    log_file_name: String,
}

impl LogFileTarget {
    fn from_path(path: &Path) -> Result<Self> {
        let directory = path
            .parent()
            .ok_or_else(|| miette!("Could not parse --logFilePath's parent directory path."))?;

        let file_name = path
            .file_name()
            .ok_or_else(|| miette!("Could not parse --logFilePath's file name."))?
            .to_string_lossy()
            .to_string();

        Ok(Self {
            directory_path: directory.to_path_buf(),
            log_file_name: file_name,
        })
    }
}

fn env_filter_or(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}


/// Set up console logging for the submitter and, if `log_output_file_path` is `Some`,
/// mirror every event into that file (without ANSI colours).
///
/// The console filter comes from `RUST_LOG`, falling back to [`DEFAULT_LOG_DIRECTIVES`].
///
/// **Keep the returned guard alive until the program exits, otherwise the file writer stops flushing.**
///
/// ## Example
/// ```no_run
/// use miette::Result;
/// use shared::logging::initialize_console_and_file_logging;
/// use std::path::PathBuf;
///
/// fn main() -> Result<()> {
///     let _guard = initialize_console_and_file_logging(
///         Some(PathBuf::from("logs/rq-submit.log")).as_ref()
///     )?;
///
///     // ...
///     Ok(())
/// }
/// ```
pub fn initialize_console_and_file_logging(
    log_output_file_path: Option<&PathBuf>,
) -> Result<Option<WorkerGuard>> {
    let file_target = log_output_file_path
        .map(|path| LogFileTarget::from_path(path))
        .transpose()?;

    let (file_writer, guard) = match file_target {
        Some(target) => {
            std::fs::create_dir_all(&target.directory_path)
                .into_diagnostic()
                .wrap_err_with(|| miette!("Could not create log directory."))?;

            let (non_blocking_appender, guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::never(target.directory_path, target.log_file_name),
            );

            (Some(non_blocking_appender), Some(guard))
        }
        None => (None, None),
    };


    let console_subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(DEFAULT_LOG_DIRECTIVES))
        .with_target(false)
        .finish();

    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::Layer::default()
            .with_ansi(false)
            .with_writer(writer)
    });

    tracing::subscriber::set_global_default(console_subscriber.with(file_layer))
        .into_diagnostic()
        .wrap_err_with(|| miette!("Failed to set up logging."))?;

    Ok(guard)
}
