use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rq-submit", about = "Package render inputs for the render queue.")]
pub struct CLIArgs {
    #[arg(
        long = "logFilePath",
        global = true,
        help = "Also write logs to this file."
    )]
    pub log_file_path: Option<PathBuf>,

    #[arg(
        short = 'c',
        long = "config",
        global = true,
        help = "Path to the submitter configuration (TOML). Defaults are used if omitted."
    )]
    pub config_file_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CLICommand,
}

#[derive(Subcommand)]
pub enum CLICommand {
    #[command(
        name = "package",
        about = "Write the manifest and archive for one scene, exactly as it would be uploaded."
    )]
    Package(PackageArgs),

    #[command(
        name = "frames",
        about = "List and check the frame files that make up an animation batch."
    )]
    Frames(FramesArgs),

    #[command(name = "show-config", about = "Print the effective configuration.")]
    ShowConfig,
}

#[derive(Args, Eq, PartialEq)]
pub struct PackageArgs {
    pub scene_file_path: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        help = "Where to write the archive (defaults to the configured archive path)."
    )]
    pub archive_output_path: Option<PathBuf>,
}

#[derive(Args, Eq, PartialEq)]
pub struct FramesArgs {
    #[arg(long = "directory", help = "Directory the frame files were written to.")]
    pub directory_path: PathBuf,

    #[arg(long = "namePrefix", default_value = "animation")]
    pub name_prefix: String,

    #[arg(long = "frames", help = "Number of frames in the animation.")]
    pub frame_count: usize,
}
