use std::io::Write;

use miette::{miette, Context, IntoDiagnostic, Report, Result};
use shared::config::SubmitterConfig;
use shared::jobs::{AnimationBatchBuilder, SubmissionBatch};
use shared::packaging::{package_render_input, PackagingOptions};
use tracing::info;

use crate::cli::{FramesArgs, PackageArgs};


/// Packages one scene exactly as an upload would, keeps the archive and prints its path.
pub fn package<W: Write>(args: PackageArgs, config: &SubmitterConfig, output: &mut W) -> Result<()> {
    let batch = SubmissionBatch::single_image(args.scene_file_path)?;
    let scene_file = &batch.files()[0];

    let archive_path = args
        .archive_output_path
        .unwrap_or_else(|| config.archive_path.clone());

    let options = PackagingOptions {
        work_directory: &config.work_directory,
        archive_path: &archive_path,
        archive_owner: &config.archive_owner,
        width: config.image_width,
        height: config.image_height,
    };

    let (manifest, archive) = package_render_input(scene_file, &options)
        .wrap_err_with(|| miette!("Could not package {:?}.", scene_file))?;
    let archive_path = archive.keep();

    info!(
        scene = %manifest.scene,
        outfile = %manifest.outfile,
        logfile = %manifest.logfile,
        "Packaged render input."
    );
    writeln!(output, "{}", archive_path.display()).into_diagnostic()?;

    Ok(())
}

pub fn frames<W: Write>(args: FramesArgs, output: &mut W) -> Result<()> {
    let builder = AnimationBatchBuilder::new(args.directory_path, args.name_prefix)
        .with_frame_count(args.frame_count);

    let mut missing = 0;
    for frame in builder.frames() {
        let marker = if frame.is_file() {
            "ok"
        } else {
            missing += 1;
            "missing"
        };
        writeln!(output, "{:>7}  {}", marker, frame.display()).into_diagnostic()?;
    }

    let batch = builder
        .build()
        .map_err(Report::new)
        .wrap_err_with(|| miette!("{} of {} frames are not ready.", missing, args.frame_count))?;

    info!(frames = batch.len(), "Animation batch is complete.");
    Ok(())
}

pub fn show_config<W: Write>(config: &SubmitterConfig, output: &mut W) -> Result<()> {
    write!(output, "{}", config.to_toml_string()?).into_diagnostic()
}


#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use shared::packaging::manifest::{SceneManifest, MANIFEST_FILE_NAME};
    use tempfile::tempdir;

    use super::*;

    fn config_in(directory: &Path) -> SubmitterConfig {
        SubmitterConfig {
            work_directory: directory.to_path_buf(),
            archive_path: directory.join("default.tar.gz"),
            ..SubmitterConfig::default()
        }
    }

    fn printed(output: Vec<u8>) -> String {
        String::from_utf8(output).expect("utf-8 output")
    }

    #[test]
    fn package_keeps_the_archive_and_prints_its_path() -> Result<()> {
        let directory = tempdir().into_diagnostic()?;
        let scene = directory.path().join("scene1.pov");
        fs::write(&scene, "sphere { <0,0,0>, 1 }").into_diagnostic()?;
        let archive_path = directory.path().join("inspect.tar.gz");

        let mut output = Vec::new();
        package(
            PackageArgs {
                scene_file_path: scene,
                archive_output_path: Some(archive_path.clone()),
            },
            &config_in(directory.path()),
            &mut output,
        )?;

        assert!(archive_path.is_file());
        assert_eq!(printed(output).trim_end(), archive_path.display().to_string());

        let manifest = SceneManifest::load_from_file(directory.path().join(MANIFEST_FILE_NAME))?;
        assert_eq!(manifest.scene, "scene1.pov");
        Ok(())
    }

    #[test]
    fn package_defaults_to_the_configured_archive_path() -> Result<()> {
        let directory = tempdir().into_diagnostic()?;
        let scene = directory.path().join("scene1.pov");
        fs::write(&scene, "// scene").into_diagnostic()?;
        let config = config_in(directory.path());

        let mut output = Vec::new();
        package(
            PackageArgs {
                scene_file_path: scene,
                archive_output_path: None,
            },
            &config,
            &mut output,
        )?;

        assert!(config.archive_path.is_file());
        Ok(())
    }

    #[test]
    fn package_rejects_a_missing_scene() {
        let directory = tempdir().expect("tmp dir");
        let mut output = Vec::new();

        let result = package(
            PackageArgs {
                scene_file_path: directory.path().join("missing.pov"),
                archive_output_path: None,
            },
            &config_in(directory.path()),
            &mut output,
        );

        assert!(result.is_err());
        assert!(output.is_empty());
    }

    #[test]
    fn frames_lists_every_frame_and_fails_on_missing_ones() {
        let directory = tempdir().expect("tmp dir");
        fs::write(directory.path().join("walk00000.pov"), "// frame").expect("write frame");

        let mut output = Vec::new();
        let result = frames(
            FramesArgs {
                directory_path: directory.path().to_path_buf(),
                name_prefix: String::from("walk"),
                frame_count: 2,
            },
            &mut output,
        );

        let error = result.expect_err("second frame is missing");
        assert!(error.to_string().contains("1 of 2 frames"));

        let printed = printed(output);
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].trim_start().starts_with("ok") && lines[0].ends_with("walk00000.pov"));
        assert!(lines[1].trim_start().starts_with("missing") && lines[1].ends_with("walk00001.pov"));
    }

    #[test]
    fn frames_succeeds_when_all_frames_exist() -> Result<()> {
        let directory = tempdir().into_diagnostic()?;
        for frame in 0..3 {
            fs::write(directory.path().join(format!("animation{frame:05}.pov")), "// frame")
                .into_diagnostic()?;
        }

        let mut output = Vec::new();
        frames(
            FramesArgs {
                directory_path: directory.path().to_path_buf(),
                name_prefix: String::from("animation"),
                frame_count: 3,
            },
            &mut output,
        )?;

        assert_eq!(printed(output).lines().filter(|line| line.contains("missing")).count(), 0);
        Ok(())
    }

    #[test]
    fn show_config_prints_loadable_toml() -> Result<()> {
        let config = SubmitterConfig {
            project_name: Some(String::from("walk-cycle")),
            timeout_seconds: 120,
            ..SubmitterConfig::default()
        };

        let mut output = Vec::new();
        show_config(&config, &mut output)?;

        let reloaded = SubmitterConfig::from_toml_str(&printed(output))?;
        assert_eq!(reloaded, config);
        Ok(())
    }
}
