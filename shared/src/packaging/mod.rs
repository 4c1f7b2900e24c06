//! Turning one render input into the archive that is uploaded as a render job.
//!
//! Each job gets a `scene.ini` manifest next to its scene file; both go into a
//! gzip-compressed tar archive with normalized ownership so identical inputs
//! always produce identical archive bytes.

pub mod archive;
pub mod manifest;

use std::path::Path;

use miette::{Context, Result};

use crate::packaging::archive::{create_archive, TemporaryArchive};
use crate::packaging::manifest::SceneManifest;


/// Where and how render inputs are packaged.
#[derive(Clone, Debug)]
pub struct PackagingOptions<'a> {
    pub work_directory: &'a Path,
    pub archive_path: &'a Path,
    pub archive_owner: &'a str,
    pub width: u32,
    pub height: u32,
}

/// Writes the manifest for `scene_file` and archives both files.
///
/// The manifest file is shared between jobs: it is overwritten by the next call,
/// so the returned archive must be uploaded before packaging the next input.
pub fn package_render_input(
    scene_file: &Path,
    options: &PackagingOptions,
) -> Result<(SceneManifest, TemporaryArchive)> {
    let manifest = SceneManifest::for_scene(scene_file, options.width, options.height)?;
    let manifest_path = manifest
        .write_to_directory(options.work_directory)
        .wrap_err_with(|| format!("Could not write manifest for {:?}.", scene_file))?;

    let archive = create_archive(
        options.archive_path,
        &[scene_file, manifest_path.as_path()],
        options.archive_owner,
    )
    .wrap_err_with(|| format!("Could not archive {:?}.", scene_file))?;

    Ok((manifest, archive))
}
