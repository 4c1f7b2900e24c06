use std::collections::HashSet;
use std::fs::{remove_file, File};
use std::path::{Path, PathBuf};

use flate2::{Compression, GzBuilder};
use miette::{miette, Context, IntoDiagnostic, Result};
use tar::{EntryType, Header};
use tracing::{debug, warn};

const ENTRY_MODE: u32 = 0o644;


/// An archive on disk that is deleted when this handle is dropped, unless `keep` is called.
#[derive(Debug)]
pub struct TemporaryArchive {
    path: PathBuf,
    keep: bool,
}

impl TemporaryArchive {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leaves the archive on disk and returns its path.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for TemporaryArchive {
    fn drop(&mut self) {
        if self.keep || !self.path.exists() {
            return;
        }

        match remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Removed temporary archive."),
            Err(error) => warn!(
                path = ?self.path,
                error = %error,
                "Could not remove temporary archive."
            ),
        }
    }
}


/// Packs `files` (stored under their base names) into a gzip-compressed tar at `archive_path`.
///
/// Entry ownership is normalized: uid and gid are 0, owner and group names are `owner`,
/// modification times are zeroed and the mode is `0644`. If anything fails, the partially
/// written archive is removed.
pub fn create_archive(archive_path: &Path, files: &[&Path], owner: &str) -> Result<TemporaryArchive> {
    let entry_names = entry_names(files)?;

    let archive = TemporaryArchive::new(archive_path.to_path_buf());

    let output_file = File::create(archive_path)
        .into_diagnostic()
        .wrap_err_with(|| miette!("Could not create archive file {:?}.", archive_path))?;

    let encoder = GzBuilder::new()
        .mtime(0)
        .write(output_file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (source_path, entry_name) in files.iter().zip(entry_names.iter()) {
        let mut source = File::open(source_path)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not open {:?} for archiving.", source_path))?;

        let metadata = source
            .metadata()
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not stat {:?}.", source_path))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(ENTRY_MODE);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_username(owner).into_diagnostic()?;
        header.set_groupname(owner).into_diagnostic()?;

        builder
            .append_data(&mut header, entry_name, &mut source)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not append {:?} to archive.", source_path))?;
    }

    let encoder = builder
        .into_inner()
        .into_diagnostic()
        .wrap_err_with(|| miette!("Could not finish tar stream."))?;
    encoder
        .finish()
        .into_diagnostic()
        .wrap_err_with(|| miette!("Could not finish gzip stream."))?;

    debug!(
        path = ?archive_path,
        entries = ?entry_names,
        "Created archive."
    );

    Ok(archive)
}

fn entry_names(files: &[&Path]) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(files.len());
    let mut names = Vec::with_capacity(files.len());

    for path in files {
        let name = path
            .file_name()
            .ok_or_else(|| miette!("Cannot archive {:?}: no file name.", path))?
            .to_string_lossy()
            .to_string();

        if !seen.insert(name.clone()) {
            return Err(miette!(
                "Cannot archive two files with the same base name: {}",
                name
            ));
        }

        names.push(name);
    }

    Ok(names)
}
