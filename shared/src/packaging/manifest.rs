use std::path::{Path, PathBuf};

use ini::Ini;
use miette::{miette, Context, IntoDiagnostic, Result};

pub const MANIFEST_FILE_NAME: &str = "scene.ini";
pub const MANIFEST_SECTION: &str = "DEFAULT";
pub const OUTPUT_IMAGE_EXTENSION: &str = "png";
pub const LOG_FILE_EXTENSION: &str = "log";


/// Per-job descriptor telling the remote worker which scene to render and where the
/// output image and log go. All paths are relative to the unpacked archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneManifest {
    pub scene: String,
    pub width: u32,
    pub height: u32,
    pub outfile: String,
    pub logfile: String,
}

impl SceneManifest {
    pub fn for_scene(scene_file: &Path, width: u32, height: u32) -> Result<Self> {
        let scene = scene_file
            .file_name()
            .ok_or_else(|| miette!("Scene path {:?} has no file name.", scene_file))?
            .to_string_lossy()
            .to_string();

        let stem = scene_file
            .file_stem()
            .ok_or_else(|| miette!("Scene path {:?} has no file stem.", scene_file))?
            .to_string_lossy()
            .to_string();

        Ok(Self {
            scene,
            width,
            height,
            outfile: format!("{stem}.{OUTPUT_IMAGE_EXTENSION}"),
            logfile: format!("{stem}.{LOG_FILE_EXTENSION}"),
        })
    }

    /// Writes `scene.ini` into `directory`, replacing any previous manifest.
    pub fn write_to_directory(&self, directory: &Path) -> Result<PathBuf> {
        let manifest_path = directory.join(MANIFEST_FILE_NAME);

        let mut ini = Ini::new();
        ini.with_section(Some(MANIFEST_SECTION))
            .set("scene", self.scene.as_str())
            .set("width", self.width.to_string())
            .set("height", self.height.to_string())
            .set("outfile", self.outfile.as_str())
            .set("logfile", self.logfile.as_str());

        ini.write_to_file(&manifest_path)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not write manifest to {:?}.", manifest_path))?;

        Ok(manifest_path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let ini = Ini::load_from_file(path)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Could not read manifest {:?}.", path))?;

        let section = ini
            .section(Some(MANIFEST_SECTION))
            .ok_or_else(|| miette!("Manifest is missing the [{}] section.", MANIFEST_SECTION))?;

        let field = |key: &str| -> Result<String> {
            section
                .get(key)
                .map(String::from)
                .ok_or_else(|| miette!("Manifest is missing key {:?}.", key))
        };

        let width = field("width")?
            .parse::<u32>()
            .into_diagnostic()
            .wrap_err_with(|| miette!("Manifest width is not an integer."))?;
        let height = field("height")?
            .parse::<u32>()
            .into_diagnostic()
            .wrap_err_with(|| miette!("Manifest height is not an integer."))?;

        Ok(Self {
            scene: field("scene")?,
            width,
            height,
            outfile: field("outfile")?,
            logfile: field("logfile")?,
        })
    }
}
