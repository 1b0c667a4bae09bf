//! Loading brain objects, volumes and templates from files.
//!
//! The kind of a file is resolved once from its extension into a [`DataKind`];
//! the loaded value is carried as a [`Dataset`] and never re-inspected.
use std::path::{Path, PathBuf};

use crate::brain::{Brain, BRAIN_EXTENSION};
use crate::error::IEEGError;
use crate::reconstruction::{reconstruct, ReconstructionConfig};
use crate::template::Template;
use crate::volume::Volume;

/// The example datasets that can be found in a data directory, with their kind.
const EXAMPLES: [(&str, DataKind); 5] = [
    ("example_data", DataKind::Brain),
    ("example_filter", DataKind::Brain),
    ("example_nifti", DataKind::Volume),
    ("gray", DataKind::Template),
    ("std", DataKind::Template),
];

/// The kinds of files understood by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// A brain object (`.bo`).
    Brain,
    /// A volumetric time series (`.vol`).
    Volume,
    /// A template volume (`.tpl`).
    Template,
}

impl DataKind {
    /// Resolve the kind of a file from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IEEGError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(BRAIN_EXTENSION) => Ok(DataKind::Brain),
            Some("vol") => Ok(DataKind::Volume),
            Some("tpl") => Ok(DataKind::Template),
            Some(other) => Err(IEEGError::UnsupportedFormat(format!(
                "file type .{} not recognized; must be .bo, .vol or .tpl",
                other
            ))),
            None => Err(IEEGError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
        }
    }

    /// Returns the file extension of the kind.
    pub fn extension(&self) -> &'static str {
        match self {
            DataKind::Brain => BRAIN_EXTENSION,
            DataKind::Volume => "vol",
            DataKind::Template => "tpl",
        }
    }
}

/// A loaded file.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Brain(Brain),
    Volume(Volume),
    Template(Template),
}

impl Dataset {
    /// Returns the kind of the dataset.
    pub fn kind(&self) -> DataKind {
        match self {
            Dataset::Brain(_) => DataKind::Brain,
            Dataset::Volume(_) => DataKind::Volume,
            Dataset::Template(_) => DataKind::Template,
        }
    }

    /// Convert the dataset into a brain object. A volume is converted voxel by voxel.
    pub fn into_brain(self) -> Result<Brain, IEEGError> {
        match self {
            Dataset::Brain(brain) => Ok(brain),
            Dataset::Volume(volume) => volume.to_brain(),
            Dataset::Template(_) => Err(IEEGError::UnsupportedFormat(
                "a template holds no recording".to_string(),
            )),
        }
    }

    /// Convert the dataset into a volume. A brain object is reconstructed in the template space.
    pub fn into_volume(
        self,
        template: &Template,
        config: &ReconstructionConfig,
    ) -> Result<Volume, IEEGError> {
        match self {
            Dataset::Brain(brain) => reconstruct(&brain, template, config),
            Dataset::Volume(volume) => Ok(volume),
            Dataset::Template(_) => Err(IEEGError::UnsupportedFormat(
                "a template holds no recording".to_string(),
            )),
        }
    }

    /// Convert the dataset into a template. A volume provides its spatial shape and affine.
    pub fn into_template(self) -> Result<Template, IEEGError> {
        match self {
            Dataset::Template(template) => Ok(template),
            Dataset::Volume(volume) => {
                let [nx, ny, nz, _] = volume.shape();
                Template::build([nx, ny, nz], *volume.affine())
            }
            Dataset::Brain(_) => Err(IEEGError::UnsupportedFormat(
                "a brain object has no voxel grid".to_string(),
            )),
        }
    }
}

/// Load a brain object, volume or template, depending on the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Dataset, IEEGError> {
    let path = path.as_ref();
    match DataKind::from_path(path)? {
        DataKind::Brain => Brain::load_from(path).map(Dataset::Brain),
        DataKind::Volume => Volume::load_from(path).map(Dataset::Volume),
        DataKind::Template => Template::load_from(path).map(Dataset::Template),
    }
}

/// A local directory holding the example datasets, e.g., `<dir>/example_data.bo`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DataDir { root: root.into() }
    }

    /// Returns the root of the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the kind of a named example.
    pub fn example_kind(name: &str) -> Result<DataKind, IEEGError> {
        EXAMPLES
            .iter()
            .find(|(example, _)| *example == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| IEEGError::UnsupportedFormat(format!("unknown example {}", name)))
    }

    /// Returns the path of a named example in the directory.
    pub fn example_path(&self, name: &str) -> Result<PathBuf, IEEGError> {
        let kind = Self::example_kind(name)?;
        Ok(self.root.join(format!("{}.{}", name, kind.extension())))
    }

    /// Load a named example from the directory.
    /// The function returns an error if the example is unknown or missing from the directory.
    pub fn load_example(&self, name: &str) -> Result<Dataset, IEEGError> {
        let path = self.example_path(name)?;
        if !path.exists() {
            return Err(IEEGError::NotFound(path.display().to_string()));
        }
        load(path)
    }
}
