//! Module implementing the template volume defining the target space of a reconstruction.
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::IEEGError;
use crate::mapping::rotation_scale;

/// Extent of the MNI152 bounding box (mm): the x axis spans [-90, 90], y spans [-126, 90] and z spans [-72, 108].
const MNI152_EXTENT: [f64; 3] = [180.0, 216.0, 180.0];

/// A reference volume: a native grid shape and the affine mapping voxel indices to MNI coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    shape: [usize; 3],
    affine: Matrix4<f64>,
}

impl Template {
    /// Create a template with the specified parameters.
    /// The function returns an error if the rotation/scale block of the affine is singular.
    pub fn build(shape: [usize; 3], affine: Matrix4<f64>) -> Result<Self, IEEGError> {
        if rotation_scale(&affine).try_inverse().is_none() {
            return Err(IEEGError::SingularAffine);
        }
        Ok(Template { shape, affine })
    }

    /// Create a template covering the MNI152 bounding box with isotropic voxels of the given size (mm).
    /// As for the standard MNI152 images, the x axis runs from right to left.
    pub fn mni152(voxel_size: f64) -> Result<Self, IEEGError> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(IEEGError::InvalidParameter(format!(
                "voxel size must be positive, got {}",
                voxel_size
            )));
        }

        let shape = MNI152_EXTENT.map(|extent| (extent / voxel_size).floor() as usize + 1);
        let affine = Matrix4::new(
            -voxel_size, 0.0, 0.0, 90.0, //
            0.0, voxel_size, 0.0, -126.0, //
            0.0, 0.0, voxel_size, -72.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        Template::build(shape, affine)
    }

    /// Returns the native grid shape of the template.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Returns the affine of the template.
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Save the template to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), IEEGError> {
        let file = File::create(path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| IEEGError::IOError(e.to_string()))?;
        writer.flush().map_err(|e| IEEGError::IOError(e.to_string()))
    }

    /// Load a template from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, IEEGError> {
        let file = File::open(path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        let template: Template =
            serde_json::from_reader(reader).map_err(|e| IEEGError::IOError(e.to_string()))?;
        Template::build(template.shape, template.affine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::voxel_indices;

    #[test]
    fn test_build_singular() {
        assert_eq!(
            Template::build([2, 2, 2], Matrix4::zeros()),
            Err(IEEGError::SingularAffine)
        );
    }

    #[test]
    fn test_mni152() {
        let template = Template::mni152(2.0).unwrap();
        assert_eq!(template.shape(), [91, 109, 91]);

        let template = Template::mni152(20.0).unwrap();
        assert_eq!(template.shape(), [10, 11, 10]);

        // The corners of the bounding box land on the first and last voxels
        let indices = voxel_indices(
            &[[90.0, -126.0, -72.0], [-90.0, 90.0, 108.0]],
            Template::mni152(2.0).unwrap().affine(),
        )
        .unwrap();
        assert_eq!(indices, vec![[0, 0, 0], [90, 108, 90]]);

        assert!(matches!(
            Template::mni152(0.0),
            Err(IEEGError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_save_load() {
        let template = Template::mni152(4.0).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mni.tpl");
        template.save_to(&path).unwrap();
        assert_eq!(Template::load_from(&path).unwrap(), template);
    }
}
