//! Conversion between continuous MNI coordinates and discrete voxel indices.
//!
//! A template affine is split into its rotation/scale block `R` (upper-left 3x3)
//! and its translation `T` (last column). Coordinates are treated as row vectors:
//! a location `x` maps to the voxel `(x - T) R^-1`, and a voxel `v` back to `v R + T`.
use nalgebra::{Matrix3, Matrix4, RowVector3};

use crate::error::IEEGError;

/// Returns the rotation/scale block of an affine.
pub fn rotation_scale(affine: &Matrix4<f64>) -> Matrix3<f64> {
    affine.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Returns the translation of an affine, as a row vector.
pub fn translation(affine: &Matrix4<f64>) -> RowVector3<f64> {
    affine.fixed_view::<3, 1>(0, 3).transpose()
}

/// Map every location to a voxel index of the template grid.
///
/// Transformed coordinates are truncated toward zero, so a coordinate of `-0.7` lands in voxel `0`
/// and `-1.5` in voxel `-1`. Indices are not bounds-checked: they may be negative or exceed the
/// template shape.
///
/// The function returns an error if the rotation/scale block of the affine is singular,
/// or if a location maps to a non-finite coordinate.
pub fn voxel_indices(
    locs: &[[f64; 3]],
    affine: &Matrix4<f64>,
) -> Result<Vec<[i64; 3]>, IEEGError> {
    let inverse = rotation_scale(affine)
        .try_inverse()
        .ok_or(IEEGError::SingularAffine)?;
    let offset = translation(affine);

    locs.iter()
        .enumerate()
        .map(|(channel, loc)| {
            let voxel = (RowVector3::new(loc[0], loc[1], loc[2]) - offset) * inverse;
            if voxel.iter().any(|x| !x.is_finite()) {
                return Err(IEEGError::InvalidLocation { channel });
            }
            Ok([voxel[0] as i64, voxel[1] as i64, voxel[2] as i64])
        })
        .collect()
}

/// Returns the MNI location of the corner of a voxel.
pub fn voxel_location(voxel: [i64; 3], affine: &Matrix4<f64>) -> [f64; 3] {
    let loc = RowVector3::new(voxel[0] as f64, voxel[1] as f64, voxel[2] as f64)
        * rotation_scale(affine)
        + translation(affine);
    [loc[0], loc[1], loc[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled_affine(scale: f64, origin: [f64; 3]) -> Matrix4<f64> {
        Matrix4::new(
            scale, 0.0, 0.0, origin[0], //
            0.0, scale, 0.0, origin[1], //
            0.0, 0.0, scale, origin[2], //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[test]
    fn test_identity() {
        let indices = voxel_indices(
            &[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0], [1.9, 2.1, 3.99]],
            &Matrix4::identity(),
        )
        .unwrap();
        assert_eq!(indices, vec![[0, 0, 0], [10, 10, 10], [1, 2, 3]]);
    }

    #[test]
    fn test_truncation_toward_zero() {
        let indices =
            voxel_indices(&[[-0.7, -1.5, -2.0]], &Matrix4::identity()).unwrap();
        assert_eq!(indices, vec![[0, -1, -2]]);
    }

    #[test]
    fn test_scale_translation() {
        let affine = scaled_affine(2.0, [-90.0, -126.0, -72.0]);
        let indices = voxel_indices(&[[-90.0, -126.0, -72.0], [0.0, 0.0, 0.0]], &affine).unwrap();
        assert_eq!(indices, vec![[0, 0, 0], [45, 63, 36]]);

        // MNI templates usually flip the x axis
        let mut flipped = affine;
        flipped[(0, 0)] = -2.0;
        flipped[(0, 3)] = 90.0;
        let indices = voxel_indices(&[[90.0, 0.0, 0.0], [-90.0, 0.0, 0.0]], &flipped).unwrap();
        assert_eq!(indices[0][0], 0);
        assert_eq!(indices[1][0], 90);
    }

    #[test]
    fn test_round_trip() {
        // A rotation/scale block mixing axes
        let affine = Matrix4::new(
            0.0, 2.0, 0.0, 5.0, //
            4.0, 0.0, 0.0, -7.0, //
            0.0, 0.0, 1.0, 1.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        for voxel in [[0, 0, 0], [1, 2, 3], [7, 4, 11]] {
            let loc = voxel_location(voxel, &affine);
            assert_eq!(voxel_indices(&[loc], &affine).unwrap(), vec![voxel]);
        }
    }

    #[test]
    fn test_singular_affine() {
        let mut affine = Matrix4::identity();
        affine[(2, 2)] = 0.0;
        assert_eq!(
            voxel_indices(&[[1.0, 2.0, 3.0]], &affine),
            Err(IEEGError::SingularAffine)
        );
    }

    #[test]
    fn test_invalid_location() {
        assert_eq!(
            voxel_indices(&[[0.0; 3], [f64::NAN, 0.0, 0.0]], &Matrix4::identity()),
            Err(IEEGError::InvalidLocation { channel: 1 })
        );
    }
}
