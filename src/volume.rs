//! Aggregation of electrode recordings into a volumetric time series.
//!
//! Grids are 4-D (x, y, z, time) and stored in row-major order with time as the fastest axis,
//! so the time series of a voxel is contiguous.
use nalgebra::{DMatrix, Matrix4};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::brain::{Brain, SampleRate};
use crate::error::IEEGError;
use crate::mapping::voxel_location;
use crate::template::Template;
use crate::LARGE_GRID_VOXELS;

/// Returns the spatial shape of the output grid: on every axis, the largest of the template shape
/// and one plus the largest voxel index, so that every mapped electrode falls inside the grid.
pub fn grid_shape(indices: &[[i64; 3]], template_shape: [usize; 3]) -> [usize; 3] {
    let mut shape = template_shape;
    for voxel in indices {
        for axis in 0..3 {
            let extent = usize::try_from(voxel[axis].saturating_add(1)).unwrap_or(0);
            shape[axis] = shape[axis].max(extent);
        }
    }
    shape
}

/// Accumulates values per voxel and time step, together with the number of contributions.
/// Colliding contributions are summed and averaged when the accumulator is turned into a volume.
#[derive(Debug)]
pub struct VoxelAccumulator {
    shape: [usize; 4],
    values: Vec<f64>,
    counts: Vec<u32>,
}

impl VoxelAccumulator {
    /// Create a zero-initialized accumulator of shape (x, y, z, time).
    /// The function returns an error if the number of cells overflows.
    pub fn new(shape: [usize; 4]) -> Result<Self, IEEGError> {
        let size = shape
            .iter()
            .try_fold(1_usize, |acc, n| acc.checked_mul(*n))
            .ok_or_else(|| IEEGError::GridTooLarge(format!("{:?} cells", shape)))?;

        if size > LARGE_GRID_VOXELS {
            log::warn!(
                "Allocating a volume grid of shape {:?} ({} cells); consider a coarser template or fewer samples",
                shape,
                size
            );
        }

        Ok(VoxelAccumulator {
            shape,
            values: vec![0.0; size],
            counts: vec![0; size],
        })
    }

    /// Returns the shape (x, y, z, time) of the accumulator.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    fn offset(&self, voxel: [usize; 3], time: usize) -> Option<usize> {
        let [nx, ny, nz, nt] = self.shape;
        if voxel[0] >= nx || voxel[1] >= ny || voxel[2] >= nz || time >= nt {
            return None;
        }
        Some(((voxel[0] * ny + voxel[1]) * nz + voxel[2]) * nt + time)
    }

    /// Add a value to a voxel at a given time step.
    /// The function returns an error if the voxel or time step is outside the grid.
    pub fn deposit(&mut self, voxel: [usize; 3], time: usize, value: f64) -> Result<(), IEEGError> {
        let offset = self.offset(voxel, time).ok_or_else(|| {
            IEEGError::OutOfBounds(format!(
                "voxel {:?} at time {} in grid {:?}",
                voxel, time, self.shape
            ))
        })?;
        self.values[offset] += value;
        self.counts[offset] += 1;
        Ok(())
    }

    /// Returns the number of values deposited in a voxel at a given time step.
    pub fn count(&self, voxel: [usize; 3], time: usize) -> u32 {
        self.offset(voxel, time).map_or(0, |offset| self.counts[offset])
    }

    /// Average the accumulated values and pair them with an affine.
    /// Cells without any contribution are set to zero.
    pub fn into_volume(self, affine: Matrix4<f64>) -> Volume {
        let data = self
            .values
            .into_iter()
            .zip(self.counts)
            .map(|(value, count)| {
                let mean = value / count as f64;
                if mean.is_nan() {
                    0.0
                } else {
                    mean
                }
            })
            .collect();
        Volume {
            shape: self.shape,
            affine,
            data,
            skipped_electrodes: 0,
        }
    }
}

/// Aggregate electrode recordings into a volume in the template space.
///
/// `indices` holds the voxel of every electrode and `data` is the samples x electrodes matrix.
/// Electrodes sharing a voxel are averaged at every time step; voxels without electrode are zero.
/// Electrodes with a negative voxel index cannot be placed in the grid and are skipped;
/// their number is reported by [`Volume::skipped_electrodes`].
///
/// The grid holds x * y * z * samples cells, which can be large for long recordings.
pub fn aggregate(
    indices: &[[i64; 3]],
    data: &DMatrix<f64>,
    template: &Template,
) -> Result<Volume, IEEGError> {
    if indices.len() != data.ncols() {
        return Err(IEEGError::ShapeMismatch(format!(
            "{} voxel indices for {} electrodes",
            indices.len(),
            data.ncols()
        )));
    }

    let [nx, ny, nz] = grid_shape(indices, template.shape());
    let mut accumulator = VoxelAccumulator::new([nx, ny, nz, data.nrows()])?;
    log::debug!("Volume grid of shape {:?}", accumulator.shape());

    let mut skipped_electrodes = 0;
    for (channel, voxel) in indices.iter().enumerate() {
        let voxel = match voxel.map(usize::try_from) {
            [Ok(x), Ok(y), Ok(z)] => [x, y, z],
            _ => {
                log::warn!(
                    "Electrode {} maps to voxel {:?} outside the grid and is skipped",
                    channel,
                    voxel
                );
                skipped_electrodes += 1;
                continue;
            }
        };
        for (time, value) in data.column(channel).iter().enumerate() {
            accumulator.deposit(voxel, time, *value)?;
        }
    }

    let mut volume = accumulator.into_volume(*template.affine());
    volume.skipped_electrodes = skipped_electrodes;
    Ok(volume)
}

/// A volumetric time series: a (x, y, z, time) grid paired with the affine of its space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    shape: [usize; 4],
    affine: Matrix4<f64>,
    #[serde(with = "crate::json_float::series")]
    data: Vec<f64>,
    #[serde(default)]
    skipped_electrodes: usize,
}

impl Volume {
    /// Create a volume from its shape, affine and row-major data (time fastest).
    /// The function returns an error if the data length does not match the shape.
    pub fn build(shape: [usize; 4], affine: Matrix4<f64>, data: Vec<f64>) -> Result<Self, IEEGError> {
        let size = shape
            .iter()
            .try_fold(1_usize, |acc, n| acc.checked_mul(*n))
            .ok_or_else(|| IEEGError::GridTooLarge(format!("{:?} cells", shape)))?;
        if size != data.len() {
            return Err(IEEGError::ShapeMismatch(format!(
                "{} values for a volume of shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Volume {
            shape,
            affine,
            data,
            skipped_electrodes: 0,
        })
    }

    /// Returns the shape (x, y, z, time) of the volume.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Returns the affine of the volume.
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Returns the number of electrodes left out of the volume because they fell outside the grid.
    pub fn skipped_electrodes(&self) -> usize {
        self.skipped_electrodes
    }

    /// Returns the raw data, in row-major order with time fastest.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the number of time steps.
    pub fn num_frames(&self) -> usize {
        self.shape[3]
    }

    /// Returns the value of a voxel at a given time step, or `None` if out of bounds.
    pub fn get(&self, x: usize, y: usize, z: usize, t: usize) -> Option<f64> {
        let [nx, ny, nz, nt] = self.shape;
        if x >= nx || y >= ny || z >= nz || t >= nt {
            return None;
        }
        Some(self.data[((x * ny + y) * nz + z) * nt + t])
    }

    /// Returns the time series of a voxel, or `None` if out of bounds.
    pub fn voxel_series(&self, x: usize, y: usize, z: usize) -> Option<&[f64]> {
        let [nx, ny, nz, nt] = self.shape;
        if x >= nx || y >= ny || z >= nz {
            return None;
        }
        let start = ((x * ny + y) * nz + z) * nt;
        Some(&self.data[start..start + nt])
    }

    /// Convert the volume into a brain object.
    /// Every voxel with at least one non-zero value becomes an electrode located at the voxel corner.
    /// The sample rate of a volume is unknown.
    pub fn to_brain(&self) -> Result<Brain, IEEGError> {
        let [nx, ny, nz, nt] = self.shape;
        let mut locs: Vec<[f64; 3]> = vec![];
        let mut values: Vec<f64> = vec![];

        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let start = ((x * ny + y) * nz + z) * nt;
                    let series = &self.data[start..start + nt];
                    if series.iter().any(|v| *v != 0.0) {
                        locs.push(voxel_location([x as i64, y as i64, z as i64], &self.affine));
                        values.extend_from_slice(series);
                    }
                }
            }
        }

        // Column-major: every electrode's series is contiguous.
        let data = DMatrix::from_vec(nt, locs.len(), values);
        Brain::build(data, locs, None, SampleRate::Unknown, None)
    }

    /// Save the volume to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), IEEGError> {
        let file = File::create(path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| IEEGError::IOError(e.to_string()))?;
        writer.flush().map_err(|e| IEEGError::IOError(e.to_string()))
    }

    /// Load a volume from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, IEEGError> {
        let file = File::open(path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        let volume: Volume =
            serde_json::from_reader(reader).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let skipped_electrodes = volume.skipped_electrodes;
        let mut volume = Volume::build(volume.shape, volume.affine, volume.data)?;
        volume.skipped_electrodes = skipped_electrodes;
        Ok(volume)
    }
}
