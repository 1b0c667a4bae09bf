//! The reconstruction pipeline: quality filtering, normalization, coordinate mapping and aggregation.
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::brain::Brain;
use crate::error::IEEGError;
use crate::mapping::voxel_indices;
use crate::stats::zscore_channels;
use crate::template::Template;
use crate::volume::{aggregate, Volume};

/// Parameters of a reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Electrodes whose kurtosis exceeds this threshold (or is undefined) are excluded.
    /// No electrode is excluded when unset.
    kurtosis_threshold: Option<f64>,
    /// Whether every electrode is z-scored before aggregation.
    zscore: bool,
}

impl ReconstructionConfig {
    pub fn new(kurtosis_threshold: Option<f64>, zscore: bool) -> Self {
        Self {
            kurtosis_threshold,
            zscore,
        }
    }

    pub fn kurtosis_threshold(&self) -> Option<f64> {
        self.kurtosis_threshold
    }

    pub fn zscore(&self) -> bool {
        self.zscore
    }

    /// Load a configuration from a JSON file. Missing fields take their default value.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, IEEGError> {
        let file = File::open(path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| IEEGError::IOError(e.to_string()))
    }
}

/// Reconstruct a brain object as a volumetric time series in the template space.
///
/// Electrodes failing the kurtosis threshold are dropped first. When normalizing, electrodes with
/// a constant signal have no z-score and are dropped as well. The remaining electrodes are mapped
/// to template voxels and averaged per voxel and time step.
pub fn reconstruct(
    brain: &Brain,
    template: &Template,
    config: &ReconstructionConfig,
) -> Result<Volume, IEEGError> {
    log::info!("Starting reconstruction of {} electrodes...", brain.n_elecs());

    let mut channels: Vec<usize> = (0..brain.n_elecs()).collect();
    if let Some(threshold) = config.kurtosis_threshold() {
        let mask = brain.kurtosis_mask(threshold);
        channels.retain(|channel| !mask[*channel]);
        log::info!(
            "{} of {} electrodes pass the kurtosis threshold {}",
            channels.len(),
            brain.n_elecs(),
            threshold
        );
    }

    let zscored;
    let source = if config.zscore() {
        zscored = zscore_channels(brain.data());
        channels.retain(|channel| {
            let finite = zscored.column(*channel).iter().all(|v| v.is_finite());
            if !finite {
                log::warn!("Electrode {} has no z-score and is skipped", channel);
            }
            finite
        });
        &zscored
    } else {
        brain.data()
    };

    let data = source.select_columns(channels.iter());
    let locs: Vec<[f64; 3]> = channels.iter().map(|channel| brain.locs()[*channel]).collect();

    let indices = voxel_indices(&locs, template.affine())?;
    let volume = aggregate(&indices, &data, template)?;
    log::info!(
        "Reconstruction completed with shape {:?} ({} electrodes outside the grid)",
        volume.shape(),
        volume.skipped_electrodes()
    );
    Ok(volume)
}
