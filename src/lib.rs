//! This crate provides tools for reconstructing volumetric brain activity from intracranial EEG in Rust.
//!
//! # Creating Brain Objects
//!
//! ## From Recordings
//!
//! ```rust
//! use nalgebra::DMatrix;
//! use rusty_ieeg::brain::{Brain, SampleRate};
//!
//! // 4 samples recorded by 3 electrodes, with their MNI locations
//! let data = DMatrix::from_row_slice(4, 3, &[
//!     0.1, 1.0, -2.0,
//!     0.3, 1.5, -2.5,
//!     -0.2, 0.5, -1.0,
//!     0.0, 1.0, -3.0,
//! ]);
//! let locs = vec![[-40.0, 10.0, 12.0], [-38.0, 14.0, 12.0], [30.0, -22.0, 5.0]];
//!
//! let brain = Brain::build(data, locs, None, SampleRate::Uniform(2.0), None).unwrap();
//!
//! assert_eq!(brain.n_elecs(), 3);
//! assert_eq!(brain.n_sessions(), 1);
//! assert_eq!(brain.n_secs(), Some(2.0));
//! ```
//!
//! ## At Random
//!
//! ```rust
//! use rusty_ieeg::sampler::rand_brain;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! // 1000 samples of 64 electrodes, 4 of them with a large artifact
//! let mut rng = StdRng::seed_from_u64(42);
//! let bounds = ([-70.0, -100.0, -40.0], [70.0, 60.0, 70.0]);
//! let brain = rand_brain(1000, 64, 4, 500.0, bounds, &mut rng).unwrap();
//!
//! let excluded = brain.kurtosis_mask(rusty_ieeg::DEFAULT_KURTOSIS_THRESHOLD);
//! assert_eq!(excluded.iter().filter(|e| **e).count(), 4);
//! ```
//!
//! # Reconstructing Volumes
//!
//! ```rust
//! use rusty_ieeg::reconstruction::ReconstructionConfig;
//! use rusty_ieeg::sampler::rand_brain_seeded;
//! use rusty_ieeg::template::Template;
//!
//! let bounds = ([-70.0, -100.0, -40.0], [70.0, 60.0, 70.0]);
//! let brain = rand_brain_seeded(200, 16, 2, 100.0, bounds, 42).unwrap();
//!
//! // Electrodes are averaged per 20mm voxel of the MNI152 template, after quality filtering
//! let template = Template::mni152(20.0).unwrap();
//! let config = ReconstructionConfig::new(Some(rusty_ieeg::DEFAULT_KURTOSIS_THRESHOLD), false);
//! let volume = brain.to_volume(&template, &config).unwrap();
//!
//! assert_eq!(volume.shape(), [10, 11, 10, 200]);
//! ```

pub mod brain;
pub mod error;
pub mod json_float;
pub mod load;
pub mod mapping;
pub mod reconstruction;
pub mod sampler;
pub mod stats;
pub mod template;
pub mod volume;

/// The default kurtosis above which an electrode is considered too noisy.
pub const DEFAULT_KURTOSIS_THRESHOLD: f64 = 10.0;
/// Minimum number of electrodes to consider parallel processing.
pub const MIN_PARALLEL_CHANNELS: usize = 64;
/// Number of grid cells above which the allocation of a volume is reported.
pub const LARGE_GRID_VOXELS: usize = 1 << 27;
/// The session label of recordings without session information.
pub const DEFAULT_SESSION: i64 = 1;
