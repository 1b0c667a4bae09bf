//! Random recordings for experiments and tests.
use nalgebra::DMatrix;
use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::brain::{Brain, SampleRate};
use crate::error::IEEGError;

/// The amplitude of an artifact, relative to the unit background noise.
const ARTIFACT_AMPLITUDE: f64 = 100.0;

/// Samples a brain object of Gaussian white noise with uniformly placed electrodes.
///
/// # Parameters
/// - `num_samples`: The number of time samples.
/// - `num_elecs`: The number of electrodes.
/// - `num_artifacts`: The number of electrodes (the first ones) carrying a single large artifact,
///   which makes their kurtosis high.
/// - `sample_rate`: The sample rate of the single session.
/// - `bounds`: The lower and upper corners of the box where electrodes are placed.
/// - `rng`: A mutable reference to a random number generator implementing the `Rng` trait.
pub fn rand_brain<R: Rng>(
    num_samples: usize,
    num_elecs: usize,
    num_artifacts: usize,
    sample_rate: f64,
    bounds: ([f64; 3], [f64; 3]),
    rng: &mut R,
) -> Result<Brain, IEEGError> {
    if num_artifacts > num_elecs {
        return Err(IEEGError::InvalidParameter(format!(
            "{} artifacts for {} electrodes",
            num_artifacts, num_elecs
        )));
    }
    let (lower, upper) = bounds;
    if !(0..3).all(|axis| lower[axis] < upper[axis]) {
        return Err(IEEGError::InvalidParameter(format!(
            "empty electrode box {:?}",
            bounds
        )));
    }

    let axes: Vec<Uniform<f64>> = (0..3)
        .map(|axis| Uniform::new(lower[axis], upper[axis]))
        .collect();
    let locs: Vec<[f64; 3]> = (0..num_elecs)
        .map(|_| [axes[0].sample(rng), axes[1].sample(rng), axes[2].sample(rng)])
        .collect();

    let mut data = DMatrix::from_fn(num_samples, num_elecs, |_, _| {
        rng.sample::<f64, _>(StandardNormal)
    });
    if num_samples > 0 {
        for channel in 0..num_artifacts {
            let time = rng.gen_range(0..num_samples);
            data[(time, channel)] += ARTIFACT_AMPLITUDE;
        }
    }

    Brain::build(data, locs, None, SampleRate::Uniform(sample_rate), None)
}

/// Same as [`rand_brain`], with a reproducible generator seeded from `seed`.
pub fn rand_brain_seeded(
    num_samples: usize,
    num_elecs: usize,
    num_artifacts: usize,
    sample_rate: f64,
    bounds: ([f64; 3], [f64; 3]),
    seed: u64,
) -> Result<Brain, IEEGError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rand_brain(num_samples, num_elecs, num_artifacts, sample_rate, bounds, &mut rng)
}
