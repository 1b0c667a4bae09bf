//! Per-channel statistics: kurtosis-based quality filtering and z-score normalization.
//!
//! All functions are pure. Channels are the columns of a samples x channels matrix.
use itertools::Itertools;
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::MIN_PARALLEL_CHANNELS;

/// Returns the mean of a series (NaN for an empty series).
pub fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}

/// Relative resolution below which the spread of a series is indistinguishable from rounding error.
const VARIANCE_RESOLUTION: f64 = 1e-15;

/// Returns the population variance of a series around `mu`.
/// A series whose variance is lost in the rounding of its mean is constant, and has zero variance.
fn variance(series: &[f64], mu: f64) -> f64 {
    let var = series.iter().map(|x| (x - mu) * (x - mu)).sum::<f64>() / series.len() as f64;
    if series.iter().all_equal() || var <= (VARIANCE_RESOLUTION * mu).powi(2) {
        0.0
    } else {
        var
    }
}

/// Returns the population standard deviation of a series (zero degrees of freedom correction).
pub fn std(series: &[f64]) -> f64 {
    variance(series, mean(series)).sqrt()
}

/// Returns the kurtosis of a series, i.e., its fourth standardized moment `m4 / m2^2`.
/// A constant (or empty) series has no defined kurtosis and yields NaN.
pub fn kurtosis(series: &[f64]) -> f64 {
    let n = series.len() as f64;
    let mu = mean(series);
    let m2 = variance(series, mu);
    if m2 == 0.0 {
        return f64::NAN;
    }
    let m4 = series.iter().map(|x| (x - mu).powi(4)).sum::<f64>() / n;
    m4 / (m2 * m2)
}

/// Returns the z-scored series: the mean is subtracted and the result divided by the standard deviation.
/// A constant series yields NaN values; callers must drop such channels before aggregation.
pub fn zscore(series: &[f64]) -> Vec<f64> {
    let mu = mean(series);
    let sigma = variance(series, mu).sqrt();
    if sigma == 0.0 {
        return vec![f64::NAN; series.len()];
    }
    series.iter().map(|x| (x - mu) / sigma).collect()
}

/// Returns the kurtosis of every channel (column) of the samples x channels matrix.
/// The computation is spread over threads when there are many channels.
pub fn channel_kurtosis(data: &DMatrix<f64>) -> Vec<f64> {
    let num_samples = data.nrows();
    if num_samples == 0 {
        return vec![f64::NAN; data.ncols()];
    }

    // Column-major storage: every chunk of `num_samples` values is one channel.
    if data.ncols() >= MIN_PARALLEL_CHANNELS {
        data.as_slice().par_chunks(num_samples).map(kurtosis).collect()
    } else {
        data.as_slice().chunks(num_samples).map(kurtosis).collect()
    }
}

/// Returns the channel-wise z-scored copy of the samples x channels matrix.
pub fn zscore_channels(data: &DMatrix<f64>) -> DMatrix<f64> {
    let num_samples = data.nrows();
    if num_samples == 0 {
        return data.clone();
    }
    DMatrix::from_iterator(
        num_samples,
        data.ncols(),
        data.as_slice().chunks(num_samples).flat_map(zscore),
    )
}

/// Returns the exclusion mask for the given kurtosis values: `true` means the channel must be excluded.
/// A channel is excluded iff its kurtosis exceeds the threshold or is not finite.
pub fn kurtosis_mask(kurtosis: &[f64], threshold: f64) -> Vec<bool> {
    kurtosis
        .iter()
        .map(|k| !k.is_finite() || *k > threshold)
        .collect()
}
