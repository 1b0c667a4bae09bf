//! Module implementing the brain object, i.e., a single subject's intracranial recording.
//!
//! A brain object holds a samples x electrodes data matrix, one MNI location per electrode,
//! a session label per sample and the sample rate of every session.
//! Derived quantities (kurtosis, recording duration) are computed once at construction;
//! a different recording requires a new brain object.
use itertools::Itertools;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IEEGError;
use crate::reconstruction::{reconstruct, ReconstructionConfig};
use crate::stats::{channel_kurtosis, kurtosis_mask, zscore_channels};
use crate::template::Template;
use crate::volume::Volume;
use crate::DEFAULT_SESSION;

/// The extension of brain object files.
pub const BRAIN_EXTENSION: &str = "bo";

/// The label of a recording session, either numeric or named.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionLabel {
    Id(i64),
    Name(String),
}

impl From<i64> for SessionLabel {
    fn from(id: i64) -> Self {
        SessionLabel::Id(id)
    }
}

impl From<&str> for SessionLabel {
    fn from(name: &str) -> Self {
        SessionLabel::Name(name.to_string())
    }
}

impl fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionLabel::Id(id) => write!(f, "{}", id),
            SessionLabel::Name(name) => write!(f, "{}", name),
        }
    }
}

/// The sample rate(s) provided when building a brain object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleRate {
    /// No sample rate; the recording duration cannot be computed.
    Unknown,
    /// A single sample rate shared by all sessions.
    Uniform(f64),
    /// One sample rate per session, in order of first appearance of the sessions.
    PerSession(Vec<f64>),
}

/// A brain object containing a single iEEG subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BrainRecord", into = "BrainRecord")]
pub struct Brain {
    data: DMatrix<f64>,
    locs: Vec<[f64; 3]>,
    sessions: Vec<SessionLabel>,
    session_labels: Vec<SessionLabel>,
    sample_rates: Option<Vec<f64>>,
    n_secs: Option<f64>,
    kurtosis: Vec<f64>,
    meta: Option<serde_json::Value>,
    created_at: u64,
}

/// The persisted part of a brain object. Derived fields are recomputed on load.
#[derive(Serialize, Deserialize)]
struct BrainRecord {
    #[serde(with = "crate::json_float::matrix")]
    data: DMatrix<f64>,
    #[serde(with = "crate::json_float::points")]
    locs: Vec<[f64; 3]>,
    sessions: Vec<SessionLabel>,
    sample_rate: Option<Vec<f64>>,
    meta: Option<serde_json::Value>,
    created_at: u64,
}

impl From<Brain> for BrainRecord {
    fn from(brain: Brain) -> Self {
        BrainRecord {
            data: brain.data,
            locs: brain.locs,
            sessions: brain.sessions,
            sample_rate: brain.sample_rates,
            meta: brain.meta,
            created_at: brain.created_at,
        }
    }
}

impl TryFrom<BrainRecord> for Brain {
    type Error = IEEGError;

    fn try_from(record: BrainRecord) -> Result<Self, Self::Error> {
        let sample_rate = match record.sample_rate {
            Some(rates) => SampleRate::PerSession(rates),
            None => SampleRate::Unknown,
        };
        let mut brain = Brain::build(
            record.data,
            record.locs,
            Some(record.sessions),
            sample_rate,
            record.meta,
        )?;
        brain.created_at = record.created_at;
        Ok(brain)
    }
}

impl Brain {
    /// Create a brain object from a samples x electrodes data matrix and one location per electrode.
    /// Without session labels, all samples belong to a single session.
    ///
    /// The function returns an error if the number of locations differs from the number of electrodes,
    /// if the number of session labels differs from the number of samples,
    /// or if one sample rate per session is given but their count does not match the number of sessions.
    /// A missing or unrecognized sample rate is accepted, but the recording duration is then unavailable.
    pub fn build(
        data: DMatrix<f64>,
        locs: Vec<[f64; 3]>,
        sessions: Option<Vec<SessionLabel>>,
        sample_rate: SampleRate,
        meta: Option<serde_json::Value>,
    ) -> Result<Self, IEEGError> {
        if locs.len() != data.ncols() {
            return Err(IEEGError::ShapeMismatch(format!(
                "{} locations for {} electrodes",
                locs.len(),
                data.ncols()
            )));
        }

        let sessions =
            sessions.unwrap_or_else(|| vec![SessionLabel::Id(DEFAULT_SESSION); data.nrows()]);
        if sessions.len() != data.nrows() {
            return Err(IEEGError::ShapeMismatch(format!(
                "{} session labels for {} samples",
                sessions.len(),
                data.nrows()
            )));
        }
        let session_labels: Vec<SessionLabel> = sessions.iter().unique().cloned().collect();

        let sample_rates = resolve_sample_rates(sample_rate, session_labels.len())?;
        let n_secs = sample_rates.as_ref().map(|rates| {
            session_labels
                .iter()
                .zip(rates.iter())
                .map(|(label, rate)| {
                    sessions.iter().filter(|s| *s == label).count() as f64 / rate
                })
                .sum::<f64>()
        });

        let kurtosis = channel_kurtosis(&data);
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        Ok(Brain {
            data,
            locs,
            sessions,
            session_labels,
            sample_rates,
            n_secs,
            kurtosis,
            meta,
            created_at,
        })
    }

    /// Returns the samples x electrodes data matrix.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Returns the channel-wise z-scored data matrix.
    pub fn zscore_data(&self) -> DMatrix<f64> {
        zscore_channels(&self.data)
    }

    /// Returns the z-scored data of the electrodes passing the kurtosis threshold,
    /// together with the indices of those electrodes.
    pub fn filtered_data(&self, threshold: f64) -> (DMatrix<f64>, Vec<usize>) {
        let kept: Vec<usize> = self
            .kurtosis_mask(threshold)
            .iter()
            .enumerate()
            .filter_map(|(channel, excluded)| (!excluded).then_some(channel))
            .collect();
        (self.zscore_data().select_columns(kept.iter()), kept)
    }

    /// Returns the electrode locations.
    pub fn locs(&self) -> &[[f64; 3]] {
        &self.locs
    }

    /// Returns the session label of every sample.
    pub fn sessions(&self) -> &[SessionLabel] {
        &self.sessions
    }

    /// Returns the distinct session labels, in order of first appearance.
    pub fn session_labels(&self) -> &[SessionLabel] {
        &self.session_labels
    }

    /// Returns the sample rate of every session, if known.
    pub fn sample_rates(&self) -> Option<&[f64]> {
        self.sample_rates.as_deref()
    }

    /// Returns the recording duration in seconds, if the sample rates are known.
    pub fn n_secs(&self) -> Option<f64> {
        self.n_secs
    }

    /// Returns the number of electrodes.
    pub fn n_elecs(&self) -> usize {
        self.data.ncols()
    }

    /// Returns the number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Returns the number of distinct sessions.
    pub fn n_sessions(&self) -> usize {
        self.session_labels.len()
    }

    /// Returns the kurtosis of every electrode.
    pub fn kurtosis(&self) -> &[f64] {
        &self.kurtosis
    }

    /// Returns the exclusion mask of the electrodes for the given kurtosis threshold.
    /// See [`kurtosis_mask`].
    pub fn kurtosis_mask(&self, threshold: f64) -> Vec<bool> {
        kurtosis_mask(&self.kurtosis, threshold)
    }

    /// Returns the optional metadata.
    pub fn meta(&self) -> Option<&serde_json::Value> {
        self.meta.as_ref()
    }

    /// Returns the creation time in seconds since the Unix epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Reconstruct the recording as a volumetric time series in the template space.
    pub fn to_volume(
        &self,
        template: &Template,
        config: &ReconstructionConfig,
    ) -> Result<Volume, IEEGError> {
        reconstruct(self, template, config)
    }

    /// Save the brain object to a file. The `.bo` extension is appended if missing.
    /// Returns the path of the written file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, IEEGError> {
        let mut path = path.as_ref().to_path_buf();
        if path.extension().and_then(|e| e.to_str()) != Some(BRAIN_EXTENSION) {
            let mut name = path.into_os_string();
            name.push(".");
            name.push(BRAIN_EXTENSION);
            path = PathBuf::from(name);
        }

        let file = File::create(&path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| IEEGError::IOError(e.to_string()))?;
        writer.flush().map_err(|e| IEEGError::IOError(e.to_string()))?;
        Ok(path)
    }

    /// Load a brain object from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, IEEGError> {
        let file = File::open(path).map_err(|e| IEEGError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| IEEGError::IOError(e.to_string()))
    }
}

impl fmt::Display for Brain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of electrodes: {}", self.n_elecs())?;
        match self.n_secs {
            Some(n_secs) => writeln!(f, "Recording time in seconds: {}", n_secs)?,
            None => writeln!(f, "Recording time in seconds: unknown")?,
        }
        writeln!(f, "Number of sessions: {}", self.n_sessions())?;
        let created = i64::try_from(self.created_at)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
        match created {
            Some(date) => {
                writeln!(f, "Date created: {}", date.format("%a %b %e %H:%M:%S %Y UTC"))?
            }
            None => writeln!(f, "Date created: {} (Unix seconds)", self.created_at)?,
        }
        match &self.meta {
            Some(meta) => write!(f, "Meta data: {}", meta),
            None => write!(f, "Meta data: none"),
        }
    }
}

/// Returns one sample rate per session, or `None` (with a warning) if no usable rate was given.
fn resolve_sample_rates(
    sample_rate: SampleRate,
    num_sessions: usize,
) -> Result<Option<Vec<f64>>, IEEGError> {
    let is_valid = |rate: &f64| rate.is_finite() && *rate > 0.0;
    match sample_rate {
        SampleRate::Unknown => {
            log::warn!("No sample rate given. Number of seconds cannot be computed");
            Ok(None)
        }
        SampleRate::Uniform(rate) if is_valid(&rate) => Ok(Some(vec![rate; num_sessions])),
        SampleRate::PerSession(rates) => {
            if rates.len() != num_sessions {
                return Err(IEEGError::SampleRateMismatch {
                    expected: num_sessions,
                    got: rates.len(),
                });
            }
            if rates.iter().all(is_valid) {
                Ok(Some(rates))
            } else {
                log::warn!("Format of sample rate not recognized. Number of seconds cannot be computed");
                Ok(None)
            }
        }
        SampleRate::Uniform(rate) => {
            log::warn!(
                "Format of sample rate not recognized ({}). Number of seconds cannot be computed",
                rate
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> DMatrix<f64> {
        // 6 samples x 2 electrodes
        DMatrix::from_row_slice(
            6,
            2,
            &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 4.0, 9.0, 5.0, 0.0, 6.0, 0.0],
        )
    }

    fn toy_locs() -> Vec<[f64; 3]> {
        vec![[10.0, -20.0, 30.0], [-40.0, 50.0, 0.0]]
    }

    fn toy_sessions() -> Vec<SessionLabel> {
        [2, 2, 1, 1, 2, 2].into_iter().map(SessionLabel::from).collect()
    }

    #[test]
    fn test_build_single_session() {
        let brain = Brain::build(toy_data(), toy_locs(), None, SampleRate::Uniform(2.0), None)
            .unwrap();
        assert_eq!(brain.n_elecs(), 2);
        assert_eq!(brain.n_samples(), 6);
        assert_eq!(brain.n_sessions(), 1);
        assert_eq!(brain.session_labels(), &[SessionLabel::Id(DEFAULT_SESSION)]);
        assert_eq!(brain.sample_rates(), Some(&[2.0][..]));
        assert_eq!(brain.n_secs(), Some(3.0));
        assert_eq!(brain.kurtosis().len(), 2);
    }

    #[test]
    fn test_build_sessions() {
        let brain = Brain::build(
            toy_data(),
            toy_locs(),
            Some(toy_sessions()),
            SampleRate::PerSession(vec![4.0, 1.0]),
            None,
        )
        .unwrap();
        // Sessions are ordered by first appearance
        assert_eq!(
            brain.session_labels(),
            &[SessionLabel::Id(2), SessionLabel::Id(1)]
        );
        // 4 samples at 4 Hz and 2 samples at 1 Hz
        assert_eq!(brain.n_secs(), Some(3.0));

        let brain = Brain::build(
            toy_data(),
            toy_locs(),
            Some(toy_sessions()),
            SampleRate::Uniform(2.0),
            None,
        )
        .unwrap();
        assert_eq!(brain.sample_rates(), Some(&[2.0, 2.0][..]));
    }

    #[test]
    fn test_build_sample_rate_mismatch() {
        for rates in [vec![], vec![1.0], vec![1.0, 2.0, 3.0]] {
            let got = rates.len();
            assert_eq!(
                Brain::build(
                    toy_data(),
                    toy_locs(),
                    Some(toy_sessions()),
                    SampleRate::PerSession(rates),
                    None,
                ),
                Err(IEEGError::SampleRateMismatch { expected: 2, got })
            );
        }
    }

    #[test]
    fn test_build_unrecognized_sample_rate() {
        for sample_rate in [
            SampleRate::Unknown,
            SampleRate::Uniform(-1.0),
            SampleRate::Uniform(f64::NAN),
            SampleRate::PerSession(vec![0.0]),
        ] {
            let brain = Brain::build(toy_data(), toy_locs(), None, sample_rate, None).unwrap();
            assert_eq!(brain.sample_rates(), None);
            assert_eq!(brain.n_secs(), None);
        }
    }

    #[test]
    fn test_build_shape_mismatch() {
        assert!(matches!(
            Brain::build(toy_data(), vec![[0.0; 3]], None, SampleRate::Unknown, None),
            Err(IEEGError::ShapeMismatch(_))
        ));
        assert!(matches!(
            Brain::build(
                toy_data(),
                toy_locs(),
                Some(vec![SessionLabel::from("a"); 5]),
                SampleRate::Unknown,
                None
            ),
            Err(IEEGError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_kurtosis_filtering() {
        let mut data = toy_data();
        data.column_mut(1).fill(7.0);
        let brain = Brain::build(data, toy_locs(), None, SampleRate::Unknown, None).unwrap();
        assert!(brain.kurtosis()[1].is_nan());
        assert_eq!(brain.kurtosis_mask(10.0), vec![false, true]);
        assert_eq!(brain.kurtosis_mask(f64::MAX), vec![false, true]);

        let (filtered, kept) = brain.filtered_data(10.0);
        assert_eq!(kept, vec![0]);
        assert_eq!(filtered.shape(), (6, 1));
        assert!(filtered.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_display() {
        let brain = Brain::build(
            toy_data(),
            toy_locs(),
            None,
            SampleRate::Uniform(2.0),
            Some(serde_json::json!({"subject": "S01"})),
        )
        .unwrap();
        let info = brain.to_string();
        assert!(info.contains("Number of electrodes: 2"));
        assert!(info.contains("Recording time in seconds: 3"));
        assert!(info.contains("Number of sessions: 1"));
        assert!(info.contains("S01"));

        let mut brain = brain;
        brain.created_at = 0;
        assert!(brain
            .to_string()
            .contains("Date created: Thu Jan  1 00:00:00 1970 UTC"));
        brain.created_at = 1_700_000_000;
        assert!(brain
            .to_string()
            .contains("Date created: Tue Nov 14 22:13:20 2023 UTC"));
    }

    #[test]
    fn test_save_load() {
        let brain = Brain::build(
            toy_data(),
            toy_locs(),
            Some(toy_sessions()),
            SampleRate::PerSession(vec![4.0, 1.0]),
            Some(serde_json::json!({"subject": "S01"})),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = brain.save_to(dir.path().join("subject")).unwrap();
        assert_eq!(path, dir.path().join("subject.bo"));

        let loaded = Brain::load_from(&path).unwrap();
        assert_eq!(loaded, brain);

        // The extension is not appended twice
        let path = brain.save_to(dir.path().join("again.bo")).unwrap();
        assert_eq!(path, dir.path().join("again.bo"));
    }

    #[test]
    fn test_save_load_non_finite() {
        let mut data = toy_data();
        data[(2, 0)] = f64::NAN;
        data[(4, 1)] = f64::NEG_INFINITY;
        let mut locs = toy_locs();
        locs[1][2] = f64::NAN;
        let brain = Brain::build(data, locs, None, SampleRate::Uniform(2.0), None).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = brain.save_to(dir.path().join("subject")).unwrap();
        let loaded = Brain::load_from(&path).unwrap();

        assert_eq!(loaded.data().shape(), (6, 2));
        for (a, b) in loaded.data().iter().zip(brain.data().iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
        assert!(loaded.data()[(2, 0)].is_nan());
        assert_eq!(loaded.data()[(4, 1)], f64::NEG_INFINITY);
        assert_eq!(loaded.locs()[0], brain.locs()[0]);
        assert!(loaded.locs()[1][2].is_nan());
        assert_eq!(loaded.n_secs(), Some(3.0));
        assert_eq!(loaded.created_at(), brain.created_at());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Brain::load_from(dir.path().join("missing.bo")),
            Err(IEEGError::IOError(_))
        ));
    }
}
