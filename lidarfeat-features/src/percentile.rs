//! Height percentile features

use lidarfeat_core::{Error, FeatureExtractor, PointCloud, Result, Volume, Z};

/// Percentiles of the z values in a neighborhood
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileFeatureExtractor {
    percentiles: Vec<f64>,
}

impl Default for PercentileFeatureExtractor {
    fn default() -> Self {
        Self {
            percentiles: (1..=10).map(|i| i as f64 * 10.0).collect(),
        }
    }
}

impl PercentileFeatureExtractor {
    /// Extractor for the 10th, 20th, ..., 100th percentiles
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor for a custom, ascending list of percentiles in `[0, 100]`
    pub fn with_percentiles(percentiles: Vec<f64>) -> Result<Self> {
        if percentiles.is_empty() {
            return Err(Error::invalid_argument("at least one percentile is required"));
        }
        if percentiles.iter().any(|p| !(0.0..=100.0).contains(p)) {
            return Err(Error::invalid_argument("percentiles must lie in [0, 100]"));
        }
        if percentiles.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_argument("percentiles must be strictly ascending"));
        }
        Ok(Self { percentiles })
    }

    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }
}

/// Score at percentile `p` of already sorted values, interpolating linearly
/// between the two closest ranks.
///
/// Panics on an empty slice.
pub fn score_at_percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
    }
}

impl FeatureExtractor for PercentileFeatureExtractor {
    fn provides(&self) -> Vec<String> {
        self.percentiles.iter().map(|p| format!("perc_{}", p)).collect()
    }

    /// Fails with [`Error::InvalidArgument`] on an empty neighborhood.
    fn extract(
        &self,
        source: &PointCloud,
        neighborhood: &[usize],
        _target: Option<&PointCloud>,
        _target_index: Option<usize>,
        _volume: &Volume,
    ) -> Result<Vec<f64>> {
        if neighborhood.is_empty() {
            return Err(Error::invalid_argument("percentiles of an empty neighborhood are undefined"));
        }

        let mut z = source.values(Z, neighborhood)?;
        z.sort_by(f64::total_cmp);

        Ok(self
            .percentiles
            .iter()
            .map(|&p| score_at_percentile(&z, p))
            .collect())
    }

    fn get_params(&self) -> Vec<f64> {
        self.percentiles.clone()
    }

    fn module(&self) -> &'static str {
        module_path!()
    }
}
