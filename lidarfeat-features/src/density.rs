//! Point density feature

use lidarfeat_core::{Error, FeatureExtractor, PointCloud, Result, Volume};

/// Number of neighborhood points per unit of volume (sphere) or base area
/// (infinite cylinder)
#[derive(Debug, Clone, Copy, Default)]
pub struct PointDensityFeatureExtractor;

impl PointDensityFeatureExtractor {
    pub const FEATURE: &'static str = "point_density";

    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for PointDensityFeatureExtractor {
    fn provides(&self) -> Vec<String> {
        vec![Self::FEATURE.to_string()]
    }

    fn extract(
        &self,
        _source: &PointCloud,
        neighborhood: &[usize],
        _target: Option<&PointCloud>,
        _target_index: Option<usize>,
        volume: &Volume,
    ) -> Result<Vec<f64>> {
        let measure = volume.measure();
        if !(measure.is_finite() && measure > 0.0) {
            return Err(Error::invalid_argument(format!(
                "{} of radius {} has no positive size",
                volume.type_name(),
                volume.radius()
            )));
        }
        Ok(vec![neighborhood.len() as f64 / measure])
    }

    fn module(&self) -> &'static str {
        module_path!()
    }
}
