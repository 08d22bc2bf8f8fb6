//! Echo ratio feature
//!
//! The share of points in a vertical cylinder around the target that also
//! lie in the sphere of the same radius, as a percentage. Low values mark
//! penetrable surfaces such as vegetation; solid surfaces approach 100.

use lidarfeat_core::{Error, FeatureExtractor, PointCloud, Result, Volume};

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoRatioFeatureExtractor;

impl EchoRatioFeatureExtractor {
    pub const FEATURE: &'static str = "echo_ratio";

    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for EchoRatioFeatureExtractor {
    fn provides(&self) -> Vec<String> {
        vec![Self::FEATURE.to_string()]
    }

    /// Fails with [`Error::InvalidArgument`] unless `volume` is an infinite
    /// cylinder and both the target cloud and index are given. An empty
    /// cylinder neighborhood has no defined ratio and fails the same way.
    fn extract(
        &self,
        source: &PointCloud,
        neighborhood: &[usize],
        target: Option<&PointCloud>,
        target_index: Option<usize>,
        volume: &Volume,
    ) -> Result<Vec<f64>> {
        let radius = match volume {
            Volume::InfiniteCylinder { radius } => *radius,
            other => {
                return Err(Error::invalid_argument(format!(
                    "echo ratio needs an infinite cylinder volume, got {}",
                    other.type_name()
                )))
            }
        };
        let target = target.ok_or_else(|| Error::invalid_argument("target point cloud required"))?;
        let target_index = target_index.ok_or_else(|| Error::invalid_argument("target point index required"))?;

        if neighborhood.is_empty() {
            return Err(Error::invalid_argument("echo ratio of an empty cylinder neighborhood is undefined"));
        }

        let center = target.position(target_index)?;
        let radius_squared = radius * radius;
        let n_sphere = source
            .positions(neighborhood)?
            .iter()
            .filter(|p| (*p - center).norm_squared() <= radius_squared)
            .count();

        Ok(vec![100.0 * n_sphere as f64 / neighborhood.len() as f64])
    }

    fn module(&self) -> &'static str {
        module_path!()
    }
}
