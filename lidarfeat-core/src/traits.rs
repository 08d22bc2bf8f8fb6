//! Core traits for lidarfeat

use crate::{point::Point3d, point_cloud::PointCloud, volume::Volume, Result};
use std::collections::BTreeSet;

/// Indices into a source point cloud making up one target's neighborhood
pub type Neighborhood = Vec<usize>;

/// Trait for finding the neighborhood of a position inside a volume
pub trait NeighborhoodSearch {
    /// Find the indices of all source points inside `volume` centered on `query`
    fn neighborhood(&self, query: &Point3d, volume: &Volume) -> Neighborhood;
}

/// Trait implemented by every feature extractor
///
/// An extractor reads a source cloud and a neighborhood and returns one
/// value per name in [`FeatureExtractor::provides`]. It never modifies its
/// inputs; writing results back is left to the caller.
pub trait FeatureExtractor: Send + Sync {
    /// Attributes that must already exist on the source cloud
    fn requires(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Names of the produced values, in the order `extract` returns them
    fn provides(&self) -> Vec<String>;

    /// Whether [`FeatureExtractor::extract_batch`] is the native entry point
    fn is_vectorized(&self) -> bool {
        false
    }

    /// Compute the feature values for a single target
    fn extract(
        &self,
        source: &PointCloud,
        neighborhood: &[usize],
        target: Option<&PointCloud>,
        target_index: Option<usize>,
        volume: &Volume,
    ) -> Result<Vec<f64>>;

    /// Compute the feature values for a batch of targets.
    ///
    /// `neighborhoods[i]` belongs to target `first_target + i`. Returns one
    /// column per provided name, each as long as the batch.
    fn extract_batch(
        &self,
        source: &PointCloud,
        neighborhoods: &[Neighborhood],
        target: Option<&PointCloud>,
        first_target: usize,
        volume: &Volume,
    ) -> Result<Vec<Vec<f64>>> {
        let mut columns = vec![Vec::with_capacity(neighborhoods.len()); self.provides().len()];
        for (offset, neighborhood) in neighborhoods.iter().enumerate() {
            let target_index = target.map(|_| first_target + offset);
            let values = self.extract(source, neighborhood, target, target_index, volume)?;
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }
        Ok(columns)
    }

    /// Parameters recorded in provenance
    fn get_params(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Module path recorded in provenance
    fn module(&self) -> &'static str;
}
