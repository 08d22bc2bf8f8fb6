//! Eigenvalue, normal vector and slope features

use crate::structure_tensor::structure_tensors;
use lidarfeat_core::{FeatureExtractor, Neighborhood, PointCloud, Result, Volume};

/// Eigen-structure of the neighborhood covariance, computed for a whole
/// batch of neighborhoods at once
///
/// Produces the eigenvalues in descending order, the normal vector (the
/// eigenvector of the smallest eigenvalue) and the slope, the cosine of the
/// normal's tilt from vertical. Neighborhoods with fewer than two points get
/// zeros throughout.
#[derive(Debug, Clone, Copy, Default)]
pub struct EigenValueVectorizeFeatureExtractor;

impl EigenValueVectorizeFeatureExtractor {
    pub const FEATURES: [&'static str; 7] = [
        "eigenv_1",
        "eigenv_2",
        "eigenv_3",
        "normal_vector_1",
        "normal_vector_2",
        "normal_vector_3",
        "slope",
    ];

    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for EigenValueVectorizeFeatureExtractor {
    fn provides(&self) -> Vec<String> {
        Self::FEATURES.iter().map(|name| name.to_string()).collect()
    }

    fn is_vectorized(&self) -> bool {
        true
    }

    fn extract(
        &self,
        source: &PointCloud,
        neighborhood: &[usize],
        target: Option<&PointCloud>,
        target_index: Option<usize>,
        volume: &Volume,
    ) -> Result<Vec<f64>> {
        let columns = self.extract_batch(
            source,
            &[neighborhood.to_vec()],
            target,
            target_index.unwrap_or(0),
            volume,
        )?;
        Ok(columns.into_iter().flatten().collect())
    }

    fn extract_batch(
        &self,
        source: &PointCloud,
        neighborhoods: &[Neighborhood],
        _target: Option<&PointCloud>,
        _first_target: usize,
        _volume: &Volume,
    ) -> Result<Vec<Vec<f64>>> {
        let tensors = structure_tensors(source, neighborhoods)?;

        let mut columns = vec![Vec::with_capacity(tensors.len()); Self::FEATURES.len()];
        for tensor in &tensors {
            let row = [
                tensor.eigenvalues[0],
                tensor.eigenvalues[1],
                tensor.eigenvalues[2],
                tensor.normal.x,
                tensor.normal.y,
                tensor.normal.z,
                tensor.slope,
            ];
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Ok(columns)
    }

    fn module(&self) -> &'static str {
        module_path!()
    }
}
