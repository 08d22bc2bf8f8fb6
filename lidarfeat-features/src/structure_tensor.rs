//! Structure tensor (neighborhood covariance) computation
//!
//! The batched path packs a ragged set of neighborhoods into one dense
//! `(batch, 3, max_len)` array with a parallel padding mask, computes masked
//! means and covariances over the whole batch, and then solves one 3×3
//! symmetric eigenproblem per neighborhood. The serial path,
//! [`structure_tensor`], computes the same quantities for one point set and
//! shares the decomposition step so both produce matching output.

use lidarfeat_core::{vertical_axis, Matrix3, Neighborhood, Point3d, PointCloud, Result, Vector3d};
use log::{debug, trace};
use nalgebra::SymmetricEigen;
use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Eigen-structure of one neighborhood
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureTensor {
    /// Eigenvalues in descending order
    pub eigenvalues: [f64; 3],
    /// Eigenvector of the smallest eigenvalue
    pub normal: Vector3d,
    /// Cosine of the angle between `normal` and the vertical axis
    pub slope: f64,
}

impl StructureTensor {
    /// Result used for neighborhoods too small to define a covariance
    pub fn zero() -> Self {
        Self {
            eigenvalues: [0.0; 3],
            normal: Vector3d::zeros(),
            slope: 0.0,
        }
    }
}

/// A batch of ragged neighborhoods packed into dense arrays
#[derive(Debug, Clone)]
pub struct PackedNeighborhoods {
    /// Coordinates with shape `(batch, 3, max_len)`; padding holds 0.0
    pub xyz: Array3<f64>,
    /// Shape `(batch, max_len)`; `true` marks a padding slot
    pub mask: Array2<bool>,
}

impl PackedNeighborhoods {
    /// Pack the positions of every neighborhood, preserving index order
    pub fn pack(source: &PointCloud, neighborhoods: &[Neighborhood]) -> Result<Self> {
        let [x, y, z] = source.coordinates()?;
        let batch = neighborhoods.len();
        let max_len = neighborhoods.iter().map(Vec::len).max().unwrap_or(0);

        let mut xyz = Array3::<f64>::zeros((batch, 3, max_len));
        let mut mask = Array2::from_elem((batch, max_len), true);

        for (b, neighborhood) in neighborhoods.iter().enumerate() {
            for (k, &index) in neighborhood.iter().enumerate() {
                xyz[[b, 0, k]] = x.get(index);
                xyz[[b, 1, k]] = y.get(index);
                xyz[[b, 2, k]] = z.get(index);
                mask[[b, k]] = false;
            }
        }

        debug!("packed {} neighborhoods into ({}, 3, {})", batch, batch, max_len);
        Ok(Self { xyz, mask })
    }

    pub fn batch_size(&self) -> usize {
        self.xyz.len_of(Axis(0))
    }

    pub fn max_len(&self) -> usize {
        self.xyz.len_of(Axis(2))
    }

    /// Number of valid (non-padding) entries per neighborhood
    pub fn counts(&self) -> Vec<usize> {
        self.mask
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&padded| !padded).count())
            .collect()
    }

    /// 1.0 for valid entries, 0.0 for padding; shape `(batch, max_len)`
    pub fn weights(&self) -> Array2<f64> {
        self.mask.mapv(|padded| if padded { 0.0 } else { 1.0 })
    }

    /// Per-neighborhood mean position, shape `(batch, 3)`.
    ///
    /// Sums only valid entries and divides by the valid count. Empty
    /// neighborhoods get a zero mean.
    pub fn masked_mean(&self) -> Array2<f64> {
        let weights = self.weights();
        let sums = (&self.xyz * &weights.view().insert_axis(Axis(1))).sum_axis(Axis(2));
        let counts = weights.sum_axis(Axis(1)).mapv(|n| n.max(1.0));
        &sums / &counts.insert_axis(Axis(1))
    }

    /// Coordinates minus their neighborhood mean, with padding forced to 0.0
    pub fn centered(&self) -> Array3<f64> {
        let mean = self.masked_mean().insert_axis(Axis(2));
        let weights = self.weights().insert_axis(Axis(1));
        (&self.xyz - &mean) * &weights
    }

    /// Sample covariance of every neighborhood.
    ///
    /// `None` for neighborhoods with fewer than two valid points.
    pub fn covariances(&self) -> Vec<Option<Matrix3<f64>>> {
        let centered = self.centered();
        centered
            .outer_iter()
            .zip(self.counts())
            .enumerate()
            .map(|(b, (m, n))| {
                if n <= 1 {
                    trace!("neighborhood {} has {} points, no covariance", b, n);
                    return None;
                }
                let cov = m.dot(&m.t()) / (n - 1) as f64;
                Some(Matrix3::from_fn(|i, j| cov[[i, j]]))
            })
            .collect()
    }
}

/// Eigen-decompose a covariance matrix with a deterministic ordering.
///
/// Eigenvalues are sorted descending; the normal is the eigenvector of the
/// smallest one, signed so its first non-zero component counting from z is
/// positive.
pub fn decompose(covariance: &Matrix3<f64>) -> StructureTensor {
    let eigen = SymmetricEigen::new(*covariance);

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(Ordering::Equal)
    });

    let eigenvalues = [
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    ];
    let normal = canonical_sign(eigen.eigenvectors.column(order[2]).into_owned());
    let slope = normal.dot(&vertical_axis());

    if eigenvalues.iter().chain(normal.iter()).any(|v| !v.is_finite()) {
        trace!("non-finite eigen-structure replaced by zero result");
        return StructureTensor::zero();
    }

    StructureTensor {
        eigenvalues,
        normal,
        slope,
    }
}

fn canonical_sign(v: Vector3d) -> Vector3d {
    let leading = [v.z, v.y, v.x].into_iter().find(|c| *c != 0.0).unwrap_or(0.0);
    if leading < 0.0 {
        -v
    } else {
        v
    }
}

/// Structure tensor of a single point set
pub fn structure_tensor(points: &[Point3d]) -> StructureTensor {
    let n = points.len();
    if n <= 1 {
        return StructureTensor::zero();
    }

    let mut sum = Vector3d::zeros();
    for point in points {
        sum += point.coords;
    }
    let mean = sum / n as f64;

    let mut covariance = Matrix3::<f64>::zeros();
    for point in points {
        let diff = point.coords - mean;
        covariance += diff * diff.transpose();
    }
    covariance /= (n - 1) as f64;

    decompose(&covariance)
}

/// Structure tensors of a batch of neighborhoods, one per neighborhood
pub fn structure_tensors(source: &PointCloud, neighborhoods: &[Neighborhood]) -> Result<Vec<StructureTensor>> {
    let packed = PackedNeighborhoods::pack(source, neighborhoods)?;
    Ok(packed
        .covariances()
        .into_par_iter()
        .map(|cov| cov.as_ref().map_or_else(StructureTensor::zero, decompose))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cloud(points: &[[f64; 3]]) -> PointCloud {
        let positions: Vec<Point3d> = points.iter().map(|p| Point3d::new(p[0], p[1], p[2])).collect();
        PointCloud::from_positions(&positions)
    }

    #[test]
    fn test_pack_preserves_order_and_marks_padding() {
        let pc = cloud(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let packed = PackedNeighborhoods::pack(&pc, &[vec![2, 1], vec![0], vec![]]).unwrap();

        assert_eq!(packed.batch_size(), 3);
        assert_eq!(packed.max_len(), 2);
        assert_eq!(packed.counts(), vec![2, 1, 0]);
        assert_eq!(packed.xyz[[0, 0, 0]], 4.0);
        assert_eq!(packed.xyz[[0, 2, 1]], 3.0);
        assert!(!packed.mask[[1, 0]]);
        assert!(packed.mask[[1, 1]]);
        assert!(packed.mask[[2, 0]]);
    }

    #[test]
    fn test_padding_does_not_bias_mean() {
        let pc = cloud(&[[1.0, 1.0, 1.0], [3.0, 5.0, 7.0], [9.0, 9.0, 9.0], [0.0, 0.0, 0.0]]);
        let packed = PackedNeighborhoods::pack(&pc, &[vec![0, 1], vec![0, 1, 2, 3]]).unwrap();
        let mean = packed.masked_mean();

        assert_relative_eq!(mean[[0, 0]], 2.0);
        assert_relative_eq!(mean[[0, 1]], 3.0);
        assert_relative_eq!(mean[[0, 2]], 4.0);
        assert_relative_eq!(mean[[1, 0]], 13.0 / 4.0);
    }

    #[test]
    fn test_centered_zeroes_padding() {
        let pc = cloud(&[[1.0, 2.0, 3.0], [3.0, 6.0, 9.0], [7.0, 7.0, 7.0]]);
        let packed = PackedNeighborhoods::pack(&pc, &[vec![0, 1], vec![2], vec![]]).unwrap();
        let centered = packed.centered();

        assert_eq!(centered.shape(), &[3, 3, 2]);
        assert_relative_eq!(centered[[0, 0, 0]], -1.0);
        assert_relative_eq!(centered[[0, 2, 1]], 3.0);
        for axis in 0..3 {
            assert_eq!(centered[[1, axis, 0]], 0.0);
            assert_eq!(centered[[1, axis, 1]], 0.0);
            assert_eq!(centered[[2, axis, 0]], 0.0);
        }
    }

    #[test]
    fn test_ragged_batch_matches_serial_covariance() {
        let pc = cloud(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.5, 0.2],
            [0.3, 2.0, 0.1],
            [1.5, 1.0, 0.9],
            [0.7, 0.4, 3.0],
        ]);
        let neighborhoods = vec![vec![0, 1, 2, 3, 4], vec![4, 2, 0], vec![1, 3]];
        let packed = PackedNeighborhoods::pack(&pc, &neighborhoods).unwrap();

        for (neighborhood, cov) in neighborhoods.iter().zip(packed.covariances()) {
            let points = pc.positions(neighborhood).unwrap();
            let n = points.len() as f64;
            let mean = points.iter().fold(Vector3d::zeros(), |acc, p| acc + p.coords) / n;
            let expected = points
                .iter()
                .map(|p| (p.coords - mean) * (p.coords - mean).transpose())
                .fold(Matrix3::zeros(), |acc, m| acc + m)
                / (n - 1.0);
            assert_relative_eq!(cov.unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_covariance_matches_sample_covariance() {
        let pc = cloud(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [2.0, 4.0, 0.0]]);
        let packed = PackedNeighborhoods::pack(&pc, &[vec![0, 1, 2, 3], vec![0]]).unwrap();
        let covs = packed.covariances();

        let cov = covs[0].unwrap();
        assert_relative_eq!(cov[(0, 0)], 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 16.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(2, 2)], 0.0);
        assert_relative_eq!(cov[(0, 1)], 0.0, epsilon = 1e-12);
        assert!(covs[1].is_none());
    }

    #[test]
    fn test_decompose_sorts_descending() {
        let cov = Matrix3::from_diagonal(&Vector3d::new(1.0, 5.0, 3.0));
        let tensor = decompose(&cov);

        assert_relative_eq!(tensor.eigenvalues[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(tensor.eigenvalues[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(tensor.eigenvalues[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(tensor.normal.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(tensor.slope, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_horizontal_plane_normal_points_up() {
        let pc = cloud(&[[0.0, 0.0, 2.0], [1.0, 0.0, 2.0], [0.0, 1.0, 2.0], [1.0, 1.0, 2.0], [0.5, 0.3, 2.0]]);
        let tensors = structure_tensors(&pc, &[vec![0, 1, 2, 3, 4]]).unwrap();

        assert_relative_eq!(tensors[0].normal.z, 1.0, epsilon = 1e-9);
        assert_relative_eq!(tensors[0].slope, 1.0, epsilon = 1e-9);
        assert_relative_eq!(tensors[0].eigenvalues[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_points_gives_zero() {
        let pc = cloud(&[[5.0, 5.0, 5.0], [1.0, 2.0, 3.0]]);
        let tensors = structure_tensors(&pc, &[vec![0], vec![], vec![0, 1]]).unwrap();

        assert_eq!(tensors[0], StructureTensor::zero());
        assert_eq!(tensors[1], StructureTensor::zero());
        assert!(tensors[2].eigenvalues[0] > 0.0);
        assert_eq!(structure_tensor(&[Point3d::new(5.0, 5.0, 5.0)]), StructureTensor::zero());
    }

    #[test]
    fn test_empty_batch() {
        let pc = cloud(&[[0.0, 0.0, 0.0]]);
        assert!(structure_tensors(&pc, &[]).unwrap().is_empty());
    }
}
