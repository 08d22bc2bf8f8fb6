//! # lidarfeat features
//!
//! Per-point neighborhood features for LiDAR point clouds.
//!
//! Every extractor implements [`lidarfeat_core::FeatureExtractor`]:
//!
//! - [`PointDensityFeatureExtractor`]: points per unit volume or base area
//! - [`EchoRatioFeatureExtractor`]: share of cylinder points inside the sphere
//! - [`PercentileFeatureExtractor`]: height percentiles
//! - [`EigenValueVectorizeFeatureExtractor`]: covariance eigenvalues, normal
//!   vector and slope, computed for a whole batch of neighborhoods at once
//!
//! [`compute_features`] resolves feature names through an
//! [`ExtractorRegistry`] and writes the results into a target cloud.
//!
//! ```rust
//! use lidarfeat_core::{PointCloud, Volume};
//! use lidarfeat_features::{compute_features, compute_neighborhoods, ExtractionConfig, ExtractorRegistry};
//!
//! fn main() -> lidarfeat_core::Result<()> {
//!     let source = PointCloud::from_xyz(
//!         vec![0.0, 0.1, 0.0, 0.1],
//!         vec![0.0, 0.0, 0.1, 0.1],
//!         vec![0.0, 0.2, 0.1, 0.3],
//!     )?;
//!     let mut target = source.copy_points(&[0]);
//!     let volume = Volume::infinite_cylinder(0.5)?;
//!
//!     let neighborhoods = compute_neighborhoods(&source, &target, &volume)?;
//!     compute_features(
//!         &ExtractorRegistry::with_defaults(),
//!         &source,
//!         &neighborhoods,
//!         &mut target,
//!         &["point_density", "echo_ratio", "eigenv_1"],
//!         &volume,
//!         &ExtractionConfig::default(),
//!     )?;
//!     assert!(target.has_attribute("slope"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod density;
pub mod echo_ratio;
pub mod eigenvalues;
pub mod neighbors;
pub mod percentile;
pub mod registry;
pub mod structure_tensor;

// Re-export commonly used items
pub use config::*;
pub use density::*;
pub use echo_ratio::*;
pub use eigenvalues::*;
pub use neighbors::*;
pub use percentile::*;
pub use registry::*;
pub use structure_tensor::*;
