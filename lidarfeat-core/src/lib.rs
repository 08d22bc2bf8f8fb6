//! Core data structures and traits for lidarfeat
//!
//! This crate provides the point cloud attribute store, search volume
//! descriptions, provenance records and the traits implemented by feature
//! extractors and neighborhood searches.

pub mod point;
pub mod point_cloud;
pub mod traits;
pub mod volume;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use traits::*;
pub use volume::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Point3, Vector3};
