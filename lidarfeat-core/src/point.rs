//! Point and vector types

use nalgebra::{Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Unit vertical axis used for slope computations
pub fn vertical_axis() -> Vector3d {
    Vector3d::new(0.0, 0.0, 1.0)
}
