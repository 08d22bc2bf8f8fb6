//! Search volume descriptions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape and size of the volume a neighborhood was searched in
///
/// [`Volume::sphere`] and [`Volume::infinite_cylinder`] are the validated
/// constructors; building a variant directly skips the positive radius
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Volume {
    /// Ball of the given radius around the target
    Sphere { radius: f64 },
    /// Vertical cylinder of the given radius, unbounded in z
    InfiniteCylinder { radius: f64 },
}

impl Volume {
    pub const SPHERE: &'static str = "sphere";
    pub const INFINITE_CYLINDER: &'static str = "infinite cylinder";

    /// Create a sphere volume
    pub fn sphere(radius: f64) -> Result<Self> {
        Self::check_radius(radius)?;
        Ok(Volume::Sphere { radius })
    }

    /// Create an infinite cylinder volume
    pub fn infinite_cylinder(radius: f64) -> Result<Self> {
        Self::check_radius(radius)?;
        Ok(Volume::InfiniteCylinder { radius })
    }

    fn check_radius(radius: f64) -> Result<()> {
        if radius.is_finite() && radius > 0.0 {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!(
                "volume radius must be positive and finite, got {}",
                radius
            )))
        }
    }

    /// Type discriminator of the volume
    pub fn type_name(&self) -> &'static str {
        match self {
            Volume::Sphere { .. } => Self::SPHERE,
            Volume::InfiniteCylinder { .. } => Self::INFINITE_CYLINDER,
        }
    }

    pub fn radius(&self) -> f64 {
        match *self {
            Volume::Sphere { radius } | Volume::InfiniteCylinder { radius } => radius,
        }
    }

    /// Volume of a sphere, `None` for unbounded shapes
    pub fn calculate_volume(&self) -> Option<f64> {
        match *self {
            Volume::Sphere { radius } => Some(4.0 / 3.0 * PI * radius.powi(3)),
            Volume::InfiniteCylinder { .. } => None,
        }
    }

    /// Base area of a cylinder, `None` for closed shapes
    pub fn calculate_base_area(&self) -> Option<f64> {
        match *self {
            Volume::Sphere { .. } => None,
            Volume::InfiniteCylinder { radius } => Some(PI * radius * radius),
        }
    }

    /// Size measure used to turn point counts into densities.
    ///
    /// Volume for spheres, base area for infinite cylinders. Strictly
    /// positive for volumes built through the constructors.
    pub fn measure(&self) -> f64 {
        match *self {
            Volume::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Volume::InfiniteCylinder { radius } => PI * radius * radius,
        }
    }
}
