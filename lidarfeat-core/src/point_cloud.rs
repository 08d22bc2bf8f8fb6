//! Point cloud attribute storage

use crate::error::{Error, Result};
use crate::point::Point3d;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the x coordinate attribute
pub const X: &str = "x";
/// Name of the y coordinate attribute
pub const Y: &str = "y";
/// Name of the z coordinate attribute
pub const Z: &str = "z";

/// A typed, flat array of per-point values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeData {
    Double(Vec<f64>),
    Float(Vec<f32>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
}

impl AttributeData {
    /// Get the type name of the stored values
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeData::Double(_) => "double",
            AttributeData::Float(_) => "float",
            AttributeData::Int(_) => "int64",
            AttributeData::UInt(_) => "uint64",
        }
    }

    /// Get the number of values
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Double(v) => v.len(),
            AttributeData::Float(v) => v.len(),
            AttributeData::Int(v) => v.len(),
            AttributeData::UInt(v) => v.len(),
        }
    }

    /// Check if the array holds no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read value `index` widened to `f64`.
    ///
    /// Panics when `index` is out of range.
    pub fn get(&self, index: usize) -> f64 {
        match self {
            AttributeData::Double(v) => v[index],
            AttributeData::Float(v) => v[index] as f64,
            AttributeData::Int(v) => v[index] as f64,
            AttributeData::UInt(v) => v[index] as f64,
        }
    }

    /// Gather the values at `indices`, in order
    pub fn gather(&self, indices: &[usize]) -> Vec<f64> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    /// Build a new array of the same type holding only `indices`
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            AttributeData::Double(v) => AttributeData::Double(indices.iter().map(|&i| v[i]).collect()),
            AttributeData::Float(v) => AttributeData::Float(indices.iter().map(|&i| v[i]).collect()),
            AttributeData::Int(v) => AttributeData::Int(indices.iter().map(|&i| v[i]).collect()),
            AttributeData::UInt(v) => AttributeData::UInt(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// Record of which extractor produced which attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Path of the module holding the extractor
    pub module: String,
    /// Parameters reported by the extractor
    pub parameters: Vec<f64>,
    /// Attribute names written by the extractor
    pub features: Vec<String>,
    /// Seconds since the UNIX epoch at which the entry was recorded
    pub time: u64,
}

/// A point cloud stored as named, index-aligned attribute arrays
///
/// Every attribute under `point` has the same length; index `i` refers to
/// the same physical point in each of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub point: BTreeMap<String, AttributeData>,
    pub provenance: Vec<ProvenanceEntry>,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud from coordinate columns
    pub fn from_xyz(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        let mut cloud = Self::new();
        cloud.add_attribute(X, AttributeData::Double(x))?;
        cloud.add_attribute(Y, AttributeData::Double(y))?;
        cloud.add_attribute(Z, AttributeData::Double(z))?;
        Ok(cloud)
    }

    /// Create a point cloud from a list of positions
    pub fn from_positions(positions: &[Point3d]) -> Self {
        let mut point = BTreeMap::new();
        point.insert(X.to_string(), AttributeData::Double(positions.iter().map(|p| p.x).collect()));
        point.insert(Y.to_string(), AttributeData::Double(positions.iter().map(|p| p.y).collect()));
        point.insert(Z.to_string(), AttributeData::Double(positions.iter().map(|p| p.z).collect()));
        Self {
            point,
            provenance: Vec::new(),
        }
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.point.values().next().map_or(0, AttributeData::len)
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether an attribute is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.point.contains_key(name)
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Result<&AttributeData> {
        self.point
            .get(name)
            .ok_or_else(|| Error::MissingAttribute(name.to_string()))
    }

    /// Add or replace an attribute, keeping all arrays the same length
    pub fn add_attribute(&mut self, name: &str, data: AttributeData) -> Result<()> {
        let others = self.point.iter().find(|(key, _)| key.as_str() != name);
        if let Some((other, existing)) = others {
            if existing.len() != data.len() {
                return Err(Error::InvalidData(format!(
                    "attribute '{}' has {} values but '{}' has {}",
                    name,
                    data.len(),
                    other,
                    existing.len()
                )));
            }
        }
        self.point.insert(name.to_string(), data);
        Ok(())
    }

    /// Get the position of point `index`.
    ///
    /// Panics when `index` is out of range.
    pub fn position(&self, index: usize) -> Result<Point3d> {
        let [x, y, z] = self.coordinates()?;
        Ok(Point3d::new(x.get(index), y.get(index), z.get(index)))
    }

    /// Get the positions of the points at `indices`, in order
    pub fn positions(&self, indices: &[usize]) -> Result<Vec<Point3d>> {
        let [x, y, z] = self.coordinates()?;
        Ok(indices
            .iter()
            .map(|&i| Point3d::new(x.get(i), y.get(i), z.get(i)))
            .collect())
    }

    /// Get the values of one attribute at `indices`
    pub fn values(&self, name: &str, indices: &[usize]) -> Result<Vec<f64>> {
        Ok(self.attribute(name)?.gather(indices))
    }

    /// Borrow the x, y and z columns
    pub fn coordinates(&self) -> Result<[&AttributeData; 3]> {
        Ok([self.attribute(X)?, self.attribute(Y)?, self.attribute(Z)?])
    }

    /// Copy the points at `indices` into a new cloud.
    ///
    /// All attributes are carried over; provenance is kept as is.
    pub fn copy_points(&self, indices: &[usize]) -> Self {
        Self {
            point: self
                .point
                .iter()
                .map(|(name, data)| (name.clone(), data.select(indices)))
                .collect(),
            provenance: self.provenance.clone(),
        }
    }
}
