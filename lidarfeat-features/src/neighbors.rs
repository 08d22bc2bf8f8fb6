//! Neighborhood search implementations

use lidarfeat_core::{Error, Neighborhood, NeighborhoodSearch, Point3d, PointCloud, Result, Volume};
use log::debug;
use rayon::prelude::*;

/// Simple brute force neighborhood search for small datasets and testing
///
/// Spheres select points by Euclidean distance, infinite cylinders by
/// horizontal (x, y) distance. Indices come back in ascending order.
pub struct BruteForceSearch {
    points: Vec<Point3d>,
}

impl BruteForceSearch {
    pub fn new(cloud: &PointCloud) -> Result<Self> {
        let all: Vec<usize> = (0..cloud.len()).collect();
        Ok(Self {
            points: cloud.positions(&all)?,
        })
    }
}

impl NeighborhoodSearch for BruteForceSearch {
    fn neighborhood(&self, query: &Point3d, volume: &Volume) -> Neighborhood {
        let radius_squared = volume.radius() * volume.radius();
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let dx = point.x - query.x;
                let dy = point.y - query.y;
                let distance_squared = match volume {
                    Volume::Sphere { .. } => {
                        let dz = point.z - query.z;
                        dx * dx + dy * dy + dz * dz
                    }
                    Volume::InfiniteCylinder { .. } => dx * dx + dy * dy,
                };

                if distance_squared <= radius_squared {
                    Some(idx)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Find the neighborhood of every target point inside the source cloud
///
/// The result is parallel to the target cloud's point order.
pub fn compute_neighborhoods(
    source: &PointCloud,
    target: &PointCloud,
    volume: &Volume,
) -> Result<Vec<Neighborhood>> {
    if target.is_empty() {
        return Ok(Vec::new());
    }
    if source.is_empty() {
        return Err(Error::InvalidData("source point cloud is empty".to_string()));
    }

    let search = BruteForceSearch::new(source)?;
    let all: Vec<usize> = (0..target.len()).collect();
    let queries = target.positions(&all)?;

    debug!(
        "searching {} {} neighborhoods of radius {} among {} points",
        queries.len(),
        volume.type_name(),
        volume.radius(),
        source.len()
    );

    Ok(queries
        .par_iter()
        .map(|query| search.neighborhood(query, volume))
        .collect())
}
