//! Feature name registry and batch feature computation
//!
//! The registry maps every provided feature name to the extractor that
//! produces it. [`compute_features`] runs the extractors behind a list of
//! requested names over all targets and writes the results, with a
//! provenance entry per extractor, into the target cloud.

use crate::config::ExtractionConfig;
use crate::{
    EchoRatioFeatureExtractor, EigenValueVectorizeFeatureExtractor, PercentileFeatureExtractor,
    PointDensityFeatureExtractor,
};
use itertools::Itertools;
use lidarfeat_core::{
    AttributeData, Error, FeatureExtractor, Neighborhood, PointCloud, ProvenanceEntry, Result, Volume,
};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Registry resolving feature names to extractors
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<String, Arc<dyn FeatureExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the density, echo ratio, percentile and eigenvalue
    /// extractors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PointDensityFeatureExtractor::new()));
        registry.register(Arc::new(EchoRatioFeatureExtractor::new()));
        registry.register(Arc::new(PercentileFeatureExtractor::new()));
        registry.register(Arc::new(EigenValueVectorizeFeatureExtractor::new()));
        registry
    }

    /// Register an extractor under every name it provides.
    ///
    /// Replaces any extractor previously registered for those names.
    pub fn register(&mut self, extractor: Arc<dyn FeatureExtractor>) {
        for name in extractor.provides() {
            self.extractors.insert(name, Arc::clone(&extractor));
        }
    }

    /// Look up the extractor providing `name`
    pub fn get(&self, name: &str) -> Result<Arc<dyn FeatureExtractor>> {
        self.extractors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownFeature(name.to_string()))
    }

    /// All registered feature names, sorted
    pub fn feature_names(&self) -> Vec<&str> {
        self.extractors.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("features", &self.feature_names())
            .finish()
    }
}

/// Compute the requested features for every target point.
///
/// `neighborhoods[i]` holds the source indices around target point `i`.
/// Each distinct extractor behind `names` runs once, in order of first
/// request, and all of its provided values are written to `target` as
/// double attributes. Attributes listed by an extractor's `requires` must
/// already exist on `source`; they are not computed on demand.
pub fn compute_features(
    registry: &ExtractorRegistry,
    source: &PointCloud,
    neighborhoods: &[Neighborhood],
    target: &mut PointCloud,
    names: &[&str],
    volume: &Volume,
    config: &ExtractionConfig,
) -> Result<()> {
    config.validate()?;
    if neighborhoods.len() != target.len() {
        return Err(Error::invalid_argument(format!(
            "{} neighborhoods given for {} target points",
            neighborhoods.len(),
            target.len()
        )));
    }

    let extractors: Vec<Arc<dyn FeatureExtractor>> = names
        .iter()
        .map(|name| registry.get(name))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unique_by(|extractor| Arc::as_ptr(extractor) as *const () as usize)
        .collect();

    // Nothing is written to the target until every extractor has succeeded
    let mut results = Vec::with_capacity(extractors.len());
    for extractor in extractors {
        let provided = extractor.provides();

        if !config.overwrite && provided.iter().all(|name| target.has_attribute(name)) {
            warn!("features {:?} already present, skipping", provided);
            continue;
        }

        if let Some(missing) = extractor.requires().into_iter().find(|name| !source.has_attribute(name)) {
            return Err(Error::MissingAttribute(format!(
                "'{}' is required by {} but absent from the source cloud",
                missing,
                extractor.module()
            )));
        }

        let columns = if extractor.is_vectorized() {
            run_vectorized(extractor.as_ref(), source, neighborhoods, target, volume, config)?
        } else {
            run_serial(extractor.as_ref(), source, neighborhoods, target, volume, config)?
        };

        if columns.len() != provided.len() || columns.iter().any(|c| c.len() != target.len()) {
            return Err(Error::Algorithm(format!(
                "{} returned {} columns for {} features over {} targets",
                extractor.module(),
                columns.len(),
                provided.len(),
                target.len()
            )));
        }

        let entry = ProvenanceEntry {
            module: extractor.module().to_string(),
            parameters: extractor.get_params(),
            features: provided.clone(),
            time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        results.push((provided, columns, entry));
    }

    for (provided, columns, entry) in results {
        for (name, column) in provided.iter().zip(columns) {
            target.add_attribute(name, AttributeData::Double(column))?;
        }
        target.provenance.push(entry);
    }

    Ok(())
}

fn run_vectorized(
    extractor: &dyn FeatureExtractor,
    source: &PointCloud,
    neighborhoods: &[Neighborhood],
    target: &PointCloud,
    volume: &Volume,
    config: &ExtractionConfig,
) -> Result<Vec<Vec<f64>>> {
    let chunk_size = config.batch_chunk_size;
    debug!(
        "{}: {} neighborhoods in chunks of {}",
        extractor.module(),
        neighborhoods.len(),
        chunk_size
    );

    let run_chunk = |(c, chunk): (usize, &[Neighborhood])| {
        extractor.extract_batch(source, chunk, Some(target), c * chunk_size, volume)
    };
    let chunks: Vec<Vec<Vec<f64>>> = if config.parallel {
        neighborhoods
            .par_chunks(chunk_size)
            .enumerate()
            .map(run_chunk)
            .collect::<Result<_>>()?
    } else {
        neighborhoods
            .chunks(chunk_size)
            .enumerate()
            .map(run_chunk)
            .collect::<Result<_>>()?
    };

    let mut columns = vec![Vec::with_capacity(neighborhoods.len()); extractor.provides().len()];
    for chunk in chunks {
        for (column, part) in columns.iter_mut().zip(chunk) {
            column.extend(part);
        }
    }
    Ok(columns)
}

fn run_serial(
    extractor: &dyn FeatureExtractor,
    source: &PointCloud,
    neighborhoods: &[Neighborhood],
    target: &PointCloud,
    volume: &Volume,
    config: &ExtractionConfig,
) -> Result<Vec<Vec<f64>>> {
    debug!("{}: {} targets", extractor.module(), neighborhoods.len());

    let run_target = |(i, neighborhood): (usize, &Neighborhood)| {
        extractor.extract(source, neighborhood, Some(target), Some(i), volume)
    };
    let rows: Vec<Vec<f64>> = if config.parallel {
        neighborhoods
            .par_iter()
            .enumerate()
            .map(run_target)
            .collect::<Result<_>>()?
    } else {
        neighborhoods
            .iter()
            .enumerate()
            .map(run_target)
            .collect::<Result<_>>()?
    };

    let mut columns = vec![Vec::with_capacity(rows.len()); extractor.provides().len()];
    for row in rows {
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct NeedsIntensity;

    impl FeatureExtractor for NeedsIntensity {
        fn requires(&self) -> BTreeSet<String> {
            BTreeSet::from(["intensity".to_string()])
        }

        fn provides(&self) -> Vec<String> {
            vec!["mean_intensity".to_string()]
        }

        fn extract(
            &self,
            source: &PointCloud,
            neighborhood: &[usize],
            _target: Option<&PointCloud>,
            _target_index: Option<usize>,
            _volume: &Volume,
        ) -> Result<Vec<f64>> {
            let values = source.values("intensity", neighborhood)?;
            Ok(vec![values.iter().sum::<f64>() / values.len().max(1) as f64])
        }

        fn module(&self) -> &'static str {
            module_path!()
        }
    }

    fn line_cloud(n: usize) -> PointCloud {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        PointCloud::from_xyz(x, vec![0.0; n], vec![0.0; n]).unwrap()
    }

    #[test]
    fn test_default_names() {
        let registry = ExtractorRegistry::with_defaults();
        let names = registry.feature_names();
        assert_eq!(names.len(), 1 + 1 + 10 + 7);
        assert!(names.contains(&"echo_ratio"));
        assert!(names.contains(&"perc_50"));
        assert!(registry.get("eigenv_2").unwrap().is_vectorized());
        assert!(matches!(registry.get("curvature"), Err(Error::UnknownFeature(_))));
    }

    #[test]
    fn test_compute_density_with_provenance() {
        let registry = ExtractorRegistry::with_defaults();
        let source = line_cloud(4);
        let mut target = source.copy_points(&[0, 1]);
        let volume = Volume::sphere(1.0).unwrap();

        compute_features(
            &registry,
            &source,
            &[vec![0, 1], vec![0, 1, 2]],
            &mut target,
            &["point_density"],
            &volume,
            &ExtractionConfig::default(),
        )
        .unwrap();

        let density = target.values("point_density", &[0, 1]).unwrap();
        assert_eq!(density, vec![2.0 / volume.measure(), 3.0 / volume.measure()]);
        assert_eq!(target.provenance.len(), 1);
        assert_eq!(target.provenance[0].module, "lidarfeat_features::density");
        assert_eq!(target.provenance[0].features, vec!["point_density"]);
    }

    #[test]
    fn test_extractor_runs_once_for_shared_names() {
        let registry = ExtractorRegistry::with_defaults();
        let source = line_cloud(3);
        let mut target = source.clone();
        let config = ExtractionConfig {
            batch_chunk_size: 2,
            parallel: false,
            overwrite: false,
        };

        compute_features(
            &registry,
            &source,
            &[vec![0, 1, 2], vec![0], vec![1, 2]],
            &mut target,
            &["eigenv_1", "slope", "eigenv_3"],
            &Volume::infinite_cylinder(1.0).unwrap(),
            &config,
        )
        .unwrap();

        assert_eq!(target.provenance.len(), 1);
        for name in EigenValueVectorizeFeatureExtractor::FEATURES {
            assert!(target.has_attribute(name));
        }
        let eigenv_1 = target.values("eigenv_1", &[0, 1, 2]).unwrap();
        assert!((eigenv_1[0] - 1.0).abs() < 1e-12);
        assert_eq!(eigenv_1[1], 0.0);
        assert!((eigenv_1[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_existing_features_are_skipped() {
        let registry = ExtractorRegistry::with_defaults();
        let source = line_cloud(2);
        let mut target = source.clone();
        target.add_attribute("point_density", AttributeData::Double(vec![7.0, 7.0])).unwrap();

        compute_features(
            &registry,
            &source,
            &[vec![0], vec![1]],
            &mut target,
            &["point_density"],
            &Volume::sphere(1.0).unwrap(),
            &ExtractionConfig::default(),
        )
        .unwrap();

        assert_eq!(target.values("point_density", &[0, 1]).unwrap(), vec![7.0, 7.0]);
        assert!(target.provenance.is_empty());
    }

    #[test]
    fn test_failed_call_leaves_target_untouched() {
        let registry = ExtractorRegistry::with_defaults();
        let source = line_cloud(2);
        let mut target = source.clone();
        let before = target.clone();

        let result = compute_features(
            &registry,
            &source,
            &[vec![0, 1], vec![1]],
            &mut target,
            &["point_density", "echo_ratio"],
            &Volume::sphere(1.0).unwrap(),
            &ExtractionConfig::default(),
        );

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(target, before);
        assert!(!target.has_attribute("point_density"));
        assert!(target.provenance.is_empty());
    }

    #[test]
    fn test_missing_requirement() {
        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(NeedsIntensity));
        let mut source = line_cloud(2);
        let mut target = source.clone();
        let volume = Volume::sphere(1.0).unwrap();
        let config = ExtractionConfig::default();

        let result = compute_features(&registry, &source, &[vec![0], vec![1]], &mut target, &["mean_intensity"], &volume, &config);
        assert!(matches!(result, Err(Error::MissingAttribute(_))));

        source.add_attribute("intensity", AttributeData::UInt(vec![10, 30])).unwrap();
        compute_features(&registry, &source, &[vec![0, 1], vec![1]], &mut target, &["mean_intensity"], &volume, &config)
            .unwrap();
        assert_eq!(target.values("mean_intensity", &[0, 1]).unwrap(), vec![20.0, 30.0]);
    }

    #[test]
    fn test_invalid_arguments() {
        let registry = ExtractorRegistry::with_defaults();
        let source = line_cloud(2);
        let mut target = source.clone();
        let sphere = Volume::sphere(1.0).unwrap();

        let mismatched = compute_features(
            &registry,
            &source,
            &[vec![0]],
            &mut target,
            &["point_density"],
            &sphere,
            &ExtractionConfig::default(),
        );
        assert!(matches!(mismatched, Err(Error::InvalidArgument(_))));

        let wrong_volume = compute_features(
            &registry,
            &source,
            &[vec![0], vec![1]],
            &mut target,
            &["echo_ratio"],
            &sphere,
            &ExtractionConfig::default(),
        );
        assert!(matches!(wrong_volume, Err(Error::InvalidArgument(_))));
        assert!(!target.has_attribute("echo_ratio"));

        let zero_chunk = ExtractionConfig {
            batch_chunk_size: 0,
            ..ExtractionConfig::default()
        };
        let result = compute_features(&registry, &source, &[vec![0], vec![1]], &mut target, &["slope"], &sphere, &zero_chunk);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
