//! Memoization of pipeline runs keyed by an input fingerprint.
//!
//! The pipeline is a pure function of `PipelineInput`. The fingerprint only
//! picks a bucket: a hit also requires the stored input to equal the new one,
//! so colliding fingerprints never share an output. Errors are never cached.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::app::pipeline::{self, PipelineInput, PipelineOutput};
use crate::domain::{DistributionSpec, EstimationParams};
use crate::error::EstimationError;

type Bucket = Vec<(PipelineInput, Arc<PipelineOutput>)>;

/// Thread-safe map from input fingerprint to finished outputs.
#[derive(Debug, Default)]
pub struct EstimateCache {
    entries: Mutex<HashMap<u64, Bucket>>,
}

impl EstimateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached output for `input`, running the pipeline on a miss.
    ///
    /// The lock is not held while the pipeline runs, so two threads racing on
    /// the same input may both compute it; the outputs are identical.
    pub fn get_or_run(&self, input: &PipelineInput) -> Result<Arc<PipelineOutput>, EstimationError> {
        self.get_or_run_keyed(fingerprint(input), input)
    }

    fn get_or_run_keyed(&self, key: u64, input: &PipelineInput) -> Result<Arc<PipelineOutput>, EstimationError> {
        if let Some(hit) = self.lookup(key, input) {
            debug!(region = %input.series.region, key, "estimate cache hit");
            return Ok(hit);
        }

        let output = Arc::new(pipeline::run(input)?);
        let mut entries = self.lock();
        let bucket = entries.entry(key).or_default();
        if let Some((_, cached)) = bucket.iter().find(|(stored, _)| stored == input) {
            return Ok(Arc::clone(cached));
        }
        if !bucket.is_empty() {
            debug!(region = %input.series.region, key, "estimate cache fingerprint collision");
        }
        bucket.push((input.clone(), Arc::clone(&output)));
        Ok(output)
    }

    fn lookup(&self, key: u64, input: &PipelineInput) -> Option<Arc<PipelineOutput>> {
        self.lock()
            .get(&key)?
            .iter()
            .find(|(stored, _)| stored == input)
            .map(|(_, output)| Arc::clone(output))
    }

    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Bucket>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 64-bit fingerprint over every field that influences the output.
pub fn fingerprint(input: &PipelineInput) -> u64 {
    let mut hasher = DefaultHasher::new();

    let series = &input.series;
    series.region.hash(&mut hasher);
    series.kind.hash(&mut hasher);
    series.rows.len().hash(&mut hasher);
    for row in &series.rows {
        row.date.hash(&mut hasher);
        row.region.hash(&mut hasher);
        row.value.to_bits().hash(&mut hasher);
    }

    let settings = &input.settings;
    hash_spec(&settings.serial_interval, &mut hasher);
    match &settings.reporting_delay {
        Some(spec) => {
            1u8.hash(&mut hasher);
            hash_spec(spec, &mut hasher);
        }
        None => 0u8.hash(&mut hasher),
    }
    settings.shift_by_delay.hash(&mut hasher);
    hash_params(&settings.params, &mut hasher);
    settings.date_range.hash(&mut hasher);
    settings.gap_policy.hash(&mut hasher);

    hasher.finish()
}

fn hash_spec(spec: &DistributionSpec, hasher: &mut DefaultHasher) {
    std::mem::discriminant(spec).hash(hasher);
    match spec {
        DistributionSpec::Default => {}
        DistributionSpec::MeanStd { family, mean, std } => {
            family.hash(hasher);
            mean.to_bits().hash(hasher);
            std.to_bits().hash(hasher);
        }
        DistributionSpec::GammaShapeScale { shape, scale } => {
            shape.to_bits().hash(hasher);
            scale.to_bits().hash(hasher);
        }
        DistributionSpec::Weights { pmf } => {
            pmf.len().hash(hasher);
            for w in pmf {
                w.to_bits().hash(hasher);
            }
        }
    }
}

fn hash_params(params: &EstimationParams, hasher: &mut DefaultHasher) {
    params.smoothing_window.hash(hasher);
    params.r_window_size.hash(hasher);
    params.prior_shape.to_bits().hash(hasher);
    params.prior_scale.to_bits().hash(hasher);
    params.robustness_iters.hash(hasher);
    params.uncertainty.hash(hasher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::RunSettings;
    use crate::domain::{ContinuousFamily, ObservationSeries, SeriesKind};
    use chrono::NaiveDate;

    fn input(level: f64) -> PipelineInput {
        let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let values: Vec<(NaiveDate, f64)> = start
            .iter_days()
            .take(30)
            .enumerate()
            .map(|(i, d)| (d, level * (i + 1) as f64))
            .collect();
        PipelineInput {
            series: ObservationSeries::from_values("A", SeriesKind::Cumulative, values),
            settings: RunSettings::default(),
        }
    }

    #[test]
    fn fingerprint_tracks_every_setting() {
        let base = input(50.0);
        assert_eq!(fingerprint(&base), fingerprint(&input(50.0)));
        assert_ne!(fingerprint(&base), fingerprint(&input(51.0)));

        let mut window = input(50.0);
        window.settings.params.r_window_size = 8;
        assert_ne!(fingerprint(&base), fingerprint(&window));

        let mut si = input(50.0);
        si.settings.serial_interval = DistributionSpec::MeanStd {
            family: ContinuousFamily::Gamma,
            mean: 4.8,
            std: 2.3,
        };
        assert_ne!(fingerprint(&base), fingerprint(&si));
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let cache = EstimateCache::new();
        let first = cache.get_or_run(&input(50.0)).unwrap();
        let second = cache.get_or_run(&input(50.0)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_run(&input(60.0)).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn colliding_fingerprints_do_not_share_outputs() {
        let cache = EstimateCache::new();
        let low = input(50.0);
        let high = input(80.0);

        let a = cache.get_or_run_keyed(7, &low).unwrap();
        let b = cache.get_or_run_keyed(7, &high).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*b, pipeline::run(&high).unwrap());
        assert_eq!(cache.len(), 2);

        let again = cache.get_or_run_keyed(7, &low).unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = EstimateCache::new();
        let mut short = input(50.0);
        short.series.rows.truncate(5);
        assert!(cache.get_or_run(&short).is_err());
        assert!(cache.is_empty());
    }
}
