//! Two-stage weighted model/key selection with atomic admission.
//!
//! Selection first draws a model (weighted by `model_weight` across models
//! that still have capacity), then a key within it (weighted by key weight).
//! The two draws are independent hierarchical stages; model and key weights
//! are never combined into one flattened ranking.
//!
//! Availability reads race with other threads, so `admit` remains the sole
//! authority for acceptance: a lost race retries within the model, then
//! falls back to the remaining candidate models. The retry budget is
//! bounded, exceeding it surfaces as a capacity condition rather than
//! spinning.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use std::sync::Arc;

use crate::core::error::AppError;
use crate::core::logging::key_prefix;
use crate::core::metrics::get_metrics;
use crate::services::registry::{Model, ModelRegistry};

/// Admit attempts against one model before falling back to the next.
const ADMIT_ATTEMPTS_PER_MODEL: usize = 3;

/// A successfully admitted (model, key) pair.
///
/// Holds the admission slot for exactly as long as it lives: dropping the
/// guard releases the key's capacity, on every exit path. This is the single
/// release call site for an admitted request.
pub struct Admission {
    model: Arc<Model>,
    key: Arc<str>,
}

impl Admission {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.model.strategy().release(&self.key);
        get_metrics()
            .inflight_requests
            .with_label_values(&[self.model.name()])
            .dec();
    }
}

impl std::fmt::Debug for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admission")
            .field("model", &self.model.name())
            .field("key", &key_prefix(&self.key))
            .finish()
    }
}

/// Picks and admits a (model, key) pair per inbound request.
#[derive(Clone)]
pub struct Selector {
    registry: Arc<ModelRegistry>,
}

impl Selector {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Select a model and key with available capacity and atomically admit
    /// the request against it.
    ///
    /// # Errors
    ///
    /// * [`AppError::CapacityExhausted`] when no model/key can admit.
    /// * [`AppError::AdmissionRaceExceeded`] when every admit attempt lost a
    ///   race to a concurrent caller; treated as capacity-exhausted by
    ///   callers.
    pub fn select_for_request(&self) -> Result<Admission, AppError> {
        let timer = get_metrics().selection_duration.start_timer();
        let result = self.try_select();
        timer.observe_duration();

        if let Err(ref e) = result {
            let outcome = match e {
                AppError::AdmissionRaceExceeded => "race_exceeded",
                _ => "capacity_exhausted",
            };
            get_metrics()
                .admission_outcomes
                .with_label_values(&["none", outcome])
                .inc();
            tracing::debug!(outcome, "no model admitted the request");
        }

        result
    }

    fn try_select(&self) -> Result<Admission, AppError> {
        let mut rng = thread_rng();

        let mut candidates: Vec<Arc<Model>> = self
            .registry
            .models()
            .iter()
            .filter(|m| m.has_available_key())
            .cloned()
            .collect();

        if candidates.is_empty() {
            return Err(AppError::CapacityExhausted);
        }

        let mut lost_race = false;

        while !candidates.is_empty() {
            let weights: Vec<f64> = candidates.iter().map(|m| m.weight()).collect();
            let model_idx = weighted_pick(&mut rng, &weights);
            let model = Arc::clone(&candidates[model_idx]);

            for _ in 0..ADMIT_ATTEMPTS_PER_MODEL {
                // Availability may have changed since the model draw; an
                // empty set here means another thread consumed the last slot.
                let available = model.strategy().available_keys();
                if available.is_empty() {
                    break;
                }

                let key_weights: Vec<f64> = available.iter().map(|k| k.weight).collect();
                let key_idx = weighted_pick(&mut rng, &key_weights);
                let key = Arc::clone(&available[key_idx].key);

                if model.strategy().admit(&key) {
                    get_metrics()
                        .admission_outcomes
                        .with_label_values(&[model.name(), "admitted"])
                        .inc();
                    get_metrics()
                        .inflight_requests
                        .with_label_values(&[model.name()])
                        .inc();
                    tracing::debug!(
                        model = model.name(),
                        key = key_prefix(&key),
                        "request admitted"
                    );
                    return Ok(Admission { model, key });
                }

                lost_race = true;
                get_metrics()
                    .admission_outcomes
                    .with_label_values(&[model.name(), "race_lost"])
                    .inc();
            }

            candidates.swap_remove(model_idx);
        }

        if lost_race {
            Err(AppError::AdmissionRaceExceeded)
        } else {
            Err(AppError::CapacityExhausted)
        }
    }
}

/// Weighted random draw over `weights`, returning the chosen index.
///
/// Zero-weight entries are eligible but never chosen while any
/// positive-weight entry exists; when every weight is zero the draw
/// degenerates to uniform.
fn weighted_pick<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights
        .iter()
        .copied()
        .filter(|w| w.is_finite() && *w > 0.0)
        .sum();

    if total > 0.0 {
        if let Ok(dist) = WeightedIndex::new(weights) {
            return dist.sample(rng);
        }
    }

    rng.gen_range(0..weights.len())
}
