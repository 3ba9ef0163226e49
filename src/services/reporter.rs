//! Read-only capacity aggregation for status and introspection endpoints.
//!
//! The reporter never mutates strategy state; every figure is a
//! point-in-time snapshot, not a historical average. Concurrency and QPS
//! totals are kept in separate buckets since their units differ.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::error::AppError;
use crate::services::registry::{Model, ModelRegistry};
use crate::services::strategy::CapacityType;

/// Per-key load within a model snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct KeyLoad {
    pub key: String,
    pub weight: f64,
    pub current: u32,
}

/// Per-model capacity snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCapacity {
    #[serde(rename = "type")]
    pub capacity_type: &'static str,
    pub current: u32,
    pub max: u32,
    pub weight: f64,
    pub keys: Vec<KeyLoad>,
}

/// Current/max pair for one capacity type bucket.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CapacityTotals {
    pub current: u32,
    pub max: u32,
}

/// System-wide totals bucketed by capacity type.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TypeTotals {
    pub concurrency: CapacityTotals,
    pub qps: CapacityTotals,
}

/// Full system capacity snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SystemCapacity {
    pub total: TypeTotals,
    pub models: BTreeMap<String, ModelCapacity>,
}

/// Per-key capacity detail for the key introspection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct KeyCapacityDetail {
    pub model: String,
    pub key: String,
    pub weight: f64,
    pub current: u32,
    pub max: u32,
}

/// Read-only aggregation over the model registry.
#[derive(Clone)]
pub struct CapacityReporter {
    registry: Arc<ModelRegistry>,
}

impl CapacityReporter {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// System-wide load as a percentage, rounded to 2 decimals.
    ///
    /// Returns 0.0 when no capacity is configured.
    pub fn system_load_percent(&self) -> f64 {
        let mut current: u64 = 0;
        let mut max: u64 = 0;

        for model in self.registry.models() {
            let snapshot = model.strategy().capacity_snapshot();
            current += snapshot.current as u64;
            max += snapshot.max as u64;
        }

        if max == 0 {
            return 0.0;
        }

        let percent = current as f64 / max as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }

    /// System-wide capacity: per-type totals plus per-model detail.
    pub fn system_capacity(&self) -> SystemCapacity {
        let mut total = TypeTotals::default();
        let mut models = BTreeMap::new();

        for model in self.registry.models() {
            let capacity = Self::model_snapshot(model);
            let bucket = match model.strategy().capacity_type() {
                CapacityType::Concurrency => &mut total.concurrency,
                CapacityType::Qps => &mut total.qps,
            };
            bucket.current += capacity.current;
            bucket.max += capacity.max;
            models.insert(model.name().to_string(), capacity);
        }

        SystemCapacity { total, models }
    }

    /// Capacity snapshot of one model.
    pub fn model_capacity(&self, name: &str) -> Result<ModelCapacity, AppError> {
        let model = self
            .registry
            .get(name)
            .ok_or_else(|| AppError::ModelNotFound(name.to_string()))?;
        Ok(Self::model_snapshot(model))
    }

    /// Capacity detail of one key of one model.
    pub fn key_capacity(&self, model_name: &str, key: &str) -> Result<KeyCapacityDetail, AppError> {
        let model = self
            .registry
            .get(model_name)
            .ok_or_else(|| AppError::ModelNotFound(model_name.to_string()))?;

        let weight = model.key_weight(key).ok_or_else(|| AppError::KeyNotFound {
            model: model_name.to_string(),
        })?;

        Ok(KeyCapacityDetail {
            model: model_name.to_string(),
            key: key.to_string(),
            weight,
            current: model.strategy().key_current(key),
            max: model.strategy().per_key_limit(),
        })
    }

    // The model's `current` is computed as the sum of the per-key reads in
    // this same pass, so the per-model figure always equals the sum of its
    // per-key figures within one snapshot.
    fn model_snapshot(model: &Model) -> ModelCapacity {
        let strategy = model.strategy();
        let keys: Vec<KeyLoad> = strategy
            .keys()
            .iter()
            .map(|k| KeyLoad {
                key: k.key.to_string(),
                weight: k.weight,
                current: strategy.key_current(&k.key),
            })
            .collect();

        ModelCapacity {
            capacity_type: strategy.capacity_type().as_str(),
            current: keys.iter().map(|k| k.current).sum(),
            max: strategy.capacity_snapshot().max,
            weight: model.weight(),
            keys,
        }
    }
}
