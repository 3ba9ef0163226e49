//! Model and key registries.
//!
//! The registry is the process-wide owner of all capacity state. It is
//! constructed once at startup from configuration and is read-mostly
//! thereafter: the key set and strategy type of each model are fixed for the
//! process lifetime, and only model weights may be replaced atomically by an
//! external auto-scaling collaborator.

use anyhow::{bail, Result};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::{AppConfig, ModelConfig, StrategyConfig};
use crate::services::strategy::{
    CapacityStrategy, ConcurrencyStrategy, KeyEntry, QpsStrategy,
};

/// One upstream chat-completion provider: a set of keys sharing one
/// capacity strategy.
pub struct Model {
    name: String,
    weight: ArcSwap<f64>,
    strategy: Box<dyn CapacityStrategy>,
}

impl Model {
    fn from_config(cfg: &ModelConfig) -> Self {
        let keys: Vec<KeyEntry> = cfg
            .api_keys
            .iter()
            .map(|k| KeyEntry::new(k.key.as_str(), k.weight))
            .collect();

        // Strategy variants are a closed set resolved here at startup.
        let strategy: Box<dyn CapacityStrategy> = match cfg.strategy {
            StrategyConfig::Concurrency { max_concurrency } => {
                Box::new(ConcurrencyStrategy::new(keys, max_concurrency))
            }
            StrategyConfig::Qps { max_qps } => Box::new(QpsStrategy::new(keys, max_qps)),
        };

        Self {
            name: cfg.name.clone(),
            weight: ArcSwap::from_pointee(cfg.model_weight),
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cross-model selection weight.
    pub fn weight(&self) -> f64 {
        **self.weight.load()
    }

    /// Replace the model weight atomically (replace-on-write).
    pub fn set_weight(&self, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            bail!("Model weight must be finite and non-negative, got {}", weight);
        }
        self.weight.store(Arc::new(weight));
        Ok(())
    }

    pub fn strategy(&self) -> &dyn CapacityStrategy {
        self.strategy.as_ref()
    }

    /// Weight of one of this model's keys, if registered.
    pub fn key_weight(&self, key: &str) -> Option<f64> {
        self.strategy
            .keys()
            .iter()
            .find(|k| &*k.key == key)
            .map(|k| k.weight)
    }

    /// Whether at least one key can currently admit a request.
    pub fn has_available_key(&self) -> bool {
        !self.strategy.available_keys().is_empty()
    }
}

/// The set of enabled models, constructed once at startup.
pub struct ModelRegistry {
    models: Vec<Arc<Model>>,
    by_name: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Build the registry from validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let models: Vec<Arc<Model>> = config
            .models
            .iter()
            .map(|cfg| Arc::new(Model::from_config(cfg)))
            .collect();

        let by_name = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name().to_string(), i))
            .collect();

        Ok(Self { models, by_name })
    }

    /// All models in configuration order.
    pub fn models(&self) -> &[Arc<Model>] {
        &self.models
    }

    /// Look up a model by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Model>> {
        self.by_name.get(name).map(|&i| &self.models[i])
    }
}
