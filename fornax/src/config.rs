//! Engine configuration
//!
//! Construction-time knobs for the engine handle. Validation happens once,
//! against the model's native limits, before any resource is acquired.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for constructing an engine handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identifier of the model served by this engine; used in logs and
    /// surfaced by observers.
    pub model_id: String,
    /// Maximum combined prompt + generated length. `None` means the
    /// model-native limit.
    #[serde(default)]
    pub max_model_len: Option<usize>,
    /// Size of the distributed process group.
    pub tensor_parallel_size: usize,
    /// Fraction of device memory to reserve, in (0, 1].
    pub gpu_memory_utilization: f32,
    /// Optional cap on tokens processed per engine iteration. Must cover
    /// `max_model_len` when set.
    #[serde(default)]
    pub max_num_batched_tokens: Option<usize>,
    /// Disable graph-capture optimizations. Purely a performance flag; no
    /// semantic effect on outputs.
    #[serde(default)]
    pub enforce_eager: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            max_model_len: None,
            tensor_parallel_size: 1,
            gpu_memory_utilization: 0.9,
            max_num_batched_tokens: None,
            enforce_eager: false,
        }
    }
}

impl EngineConfig {
    /// Config for the given model with defaults everywhere else.
    #[must_use]
    pub fn for_model(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            ..Self::default()
        }
    }

    /// Validate against the model-native sequence limit and resolve the
    /// effective maximum model length.
    ///
    /// # Errors
    /// Returns [`Error::Initialization`] for out-of-range or mutually
    /// inconsistent settings.
    pub fn resolve_max_model_len(&self, model_native_limit: usize) -> Result<usize> {
        if !self.gpu_memory_utilization.is_finite()
            || self.gpu_memory_utilization <= 0.0
            || self.gpu_memory_utilization > 1.0
        {
            return Err(Error::Initialization(format!(
                "gpu_memory_utilization must be in (0, 1], got {}",
                self.gpu_memory_utilization
            )));
        }
        if self.tensor_parallel_size == 0 {
            return Err(Error::Initialization(
                "tensor_parallel_size must be at least 1".to_string(),
            ));
        }
        if self.max_model_len == Some(0) {
            return Err(Error::Initialization(
                "max_model_len must be positive".to_string(),
            ));
        }
        if self.max_num_batched_tokens == Some(0) {
            return Err(Error::Initialization(
                "max_num_batched_tokens must be positive".to_string(),
            ));
        }

        let max_model_len = self.max_model_len.unwrap_or(model_native_limit);
        if max_model_len > model_native_limit {
            return Err(Error::Initialization(format!(
                "max_model_len {max_model_len} exceeds the model's native limit {model_native_limit}"
            )));
        }
        if let Some(batched) = self.max_num_batched_tokens {
            if batched < max_model_len {
                return Err(Error::Initialization(format!(
                    "max_num_batched_tokens {batched} is smaller than max_model_len {max_model_len}"
                )));
            }
        }
        Ok(max_model_len)
    }
}
