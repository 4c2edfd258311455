//! Model trait for the generation engine
//!
//! Defines the narrow interface the engine consumes. Everything about how
//! logits are produced — device placement, batching, caching — stays behind
//! this seam.

use crate::error::Result;

/// Configuration the engine needs from a model to size and bound generation.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Maximum sequence length the model supports.
    pub max_seq_len: usize,
    /// End-of-sequence token ID.
    pub eos_token_id: u32,
    /// Vocabulary size; each forward pass returns one logit per entry.
    pub vocab_size: usize,
}

/// A language model as the engine sees it: context in, next-position logits
/// out.
pub trait Model: Send + 'static {
    /// Get the model configuration needed for resource allocation and
    /// length bounding.
    fn config(&self) -> ModelConfig;

    /// Logits for the position following `token_ids`.
    ///
    /// Returns one `f32` per vocabulary entry.
    ///
    /// # Errors
    /// Returns an error if the forward pass fails.
    fn forward(&self, token_ids: &[u32]) -> Result<Vec<f32>>;
}
