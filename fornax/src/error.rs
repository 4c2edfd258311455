//! Error types for Fornax

use thiserror::Error;

/// Result type alias using Fornax's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Fornax operations
#[derive(Error, Debug)]
pub enum Error {
    /// A per-request sampling list did not match the request count.
    ///
    /// Raised by the broadcast resolver before any engine call is made.
    #[error("sampling parameter count mismatch: {expected} requests, {got} sampling configs")]
    SamplingCountMismatch { expected: usize, got: usize },

    /// The request batch could not be interpreted (empty batch, out-of-range
    /// sampling fields, and similar caller mistakes).
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Engine construction failed: invalid or inconsistent configuration,
    /// or the requested resources are unavailable.
    #[error("engine initialization failed: {0}")]
    Initialization(String),

    /// Another engine already holds the exclusive device resources.
    #[error("engine resource conflict: {0}")]
    ResourceConflict(String),

    /// The engine collaborator failed internally during generation.
    #[error("engine error: {0}")]
    Engine(String),

    /// The engine returned a result batch of the wrong size. This is a
    /// contract violation of the collaborator, not a caller mistake.
    #[error("engine returned {got} results for {expected} requests")]
    ResultCountMismatch { expected: usize, got: usize },

    /// The prompt alone does not fit in the model's sequence budget.
    #[error("prompt length {len} exceeds maximum model length {max_model_len}")]
    PromptTooLong { len: usize, max_model_len: usize },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// An operation was attempted on a torn-down engine handle.
    #[error("engine used after teardown")]
    UseAfterTeardown,

    /// A weak observer dereferenced an engine whose owner is gone.
    #[error("engine observer target released")]
    TargetReleased,
}
