//! Tokenizer trait
//!
//! The engine needs exactly two operations: text → ids for incoming text
//! prompts, and ids → text for completions. Vocabulary management and
//! special-token handling live behind this seam.

use crate::error::Result;

/// Converts between text and token ids.
pub trait Tokenizer: Send + 'static {
    /// Encode text into token ids.
    ///
    /// # Errors
    /// Returns an error if the text cannot be tokenized.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids into text.
    ///
    /// # Errors
    /// Returns an error if the ids cannot be decoded.
    fn decode(&self, ids: &[u32]) -> Result<String>;
}
