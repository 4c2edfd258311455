//! Request and result data model
//!
//! A [`GenerationRequest`] pairs one prompt with one resolved sampling
//! configuration; it is built by the normalizer/resolver pair and never
//! partially filled downstream. A [`GenerationResult`] carries the resolved
//! prompt token ids and the completions in request order.

use serde::{Deserialize, Serialize};

use crate::sampling::SamplingParams;

/// A prompt, either raw text or a pre-tokenized id sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptSpec {
    /// Raw text, tokenized by the engine.
    Text(String),
    /// Pre-tokenized prompt; used verbatim.
    TokenIds(Vec<u32>),
}

impl PromptSpec {
    /// Prompt length in tokens when known without a tokenizer.
    #[must_use]
    pub fn token_len(&self) -> Option<usize> {
        match self {
            Self::Text(_) => None,
            Self::TokenIds(ids) => Some(ids.len()),
        }
    }
}

impl From<&str> for PromptSpec {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PromptSpec {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u32>> for PromptSpec {
    fn from(ids: Vec<u32>) -> Self {
        Self::TokenIds(ids)
    }
}

/// One fully-resolved generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: PromptSpec,
    pub sampling: SamplingParams,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(prompt: PromptSpec, sampling: SamplingParams) -> Self {
        Self { prompt, sampling }
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model produced the end-of-sequence token.
    Stop,
    /// Reached the token budget (requested max tokens or the model's
    /// sequence limit).
    Length,
}

/// One generated continuation of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutput {
    /// Generated token ids, not including the prompt.
    pub token_ids: Vec<u32>,
    /// Generated text, decoded from `token_ids` only.
    pub text: String,
    pub finish_reason: FinishReason,
}

/// The result of one [`GenerationRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The prompt as the engine saw it: given ids, or the encoding of the
    /// given text.
    pub prompt_token_ids: Vec<u32>,
    /// Completions for this prompt, in generation order.
    pub outputs: Vec<CompletionOutput>,
}
