//! Input normalization and the legacy-shape compatibility shim
//!
//! Callers reach the engine through two conventions: the deprecated
//! positional form (bare text or token-id lists) and the canonical form
//! (explicit [`PromptSpec`] values). [`GenerateInput`] captures which one
//! was used at the type level, and [`normalize`] converts everything to
//! canonical prompts in a single place — downstream code never sees the
//! legacy shape. Converting a legacy shape yields a [`DeprecationNotice`]
//! naming the deprecated argument; it is a diagnostic, never an error.

use crate::error::{Error, Result};
use crate::request::PromptSpec;

/// Caller input in either call convention.
#[derive(Debug, Clone)]
pub enum GenerateInput {
    /// Deprecated: bare text prompt(s) via the positional `prompts` argument.
    LegacyText(Vec<String>),
    /// Deprecated: pre-tokenized prompt(s) via the `prompt_token_ids`
    /// argument.
    LegacyTokenIds(Vec<Vec<u32>>),
    /// Canonical: explicitly tagged prompts.
    Prompts(Vec<PromptSpec>),
}

impl From<&str> for GenerateInput {
    fn from(text: &str) -> Self {
        Self::LegacyText(vec![text.to_string()])
    }
}

impl From<String> for GenerateInput {
    fn from(text: String) -> Self {
        Self::LegacyText(vec![text])
    }
}

impl From<Vec<&str>> for GenerateInput {
    fn from(texts: Vec<&str>) -> Self {
        Self::LegacyText(texts.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for GenerateInput {
    fn from(texts: Vec<String>) -> Self {
        Self::LegacyText(texts)
    }
}

impl From<Vec<u32>> for GenerateInput {
    fn from(ids: Vec<u32>) -> Self {
        Self::LegacyTokenIds(vec![ids])
    }
}

impl From<Vec<Vec<u32>>> for GenerateInput {
    fn from(ids: Vec<Vec<u32>>) -> Self {
        Self::LegacyTokenIds(ids)
    }
}

impl From<PromptSpec> for GenerateInput {
    fn from(prompt: PromptSpec) -> Self {
        Self::Prompts(vec![prompt])
    }
}

impl From<Vec<PromptSpec>> for GenerateInput {
    fn from(prompts: Vec<PromptSpec>) -> Self {
        Self::Prompts(prompts)
    }
}

/// A structured record that a deprecated call shape was used.
///
/// Emitted alongside the normal return path, observable by the caller, and
/// mirrored to the `log` facade by the session. Never aborts execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    /// Name of the deprecated argument.
    pub field: &'static str,
    pub message: String,
}

impl DeprecationNotice {
    fn for_field(field: &'static str) -> Self {
        Self {
            field,
            message: format!(
                "the '{field}' argument is deprecated; pass tagged prompts instead"
            ),
        }
    }
}

/// Convert caller input into canonical prompts.
///
/// Legacy shapes convert element-wise and report which deprecated argument
/// was used; canonical input passes through untouched. Semantically
/// equivalent inputs of either shape produce identical prompt sequences.
///
/// # Errors
/// Returns [`Error::MalformedRequest`] for an empty batch.
pub fn normalize(input: GenerateInput) -> Result<(Vec<PromptSpec>, Option<DeprecationNotice>)> {
    let (prompts, notice) = match input {
        GenerateInput::LegacyText(texts) => (
            texts.into_iter().map(PromptSpec::Text).collect(),
            Some(DeprecationNotice::for_field("prompts")),
        ),
        GenerateInput::LegacyTokenIds(ids) => (
            ids.into_iter().map(PromptSpec::TokenIds).collect(),
            Some(DeprecationNotice::for_field("prompt_token_ids")),
        ),
        GenerateInput::Prompts(prompts) => (prompts, None),
    };

    if prompts.is_empty() {
        return Err(Error::MalformedRequest(
            "at least one prompt is required".to_string(),
        ));
    }
    Ok((prompts, notice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_prompts_pass_through_without_notice() {
        let prompts = vec![
            PromptSpec::Text("Hello".to_string()),
            PromptSpec::TokenIds(vec![0, 1, 2]),
        ];
        let (out, notice) = normalize(prompts.clone().into()).unwrap();
        assert_eq!(out, prompts);
        assert!(notice.is_none());
    }

    #[test]
    fn legacy_text_converts_and_names_the_field() {
        let (out, notice) = normalize("Hello, my name is".into()).unwrap();
        assert_eq!(out, vec![PromptSpec::Text("Hello, my name is".to_string())]);
        let notice = notice.unwrap();
        assert_eq!(notice.field, "prompts");
        assert!(notice.message.contains("'prompts'"));
    }

    #[test]
    fn legacy_token_ids_convert_and_name_the_field() {
        let ids = vec![vec![0u32], vec![0, 2, 1]];
        let (out, notice) = normalize(ids.clone().into()).unwrap();
        assert_eq!(
            out,
            ids.into_iter().map(PromptSpec::TokenIds).collect::<Vec<_>>()
        );
        assert_eq!(notice.unwrap().field, "prompt_token_ids");
    }

    #[test]
    fn single_token_id_list_is_one_request() {
        let (out, notice) = normalize(vec![0u32, 3, 1, 2].into()).unwrap();
        assert_eq!(out, vec![PromptSpec::TokenIds(vec![0, 3, 1, 2])]);
        assert_eq!(notice.unwrap().field, "prompt_token_ids");
    }

    #[test]
    fn equivalent_shapes_yield_identical_prompts() {
        let token_ids = vec![vec![0u32, 1], vec![0, 2, 1]];
        let (legacy, _) = normalize(token_ids.clone().into()).unwrap();
        let canonical: Vec<PromptSpec> =
            token_ids.into_iter().map(PromptSpec::TokenIds).collect();
        let (tagged, notice) = normalize(canonical.into()).unwrap();
        assert_eq!(legacy, tagged);
        assert!(notice.is_none());
    }

    #[test]
    fn empty_batch_is_malformed() {
        assert!(matches!(
            normalize(Vec::<PromptSpec>::new().into()),
            Err(Error::MalformedRequest(_))
        ));
        assert!(matches!(
            normalize(Vec::<String>::new().into()),
            Err(Error::MalformedRequest(_))
        ));
    }
}
