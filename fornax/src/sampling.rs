//! Sampling parameters and per-request broadcast resolution
//!
//! A caller supplies sampling configuration as nothing (process defaults),
//! a single config (applied to every request), or one config per request.
//! [`resolve`] turns any of those into exactly one [`SamplingParams`] per
//! request, or fails — no truncation, no padding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters controlling how the next token is chosen during generation.
///
/// `temperature == 0.0` selects greedy (argmax) decoding; the seed is then
/// unused. Two configs are equal iff all fields are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Temperature for logit scaling (higher = more random). Must be >= 0;
    /// 0 means greedy decoding.
    pub temperature: f32,
    /// Nucleus probability threshold in (0, 1]. Only tokens within the top-p
    /// cumulative probability mass are considered.
    pub top_p: f32,
    /// Maximum number of new tokens to generate. The engine may emit fewer
    /// when the model's sequence budget runs out first.
    pub max_tokens: usize,
    /// Seed for the PRNG. Same seed + same input → same output.
    pub seed: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 16,
            seed: 42,
        }
    }
}

impl SamplingParams {
    /// Greedy decoding with the given new-token budget.
    #[must_use]
    pub fn greedy(max_tokens: usize) -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            max_tokens,
            ..Self::default()
        }
    }

    /// Whether these parameters select the deterministic greedy path.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_greedy(&self) -> bool {
        self.temperature == 0.0
    }

    /// Check field ranges.
    ///
    /// # Errors
    /// Returns [`Error::MalformedRequest`] if temperature is negative or
    /// non-finite, or top-p is outside (0, 1].
    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::MalformedRequest(format!(
                "temperature must be non-negative, got {}",
                self.temperature
            )));
        }
        if !self.top_p.is_finite() || self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(Error::MalformedRequest(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

/// Sampling argument as supplied by the caller: absent, singular, or one
/// config per request.
#[derive(Debug, Clone)]
pub enum SamplingInput {
    /// Use process defaults for every request.
    Default,
    /// Broadcast one config to every request.
    Single(SamplingParams),
    /// One config per request; the length must match the request count.
    PerRequest(Vec<SamplingParams>),
}

impl From<SamplingParams> for SamplingInput {
    fn from(params: SamplingParams) -> Self {
        Self::Single(params)
    }
}

impl From<Option<SamplingParams>> for SamplingInput {
    fn from(params: Option<SamplingParams>) -> Self {
        params.map_or(Self::Default, Self::Single)
    }
}

impl From<Vec<SamplingParams>> for SamplingInput {
    fn from(params: Vec<SamplingParams>) -> Self {
        Self::PerRequest(params)
    }
}

/// Resolve a sampling argument against a request count.
///
/// Scalar-like inputs broadcast; a per-request list must match the count
/// exactly. Order is preserved.
///
/// # Errors
/// Returns [`Error::SamplingCountMismatch`] when a per-request list has the
/// wrong length, or [`Error::MalformedRequest`] when any config has
/// out-of-range fields.
pub fn resolve(request_count: usize, sampling: SamplingInput) -> Result<Vec<SamplingParams>> {
    let resolved = match sampling {
        SamplingInput::Default => vec![SamplingParams::default(); request_count],
        SamplingInput::Single(params) => {
            params.validate()?;
            vec![params; request_count]
        }
        SamplingInput::PerRequest(list) => {
            if list.len() != request_count {
                return Err(Error::SamplingCountMismatch {
                    expected: request_count,
                    got: list.len(),
                });
            }
            for params in &list {
                params.validate()?;
            }
            list
        }
    };
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distinct_params(n: usize) -> Vec<SamplingParams> {
        (0..n)
            .map(|i| SamplingParams {
                temperature: 0.1 * (i as f32 + 1.0),
                top_p: 0.95,
                max_tokens: 8 + i,
                seed: 7,
            })
            .collect()
    }

    #[test]
    fn default_broadcasts_process_defaults() {
        let resolved = resolve(3, SamplingInput::Default).unwrap();
        assert_eq!(resolved.len(), 3);
        assert!(resolved.iter().all(|p| *p == SamplingParams::default()));
    }

    #[test]
    fn single_broadcasts_to_every_request() {
        let params = SamplingParams {
            temperature: 0.3,
            top_p: 0.95,
            ..SamplingParams::default()
        };
        let resolved = resolve(4, params.clone().into()).unwrap();
        assert_eq!(resolved, vec![params; 4]);
    }

    #[test]
    fn exact_length_list_passes_through_in_order() {
        let list = distinct_params(4);
        let resolved = resolve(4, list.clone().into()).unwrap();
        assert_eq!(resolved, list);
    }

    #[test]
    fn short_list_is_a_count_mismatch() {
        let err = resolve(4, distinct_params(3).into()).unwrap_err();
        match err {
            Error::SamplingCountMismatch { expected, got } => {
                assert_eq!(expected, 4);
                assert_eq!(got, 3);
            }
            other => panic!("expected count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn long_list_is_rejected_too() {
        assert!(matches!(
            resolve(2, distinct_params(5).into()),
            Err(Error::SamplingCountMismatch {
                expected: 2,
                got: 5
            })
        ));
    }

    #[test]
    fn negative_temperature_is_malformed() {
        let params = SamplingParams {
            temperature: -0.5,
            ..SamplingParams::default()
        };
        assert!(matches!(
            resolve(1, params.into()),
            Err(Error::MalformedRequest(_))
        ));
    }

    #[test]
    fn top_p_zero_is_malformed() {
        let params = SamplingParams {
            top_p: 0.0,
            ..SamplingParams::default()
        };
        assert!(matches!(
            resolve(1, params.into()),
            Err(Error::MalformedRequest(_))
        ));
    }

    #[test]
    fn greedy_constructor_is_greedy() {
        let params = SamplingParams::greedy(32);
        assert!(params.is_greedy());
        assert_eq!(params.max_tokens, 32);
        params.validate().unwrap();
    }
}
