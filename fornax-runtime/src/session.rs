//! Generation session
//!
//! [`Session`] orchestrates one call end to end: normalize the input shape,
//! resolve the sampling argument against the request count, pair them into
//! requests, and submit the batch to the engine. All caller mistakes are
//! caught before the engine runs; engine errors pass through unchanged.

use std::sync::{Mutex, PoisonError};

use fornax::{
    normalize, resolve, DeprecationNotice, Error, GenerateInput, GenerationRequest,
    GenerationResult, Result, SamplingInput,
};

use crate::engine::Engine;

/// Caller-facing session over an [`Engine`].
pub struct Session {
    engine: Engine,
    diagnostics: Mutex<Vec<DeprecationNotice>>,
}

impl Session {
    /// Wrap an engine handle.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// The engine this session submits to.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Generate completions for the given input, in either call convention.
    ///
    /// Accepts bare text / token-id lists (deprecated shapes, recorded as a
    /// [`DeprecationNotice`]) or tagged [`fornax::PromptSpec`]s, plus a
    /// sampling argument that is absent, singular, or per-request. Returns
    /// one result per prompt, in submission order.
    ///
    /// # Errors
    /// Validation errors ([`Error::MalformedRequest`],
    /// [`Error::SamplingCountMismatch`]) are raised before the engine is
    /// invoked; engine errors propagate unchanged.
    pub fn generate(
        &self,
        input: impl Into<GenerateInput>,
        sampling: impl Into<SamplingInput>,
    ) -> Result<Vec<GenerationResult>> {
        // 1. Normalize the input shape; record any deprecation notice
        let (prompts, notice) = normalize(input.into())?;
        if let Some(notice) = notice {
            log::warn!("{}", notice.message);
            self.diagnostics
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notice);
        }

        // 2. Resolve the sampling argument against the request count
        let sampling = resolve(prompts.len(), sampling.into())?;

        // 3. Pair element-wise
        let requests: Vec<GenerationRequest> = prompts
            .into_iter()
            .zip(sampling)
            .map(|(prompt, params)| GenerationRequest::new(prompt, params))
            .collect();
        let expected = requests.len();

        // 4. One engine call for the whole batch
        let results = self.engine.generate(requests)?;

        // 5. The collaborator owes one result per request
        if results.len() != expected {
            return Err(Error::ResultCountMismatch {
                expected,
                got: results.len(),
            });
        }
        Ok(results)
    }

    /// Drain the deprecation notices recorded since the last call.
    pub fn take_diagnostics(&self) -> Vec<DeprecationNotice> {
        let mut notices = self
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *notices)
    }
}
