//! The engine handle
//!
//! [`Engine`] owns the heavy, process-wide generation resource: the model,
//! the device-memory reservation, and the distributed process group. It
//! spawns a long-lived worker thread at construction; [`Engine::generate`]
//! submits one batch and blocks for the results. Teardown closes the
//! request channel, joins the worker (so it never races an in-flight
//! batch), and releases the resource lease. [`EngineObserver`] is a
//! non-owning handle for inspection that neither extends the engine's
//! lifetime nor blocks its teardown.

use std::sync::{mpsc, Arc, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use fornax::{
    CompletionOutput, EngineConfig, Error, FinishReason, GenerationRequest, GenerationResult,
    Model, ModelConfig, PromptSpec, Result, SamplingParams, Tokenizer,
};

use crate::logits;
use crate::resources::ResourceLease;

/// A batch submitted to the engine's worker thread, with the channel the
/// results come back on.
struct WorkerRequest {
    requests: Vec<GenerationRequest>,
    result_tx: mpsc::Sender<Result<Vec<GenerationResult>>>,
}

/// Lifecycle state of an engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Resources are held; `generate` is valid.
    Ready,
    /// Terminal: resources released, only inspection remains.
    TornDown,
}

struct EngineInner {
    /// `Some` while Ready. Taking it is the Ready → TornDown transition.
    request_tx: Mutex<Option<mpsc::Sender<WorkerRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    lease: Mutex<Option<ResourceLease>>,
    config: EngineConfig,
    model_config: ModelConfig,
    max_model_len: usize,
}

/// Handle to the generation engine.
///
/// The sole strong owner of the underlying resource; hand out
/// [`EngineObserver`]s for non-owning access.
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Load a model into a new engine.
    ///
    /// Validates the configuration against the model's native limits,
    /// reserves the process-wide device slot and process group, and spawns
    /// the worker thread owning model and tokenizer.
    ///
    /// # Errors
    /// Returns [`Error::Initialization`] for invalid or inconsistent
    /// configuration, or [`Error::ResourceConflict`] when another engine is
    /// Ready. A failed construction releases anything it acquired.
    pub fn new<M: Model, T: Tokenizer>(
        model: M,
        tokenizer: T,
        config: EngineConfig,
    ) -> Result<Self> {
        let model_config = model.config();
        let max_model_len = config.resolve_max_model_len(model_config.max_seq_len)?;
        let lease = ResourceLease::acquire(
            &config.model_id,
            config.gpu_memory_utilization,
            config.tensor_parallel_size,
        )?;

        log::info!(
            "engine ready: model '{}', max_model_len {}, tensor_parallel_size {}",
            config.model_id,
            max_model_len,
            config.tensor_parallel_size
        );
        if config.enforce_eager {
            log::debug!("graph capture disabled (enforce_eager)");
        }

        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let eos_token_id = model_config.eos_token_id;
        let worker = thread::spawn(move || {
            worker_loop(model, tokenizer, eos_token_id, max_model_len, request_rx);
        });

        Ok(Self {
            inner: Arc::new(EngineInner {
                request_tx: Mutex::new(Some(request_tx)),
                worker: Mutex::new(Some(worker)),
                lease: Mutex::new(Some(lease)),
                config,
                model_config,
                max_model_len,
            }),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        if lock(&self.inner.request_tx).is_some() {
            EngineState::Ready
        } else {
            EngineState::TornDown
        }
    }

    /// Identifier of the model this engine serves.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.inner.config.model_id
    }

    /// The model configuration the engine was built against.
    #[must_use]
    pub fn model_config(&self) -> &ModelConfig {
        &self.inner.model_config
    }

    /// Effective maximum combined prompt + generated length.
    #[must_use]
    pub fn max_model_len(&self) -> usize {
        self.inner.max_model_len
    }

    /// Generate completions for one batch of requests.
    ///
    /// Synchronous: submits the batch to the worker as one message and
    /// blocks until every request in it has finished. Results align
    /// positionally with requests.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterTeardown`] on a torn-down handle,
    /// [`Error::PromptTooLong`] when a prompt alone exceeds the sequence
    /// budget, or [`Error::Engine`] if the worker has died.
    pub fn generate(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResult>> {
        let request_tx = lock(&self.inner.request_tx)
            .clone()
            .ok_or(Error::UseAfterTeardown)?;

        let (result_tx, result_rx) = mpsc::channel();
        request_tx
            .send(WorkerRequest {
                requests,
                result_tx,
            })
            .map_err(|_| Error::Engine("worker thread terminated".to_string()))?;
        drop(request_tx);

        result_rx
            .recv()
            .map_err(|_| Error::Engine("worker thread terminated before replying".to_string()))?
    }

    /// Obtain a non-owning observation handle.
    #[must_use]
    pub fn observer(&self) -> EngineObserver {
        EngineObserver {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Release the engine's resources: device memory and the distributed
    /// process group.
    ///
    /// Closes the request channel, waits for the worker to drain in-flight
    /// batches and exit, then drops the resource lease. Idempotent: calling
    /// this on a torn-down engine is a no-op. Observers outstanding at
    /// teardown stay valid for inspection.
    pub fn teardown(&self) {
        let was_ready = lock(&self.inner.request_tx).take().is_some();
        if let Some(worker) = lock(&self.inner.worker).take() {
            let _ = worker.join();
        }
        if let Some(mut lease) = lock(&self.inner.lease).take() {
            lease.release();
        }
        if was_ready {
            log::info!("engine for '{}' torn down", self.inner.config.model_id);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Non-owning observation handle to an [`Engine`].
///
/// Holds a weak reference: it can inspect the engine while the owner lives
/// but never keeps it alive. Once the owning [`Engine`] is dropped, every
/// accessor fails with [`Error::TargetReleased`].
#[derive(Clone)]
pub struct EngineObserver {
    inner: Weak<EngineInner>,
}

impl EngineObserver {
    fn target(&self) -> Result<Arc<EngineInner>> {
        self.inner.upgrade().ok_or(Error::TargetReleased)
    }

    /// Lifecycle state of the observed engine.
    ///
    /// # Errors
    /// Returns [`Error::TargetReleased`] when the owner is gone.
    pub fn state(&self) -> Result<EngineState> {
        let inner = self.target()?;
        let state = if lock(&inner.request_tx).is_some() {
            EngineState::Ready
        } else {
            EngineState::TornDown
        };
        Ok(state)
    }

    /// Identifier of the observed model.
    ///
    /// # Errors
    /// Returns [`Error::TargetReleased`] when the owner is gone.
    pub fn model_id(&self) -> Result<String> {
        Ok(self.target()?.config.model_id.clone())
    }

    /// Model configuration of the observed engine.
    ///
    /// # Errors
    /// Returns [`Error::TargetReleased`] when the owner is gone.
    pub fn model_config(&self) -> Result<ModelConfig> {
        Ok(self.target()?.model_config.clone())
    }

    /// Effective maximum sequence length of the observed engine.
    ///
    /// # Errors
    /// Returns [`Error::TargetReleased`] when the owner is gone.
    pub fn max_model_len(&self) -> Result<usize> {
        Ok(self.target()?.max_model_len)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

/// The worker thread's main loop. Batches are processed in arrival order;
/// the loop exits once every sender is gone and the queue is drained.
fn worker_loop<M: Model, T: Tokenizer>(
    model: M,
    tokenizer: T,
    eos_token_id: u32,
    max_model_len: usize,
    request_rx: mpsc::Receiver<WorkerRequest>,
) {
    while let Ok(batch) = request_rx.recv() {
        let result = process_batch(&model, &tokenizer, eos_token_id, max_model_len, batch.requests);
        // A send failure means the caller gave up waiting; nothing to do.
        let _ = batch.result_tx.send(result);
    }
}

fn process_batch<M: Model, T: Tokenizer>(
    model: &M,
    tokenizer: &T,
    eos_token_id: u32,
    max_model_len: usize,
    requests: Vec<GenerationRequest>,
) -> Result<Vec<GenerationResult>> {
    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        results.push(process_request(
            model,
            tokenizer,
            eos_token_id,
            max_model_len,
            &request,
        )?);
    }
    Ok(results)
}

/// Run one request to completion.
///
/// The decode loop is bounded by `min(max_tokens, max_model_len - prompt)`,
/// so `prompt + generated <= max_model_len` holds for every result. A
/// budget smaller than the requested `max_tokens` truncates generation; it
/// never fails the call.
fn process_request<M: Model, T: Tokenizer>(
    model: &M,
    tokenizer: &T,
    eos_token_id: u32,
    max_model_len: usize,
    request: &GenerationRequest,
) -> Result<GenerationResult> {
    // 1. Resolve the prompt to token ids
    let prompt_token_ids = match &request.prompt {
        PromptSpec::Text(text) => tokenizer.encode(text)?,
        PromptSpec::TokenIds(ids) => ids.clone(),
    };

    // 2. The prompt alone must fit the sequence budget
    if prompt_token_ids.len() > max_model_len {
        return Err(Error::PromptTooLong {
            len: prompt_token_ids.len(),
            max_model_len,
        });
    }
    let budget = max_model_len - prompt_token_ids.len();
    let max_new_tokens = request.sampling.max_tokens.min(budget);

    // 3. Decode until EOS or the token budget runs out
    let mut context = prompt_token_ids.clone();
    let mut generated = Vec::new();
    let mut rng_state = request.sampling.seed;
    let mut finish_reason = FinishReason::Length;
    for _ in 0..max_new_tokens {
        let row = model.forward(&context)?;
        let next = select_token(&row, &request.sampling, &mut rng_state);
        if next == eos_token_id {
            finish_reason = FinishReason::Stop;
            break;
        }
        context.push(next);
        generated.push(next);
    }

    // 4. Decode the completion text from the generated ids only
    let text = tokenizer.decode(&generated)?;
    Ok(GenerationResult {
        prompt_token_ids,
        outputs: vec![CompletionOutput {
            token_ids: generated,
            text,
            finish_reason,
        }],
    })
}

/// Select the next token from a logits row, either greedy or sampled.
fn select_token(row: &[f32], sampling: &SamplingParams, rng_state: &mut u64) -> u32 {
    if sampling.is_greedy() {
        logits::argmax(row)
    } else {
        *rng_state ^= *rng_state << 13;
        *rng_state ^= *rng_state >> 7;
        *rng_state ^= *rng_state << 17;
        logits::sample_top_p(row, sampling.temperature, sampling.top_p, *rng_state)
    }
}
