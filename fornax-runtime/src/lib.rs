//! Fornax Runtime: the stateful half of the generation client
//!
//! This crate provides the [`Engine`] handle — worker thread, lifecycle
//! state machine, weak observation, teardown — and the [`Session`] that
//! orchestrates normalize → resolve → generate over it.
//!
//! # Architecture
//!
//! ```text
//! Session          ← shape unification, sampling fan-out, diagnostics
//!   └── Engine     ← batch in, results out (owns Model + Tokenizer + lease)
//!         └── M: Model  ← next-position logits only
//! ```

mod engine;
pub mod logits;
pub mod resources;
mod session;

pub use engine::{Engine, EngineObserver, EngineState};
pub use resources::ResourceLease;
pub use session::Session;
