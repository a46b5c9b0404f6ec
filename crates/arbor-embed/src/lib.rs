//! # arbor-embed
//!
//! Embedding backend implementations for arbor.
//!
//! This crate provides the concrete
//! [`EmbeddingBackend`](arbor_core::EmbeddingBackend) implementations:
//! - [`HttpEmbeddingBackend`] — Ollama-compatible HTTP endpoint with
//!   per-cause error mapping (timeout / quota / generic)
//! - [`MockEmbeddingBackend`] — deterministic hash-seeded vectors for
//!   tests, with scriptable failures
//!
//! The backend is selected at the composition root via configuration,
//! never through runtime type probing.

pub mod http;
pub mod mock;

pub use http::HttpEmbeddingBackend;
pub use mock::{MockEmbeddingBackend, MockFailure};
