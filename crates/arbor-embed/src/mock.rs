//! Deterministic mock embedding backend for tests.
//!
//! Vectors derive from the sha256 digest of the input text, so identical
//! texts always embed identically and tests are reproducible without a
//! running embedding server. Failures can be scripted to exercise the
//! engine's degradation paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use arbor_core::{Error, EmbeddingBackend, Result, Vector};

/// Failure the mock should inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Infrastructure error flagged as a timeout.
    Timeout,
    /// Quota exhaustion.
    QuotaExceeded,
    /// Generic infrastructure failure.
    Generic,
}

/// Deterministic, hash-seeded [`EmbeddingBackend`].
pub struct MockEmbeddingBackend {
    dimension: usize,
    /// Inject this failure on every call once `fail_after` calls have
    /// succeeded.
    failure: Option<MockFailure>,
    fail_after: usize,
    calls: AtomicUsize,
}

impl MockEmbeddingBackend {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            failure: None,
            fail_after: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with the given failure.
    pub fn failing(dimension: usize, failure: MockFailure) -> Self {
        Self {
            dimension,
            failure: Some(failure),
            fail_after: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Succeed `calls` times, then fail with the given failure.
    pub fn failing_after(mut self, calls: usize, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self.fail_after = calls;
        self
    }

    /// Number of `embed_texts` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The deterministic vector for one text: sha256 bytes cycled across
    /// the dimension, scaled to [-1, 1].
    pub fn vector_for(&self, text: &str) -> Vector {
        let digest = Sha256::digest(text.as_bytes());
        let values: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let byte = digest[i % digest.len()];
                // Mix the position in so long vectors are not periodic
                let mixed = byte.wrapping_add((i / digest.len()) as u8 * 31);
                (mixed as f32 / 127.5) - 1.0
            })
            .collect();
        Vector::new(values)
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failure {
            if call >= self.fail_after {
                return Err(match failure {
                    MockFailure::Timeout => Error::timeout("mock embedding timeout"),
                    MockFailure::QuotaExceeded => Error::budget_exceeded("mock quota exceeded"),
                    MockFailure::Generic => Error::infrastructure("mock embedding failure"),
                });
            }
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}
