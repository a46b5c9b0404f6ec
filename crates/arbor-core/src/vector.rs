//! Vector and embedding value types.
//!
//! Embeddings are produced once per candidate by an external backend and
//! treated as opaque, immutable input everywhere else.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Fixed-length numeric vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector(Vec<f32>);

impl Vector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for Vector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Cosine similarity of two vectors.
///
/// Defined as 0.0 (not an error) when either vector has zero magnitude or
/// the dimensions disagree.
pub fn cosine_similarity(a: &Vector, b: &Vector) -> f32 {
    let (a, b) = (a.as_slice(), b.as_slice());
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// An embedding plus its provenance: which content (by hash), which model,
/// and the expected dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEmbedding {
    pub vector: Vector,
    /// Lowercase sha256 hex of the embedded content.
    pub content_hash: String,
    /// Identifier of the model that produced the vector.
    pub model: String,
    pub dimension: usize,
}

impl VectorEmbedding {
    /// Create an embedding, checking the vector length against the
    /// declared dimension.
    pub fn new(
        vector: Vector,
        content_hash: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self> {
        if vector.len() != dimension {
            return Err(Error::validation(format!(
                "embedding has {} components, expected {}",
                vector.len(),
                dimension
            ))
            .with_context("expected_dimension", dimension)
            .with_context("actual_dimension", vector.len()));
        }
        Ok(Self {
            vector,
            content_hash: content_hash.into(),
            model: model.into(),
            dimension,
        })
    }
}

/// Lowercase sha256 hex digest of the given content.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)
}

/// Deterministic candidate id derived from content: the first 16 bytes of
/// the content's sha256 digest. Capturing the same text twice yields the
/// same id.
pub fn candidate_id(content: &str) -> Uuid {
    let digest = Sha256::digest(content.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// Candidate id from an existing lowercase hex content hash.
pub fn candidate_id_from_hash(hash: &str) -> Result<Uuid> {
    let decoded = hex::decode(hash)
        .map_err(|e| Error::validation(format!("invalid content hash: {e}")))?;
    if decoded.len() < 16 {
        return Err(Error::validation("content hash shorter than 16 bytes")
            .with_context("len", decoded.len()));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&decoded[..16]);
    Ok(Uuid::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_vector_accessors() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert!(!v.is_empty());
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(v.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vector_serde_transparent() {
        let v = Vector::from(vec![0.5, -0.5]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[0.5,-0.5]");
        let back: Vector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_embedding_dimension_check() {
        let ok = VectorEmbedding::new(
            Vector::new(vec![0.0; 4]),
            content_hash("x"),
            "test-model",
            4,
        );
        assert!(ok.is_ok());

        let err = VectorEmbedding::new(
            Vector::new(vec![0.0; 3]),
            content_hash("x"),
            "test-model",
            4,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.context_value("expected_dimension"), Some("4"));
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello!"));
        assert_eq!(content_hash("hello").len(), 64);
    }

    #[test]
    fn test_candidate_id_deterministic() {
        let a = candidate_id("heap sort uses a binary heap");
        let b = candidate_id("heap sort uses a binary heap");
        let c = candidate_id("merge sort splits the input");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_candidate_id_from_hash_matches_direct() {
        let content = "quick sort partitions around a pivot";
        let from_content = candidate_id(content);
        let from_hash = candidate_id_from_hash(&content_hash(content)).unwrap();
        assert_eq!(from_content, from_hash);
    }

    #[test]
    fn test_candidate_id_from_hash_rejects_garbage() {
        assert!(candidate_id_from_hash("not-hex").is_err());
        assert!(candidate_id_from_hash("abcd").is_err()); // too short
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = Vector::new(vec![0.3, 0.4, 0.5]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Vector::new(vec![1.0, 0.0]);
        let b = Vector::new(vec![0.0, 1.0]);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_magnitude_is_zero() {
        let zero = Vector::new(vec![0.0, 0.0]);
        let v = Vector::new(vec![1.0, 2.0]);
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch_is_zero() {
        let a = Vector::new(vec![1.0, 2.0]);
        let b = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
