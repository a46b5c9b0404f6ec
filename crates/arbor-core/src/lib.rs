//! # arbor-core
//!
//! Core types, traits, and abstractions for the arbor concept-filing
//! engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other arbor crates depend on: the depth-bounded
//! [`FolderPath`] hierarchy model, vector/embedding value types, routing
//! decision models, validated configuration, and the collaborator traits
//! implemented by the index, search, and embedding crates.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod path;
pub mod traits;
pub mod vector;

// Re-export commonly used types at crate root
pub use config::{ClusteringConfig, DiscoveryConfig, RetryConfig, RoutingConfig, ScoringWeights};
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use path::FolderPath;
pub use traits::*;
pub use vector::{
    candidate_id, candidate_id_from_hash, content_hash, cosine_similarity, Vector, VectorEmbedding,
};
