//! # arbor-search
//!
//! Vector-similarity services for arbor.
//!
//! This crate provides:
//! - Pure clustering math (centroid, coherence, threshold clustering)
//!   used for bootstrap grouping and reorganization proposals
//! - Folder matching with a weighted composite score per folder
//! - Near-identity duplicate detection
//! - Cross-folder discovery for read-time enrichment
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use arbor_core::RoutingConfig;
//! use arbor_index::InMemoryVectorIndex;
//! use arbor_search::FolderMatchingService;
//!
//! let index = Arc::new(InMemoryVectorIndex::new());
//! let matching = FolderMatchingService::new(index, RoutingConfig::default());
//! let ranked = matching.rank_folders(&candidate.context.vector, None).await?;
//! ```

pub mod clustering;
pub mod discovery;
pub mod duplicates;
pub mod matching;

// Re-export core types
pub use arbor_core::*;

// Re-export service types
pub use clustering::{centroid, coherence, find_clusters, suggested_action};
pub use discovery::DiscoveryService;
pub use duplicates::DuplicateDetectionService;
pub use matching::{composite_score, FolderCandidate, FolderMatchingService};
