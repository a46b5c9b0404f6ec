//! # arbor-index
//!
//! Vector index adapter and in-memory collaborator implementations for
//! arbor.
//!
//! This crate provides:
//! - The stable index payload contract and one-shot normalization of
//!   legacy single-folder records into canonical placements
//! - An in-memory [`VectorIndex`](arbor_core::VectorIndex) with
//!   full-replacement upsert semantics
//! - In-memory artifact/folder repositories (optimistic versioning),
//!   an append-only audit log, and a review queue

pub mod memory;
pub mod payload;
pub mod repos;

pub use memory::InMemoryVectorIndex;
pub use payload::IndexPayload;
pub use repos::{
    InMemoryArtifactRepository, InMemoryAuditLog, InMemoryFolderRepository, InMemoryReviewQueue,
    ReviewItem,
};
