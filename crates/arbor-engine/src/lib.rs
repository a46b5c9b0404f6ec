//! # arbor-engine
//!
//! The routing decision engine for arbor.
//!
//! This crate provides:
//! - [`RoutingDecisionEngine`] — converts similarity signals into one of
//!   five auditable actions per candidate, tracking derived system
//!   maturity and degrading gracefully on infrastructure failure
//! - [`FolderAggregateWriter`] — single-writer-per-folder centroid and
//!   exemplar updates
//! - [`ReorganizationAnalyzer`] — out-of-band advisory reorganization
//!   proposals from decision history
//! - Bounded retry/timeout plumbing for network-bound dependencies
//!
//! ## Wiring
//!
//! Collaborators are injected explicitly at construction; there is no
//! service container. A typical composition root:
//!
//! ```ignore
//! use std::sync::Arc;
//! use arbor_core::{logging, RoutingConfig};
//! use arbor_engine::RoutingDecisionEngine;
//! use arbor_index::{
//!     InMemoryArtifactRepository, InMemoryAuditLog, InMemoryFolderRepository,
//!     InMemoryReviewQueue, InMemoryVectorIndex,
//! };
//!
//! logging::init_tracing();
//! let config = RoutingConfig::from_env()?;
//! let engine = RoutingDecisionEngine::new(
//!     Arc::new(InMemoryVectorIndex::new()), // identity vectors
//!     Arc::new(InMemoryVectorIndex::new()), // context vectors
//!     Arc::new(InMemoryFolderRepository::new()),
//!     Arc::new(InMemoryArtifactRepository::new()),
//!     Arc::new(InMemoryReviewQueue::new()),
//!     Arc::new(InMemoryAuditLog::new()),
//!     config,
//! )
//! .await?;
//! let decisions = engine.route_batch(&candidates).await;
//! ```

pub mod aggregate;
pub mod engine;
pub mod reorganize;
pub mod retry;

// Re-export core types
pub use arbor_core::*;

// Re-export engine types
pub use aggregate::FolderAggregateWriter;
pub use engine::{folder_slug, RoutingDecisionEngine};
pub use reorganize::ReorganizationAnalyzer;
pub use retry::{with_retry, with_timeout};
