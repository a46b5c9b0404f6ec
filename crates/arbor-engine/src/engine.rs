//! The routing decision engine.
//!
//! Converts noisy, continuous similarity scores into one of five discrete,
//! auditable actions per candidate: route, create folder, duplicate,
//! unsorted, or (out-of-band, see [`crate::reorganize`]) reorganize.
//!
//! Ordering guarantees within one candidate: the duplicate check runs and
//! completes before folder matching is acted upon; a duplicate never also
//! receives a route or create-folder decision. Infrastructure failures
//! degrade to an unsorted decision with confidence 0 — they never escape
//! the engine, so a batch keeps processing the remaining candidates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use arbor_core::{
    AlternativeFolder, ArtifactRepository, AuditLog, Candidate, DecisionRationale, Error,
    FolderPath, FolderRecord, FolderRepository, NewFolderSpec, Result, ReviewQueue, ReviewReason,
    RoutingAction, RoutingConfig, RoutingDecision, SearchFilter, SuggestedAction, SystemState,
    VectorIndex,
};
use arbor_search::{
    find_clusters, DuplicateDetectionService, FolderCandidate, FolderMatchingService,
};

use crate::retry::{with_retry, with_timeout};

/// Turn a free-form title into a valid provisional folder segment.
///
/// Deterministic for a given title so repeated routing of the same
/// candidate proposes the same path.
pub fn folder_slug(title: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= arbor_core::defaults::MAX_SEGMENT_LENGTH {
            break;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "unnamed-cluster".to_string()
    } else {
        slug
    }
}

/// Orchestrates duplicate detection, folder matching, and clustering into
/// exactly one [`RoutingDecision`] per candidate.
pub struct RoutingDecisionEngine {
    duplicates: DuplicateDetectionService,
    matching: FolderMatchingService,
    /// Context-vector index, also used to scroll Unsorted for bootstrap.
    context_index: Arc<dyn VectorIndex>,
    folders: Arc<dyn FolderRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    review: Arc<dyn ReviewQueue>,
    audit: Arc<dyn AuditLog>,
    config: RoutingConfig,
    unsorted_folder_id: Uuid,
    /// Create-folder proposals issued in the current batch.
    bootstrap_proposals: AtomicUsize,
}

impl RoutingDecisionEngine {
    /// Build the engine, validating the configuration and ensuring the
    /// `/Unsorted` fallback folder exists.
    ///
    /// Identity (title) vectors and context vectors live in separate
    /// index collections: duplicate detection searches the former, folder
    /// matching the latter.
    pub async fn new(
        identity_index: Arc<dyn VectorIndex>,
        context_index: Arc<dyn VectorIndex>,
        folders: Arc<dyn FolderRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        review: Arc<dyn ReviewQueue>,
        audit: Arc<dyn AuditLog>,
        config: RoutingConfig,
    ) -> Result<Self> {
        config.validate()?;

        let unsorted_folder_id = match folders.find_by_path(&FolderPath::unsorted()).await? {
            Some(folder) => folder.id,
            None => {
                let record = FolderRecord::new(FolderPath::unsorted());
                folders.create(record).await?
            }
        };

        info!(
            unsorted_folder_id = %unsorted_folder_id,
            high = config.high_confidence_threshold,
            low = config.low_confidence_threshold,
            duplicate = config.duplicate_threshold,
            "routing engine initialized"
        );

        Ok(Self {
            duplicates: DuplicateDetectionService::new(
                identity_index,
                artifacts.clone(),
                config.clone(),
            ),
            matching: FolderMatchingService::new(context_index.clone(), config.clone()),
            context_index,
            folders,
            artifacts,
            review,
            audit,
            config,
            unsorted_folder_id,
            bootstrap_proposals: AtomicUsize::new(0),
        })
    }

    /// Id of the `/Unsorted` fallback folder.
    pub fn unsorted_folder_id(&self) -> Uuid {
        self.unsorted_folder_id
    }

    /// Current derived maturity of the hierarchy. Never stored; a count
    /// failure conservatively reads as Growing (no bootstrap proposals).
    pub async fn system_state(&self) -> SystemState {
        match self.artifacts.count().await {
            Ok(total) => SystemState::classify(total, &self.config),
            Err(e) => {
                warn!(error = %e, "concept count unavailable, assuming growing state");
                SystemState::Growing
            }
        }
    }

    /// Route one candidate. Infallible: every candidate yields exactly one
    /// decision, degraded to unsorted on infrastructure failure.
    pub async fn route(&self, candidate: &Candidate) -> RoutingDecision {
        let started = Instant::now();
        let decision = match self.try_route(candidate).await {
            Ok(decision) => decision,
            Err(error) => self.degraded_unsorted(candidate, &error),
        };

        info!(
            candidate_id = %candidate.id,
            decision = decision.action.label(),
            confidence = decision.confidence,
            duration_ms = started.elapsed().as_millis() as u64,
            "routing decision"
        );

        self.record(&decision).await;
        decision
    }

    /// Route a batch concurrently. No ordering requirement between
    /// unrelated candidates; results arrive in completion order. The
    /// bootstrap proposal cap applies across the whole batch.
    pub async fn route_batch(&self, candidates: &[Candidate]) -> Vec<RoutingDecision> {
        self.bootstrap_proposals.store(0, Ordering::SeqCst);
        stream::iter(candidates)
            .map(|candidate| self.route(candidate))
            .buffer_unordered(self.config.batch_concurrency)
            .collect()
            .await
    }

    async fn try_route(&self, candidate: &Candidate) -> Result<RoutingDecision> {
        // Step 1: duplicate check. Must complete before folder matching
        // is acted upon.
        let duplicate = with_retry("duplicate_check", &self.config.retry, || {
            with_timeout(
                "duplicate_check",
                self.config.search_timeout(),
                self.duplicates.check(candidate.id, &candidate.identity.vector),
            )
        })
        .await?;

        if duplicate.is_duplicate {
            let matched = duplicate
                .matched
                .expect("duplicate verdict always carries a match");
            let rationale = DecisionRationale::new(matched.rationale.clone())
                .with_signal("identity_similarity", matched.similarity);
            return Ok(RoutingDecision::new(
                candidate.id,
                RoutingAction::Duplicate {
                    existing_id: matched.existing_id,
                },
                matched.similarity,
                rationale,
            ));
        }

        // Step 2: ranked folder candidates. The Unsorted folder never
        // attracts routing.
        let filter = SearchFilter {
            exclude_folders: vec![self.unsorted_folder_id],
            exclude_concepts: vec![candidate.id],
            ..Default::default()
        };
        let ranked = with_retry("rank_folders", &self.config.retry, || {
            with_timeout(
                "rank_folders",
                self.config.search_timeout(),
                self.matching.rank_folders(&candidate.context.vector, Some(&filter)),
            )
        })
        .await?;

        // Step 3: thresholds + maturity state → action.
        if let Some(best) = ranked.first() {
            if best.score >= self.config.high_confidence_threshold {
                return self.route_to_best(candidate, &ranked).await;
            }
            if best.score >= self.config.low_confidence_threshold {
                // Boundary inclusive: exactly at the low threshold is
                // ambiguous, not plain unsorted.
                return Ok(self.ambiguous_unsorted(candidate, &ranked).await);
            }
        }

        let state = self.system_state().await;
        if state == SystemState::Bootstrap
            && self.bootstrap_proposals.load(Ordering::SeqCst) < self.config.bootstrap_batch_cap
        {
            if let Some(decision) = self.bootstrap_proposal(candidate).await? {
                self.bootstrap_proposals.fetch_add(1, Ordering::SeqCst);
                return Ok(decision);
            }
        }

        let best_score = ranked.first().map(|c| c.score).unwrap_or(0.0);
        Ok(RoutingDecision::new(
            candidate.id,
            RoutingAction::Unsorted,
            best_score,
            DecisionRationale::new(format!(
                "no folder scored at or above the low-confidence threshold {:.2} ({} state)",
                self.config.low_confidence_threshold, state
            ))
            .with_signal("best_score", best_score),
        ))
    }

    /// High-confidence route, preferring the shallower folder when several
    /// are within epsilon of the top score.
    async fn route_to_best(
        &self,
        candidate: &Candidate,
        ranked: &[FolderCandidate],
    ) -> Result<RoutingDecision> {
        let top_score = ranked[0].score;
        let tied: Vec<&FolderCandidate> = ranked
            .iter()
            .filter(|c| top_score - c.score <= self.config.score_epsilon)
            .collect();

        let mut winner = tied[0];
        if tied.len() > 1 {
            let mut best_depth = usize::MAX;
            for &candidate_folder in tied.iter() {
                let depth = match self.folders.find(candidate_folder.folder_id).await? {
                    Some(record) => record.path.depth(),
                    None => usize::MAX,
                };
                if depth < best_depth {
                    best_depth = depth;
                    winner = candidate_folder;
                }
            }
            debug!(
                folder_id = %winner.folder_id,
                tied = tied.len(),
                "epsilon tie broken toward shallower folder"
            );
        }

        let alternatives = self
            .alternatives(
                ranked
                    .iter()
                    .filter(|c| c.folder_id != winner.folder_id)
                    .take(self.config.max_review_alternatives),
            )
            .await;

        let rationale = DecisionRationale::new(format!(
            "composite score {:.4} at or above high-confidence threshold {:.2}",
            winner.score, self.config.high_confidence_threshold
        ))
        .with_signal("composite_score", winner.score)
        .with_signal("average_similarity", winner.average_similarity)
        .with_signal("maximum_similarity", winner.maximum_similarity)
        .with_signal("match_count", winner.match_count as f32)
        .with_alternatives(alternatives);

        Ok(RoutingDecision::new(
            candidate.id,
            RoutingAction::Route {
                folder_id: winner.folder_id,
            },
            winner.score,
            rationale,
        ))
    }

    /// Low-confidence band: park in Unsorted and enqueue for human review
    /// with the top alternatives as suggested actions.
    async fn ambiguous_unsorted(
        &self,
        candidate: &Candidate,
        ranked: &[FolderCandidate],
    ) -> RoutingDecision {
        let best = &ranked[0];
        let suggested = self
            .alternatives(ranked.iter().take(self.config.max_review_alternatives))
            .await;

        if let Err(e) = self
            .review
            .add_for_review(candidate.id, ReviewReason::AmbiguousRouting, suggested.clone())
            .await
        {
            warn!(candidate_id = %candidate.id, error = %e, "review enqueue failed");
        }

        let rationale = DecisionRationale::new(format!(
            "best score {:.4} in the ambiguous band [{:.2}, {:.2}); queued for review",
            best.score, self.config.low_confidence_threshold, self.config.high_confidence_threshold
        ))
        .with_signal("composite_score", best.score)
        .with_alternatives(suggested);

        RoutingDecision::new(candidate.id, RoutingAction::Unsorted, best.score, rationale)
    }

    /// Bootstrap path: cluster the candidate with concepts already parked
    /// in Unsorted and propose a provisional folder when the cluster is
    /// large and coherent enough. Any proposed path must pass FolderPath
    /// validation or the engine falls back to unsorted.
    async fn bootstrap_proposal(&self, candidate: &Candidate) -> Result<Option<RoutingDecision>> {
        let mut embeddings = with_retry("scroll_unsorted", &self.config.retry, || {
            with_timeout(
                "scroll_unsorted",
                self.config.search_timeout(),
                self.context_index.scroll_by_folder(self.unsorted_folder_id),
            )
        })
        .await?;
        embeddings.retain(|(id, _)| *id != candidate.id);
        embeddings.push((candidate.id, candidate.context.vector.clone()));

        let clusters = find_clusters(&embeddings, &self.config.clustering);
        let Some(cluster) = clusters.iter().find(|c| {
            c.members.contains(&candidate.id)
                && c.suggested_action == SuggestedAction::CreateFolder
                && !c.needs_split
        }) else {
            return Ok(None);
        };

        let path = match FolderPath::provisional(&folder_slug(&candidate.title)) {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    candidate_id = %candidate.id,
                    error = %e,
                    "proposed folder path failed validation, falling back to unsorted"
                );
                return Ok(None);
            }
        };

        let rationale = DecisionRationale::new(format!(
            "bootstrap cluster of {} concepts with coherence {:.4} proposes {}",
            cluster.members.len(),
            cluster.coherence,
            path
        ))
        .with_signal("cluster_size", cluster.members.len() as f32)
        .with_signal("coherence", cluster.coherence);

        Ok(Some(RoutingDecision::new(
            candidate.id,
            RoutingAction::CreateFolder {
                spec: NewFolderSpec {
                    path,
                    member_ids: cluster.members.clone(),
                    coherence: cluster.coherence,
                },
            },
            cluster.coherence,
            rationale,
        )))
    }

    /// Degraded decision after exhausted retries: unsorted, confidence 0,
    /// infra-error annotation in the rationale.
    fn degraded_unsorted(&self, candidate: &Candidate, error: &Error) -> RoutingDecision {
        warn!(
            candidate_id = %candidate.id,
            error = %error,
            degraded = true,
            "routing degraded to unsorted"
        );
        let rationale = DecisionRationale::new(format!(
            "infra-error: vector search unavailable after {} attempts ({error})",
            self.config.retry.max_attempts
        ))
        .with_signal("infra_error", 1.0);
        RoutingDecision::new(candidate.id, RoutingAction::Unsorted, 0.0, rationale)
    }

    async fn alternatives<'a>(
        &self,
        candidates: impl Iterator<Item = &'a FolderCandidate>,
    ) -> Vec<AlternativeFolder> {
        let mut alternatives = Vec::new();
        for candidate in candidates {
            let path = match self.folders.find(candidate.folder_id).await {
                Ok(Some(record)) => record.path,
                _ => continue,
            };
            alternatives.push(AlternativeFolder {
                folder_id: candidate.folder_id,
                path,
                score: candidate.score,
            });
        }
        alternatives
    }

    /// Append to the audit log. Failures never reach the caller: they are
    /// logged and retried asynchronously a bounded number of times.
    async fn record(&self, decision: &RoutingDecision) {
        if let Err(e) = self.audit.append(decision).await {
            warn!(
                decision_id = %decision.id,
                error = %e,
                "audit append failed, scheduling async retry"
            );
            let audit = self.audit.clone();
            let decision = decision.clone();
            tokio::spawn(async move {
                for _ in 0..arbor_core::defaults::AUDIT_RETRY_ATTEMPTS {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        arbor_core::defaults::AUDIT_RETRY_DELAY_MS,
                    ))
                    .await;
                    if audit.append(&decision).await.is_ok() {
                        return;
                    }
                }
                warn!(decision_id = %decision.id, "audit append abandoned after retries");
            });
        }
    }
}
