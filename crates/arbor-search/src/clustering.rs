//! Pure vector math for bootstrap grouping and reorganization analysis.
//!
//! No I/O and no side effects: centroid, coherence, and threshold
//! clustering over in-memory vectors.
//!
//! Coherence is defined as the **mean pairwise cosine similarity over all
//! unordered pairs** (not mean similarity-to-centroid; the two diverge for
//! non-spherical clusters). Sets with fewer than two vectors are trivially
//! coherent (1.0).

use uuid::Uuid;

use arbor_core::{
    cosine_similarity, Cluster, ClusteringConfig, Error, Result, SuggestedAction, Vector,
};

/// Component-wise arithmetic mean of the given vectors.
///
/// Empty input is a validation error; mismatched dimensions are too.
pub fn centroid(vectors: &[Vector]) -> Result<Vector> {
    let first = vectors
        .first()
        .ok_or_else(|| Error::validation("centroid of empty vector set is undefined"))?;
    let dim = first.len();

    let mut sums = vec![0.0f32; dim];
    for vector in vectors {
        if vector.len() != dim {
            return Err(Error::validation(format!(
                "centroid input dimensions disagree: {} vs {}",
                dim,
                vector.len()
            )));
        }
        for (sum, value) in sums.iter_mut().zip(vector.as_slice()) {
            *sum += value;
        }
    }
    let n = vectors.len() as f32;
    for sum in &mut sums {
        *sum /= n;
    }
    Ok(Vector::new(sums))
}

/// Mean pairwise cosine similarity over all unordered pairs, in [0, 1]
/// for non-negative-similarity inputs. Fewer than two vectors → 1.0.
pub fn coherence(vectors: &[Vector]) -> f32 {
    if vectors.len() < 2 {
        return 1.0;
    }
    let mut total = 0.0f32;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            total += cosine_similarity(&vectors[i], &vectors[j]);
            pairs += 1;
        }
    }
    total / pairs as f32
}

/// What to do with a cluster of the given size and coherence.
pub fn suggested_action(size: usize, coherence: f32, config: &ClusteringConfig) -> SuggestedAction {
    if size >= config.minimum_cluster_size && coherence >= config.similarity_threshold {
        SuggestedAction::CreateFolder
    } else {
        SuggestedAction::RouteTogether
    }
}

/// Union-find over indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Group embeddings into clusters by transitive threshold similarity.
///
/// Two concepts share a cluster iff a chain of pairwise similarities at or
/// above `similarity_threshold` connects them (connected components).
/// Components smaller than `minimum_cluster_size` are discarded.
/// Components larger than `maximum_cluster_size` are kept but flagged
/// `needs_split` — the splitting strategy is an open product question and
/// flagged clusters are skipped by bootstrap proposals.
pub fn find_clusters(embeddings: &[(Uuid, Vector)], config: &ClusteringConfig) -> Vec<Cluster> {
    if embeddings.is_empty() {
        return Vec::new();
    }

    let mut sets = DisjointSet::new(embeddings.len());
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            if cosine_similarity(&embeddings[i].1, &embeddings[j].1)
                >= config.similarity_threshold
            {
                sets.union(i, j);
            }
        }
    }

    let mut components: std::collections::HashMap<usize, Vec<usize>> =
        std::collections::HashMap::new();
    for i in 0..embeddings.len() {
        components.entry(sets.find(i)).or_default().push(i);
    }

    let mut clusters: Vec<Cluster> = components
        .into_values()
        .filter(|indices| indices.len() >= config.minimum_cluster_size)
        .map(|indices| {
            let members: Vec<Uuid> = indices.iter().map(|&i| embeddings[i].0).collect();
            let vectors: Vec<Vector> = indices.iter().map(|&i| embeddings[i].1.clone()).collect();
            let coherence = coherence(&vectors);
            // Non-empty by construction, so centroid cannot fail
            let centroid = centroid(&vectors).expect("cluster is non-empty");
            Cluster {
                suggested_action: suggested_action(members.len(), coherence, config),
                needs_split: members.len() > config.maximum_cluster_size,
                members,
                centroid,
                coherence,
            }
        })
        .collect();

    // Deterministic output order: largest, then most coherent, first
    clusters.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then_with(|| b.coherence.partial_cmp(&a.coherence).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.members.cmp(&b.members))
    });
    clusters
}
