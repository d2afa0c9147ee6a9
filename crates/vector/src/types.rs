use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Group of chunks sharing a centroid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster id, ordered by each cluster's lowest member id
    pub id: usize,

    /// Member chunk ids
    pub member_chunk_ids: BTreeSet<usize>,

    /// Member closest to the centroid
    pub representative_chunk_id: usize,
}

impl Cluster {
    /// Cluster holding a single chunk
    pub fn singleton(id: usize, chunk_id: usize) -> Self {
        Self {
            id,
            member_chunk_ids: BTreeSet::from([chunk_id]),
            representative_chunk_id: chunk_id,
        }
    }

    pub fn len(&self) -> usize {
        self.member_chunk_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_chunk_ids.is_empty()
    }
}

/// One point of the k sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InertiaPoint {
    pub k: usize,
    pub inertia: f64,
}

/// Outcome of cluster selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSelection {
    /// Non-empty clusters
    pub clusters: Vec<Cluster>,

    /// Inertia for each k tried, empty when no sweep ran
    pub inertia_curve: Vec<InertiaPoint>,

    /// Whether the one-cluster-per-chunk policy replaced a failed clustering
    pub fallback: bool,
}

impl ClusterSelection {
    /// One cluster per chunk
    pub fn one_per_chunk(chunk_ids: impl IntoIterator<Item = usize>, fallback: bool) -> Self {
        let clusters = chunk_ids
            .into_iter()
            .enumerate()
            .map(|(id, chunk_id)| Cluster::singleton(id, chunk_id))
            .collect();

        Self {
            clusters,
            inertia_curve: Vec::new(),
            fallback,
        }
    }

    pub fn k(&self) -> usize {
        self.clusters.len()
    }

    /// Representative chunk ids in document order
    pub fn representative_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .clusters
            .iter()
            .map(|c| c.representative_chunk_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_per_chunk() {
        let selection = ClusterSelection::one_per_chunk([0, 1, 2], true);
        assert_eq!(selection.k(), 3);
        assert!(selection.fallback);
        assert_eq!(selection.representative_ids(), vec![0, 1, 2]);
        assert!(selection.clusters.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_selection_serializes() {
        let selection = ClusterSelection::one_per_chunk([4], false);
        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(json["clusters"][0]["representative_chunk_id"], 4);
        assert_eq!(json["fallback"], false);
    }
}
