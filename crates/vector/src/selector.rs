use docsum_common::{DocsumError, PipelineConfig, Result};
use docsum_llm::Chunk;
use ndarray::Array2;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::elbow::{strategy_from_config, ElbowStrategy};
use crate::kmeans::{kmeans, squared_distance, KMeansResult};
use crate::types::{Cluster, ClusterSelection, InertiaPoint};

/// Groups embedded chunks and picks one representative per group
#[derive(Debug)]
pub struct ClusterSelector {
    small_document_threshold: usize,
    max_clusters: usize,
    fallback_k: usize,
    max_iterations: usize,
    strategy: Box<dyn ElbowStrategy>,
}

impl ClusterSelector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            small_document_threshold: config.small_document_threshold,
            max_clusters: config.max_clusters.max(1),
            fallback_k: config.fallback_k.max(1),
            max_iterations: config.kmeans_max_iterations.max(1),
            strategy: strategy_from_config(config),
        }
    }

    /// Replace the elbow strategy
    pub fn with_strategy(mut self, strategy: Box<dyn ElbowStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cluster the chunks.
    ///
    /// Never fails: when clustering is impossible every chunk becomes its own
    /// cluster and the selection is marked as a fallback.
    pub fn select(&self, chunks: &[Chunk]) -> ClusterSelection {
        let n = chunks.len();
        if n <= self.small_document_threshold {
            debug!("{} chunks, skipping clustering", n);
            return ClusterSelection::one_per_chunk(chunks.iter().map(|c| c.id), false);
        }

        match self.cluster(chunks) {
            Ok(selection) => {
                info!(
                    "Selected {} clusters out of {} chunks ({} elbow)",
                    selection.k(),
                    n,
                    self.strategy.name()
                );
                selection
            }
            Err(e) => {
                warn!("{}; using one cluster per chunk", e);
                ClusterSelection::one_per_chunk(chunks.iter().map(|c| c.id), true)
            }
        }
    }

    fn cluster(&self, chunks: &[Chunk]) -> Result<ClusterSelection> {
        let data = embedding_matrix(chunks)?;
        let n = data.nrows();

        let k_max = self.max_clusters.min(n - 1);
        let mut sweep: Vec<KMeansResult> = Vec::new();
        for k in 2..=k_max {
            sweep.push(kmeans(&data, k, self.max_iterations)?);
        }

        let curve: Vec<InertiaPoint> = sweep
            .iter()
            .map(|r| InertiaPoint {
                k: r.k,
                inertia: r.inertia,
            })
            .collect();
        debug!("Inertia curve: {:?}", curve);

        let k = match self.strategy.choose_k(&curve) {
            Some(k) => k.clamp(1, n),
            None => {
                let k = self.fallback_k.min(n);
                debug!("No clear elbow, falling back to k={}", k);
                k
            }
        };

        let result = match sweep.into_iter().find(|r| r.k == k) {
            Some(result) => result,
            None => kmeans(&data, k, self.max_iterations)?,
        };

        Ok(ClusterSelection {
            clusters: build_clusters(chunks, &data, &result),
            inertia_curve: curve,
            fallback: false,
        })
    }
}

/// Stack chunk embeddings into an `n × D` matrix
fn embedding_matrix(chunks: &[Chunk]) -> Result<Array2<f64>> {
    let first = chunks
        .first()
        .ok_or_else(|| DocsumError::clustering_failed("no chunks to cluster"))?;
    let dim = first.embedding.as_ref().map_or(0, Vec::len);
    if dim == 0 {
        return Err(DocsumError::clustering_failed(format!(
            "chunk {} has no embedding",
            first.id
        )));
    }

    let mut data = Array2::<f64>::zeros((chunks.len(), dim));
    for (i, chunk) in chunks.iter().enumerate() {
        let embedding = chunk.embedding.as_ref().ok_or_else(|| {
            DocsumError::clustering_failed(format!("chunk {} has no embedding", chunk.id))
        })?;
        if embedding.len() != dim {
            return Err(DocsumError::clustering_failed(format!(
                "chunk {} has dimension {}, expected {}",
                chunk.id,
                embedding.len(),
                dim
            )));
        }
        for (j, &value) in embedding.iter().enumerate() {
            if !value.is_finite() {
                return Err(DocsumError::clustering_failed(format!(
                    "chunk {} has a non-finite embedding value",
                    chunk.id
                )));
            }
            data[[i, j]] = value as f64;
        }
    }

    let row0 = data.row(0);
    if data.outer_iter().all(|row| row == row0) {
        return Err(DocsumError::clustering_failed("all embeddings are identical"));
    }

    Ok(data)
}

fn build_clusters(chunks: &[Chunk], data: &Array2<f64>, result: &KMeansResult) -> Vec<Cluster> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); result.k];
    for (row, &c) in result.assignments.iter().enumerate() {
        members[c].push(row);
    }

    // Rows are in document order, so the first member is the lowest id
    let mut groups: Vec<(usize, Vec<usize>)> = members
        .into_iter()
        .enumerate()
        .filter(|(_, rows)| !rows.is_empty())
        .collect();
    groups.sort_by_key(|(_, rows)| chunks[rows[0]].id);

    groups
        .into_iter()
        .enumerate()
        .map(|(id, (c, rows))| {
            let centroid = result.centroids.row(c);
            let mut representative = rows[0];
            let mut best = f64::INFINITY;
            for &row in &rows {
                let d = squared_distance(data.row(row), centroid);
                if d < best {
                    best = d;
                    representative = row;
                }
            }

            Cluster {
                id,
                member_chunk_ids: rows.iter().map(|&row| chunks[row].id).collect::<BTreeSet<_>>(),
                representative_chunk_id: chunks[representative].id,
            }
        })
        .collect()
}
