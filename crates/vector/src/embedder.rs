use docsum_common::{DocsumError, PipelineConfig, Result};
use docsum_llm::{Chunk, EmbeddingService, RetryPolicy};
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Attaches embeddings to chunks in bounded, concurrent batches
pub struct Embedder {
    service: Arc<dyn EmbeddingService>,
    retry: RetryPolicy,
    batch_size: usize,
    concurrency: usize,
}

impl Embedder {
    pub fn new(service: Arc<dyn EmbeddingService>, config: &PipelineConfig) -> Self {
        Self {
            service,
            retry: RetryPolicy::from_config(config),
            batch_size: config.embedding_batch_size.max(1),
            concurrency: config.embedding_concurrency.max(1),
        }
    }

    /// Embed every chunk.
    ///
    /// `on_progress(done, total)` is called once per finished batch. Either
    /// every chunk gets an embedding of the same dimension or the call fails
    /// with `EmbeddingFailed`.
    pub async fn embed<F>(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<Vec<Chunk>>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batches: Vec<&[String]> = texts.chunks(self.batch_size).collect();
        let total = batches.len();
        let finished = AtomicUsize::new(0);

        info!(
            "Embedding {} chunks in {} batches (concurrency {})",
            chunks.len(),
            total,
            self.concurrency
        );

        let finished = &finished;
        let on_progress = &on_progress;
        // Boxed up front so the stream holds no borrowing closure and stays Send.
        let pending: Vec<_> = batches
            .into_iter()
            .enumerate()
            .map(|(index, batch)| {
                async move {
                    let vectors = self.embed_batch(index, batch, cancel).await?;
                    let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    on_progress(done, total);
                    Ok::<_, DocsumError>(vectors)
                }
                .boxed()
            })
            .collect();
        let batch_results: Vec<Vec<Vec<f32>>> = stream::iter(pending)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batch_results.into_iter().flatten().collect();
        let dim = vectors.first().map_or(0, Vec::len);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dim) {
            return Err(DocsumError::embedding_failed(format!(
                "chunk {} has dimension {}, expected {}",
                chunks[bad].id,
                vectors[bad].len(),
                dim
            )));
        }

        debug!("Embedded {} chunks, dimension {}", vectors.len(), dim);

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.with_embedding(vector))
            .collect())
    }

    async fn embed_batch(
        &self,
        index: usize,
        batch: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        if cancel.is_cancelled() {
            return Err(DocsumError::cancelled("embedding"));
        }

        let service = &self.service;
        let vectors = self
            .retry
            .run("Embedding batch", move || async move {
                let vectors = service.embed_batch(batch).await?;
                check_batch(&vectors, batch.len())?;
                Ok(vectors)
            })
            .await;

        vectors.map_err(|e| match e {
            DocsumError::Cancelled(_) => e,
            DocsumError::EmbeddingFailed(msg) => {
                DocsumError::embedding_failed(format!("batch {}: {}", index, msg))
            }
            other => DocsumError::embedding_failed(format!("batch {}: {}", index, other)),
        })
    }
}

fn check_batch(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    if vectors.len() != expected {
        return Err(DocsumError::embedding_failed(format!(
            "got {} vectors for {} texts",
            vectors.len(),
            expected
        )));
    }

    let dim = vectors.first().map_or(0, Vec::len);
    for vector in vectors {
        if vector.is_empty() || vector.len() != dim {
            return Err(DocsumError::embedding_failed("inconsistent vector dimension"));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(DocsumError::embedding_failed("non-finite vector value"));
        }
    }

    Ok(())
}
