use docsum_common::{DocsumError, PipelineConfig, Result, SummaryMode};
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunking::chunk_text;
use crate::llm_trait::GenerativeService;
use crate::retry::RetryPolicy;
use crate::types::{Chunk, SummaryResult};

const PART_SEPARATOR: &str = "\n\n";

/// Summarizer for representative chunks, reducing hierarchically when the
/// content does not fit one request
pub struct Summarizer {
    generator: Arc<dyn GenerativeService>,
    retry: RetryPolicy,
    input_budget: usize,
    max_depth: usize,
    concurrency: usize,
    mode: SummaryMode,
}

impl Summarizer {
    /// Create new summarizer
    pub fn new(generator: Arc<dyn GenerativeService>, config: &PipelineConfig) -> Self {
        Self {
            generator,
            retry: RetryPolicy::from_config(config),
            input_budget: config.summary_input_budget.max(1),
            max_depth: config.summary_max_depth,
            concurrency: config.summary_concurrency.max(1),
            mode: config.summary_mode,
        }
    }

    /// Summarize representative chunks under the given instruction.
    ///
    /// Chunks are put back into document order before anything is sent.
    pub async fn summarize(
        &self,
        representatives: &[Chunk],
        prompt: &str,
        source_chunk_count: usize,
        cancel: &CancellationToken,
    ) -> Result<SummaryResult> {
        if representatives.is_empty() {
            return Err(DocsumError::invalid_input("no representative chunks to summarize"));
        }

        let mut ordered: Vec<&Chunk> = representatives.iter().collect();
        ordered.sort_by_key(|chunk| chunk.id);

        let ids: Vec<usize> = ordered.iter().map(|chunk| chunk.id).collect();
        let parts: Vec<String> = ordered.iter().map(|chunk| chunk.text.clone()).collect();

        info!(
            "Starting summarization - {} representatives, mode {:?}",
            parts.len(),
            self.mode
        );

        let mut warnings = Vec::new();
        let text = match self.mode {
            SummaryMode::Aggregate => {
                self.summarize_aggregate(parts, prompt, cancel, &mut warnings)
                    .await?
            }
            SummaryMode::PerCluster => self.summarize_per_cluster(parts, prompt, cancel).await?,
        };

        info!("Summary generated - Length: {} chars", text.len());

        let mut result = SummaryResult::new(text, source_chunk_count, ids);
        result.warnings = warnings;
        Ok(result)
    }

    /// One request over all parts; over-budget content is reduced level by level
    async fn summarize_aggregate(
        &self,
        mut parts: Vec<String>,
        prompt: &str,
        cancel: &CancellationToken,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        let mut depth = 0;

        loop {
            let combined = parts.join(PART_SEPARATOR);
            if combined.chars().count() <= self.input_budget {
                return self.generate(prompt, &combined, cancel).await;
            }

            if depth >= self.max_depth {
                let warning = format!(
                    "content still exceeded {} characters after {} reduction levels and was truncated",
                    self.input_budget, depth
                );
                warn!("{}", warning);
                warnings.push(warning);
                let truncated = truncate_chars(&combined, self.input_budget);
                return self.generate(prompt, truncated, cancel).await;
            }

            let parts_in_budget = split_to_budget(&parts, self.input_budget)?;
            let groups = group_by_budget(&parts_in_budget, self.input_budget);
            debug!(
                "Reduction level {}: {} parts into {} groups",
                depth + 1,
                parts_in_budget.len(),
                groups.len()
            );
            parts = self.generate_all(&groups, prompt, cancel).await?;
            depth += 1;
        }
    }

    /// One request per representative, joined in document order
    async fn summarize_per_cluster(
        &self,
        parts: Vec<String>,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let summaries = self.generate_all(&parts, prompt, cancel).await?;
        Ok(summaries.join("\n"))
    }

    /// Generate for every content with bounded concurrency, keeping input order
    async fn generate_all(
        &self,
        contents: &[String],
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let pending: Vec<_> = contents
            .iter()
            .map(|content| self.generate(prompt, content, cancel).boxed())
            .collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Single generative call under the retry policy
    async fn generate(
        &self,
        prompt: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(DocsumError::cancelled("summarization"));
        }

        let generator = &self.generator;
        let output = self
            .retry
            .run("Generation request", move || async move {
                let output = generator.complete(prompt, content).await?;
                if output.trim().is_empty() {
                    return Err(DocsumError::network("generative model returned no text"));
                }
                Ok(output)
            })
            .await;

        output.map_err(|e| match e {
            DocsumError::Cancelled(_) => e,
            other => DocsumError::generation_failed(format!(
                "gave up after {} attempts: {}",
                self.retry.max_attempts, other
            )),
        })
    }
}

/// Break any part longer than the budget into budget-sized pieces
fn split_to_budget(parts: &[String], budget: usize) -> Result<Vec<String>> {
    let mut pieces = Vec::with_capacity(parts.len());
    for part in parts {
        if part.chars().count() <= budget {
            pieces.push(part.clone());
        } else {
            pieces.extend(chunk_text(part, budget)?.into_iter().map(|chunk| chunk.text));
        }
    }
    Ok(pieces)
}

/// Group consecutive parts so each group's joined text fits the budget
fn group_by_budget(parts: &[String], budget: usize) -> Vec<String> {
    let separator_len = PART_SEPARATOR.chars().count();
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for part in parts {
        let part_len = part.chars().count();
        if current.is_empty() {
            current.push_str(part);
            current_len = part_len;
        } else if current_len + separator_len + part_len <= budget {
            current.push_str(PART_SEPARATOR);
            current.push_str(part);
            current_len += separator_len + part_len;
        } else {
            groups.push(std::mem::take(&mut current));
            current.push_str(part);
            current_len = part_len;
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Reply = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

    struct ScriptedGenerator {
        reply: Reply,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        fn new(reply: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeService for ScriptedGenerator {
        async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), context.to_string()));
            (self.reply)(context)
        }
    }

    fn config(budget: usize, depth: usize, mode: SummaryMode) -> PipelineConfig {
        PipelineConfig {
            max_chunk_size: budget.min(1000),
            summary_input_budget: budget,
            summary_max_depth: depth,
            summary_mode: mode,
            retry_attempts: 2,
            retry_base_delay_ms: 1,
            ..PipelineConfig::default()
        }
    }

    fn chunk(id: usize, text: &str) -> Chunk {
        Chunk::new(id, text, 0, text.len())
    }

    #[tokio::test]
    async fn test_single_request_in_document_order() {
        let generator = ScriptedGenerator::new(|_| Ok("short summary".to_string()));
        let summarizer = Summarizer::new(generator.clone(), &config(1000, 2, SummaryMode::Aggregate));
        let reps = vec![chunk(4, "Later part."), chunk(1, "Early part.")];

        let result = summarizer
            .summarize(&reps, "Summarize.", 6, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.text, "short summary");
        assert_eq!(result.representative_chunk_ids, vec![1, 4]);
        assert_eq!(result.cluster_count, 2);
        assert_eq!(result.source_chunk_count, 6);

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Summarize.");
        assert_eq!(calls[0].1, "Early part.\n\nLater part.");
    }

    #[tokio::test]
    async fn test_hierarchical_reduction_over_budget() {
        let generator = ScriptedGenerator::new(|_| Ok("summary".to_string()));
        let summarizer = Summarizer::new(generator.clone(), &config(50, 2, SummaryMode::Aggregate));
        let reps: Vec<Chunk> = (0..4).map(|i| chunk(i, &"a".repeat(30))).collect();

        let result = summarizer
            .summarize(&reps, "Summarize.", 4, &CancellationToken::new())
            .await
            .unwrap();

        let calls = generator.calls();
        // four group summaries, then one final request
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[4].1, vec!["summary"; 4].join("\n\n"));
        assert!(calls.iter().all(|(_, content)| content.chars().count() <= 50));
        assert_eq!(result.text, "summary");
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_depth_limit_truncates() {
        let generator = ScriptedGenerator::new(|_| Ok("b".repeat(40)));
        let summarizer = Summarizer::new(generator.clone(), &config(50, 1, SummaryMode::Aggregate));
        let reps: Vec<Chunk> = (0..3).map(|i| chunk(i, &"a".repeat(30))).collect();

        let result = summarizer
            .summarize(&reps, "Summarize.", 3, &CancellationToken::new())
            .await
            .unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3].1.chars().count(), 50);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_per_cluster_mode_keeps_order() {
        let generator = ScriptedGenerator::new(|context| Ok(format!("about {}", context)));
        let summarizer =
            Summarizer::new(generator.clone(), &config(1000, 2, SummaryMode::PerCluster));
        let reps = vec![chunk(7, "seven"), chunk(2, "two"), chunk(5, "five")];

        let result = summarizer
            .summarize(&reps, "Summarize.", 9, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.text, "about two\nabout five\nabout seven");
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_generation_failure_is_terminal() {
        let generator =
            ScriptedGenerator::new(|_| Err(DocsumError::network("connection refused")));
        let summarizer = Summarizer::new(generator.clone(), &config(1000, 2, SummaryMode::Aggregate));

        let err = summarizer
            .summarize(&[chunk(0, "text")], "Summarize.", 1, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DocsumError::GenerationFailed(_)));
        assert_eq!(generator.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_output_counts_as_failure() {
        let generator = ScriptedGenerator::new(|_| Ok("  \n".to_string()));
        let summarizer = Summarizer::new(generator.clone(), &config(1000, 2, SummaryMode::Aggregate));

        let err = summarizer
            .summarize(&[chunk(0, "text")], "Summarize.", 1, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DocsumError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let generator = ScriptedGenerator::new(|_| Ok("never".to_string()));
        let summarizer = Summarizer::new(generator.clone(), &config(1000, 2, SummaryMode::Aggregate));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = summarizer
            .summarize(&[chunk(0, "text")], "Summarize.", 1, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_representatives() {
        let generator = ScriptedGenerator::new(|_| Ok("never".to_string()));
        let summarizer = Summarizer::new(generator, &config(1000, 2, SummaryMode::Aggregate));
        let err = summarizer
            .summarize(&[], "Summarize.", 0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsumError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_long_model_output_is_split_to_budget() {
        let generator = ScriptedGenerator::new(|_| Ok("word ".repeat(12).trim_end().to_string()));
        let summarizer = Summarizer::new(generator.clone(), &config(50, 2, SummaryMode::Aggregate));
        let reps: Vec<Chunk> = (0..4).map(|i| chunk(i, &"a".repeat(30))).collect();

        let result = summarizer
            .summarize(&reps, "Summarize.", 4, &CancellationToken::new())
            .await
            .unwrap();

        let calls = generator.calls();
        assert!(calls.len() > 5);
        for (_, content) in &calls {
            assert!(content.chars().count() <= 50, "over budget: {:?}", content);
        }
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_split_to_budget() {
        let parts = vec!["short".to_string(), "one two three four five six".to_string()];
        let pieces = split_to_budget(&parts, 10).unwrap();
        assert_eq!(pieces[0], "short");
        assert!(pieces.len() > 2);
        assert!(pieces.iter().all(|p| p.chars().count() <= 10));
    }

    #[test]
    fn test_group_by_budget() {
        let parts = vec!["aaaa".to_string(), "bbbb".to_string(), "cccccccccc".to_string()];
        let groups = group_by_budget(&parts, 10);
        assert_eq!(groups, vec!["aaaa\n\nbbbb".to_string(), "cccccccccc".to_string()]);
    }
}
