use docsum_common::{DocsumError, PipelineConfig, Result};
use docsum_llm::{
    Chunk, EmbeddingService, GenerativeService, LanguageCode, LanguageDetector, LlmTranslator,
    OllamaService, PromptLocalizer, RetryPolicy, Segmenter, Summarizer, SummaryResult,
    TranslationService,
};
use docsum_vector::{ClusterSelector, Embedder};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::progress::{PipelineStage, ProgressEvent, ProgressObserver, RunTracker, StageError};

/// Input text with its detected language
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub detected_language: LanguageCode,
}

/// External services a run talks to
#[derive(Clone)]
pub struct PipelineServices {
    pub generator: Arc<dyn GenerativeService>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub translator: Arc<dyn TranslationService>,
}

impl PipelineServices {
    /// Every service backed by one Ollama instance
    pub fn ollama(service: Arc<OllamaService>) -> Self {
        Self {
            generator: service.clone(),
            embedder: service.clone(),
            translator: Arc::new(LlmTranslator::new(service)),
        }
    }
}

/// Runs documents through detection, localization, segmentation, embedding,
/// clustering and summarization
pub struct PipelineOrchestrator {
    detector: LanguageDetector,
    localizer: PromptLocalizer,
    segmenter: Segmenter,
    embedder: Embedder,
    selector: ClusterSelector,
    summarizer: Summarizer,
    observer: Arc<dyn ProgressObserver>,
    tracker: Arc<RunTracker>,
}

impl PipelineOrchestrator {
    /// Create new orchestrator
    pub fn new(
        config: &PipelineConfig,
        services: PipelineServices,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<Self> {
        config.validate()?;

        let detector = LanguageDetector::from_config(config);
        let localizer = PromptLocalizer::new(
            detector.clone(),
            services.translator,
            RetryPolicy::from_config(config),
        );

        Ok(Self {
            detector,
            localizer,
            segmenter: Segmenter::new(config.max_chunk_size),
            embedder: Embedder::new(services.embedder, config),
            selector: ClusterSelector::new(config),
            summarizer: Summarizer::new(services.generator, config),
            observer,
            tracker: Arc::new(RunTracker::new()),
        })
    }

    /// Registry of runs started by this orchestrator
    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Summarize `text` under `prompt` (the built-in default when `None`)
    pub async fn run(
        &self,
        text: &str,
        prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> std::result::Result<SummaryResult, PipelineError> {
        self.execute(Uuid::new_v4(), text, prompt, cancel).await
    }

    /// Start a run on its own task
    pub fn spawn(self: &Arc<Self>, text: String, prompt: Option<String>) -> RunHandle {
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        let orchestrator = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            orchestrator
                .execute(run_id, &text, prompt.as_deref(), &token)
                .await
        });

        RunHandle {
            run_id,
            cancel,
            task,
            tracker: Arc::clone(&self.tracker),
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        text: &str,
        prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> std::result::Result<SummaryResult, PipelineError> {
        let span = info_span!("pipeline_run", %run_id);

        async move {
            self.emit(run_id, PipelineStage::Idle, 0.0, "Run queued");

            let outcome = self.run_stages(run_id, text, prompt, cancel).await;
            match &outcome {
                Ok(result) => {
                    info!(
                        "Run finished - {} chunks, {} clusters, {} warnings",
                        result.source_chunk_count,
                        result.cluster_count,
                        result.warnings.len()
                    );
                    self.emit(run_id, PipelineStage::Done, 1.0, "Summary ready");
                }
                Err(PipelineError::Cancelled { stage }) => {
                    self.emit(
                        run_id,
                        PipelineStage::Cancelled,
                        self.reached_fraction(run_id, *stage),
                        format!("Cancelled during {}", stage),
                    );
                }
                Err(PipelineError::Stage { stage, source }) => {
                    let event = ProgressEvent::new(
                        run_id,
                        PipelineStage::Failed,
                        self.reached_fraction(run_id, *stage),
                        format!("{} failed", stage),
                    )
                    .with_error(StageError::from(source));
                    self.publish(&event);
                }
            }

            outcome
        }
        .instrument(span)
        .await
    }

    /// Progress reported so far, so terminal events never move the bar back
    fn reached_fraction(&self, run_id: Uuid, stage: PipelineStage) -> f32 {
        self.tracker
            .get(run_id)
            .map_or(stage.start_fraction(), |run| run.fraction)
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        text: &str,
        prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> std::result::Result<SummaryResult, PipelineError> {
        let mut warnings = Vec::new();

        // Detecting
        self.enter(run_id, PipelineStage::Detecting, cancel, "Detecting language")?;
        let detected_language = self
            .detector
            .detect(text)
            .map_err(|e| PipelineError::at(PipelineStage::Detecting, e))?;
        let document = Document {
            text: text.to_string(),
            detected_language,
        };
        info!("Document language: {}", document.detected_language);

        // Localizing
        self.enter(run_id, PipelineStage::Localizing, cancel, "Localizing prompt")?;
        let prompt = guarded(PipelineStage::Localizing, cancel, async {
            Ok(self
                .localizer
                .localize(prompt, &document.detected_language)
                .await)
        })
        .await?;
        if let Some(reason) = &prompt.degraded {
            warnings.push(format!("prompt kept untranslated: {}", reason));
        }

        // Segmenting
        self.enter(run_id, PipelineStage::Segmenting, cancel, "Splitting document")?;
        let chunks = self
            .segmenter
            .segment(&document.text)
            .map_err(|e| PipelineError::at(PipelineStage::Segmenting, e))?;
        info!("Document split into {} chunks", chunks.len());

        // Embedding
        self.enter(
            run_id,
            PipelineStage::Embedding,
            cancel,
            format!("Embedding {} chunks", chunks.len()),
        )?;
        let on_progress = |done: usize, total: usize| {
            let fraction = 0.20 + 0.35 * done as f32 / total.max(1) as f32;
            self.emit(
                run_id,
                PipelineStage::Embedding,
                fraction,
                format!("Embedded batch {}/{}", done, total),
            );
        };
        let chunks = guarded(
            PipelineStage::Embedding,
            cancel,
            self.embedder.embed(chunks, cancel, on_progress),
        )
        .await?;

        // Clustering
        self.enter(run_id, PipelineStage::Clustering, cancel, "Selecting clusters")?;
        let selection = self.selector.select(&chunks);
        if selection.fallback {
            warnings.push("clustering failed; every chunk was summarized".to_string());
        }
        let representative_ids = selection.representative_ids();
        let representatives: Vec<Chunk> = chunks
            .iter()
            .filter(|chunk| representative_ids.binary_search(&chunk.id).is_ok())
            .cloned()
            .collect();

        // Summarizing
        self.enter(
            run_id,
            PipelineStage::Summarizing,
            cancel,
            format!("Summarizing {} representative chunks", representatives.len()),
        )?;
        let result = guarded(
            PipelineStage::Summarizing,
            cancel,
            self.summarizer
                .summarize(&representatives, &prompt.localized, chunks.len(), cancel),
        )
        .await?;
        self.emit(run_id, PipelineStage::Summarizing, 0.95, "Summary generated");

        let mut result = result.with_language(document.detected_language);
        warnings.append(&mut result.warnings);
        result.warnings = warnings;
        Ok(result)
    }

    /// Cancellation checkpoint followed by the stage's first event
    fn enter(
        &self,
        run_id: Uuid,
        stage: PipelineStage,
        cancel: &CancellationToken,
        message: impl Into<String>,
    ) -> std::result::Result<(), PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled { stage });
        }
        self.emit(run_id, stage, stage.start_fraction(), message);
        Ok(())
    }

    fn emit(&self, run_id: Uuid, stage: PipelineStage, fraction: f32, message: impl Into<String>) {
        self.publish(&ProgressEvent::new(run_id, stage, fraction, message));
    }

    fn publish(&self, event: &ProgressEvent) {
        self.tracker.record(event);
        self.observer.on_event(event);
    }
}

/// Race a stage against cancellation; the stage future is dropped on cancel
async fn guarded<T>(
    stage: PipelineStage,
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T>>,
) -> std::result::Result<T, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
        outcome = work => outcome.map_err(|e| PipelineError::at(stage, e)),
    }
}

/// Handle to a spawned run
pub struct RunHandle {
    run_id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<std::result::Result<SummaryResult, PipelineError>>,
    tracker: Arc<RunTracker>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Request cancellation; in-flight external calls are abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run's outcome
    pub async fn join(self) -> std::result::Result<SummaryResult, PipelineError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let stage = self
                    .tracker
                    .get(self.run_id)
                    .map(|run| run.stage)
                    .unwrap_or(PipelineStage::Idle);
                if e.is_cancelled() {
                    Err(PipelineError::Cancelled { stage })
                } else {
                    Err(PipelineError::Stage {
                        stage,
                        source: DocsumError::internal(format!("pipeline task failed: {}", e)),
                    })
                }
            }
        }
    }
}
