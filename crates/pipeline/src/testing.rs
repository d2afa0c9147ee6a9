//! Hand-written fakes for the external services

use async_trait::async_trait;
use docsum_common::{DocsumError, Result};
use docsum_llm::{EmbeddingService, GenerativeService, LanguageCode, TranslationService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

use crate::progress::{PipelineStage, ProgressEvent, ProgressObserver};

/// Keyword vocabularies, one embedding axis each
pub const TOPICS: [&[&str]; 3] = [
    &["bread", "oven", "flour", "dough", "bake"],
    &["planet", "star", "telescope", "orbit", "galaxy"],
    &["football", "goal", "match", "league", "stadium"],
];

/// Generator that reports the length of what it was asked to summarize
#[derive(Default)]
pub struct MockGenerator {
    pub calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl GenerativeService for MockGenerator {
    async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), context.to_string()));
        Ok(format!("Summary of {} characters.", context.chars().count()))
    }
}

/// Generator that never answers, announcing the first call
#[derive(Default)]
pub struct StalledGenerator {
    pub started: Notify,
}

#[async_trait]
impl GenerativeService for StalledGenerator {
    async fn complete(&self, _prompt: &str, _context: &str) -> Result<String> {
        self.started.notify_one();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

/// Embeds text as keyword counts over `TOPICS`
#[derive(Default)]
pub struct MockEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingService for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| topic_vector(text)).collect())
    }
}

fn topic_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut vector: Vec<f32> = TOPICS
        .iter()
        .map(|words| words.iter().map(|w| lower.matches(w).count() as f32).sum())
        .collect();

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

/// Embedding backend that is always down
#[derive(Default)]
pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DocsumError::network("connection refused"))
    }
}

/// Embedding backend that serves the first `healthy_calls` batches, then goes down
pub struct EmbedderFailingAfter {
    pub healthy_calls: usize,
    pub calls: AtomicUsize,
}

impl EmbedderFailingAfter {
    pub fn new(healthy_calls: usize) -> Self {
        Self {
            healthy_calls,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingService for EmbedderFailingAfter {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.healthy_calls {
            Ok(texts.iter().map(|text| topic_vector(text)).collect())
        } else {
            Err(DocsumError::network("connection reset"))
        }
    }
}

/// Translator that tags the text with the target language
#[derive(Default)]
pub struct MockTranslator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TranslationService for MockTranslator {
    async fn translate(&self, text: &str, target: &LanguageCode) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{}] {}", target, text))
    }
}

/// Translation backend that is always down
#[derive(Default)]
pub struct FailingTranslator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TranslationService for FailingTranslator {
    async fn translate(&self, _text: &str, _target: &LanguageCode) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DocsumError::translation_unavailable("service offline"))
    }
}

/// Observer that keeps every event
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn stages(&self) -> Vec<PipelineStage> {
        self.events.lock().unwrap().iter().map(|e| e.stage).collect()
    }

    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Three sections of three paragraphs each, one topic per section
pub fn three_topic_document() -> String {
    let sections = [
        "Fresh bread begins with good flour and patient hands. The dough rests before it meets the oven, \
         and every baker knows that to bake well is to wait well. Flour, water and salt become bread.",
        "The telescope turned toward a distant star at dusk. Each planet follows its orbit around the star, \
         and the galaxy beyond holds billions more. Astronomers map every orbit and planet they find.",
        "The football match filled the stadium before kickoff. One goal decided the league title, \
         and the stadium roared when the match ended. Every club in the league wanted that goal.",
    ];

    let mut paragraphs = Vec::new();
    for section in sections {
        for repeat in [4, 3, 4] {
            paragraphs.push(vec![section; repeat].join(" "));
        }
    }
    paragraphs.join("\n\n")
}
