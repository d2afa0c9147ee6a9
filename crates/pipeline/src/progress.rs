use chrono::{DateTime, Utc};
use docsum_common::{DocsumError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pipeline state; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Detecting,
    Localizing,
    Segmenting,
    Embedding,
    Clustering,
    Summarizing,
    Done,
    Failed,
    Cancelled,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::Localizing => "localizing",
            Self::Segmenting => "segmenting",
            Self::Embedding => "embedding",
            Self::Clustering => "clustering",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Progress fraction reported when the stage starts
    pub fn start_fraction(&self) -> f32 {
        match self {
            Self::Idle => 0.0,
            Self::Detecting => 0.05,
            Self::Localizing => 0.10,
            Self::Segmenting => 0.20,
            Self::Embedding => 0.20,
            Self::Clustering => 0.60,
            Self::Summarizing => 0.70,
            Self::Done => 1.0,
            Self::Failed | Self::Cancelled => 0.0,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error attached to a `Failed` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DocsumError> for StageError {
    fn from(e: &DocsumError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Progress notification for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub stage: PipelineStage,

    /// Overall progress in `[0, 1]`
    pub fraction: f32,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,

    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        run_id: Uuid,
        stage: PipelineStage,
        fraction: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            stage,
            fraction: fraction.clamp(0.0, 1.0),
            message: message.into(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: StageError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Receives every progress event of a run
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Observer that writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match (&event.stage, &event.error) {
            (_, Some(error)) => warn!(
                "[{}] {} ({}): {}",
                event.run_id, event.stage, error.kind, error.message
            ),
            (PipelineStage::Done, None) | (PipelineStage::Cancelled, None) => {
                info!("[{}] {}: {}", event.run_id, event.stage, event.message)
            }
            _ => debug!(
                "[{}] {} {:.0}%: {}",
                event.run_id,
                event.stage,
                event.fraction * 100.0,
                event.message
            ),
        }
    }
}

/// Latest known state of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub stage: PipelineStage,
    pub fraction: f32,
    pub message: String,
    pub error: Option<StageError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Finished runs kept for inspection before the oldest are evicted
const DEFAULT_FINISHED_RETENTION: usize = 32;

/// In-memory registry of runs, fed by progress events
#[derive(Debug)]
pub struct RunTracker {
    runs: RwLock<HashMap<Uuid, RunInfo>>,
    finished: Mutex<VecDeque<Uuid>>,
    finished_retention: usize,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::with_retention(DEFAULT_FINISHED_RETENTION)
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `finished_retention` finished runs (at least one)
    pub fn with_retention(finished_retention: usize) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            finished: Mutex::new(VecDeque::new()),
            finished_retention: finished_retention.max(1),
        }
    }

    /// Apply an event to the run it belongs to
    pub fn record(&self, event: &ProgressEvent) {
        let mut runs = self.runs.write().unwrap_or_else(|e| e.into_inner());
        let run = runs.entry(event.run_id).or_insert_with(|| RunInfo {
            run_id: event.run_id,
            stage: PipelineStage::Idle,
            fraction: 0.0,
            message: String::new(),
            error: None,
            started_at: event.timestamp,
            finished_at: None,
        });

        if run.stage.is_terminal() {
            return;
        }

        run.stage = event.stage;
        // Failed and Cancelled keep the progress reached so far
        if !matches!(event.stage, PipelineStage::Failed | PipelineStage::Cancelled) {
            run.fraction = event.fraction;
        }
        run.message = event.message.clone();
        run.error = event.error.clone();
        if event.stage.is_terminal() {
            run.finished_at = Some(event.timestamp);
            let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
            finished.push_back(event.run_id);
            let mut evicted = 0;
            while finished.len() > self.finished_retention {
                if let Some(old) = finished.pop_front() {
                    runs.remove(&old);
                    evicted += 1;
                }
            }
            if evicted > 0 {
                debug!("Evicted {} finished runs", evicted);
            }
        }
    }

    pub fn get(&self, run_id: Uuid) -> Option<RunInfo> {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&run_id)
            .cloned()
    }

    pub fn runs(&self) -> Vec<RunInfo> {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Runs that have not reached a terminal stage
    pub fn active_count(&self) -> usize {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|run| !run.stage.is_terminal())
            .count()
    }

}

impl ProgressObserver for RunTracker {
    fn on_event(&self, event: &ProgressEvent) {
        self.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_follows_run() {
        let tracker = RunTracker::new();
        let run_id = Uuid::new_v4();

        tracker.record(&ProgressEvent::new(run_id, PipelineStage::Idle, 0.0, "Starting"));
        tracker.record(&ProgressEvent::new(run_id, PipelineStage::Embedding, 0.4, "Batch 2/4"));
        assert_eq!(tracker.active_count(), 1);

        let info = tracker.get(run_id).unwrap();
        assert_eq!(info.stage, PipelineStage::Embedding);
        assert_eq!(info.fraction, 0.4);

        let error = StageError::from(&DocsumError::embedding_failed("offline"));
        tracker.record(
            &ProgressEvent::new(run_id, PipelineStage::Failed, 0.4, "failed").with_error(error),
        );

        let info = tracker.get(run_id).unwrap();
        assert_eq!(info.stage, PipelineStage::Failed);
        assert_eq!(info.error.as_ref().unwrap().kind, ErrorKind::EmbeddingFailed);
        assert!(info.finished_at.is_some());
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(info.fraction, 0.4);
    }

    #[test]
    fn test_oldest_finished_runs_are_evicted() {
        let tracker = RunTracker::with_retention(2);
        let active = Uuid::new_v4();
        tracker.record(&ProgressEvent::new(active, PipelineStage::Embedding, 0.3, "busy"));

        let finished: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for run_id in &finished {
            tracker.record(&ProgressEvent::new(*run_id, PipelineStage::Idle, 0.0, "Starting"));
            tracker.record(&ProgressEvent::new(*run_id, PipelineStage::Done, 1.0, "Done"));
        }

        assert_eq!(tracker.runs().len(), 3);
        assert!(tracker.get(active).is_some());
        assert!(tracker.get(finished[0]).is_none());
        assert!(tracker.get(finished[1]).is_none());
        assert!(tracker.get(finished[3]).is_some());
    }

    #[test]
    fn test_terminal_stage_is_final() {
        let tracker = RunTracker::new();
        let run_id = Uuid::new_v4();
        tracker.record(&ProgressEvent::new(run_id, PipelineStage::Done, 1.0, "Done"));
        tracker.record(&ProgressEvent::new(run_id, PipelineStage::Embedding, 0.3, "late"));
        assert_eq!(tracker.get(run_id).unwrap().stage, PipelineStage::Done);
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::new(Uuid::nil(), PipelineStage::Clustering, 1.5, "k=3");
        assert_eq!(event.fraction, 1.0);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "clustering");
        assert!(json.get("error").is_none());
    }
}
