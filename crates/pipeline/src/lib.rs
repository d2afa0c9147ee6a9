//! docsum Pipeline
//!
//! Orchestrates a summarization run from raw text to summary, reporting
//! progress and honoring cancellation

mod error;
mod extract;
mod orchestrator;
mod progress;

#[cfg(test)]
mod testing;

pub use error::PipelineError;
pub use extract::{PlainTextExtractor, TextExtractor};
pub use orchestrator::{Document, PipelineOrchestrator, PipelineServices, RunHandle};
pub use progress::{
    LoggingObserver, PipelineStage, ProgressEvent, ProgressObserver, RunInfo, RunTracker,
    StageError,
};
