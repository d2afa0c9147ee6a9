use docsum_common::{DocsumError, ErrorKind};

use crate::progress::PipelineStage;

/// Terminal outcome of a run that did not reach `Done`
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        source: DocsumError,
    },

    #[error("run cancelled during {stage}")]
    Cancelled { stage: PipelineStage },
}

impl PipelineError {
    /// Wrap a stage error; cancellations stay cancellations
    pub fn at(stage: PipelineStage, source: DocsumError) -> Self {
        if source.is_cancelled() {
            Self::Cancelled { stage }
        } else {
            Self::Stage { stage, source }
        }
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Stage { stage, .. } | Self::Cancelled { stage } => *stage,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stage { source, .. } => source.kind(),
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_not_wrapped() {
        let err = PipelineError::at(PipelineStage::Embedding, DocsumError::cancelled("embedding"));
        assert!(err.is_cancelled());
        assert_eq!(err.stage(), PipelineStage::Embedding);
    }

    #[test]
    fn test_stage_error_display() {
        let err = PipelineError::at(
            PipelineStage::Summarizing,
            DocsumError::generation_failed("gave up"),
        );
        assert_eq!(err.kind(), ErrorKind::GenerationFailed);
        assert_eq!(
            err.to_string(),
            "summarizing stage failed: Generation failed: gave up"
        );
    }
}
