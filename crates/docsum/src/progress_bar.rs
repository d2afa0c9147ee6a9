use docsum_pipeline::{PipelineStage, ProgressEvent, ProgressObserver};
use indicatif::{ProgressBar, ProgressStyle};

const STEPS: u64 = 100;

/// Terminal progress bar driven by pipeline events
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(STEPS);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_event(&self, event: &ProgressEvent) {
        self.bar
            .set_position((event.fraction * STEPS as f32).round() as u64);

        match event.stage {
            PipelineStage::Done => self.bar.finish_with_message("Done"),
            PipelineStage::Failed => {
                let message = event
                    .error
                    .as_ref()
                    .map(|e| format!("Failed: {}", e.kind))
                    .unwrap_or_else(|| "Failed".to_string());
                self.bar.abandon_with_message(message);
            }
            PipelineStage::Cancelled => self.bar.abandon_with_message("Cancelled"),
            _ => self.bar.set_message(event.message.clone()),
        }
    }
}
