//! Terminal progress bar.

use framestream::progress::{ProgressObserver, ProgressUpdate};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames [{elapsed_precise}] ETA {msg}";

/// Renders pipeline progress with `indicatif`.
///
/// The bar length starts at the estimate and grows if the stream turns out
/// to be longer, so the bar never overflows.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Progress bar drawn on stderr.
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(bar_style());
        Self { bar }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl ProgressObserver for BarProgress {
    fn start(&self, expected: u64) {
        self.bar.set_length(expected);
        self.bar.set_message(framestream::progress::UNKNOWN_ETA);
    }

    fn update(&self, update: &ProgressUpdate) {
        self.bar.set_length(update.expected.max(update.completed));
        self.bar.set_position(update.completed);
        self.bar.set_message(update.eta.clone());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
