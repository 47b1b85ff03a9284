use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives one call per unit of work started by the aggregation loop.
///
/// `total` may grow during a run: SSID splitting only learns how many units a
/// network has after listing its SSIDs.
pub trait ProgressReporter {
    fn report(&mut self, unit_label: &str, completed: usize, total: usize);

    fn finish(&mut self) {}
}

/// Discards progress; used for JSON output and tests.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _unit_label: &str, _completed: usize, _total: usize) {}
}

/// Terminal progress bar on stderr, cleared once the run finishes.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn report(&mut self, unit_label: &str, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed.min(total) as u64);
        self.bar.set_message(format!("Processing: {unit_label}"));
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
