use indicatif::{ProgressBar, ProgressStyle};
use osmcache_core::ports::ProgressSink;
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        pb.set_style(spinner.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(bar) = ProgressStyle::default_bar()
        .template("{msg}\n[{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
    {
        pb.set_style(bar.progress_chars("█▓▒░ "));
    }
    pb.set_message(message.to_string());
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

/// Category progress for a download, one tick per finished category
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new(total: usize, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            create_progress_bar(total as u64, "Downloading OSM categories")
        };
        Self { bar }
    }

    pub fn finish(&self, cached: usize, failed: usize) {
        if failed == 0 {
            finish_success(&self.bar, &format!("Cached {} categories", cached));
        } else if cached > 0 {
            finish_success(&self.bar, &format!("Cached {} categories, {} failed", cached, failed));
        } else {
            finish_error(&self.bar, "No category could be cached");
        }
    }

    pub fn abandon(&self, message: &str) {
        finish_error(&self.bar, message);
    }
}

impl ProgressSink for DownloadProgress {
    fn on_progress(&mut self, completed: usize, total: usize, message: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
        self.bar.set_message(format!("Finished {}", message));
    }
}
