/// Receives download progress between categories
///
/// Called synchronously on the task driving the download, once per finished
/// category.
pub trait ProgressSink {
    fn on_progress(&mut self, completed: usize, total: usize, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize, &str),
{
    fn on_progress(&mut self, completed: usize, total: usize, message: &str) {
        self(completed, total, message)
    }
}

/// Sink that discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _completed: usize, _total: usize, _message: &str) {}
}
