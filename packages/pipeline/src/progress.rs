//! Progress reporting for scrape runs.
//!
//! The pipeline reports its stages through [`ProgressCallback`] so the CLI
//! can render a progress bar while tests stay silent.

/// Receives stage updates from a running pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Set the number of stages the run will go through.
    fn set_total(&self, total: u64);

    /// Advance by `delta` stages.
    fn inc(&self, delta: u64);

    /// Describe the stage currently running.
    fn set_message(&self, msg: String);

    /// Mark the run as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark the run as complete and remove the indicator.
    fn finish_and_clear(&self);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}
