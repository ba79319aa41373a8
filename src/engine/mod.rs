//! Module for the concurrent enrichment pipeline

mod logic;
mod orchestration;
mod tracker;

pub(crate) use orchestration::run_pipeline;


/// Sizing of the worker pool and of the bounded channels between the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Number of worker threads, independent of the CPU count. At least one worker is started.
    pub workers: usize,
    /// Capacity of the raw-row, result and skipped-row channels
    pub channel_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 32,
            channel_capacity: 64,
        }
    }
}

/// Final accounting of one pipeline run.
///
/// Every row read from the input ends in exactly one of the `forwarded`, `skipped` or
/// `abandoned` counts. Rows are only abandoned once the run was aborted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub rows_read: u64,
    pub forwarded: u64,
    pub skipped: u64,
    pub abandoned: u64,
    /// Rows written by the sink
    pub written: usize,
}
