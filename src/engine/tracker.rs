//! Completion accounting of the rows accepted by the pipeline

use std::sync::{
    Condvar, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::{Error, engine::PipelineReport};

/// Counts the rows that were handed to the workers but have not reached a terminal state yet.
///
/// Every accepted row holds a [`RowTicket`]. Dropping the ticket is the only way to decrement
/// the counter, so each row is counted down exactly once, whichever path it takes (forwarded,
/// skipped, abandoned after a fatal error, or unwound by a panic).
#[derive(Debug, Default)]
pub(super) struct InFlight {
    counts: Mutex<Counts>,
    idle: Condvar,
}

#[derive(Debug, Default)]
struct Counts {
    in_flight: usize,
    report: PipelineReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Forwarded,
    Skipped,
    Abandoned,
}

/// Terminal-state obligation of one row, see [`InFlight`].
#[derive(Debug)]
#[must_use = "dropping a ticket marks its row as abandoned"]
pub(super) struct RowTicket<'t> {
    tracker: &'t InFlight,
    outcome: Outcome,
}

impl InFlight {
    fn counts(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new row. Must be called before the row is dispatched.
    pub(super) fn begin(&self) -> RowTicket<'_> {
        let mut counts = self.counts();
        counts.in_flight += 1;
        counts.report.rows_read += 1;
        RowTicket {
            tracker: self,
            outcome: Outcome::Abandoned,
        }
    }

    /// Blocks until every ticket handed out so far was dropped, then returns the counts.
    pub(super) fn wait_idle(&self) -> PipelineReport {
        let mut counts = self.counts();
        while counts.in_flight > 0 {
            counts = self
                .idle
                .wait(counts)
                .unwrap_or_else(PoisonError::into_inner);
        }
        counts.report
    }

    fn finish(&self, outcome: Outcome) {
        let mut counts = self.counts();
        counts.in_flight -= 1;
        match outcome {
            Outcome::Forwarded => counts.report.forwarded += 1,
            Outcome::Skipped => counts.report.skipped += 1,
            Outcome::Abandoned => counts.report.abandoned += 1,
        }
        if counts.in_flight == 0 {
            self.idle.notify_all();
        }
    }
}

impl RowTicket<'_> {
    /// The row reached the sink channel.
    pub(super) fn forwarded(mut self) {
        self.outcome = Outcome::Forwarded;
    }

    /// The row was rejected and reported to the skip callback.
    pub(super) fn skipped(mut self) {
        self.outcome = Outcome::Skipped;
    }
}

impl Drop for RowTicket<'_> {
    fn drop(&mut self) {
        self.tracker.finish(self.outcome);
    }
}

/// Stop signal shared by the reader and the workers.
///
/// Raised either by a fatal row error, which is kept for the coordinator, or by a sink that
/// stopped receiving.
#[derive(Debug, Default)]
pub(super) struct AbortSignal {
    raised: AtomicBool,
    error: Mutex<Option<Error>>,
}

impl AbortSignal {
    pub(super) fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    pub(super) fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Raises the signal with `error`. Only the first error is kept.
    pub(super) fn fail(&self, error: Error) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
        drop(slot);
        self.raise();
    }

    pub(super) fn into_error(self) -> Option<Error> {
        self.error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
