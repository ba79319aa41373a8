//! Module focusing on the way rows are orchestrated between the reader, the workers and the sink

use std::{
    io::{Read, Write},
    panic,
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{Receiver, SyncSender, sync_channel},
    },
    thread::{Scope, ScopedJoinHandle},
};

use tracing::{debug, error};

use crate::{
    Error,
    domain::{Flight, ReferenceData},
    engine::{
        PipelineOptions, PipelineReport,
        logic::{RowResult, process_row},
        tracker::{AbortSignal, InFlight, RowTicket},
    },
    input::{RawRow, RowReader},
    output::write_flights,
    weather::{WeatherProvider, WeatherResolver},
};

type RowMessage<'t> = (RawRow, RowTicket<'t>);

/// Everything a worker reads but never owns
struct WorkerContext<'a, R, P> {
    references: &'a R,
    resolver: &'a WeatherResolver<'a, P>,
    abort: &'a AbortSignal,
}

///
/// Streams the rows of `reader` through `options.workers` worker threads into the sink writing to
/// `writer`, and returns once every accepted row reached a terminal state and the sink is closed.
///
/// A fatal error stops the reader, makes the workers abandon the rows still queued and is
/// returned after the sink flushed what it had already received.
///
pub(crate) fn run_pipeline<R, P>(
    reader: impl Read,
    writer: impl Write + Send,
    references: &R,
    resolver: &WeatherResolver<'_, P>,
    options: PipelineOptions,
    on_skip: impl FnMut(Error) + Send,
) -> Result<PipelineReport, Error>
where
    R: ReferenceData + Sync,
    P: WeatherProvider,
{
    // Opened: header problems are reported before any thread starts
    let rows = RowReader::new(reader)?;

    let tracker = InFlight::default();
    let abort = AbortSignal::default();
    let context = WorkerContext {
        references,
        resolver,
        abort: &abort,
    };

    let (mut report, sink_result) = std::thread::scope(|s| {
        let (flight_tx, flight_rx) = sync_channel::<Flight>(options.channel_capacity);
        let sink = s.spawn(move || write_flights(writer, flight_rx));
        let skip_tx = spawn_skip_handler(s, on_skip, options.channel_capacity);

        // The workers share the receiving end. Once the last worker is gone the queued rows are
        // dropped with it and the reader's next send fails.
        let (row_tx, row_rx) = sync_channel::<RowMessage<'_>>(options.channel_capacity);
        let row_rx = Arc::new(Mutex::new(row_rx));
        for _ in 0..options.workers.max(1) {
            let row_rx = Arc::clone(&row_rx);
            let context = &context;
            let flight_tx = flight_tx.clone();
            let skip_tx = skip_tx.clone();
            s.spawn(move || run_worker(&row_rx, context, flight_tx, skip_tx));
        }
        // workers hold their own clones
        drop(flight_tx);
        drop(row_rx);

        // Streaming
        for result in rows {
            if abort.is_raised() {
                break;
            }
            let ticket = tracker.begin();
            match result {
                Ok(row) => {
                    // Fails only if every worker is gone; the ticket comes back and is
                    // dropped as abandoned.
                    if row_tx.send((row, ticket)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = skip_tx.send(e);
                    ticket.skipped();
                }
            }
        }

        // Draining
        drop(row_tx);
        drop(skip_tx);
        let report = tracker.wait_idle();
        debug!(?report, "all accepted rows are terminal");

        // Closed: the workers exit on the closed row channel and drop the last flight senders
        (report, join(sink))
    });

    if let Some(fatal) = abort.into_error() {
        error!(
            rows_read = report.rows_read,
            forwarded = report.forwarded,
            abandoned = report.abandoned,
            "pipeline aborted"
        );
        return Err(fatal);
    }
    report.written = sink_result?;
    Ok(report)
}

fn run_worker<R, P>(
    rows: &Mutex<Receiver<RowMessage<'_>>>,
    context: &WorkerContext<'_, R, P>,
    flights: SyncSender<Flight>,
    skips: SyncSender<Error>,
) where
    R: ReferenceData,
    P: WeatherProvider,
{
    loop {
        let message = rows.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok((row, ticket)) = message else {
            // row channel closed and drained
            return;
        };

        if context.abort.is_raised() {
            drop(ticket);
            continue;
        }

        match process_row(&row, context.references, context.resolver) {
            RowResult::Forward(flight) => {
                if flights.send(flight).is_ok() {
                    ticket.forwarded();
                } else {
                    // the sink stopped, its own error is reported by the coordinator
                    context.abort.raise();
                }
            }
            RowResult::Skip(e) => {
                // Send fails only if the callback thread panicked; surfaced at the end of the scope.
                let _ = skips.send(e);
                ticket.skipped();
            }
            RowResult::Fatal(e) => {
                context.abort.fail(e);
            }
        }
    }
}

fn spawn_skip_handler<'s, 'e>(
    s: &'s Scope<'s, 'e>,
    mut on_skip: impl FnMut(Error) + Send + 's,
    channel_capacity: usize,
) -> SyncSender<Error> {
    let (skip_tx, skip_rx) = sync_channel::<Error>(channel_capacity);

    s.spawn(move || {
        for err in skip_rx {
            on_skip(err)
        }
    });

    skip_tx
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
}
