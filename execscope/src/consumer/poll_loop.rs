//! Single-threaded polling loop
//!
//! The transport's `poll` is the only place the loop blocks. Cancellation is
//! checked once per iteration, after `poll` returns, so a poll in progress is
//! never interrupted and everything it delivered is processed first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use execscope_common::{EventData, StringData};

use super::dispatch::Dispatched;
use super::display::display_statistics;
use super::processor::EventProcessor;
use crate::domain::{PollError, TransportError};
use crate::store::SlotReader;

/// One unit of data handed over by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery<'a> {
    /// Raw notification bytes
    Batch(&'a [u8]),

    /// Number of notifications the transport dropped
    Lost(u64),
}

/// Source of notification batches and loss signals
pub trait NotificationTransport {
    /// Wait up to `timeout` for data and pass everything available to `deliver`
    ///
    /// # Errors
    /// Returns [`TransportError`] if waiting or reading fails
    fn poll(
        &mut self,
        timeout: Duration,
        deliver: &mut dyn FnMut(Delivery<'_>),
    ) -> Result<(), TransportError>;
}

/// Destination for dispatched records
pub trait RecordSink {
    /// # Errors
    /// Returns an I/O error if the record cannot be written
    fn write_record(&mut self, dispatched: &Dispatched) -> std::io::Result<()>;
}

/// Loop settings
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Longest single wait inside the transport
    pub timeout: Duration,

    /// Print statistics to stderr this often
    pub stats_interval: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_millis(100), stats_interval: None }
    }
}

/// Poll `transport` until `cancel` is set
///
/// Returns the number of completed polls.
///
/// # Errors
/// Returns [`PollError`] if the transport fails or a record cannot be written
pub fn run_poll_loop<T, E, S, O>(
    transport: &mut T,
    processor: &mut EventProcessor<E, S>,
    sink: &mut O,
    cancel: &AtomicBool,
    config: PollConfig,
) -> Result<u64, PollError>
where
    T: NotificationTransport + ?Sized,
    E: SlotReader<EventData>,
    S: SlotReader<StringData>,
    O: RecordSink + ?Sized,
{
    let mut polls = 0u64;
    let mut stats_timer = Instant::now();

    loop {
        let mut output_error = None;

        transport.poll(config.timeout, &mut |delivery: Delivery<'_>| match delivery {
            Delivery::Batch(bytes) => {
                // Rejection is already logged and counted by the processor
                let Ok(records) = processor.process_batch(bytes) else {
                    return;
                };
                for dispatched in &records {
                    if output_error.is_some() {
                        break;
                    }
                    if let Err(err) = sink.write_record(dispatched) {
                        output_error = Some(err);
                    }
                }
            }
            Delivery::Lost(count) => processor.on_lost(count),
        })?;
        polls += 1;

        if let Some(err) = output_error {
            return Err(err.into());
        }

        if let Some(interval) = config.stats_interval {
            if stats_timer.elapsed() >= interval {
                display_statistics(processor.stats());
                stats_timer = Instant::now();
            }
        }

        if cancel.load(Ordering::Relaxed) {
            return Ok(polls);
        }
    }
}
