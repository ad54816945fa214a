//! # Notification Processing
//!
//! Turns batches of notification bytes into dispatched records.
//!
//! ## Failure Handling
//!
//! - **Batch not a multiple of 4 bytes**: the whole batch is rejected
//! - **Slot lookup failure, unknown event id, handler failure**: the single
//!   notification is logged, counted and skipped
//!
//! Nothing that goes wrong with one notification affects the next.

use execscope_common::{EventData, ExternalIndex, StringData};
use log::{error, warn};
use serde::Serialize;

use super::dispatch::{Dispatched, Dispatcher};
use super::strings::StringTable;
use crate::domain::{BatchError, CpuId, DispatchError};
use crate::store::SlotReader;

/// Size of one notification on the wire
pub const NOTIFICATION_SIZE: usize = std::mem::size_of::<u32>();

/// Diagnostic counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub batches: u64,
    pub rejected_batches: u64,
    pub notifications: u64,
    pub dispatched: u64,
    pub slot_lookup_failures: u64,
    pub unknown_events: u64,
    pub handler_failures: u64,
    /// Sum of the transport's loss counts
    pub lost_notifications: u64,
}

/// Decodes notifications against the per-CPU stores
pub struct EventProcessor<E, S> {
    events: E,
    strings: StringTable<S>,
    dispatcher: Dispatcher,
    stats: ProcessorStats,
}

impl<E, S> EventProcessor<E, S>
where
    E: SlotReader<EventData>,
    S: SlotReader<StringData>,
{
    /// Create a processor using the default handler table
    pub fn new(events: E, strings: S) -> Self {
        Self::with_dispatcher(events, strings, Dispatcher::default())
    }

    pub fn with_dispatcher(events: E, strings: S, dispatcher: Dispatcher) -> Self {
        Self {
            events,
            strings: StringTable::new(strings),
            dispatcher,
            stats: ProcessorStats::default(),
        }
    }

    /// Process every notification in `batch`
    ///
    /// Returns the records that were dispatched successfully, in batch order.
    ///
    /// # Errors
    /// Returns [`BatchError::Misaligned`] and decodes nothing if the batch
    /// length is not a multiple of [`NOTIFICATION_SIZE`]
    pub fn process_batch(&mut self, batch: &[u8]) -> Result<Vec<Dispatched>, BatchError> {
        self.stats.batches += 1;

        if batch.len() % NOTIFICATION_SIZE != 0 {
            let err = BatchError::Misaligned(batch.len());
            error!("{err}; batch dropped");
            self.stats.rejected_batches += 1;
            return Err(err);
        }

        let mut records = Vec::with_capacity(batch.len() / NOTIFICATION_SIZE);
        for chunk in batch.chunks_exact(NOTIFICATION_SIZE) {
            let mut raw = [0u8; NOTIFICATION_SIZE];
            raw.copy_from_slice(chunk);

            if let Some(dispatched) = self.handle_notification(ExternalIndex::from_le_bytes(raw)) {
                records.push(dispatched);
            }
        }
        Ok(records)
    }

    /// Decode and dispatch a single notification, logging and counting failures
    pub fn handle_notification(&mut self, index: ExternalIndex) -> Option<Dispatched> {
        self.stats.notifications += 1;

        match self.dispatch(index) {
            Ok(dispatched) => {
                self.stats.dispatched += 1;
                Some(dispatched)
            }
            Err(err) => {
                match err {
                    DispatchError::SlotLookup { .. } => self.stats.slot_lookup_failures += 1,
                    DispatchError::UnknownEvent(_) => self.stats.unknown_events += 1,
                    DispatchError::Handler(_) => self.stats.handler_failures += 1,
                }
                warn!("Skipping notification {index}: {err}");
                None
            }
        }
    }

    /// Read the event slot behind `index` and route it to its handler
    ///
    /// # Errors
    /// Returns the [`DispatchError`] for this notification; no counters change
    pub fn dispatch(&self, index: ExternalIndex) -> Result<Dispatched, DispatchError> {
        let (cpu, slot) = index.split();
        let data = self
            .events
            .read_slot(CpuId(cpu), slot)
            .map_err(|source| DispatchError::SlotLookup { index, source })?;

        self.dispatcher.dispatch(&data, &self.strings)
    }

    /// Record a loss signal from the transport
    pub fn on_lost(&mut self, count: u64) {
        if count == 0 {
            return;
        }
        self.stats.lost_notifications += count;
        warn!("Lost {count} notifications (total {})", self.stats.lost_notifications);
    }

    #[must_use]
    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PerCpuArena;
    use execscope_common::{EventId, SlotStore, SYS_ENTER_EXECVE};

    fn processor() -> EventProcessor<PerCpuArena<EventData>, PerCpuArena<StringData>> {
        EventProcessor::new(PerCpuArena::new(2, 4), PerCpuArena::new(2, 4))
    }

    fn set_event_id(
        processor: &mut EventProcessor<PerCpuArena<EventData>, PerCpuArena<StringData>>,
        cpu: u32,
        slot: u32,
        id: EventId,
    ) {
        let data = processor.events.cpu_mut(CpuId(cpu)).unwrap().slot_mut(slot).unwrap();
        data.header.id = id.raw();
    }

    #[test]
    fn test_misaligned_batch_is_rejected() {
        let mut processor = processor();
        set_event_id(&mut processor, 0, 0, SYS_ENTER_EXECVE);

        let err = processor.process_batch(&[0u8; 6]).unwrap_err();
        assert_eq!(err, BatchError::Misaligned(6));
        assert_eq!(processor.stats().rejected_batches, 1);
        assert_eq!(processor.stats().notifications, 0);
        assert_eq!(processor.stats().dispatched, 0);
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let mut processor = processor();
        assert!(processor.process_batch(&[]).unwrap().is_empty());
        assert_eq!(processor.stats().batches, 1);
        assert_eq!(processor.stats().rejected_batches, 0);
    }

    #[test]
    fn test_soft_failures_skip_single_notifications() {
        let mut processor = processor();
        set_event_id(&mut processor, 1, 1, SYS_ENTER_EXECVE);
        set_event_id(&mut processor, 1, 2, EventId::kprobe(9, false));

        let mut batch = Vec::new();
        batch.extend_from_slice(&ExternalIndex::new(5, 0).to_le_bytes()); // no such CPU
        batch.extend_from_slice(&ExternalIndex::new(1, 2).to_le_bytes()); // unknown id
        batch.extend_from_slice(&ExternalIndex::new(1, 1).to_le_bytes()); // valid

        let records = processor.process_batch(&batch).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handler, "sys_enter_execve");

        let stats = processor.stats();
        assert_eq!(stats.notifications, 3);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.slot_lookup_failures, 1);
        assert_eq!(stats.unknown_events, 1);
        assert_eq!(stats.handler_failures, 0);
    }

    #[test]
    fn test_lost_counts_accumulate() {
        let mut processor = processor();
        processor.on_lost(3);
        processor.on_lost(0);
        processor.on_lost(4);
        assert_eq!(processor.stats().lost_notifications, 7);
    }
}
