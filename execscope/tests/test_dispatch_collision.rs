mod support;

use execscope::consumer::{Dispatcher, EventRecord, ExecRecord, Handler, StringResolver};
use execscope::domain::{CpuId, HandlerError};
use execscope_common::{EventData, EventId, ExternalIndex, SlotStore};
use support::Harness;

fn tagged(tag: u32) -> Result<EventRecord, HandlerError> {
    Ok(EventRecord::Exec(ExecRecord { argc: tag, ..ExecRecord::default() }))
}

fn tracepoint_enter(_: &EventData, _: &dyn StringResolver) -> Result<EventRecord, HandlerError> {
    tagged(1)
}

fn tracepoint_exit(_: &EventData, _: &dyn StringResolver) -> Result<EventRecord, HandlerError> {
    tagged(2)
}

fn kprobe_enter(_: &EventData, _: &dyn StringResolver) -> Result<EventRecord, HandlerError> {
    tagged(3)
}

static SAME_CODE: &[Handler] = &[
    Handler { id: EventId::tracepoint(7, true), name: "tp_enter", handle: tracepoint_enter },
    Handler { id: EventId::tracepoint(7, false), name: "tp_exit", handle: tracepoint_exit },
    Handler { id: EventId::kprobe(7, true), name: "kprobe_enter", handle: kprobe_enter },
];

#[test]
fn test_same_code_different_flags_routes_to_distinct_handlers() {
    let mut harness = Harness::new(1, 4, 4);
    let ids = [
        EventId::tracepoint(7, true),
        EventId::tracepoint(7, false),
        EventId::kprobe(7, true),
        EventId::kprobe(7, false),
    ];

    let mut wire = Vec::new();
    for (slot, id) in (0u32..).zip(ids) {
        let store = harness.events.cpu_mut(CpuId(0)).unwrap();
        store.slot_mut(slot).unwrap().header.id = id.raw();
        wire.extend_from_slice(&ExternalIndex::new(0, slot).to_le_bytes());
    }

    let mut processor = harness.processor_with(Dispatcher::new(SAME_CODE));
    let records = processor.process_batch(&wire).unwrap();

    let handlers: Vec<&str> = records.iter().map(|d| d.handler).collect();
    assert_eq!(handlers, ["tp_enter", "tp_exit", "kprobe_enter"]);
    let tags: Vec<u32> = records
        .iter()
        .map(|d| {
            let EventRecord::Exec(record) = &d.record;
            record.argc
        })
        .collect();
    assert_eq!(tags, [1, 2, 3]);

    // kprobe:exit:7 has no handler
    assert_eq!(processor.stats().unknown_events, 1);
}
