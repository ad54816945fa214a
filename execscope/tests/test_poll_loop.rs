mod support;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use execscope::consumer::{
    run_poll_loop, Delivery, NotificationTransport, OutputFormat, OutputSink, PollConfig,
};
use execscope::domain::TransportError;
use execscope::export::RecordExporter;
use support::{FakeProbe, Harness};

/// What the transport hands over during one poll
#[derive(Default)]
struct Poll {
    batches: Vec<Vec<u8>>,
    lost: u64,
    cancel: bool,
}

struct ReplayTransport<'a> {
    polls: VecDeque<Poll>,
    cancel: &'a AtomicBool,
    polled: u64,
}

impl NotificationTransport for ReplayTransport<'_> {
    fn poll(
        &mut self,
        _timeout: Duration,
        deliver: &mut dyn FnMut(Delivery<'_>),
    ) -> Result<(), TransportError> {
        self.polled += 1;
        let poll = self.polls.pop_front().unwrap_or_default();
        if poll.cancel {
            // Requested while this poll is in progress
            self.cancel.store(true, Ordering::Relaxed);
        }
        for batch in &poll.batches {
            deliver(Delivery::Batch(batch));
        }
        if poll.lost > 0 {
            deliver(Delivery::Lost(poll.lost));
        }
        Ok(())
    }
}

fn two_execs() -> (Harness, Vec<u8>, Vec<u8>) {
    let mut harness = Harness::new(2, 16, 64);
    harness.emit(&FakeProbe::execve("/bin/ls", &["ls", "-la"])).unwrap();
    let first = harness.wire.drain();
    harness.emit(&FakeProbe::execve("/bin/cat", &["cat", "/etc/hostname"]).on_cpu(1)).unwrap();
    let second = harness.wire.drain();
    (harness, first, second)
}

#[test]
fn test_loop_stops_after_poll_that_saw_cancellation() {
    let (harness, first, second) = two_execs();
    let cancel = AtomicBool::new(false);
    let mut transport = ReplayTransport {
        polls: VecDeque::from([
            Poll { batches: vec![first], ..Poll::default() },
            Poll { batches: vec![second], cancel: true, ..Poll::default() },
            Poll { lost: 99, ..Poll::default() },
        ]),
        cancel: &cancel,
        polled: 0,
    };

    let mut processor = harness.processor();
    let mut out = Vec::new();
    let mut sink = OutputSink::<_, Vec<u8>>::new(&mut out, OutputFormat::Text, None);
    let polls =
        run_poll_loop(&mut transport, &mut processor, &mut sink, &cancel, PollConfig::default())
            .unwrap();

    assert_eq!(polls, 2);
    assert_eq!(transport.polled, 2, "no poll after cancellation");
    assert_eq!(processor.stats().dispatched, 2, "the cancelling poll's batch is processed");
    assert_eq!(processor.stats().lost_notifications, 0);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("path=/bin/ls"));
    assert!(lines[1].contains("path=/bin/cat"));
}

#[test]
fn test_lost_counts_accumulate_across_polls() {
    let (harness, first, _) = two_execs();
    let cancel = AtomicBool::new(false);
    let mut transport = ReplayTransport {
        polls: VecDeque::from([
            Poll { lost: 3, ..Poll::default() },
            Poll { batches: vec![first], lost: 5, ..Poll::default() },
            Poll { lost: 2, cancel: true, ..Poll::default() },
        ]),
        cancel: &cancel,
        polled: 0,
    };

    let mut processor = harness.processor();
    let mut sink = OutputSink::<_, Vec<u8>>::new(std::io::sink(), OutputFormat::Text, None);
    run_poll_loop(&mut transport, &mut processor, &mut sink, &cancel, PollConfig::default())
        .unwrap();

    assert_eq!(processor.stats().lost_notifications, 10);
    assert_eq!(processor.stats().dispatched, 1);
}

#[test]
fn test_rejected_batch_does_not_stop_loop() {
    let (harness, first, _) = two_execs();
    let cancel = AtomicBool::new(false);
    let mut transport = ReplayTransport {
        polls: VecDeque::from([
            Poll { batches: vec![vec![1, 2, 3, 4, 5, 6]], ..Poll::default() },
            Poll { batches: vec![first], cancel: true, ..Poll::default() },
        ]),
        cancel: &cancel,
        polled: 0,
    };

    let mut processor = harness.processor();
    let mut sink = OutputSink::<_, Vec<u8>>::new(std::io::sink(), OutputFormat::Json, None);
    run_poll_loop(&mut transport, &mut processor, &mut sink, &cancel, PollConfig::default())
        .unwrap();

    assert_eq!(processor.stats().rejected_batches, 1);
    assert_eq!(processor.stats().dispatched, 1);
}

#[test]
fn test_export_writes_one_json_object_per_record() {
    let (harness, first, second) = two_execs();
    let export = tempfile::NamedTempFile::new().unwrap();

    let cancel = AtomicBool::new(false);
    let mut transport = ReplayTransport {
        polls: VecDeque::from([Poll { batches: vec![first, second], cancel: true, lost: 0 }]),
        cancel: &cancel,
        polled: 0,
    };
    let exporter = RecordExporter::create(export.path()).unwrap();
    let mut sink = OutputSink::new(std::io::sink(), OutputFormat::Text, Some(exporter));

    let mut processor = harness.processor();
    run_poll_loop(&mut transport, &mut processor, &mut sink, &cancel, PollConfig::default())
        .unwrap();
    let written = sink.take_exporter().unwrap().finish().unwrap();
    assert_eq!(written, 2);

    let contents = std::fs::read_to_string(export.path()).unwrap();
    let records: Vec<serde_json::Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["event"], "exec");
    assert_eq!(records[0]["path"], "/bin/ls");
    assert_eq!(records[0]["argv"], serde_json::json!(["ls", "-la"]));
    assert_eq!(records[1]["path"], "/bin/cat");
    assert_eq!(records[1]["argc"], 2);
}
