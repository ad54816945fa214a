//! Consumer side of the event protocol
//!
//! - `processor`: batch validation, per-notification decode, diagnostics
//! - `dispatch`: static handler table keyed by composite event id
//! - `handlers`: typed payload → record conversion
//! - `strings`: interned string resolution
//! - `poll_loop`: transport-driven loop with check-after-poll cancellation
//! - `record`, `display`: records and their text/JSON output

pub mod dispatch;
pub mod display;
pub mod handlers;
pub mod poll_loop;
pub mod processor;
pub mod record;
pub mod strings;

pub use dispatch::{Dispatched, Dispatcher, Handler, HandlerFn, DEFAULT_HANDLERS};
pub use display::{display_statistics, display_summary, format_record, OutputFormat, OutputSink};
pub use poll_loop::{run_poll_loop, Delivery, NotificationTransport, PollConfig, RecordSink};
pub use processor::{EventProcessor, ProcessorStats, NOTIFICATION_SIZE};
pub use record::{EventRecord, ExecRecord};
pub use strings::{terminated_len, StringResolver, StringTable};
