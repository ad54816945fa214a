//! Event handlers, one per composite event id

// Header words pack two 32-bit ids; argc is bounded by ARGV_CAPACITY
#![allow(clippy::cast_possible_truncation)]

use execscope_common::{EventData, EventPayload, ExecveEnterEventData, PayloadError};

use super::record::{EventRecord, ExecRecord};
use super::strings::StringResolver;
use crate::domain::HandlerError;

fn decode(handler: &'static str, data: &EventData) -> Result<EventPayload, HandlerError> {
    EventPayload::decode(data)
        .map_err(|PayloadError::UnknownEvent(id)| HandlerError::UnexpectedPayload { handler, id })
}

fn resolve_field(
    strings: &dyn StringResolver,
    field: &'static str,
    index: execscope_common::ExternalIndex,
) -> Result<String, HandlerError> {
    strings.resolve(index).map_err(|source| HandlerError::String { field, source })
}

/// `syscalls/sys_enter_execve`
///
/// Resolves the path and every captured argument. Any unresolvable string
/// fails the whole event.
///
/// # Errors
/// Returns [`HandlerError`] if the slot does not hold an execve payload or a
/// string cannot be resolved
pub fn sys_enter_execve(
    data: &EventData,
    strings: &dyn StringResolver,
) -> Result<EventRecord, HandlerError> {
    let EventPayload::SysEnterExecve(event) = decode("sys_enter_execve", data)?;
    exec_record(&event, strings).map(EventRecord::Exec)
}

fn exec_record(
    event: &ExecveEnterEventData,
    strings: &dyn StringResolver,
) -> Result<ExecRecord, HandlerError> {
    let path = resolve_field(strings, "filename", event.filename())?;
    let argv = event
        .args()
        .map(|index| resolve_field(strings, "argv", index))
        .collect::<Result<Vec<_>, _>>()?;

    let argc = argv.len() as u32;
    let header = &event.header;

    Ok(ExecRecord {
        timestamp_ns: header.timestamp,
        pid: header.tgid(),
        tid: header.pid(),
        ppid: header.parent_tgid as u32,
        uid: header.uid(),
        gid: header.gid(),
        path,
        argc,
        argv,
    })
}
