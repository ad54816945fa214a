//! Static dispatch table keyed by composite event id
//!
//! Numeric codes are only unique within one (tracepoint, enter) combination,
//! so lookups always compare the full 64-bit [`EventId`].

use execscope_common::{EventData, EventId, SYS_ENTER_EXECVE};

use super::handlers;
use super::record::EventRecord;
use super::strings::StringResolver;
use crate::domain::{DispatchError, HandlerError};

/// Decodes one event slot into a record
pub type HandlerFn = fn(&EventData, &dyn StringResolver) -> Result<EventRecord, HandlerError>;

/// One dispatch table entry
#[derive(Clone, Copy)]
pub struct Handler {
    pub id: EventId,
    pub name: &'static str,
    pub handle: HandlerFn,
}

/// Handlers for every event the probe emits
pub static DEFAULT_HANDLERS: &[Handler] = &[Handler {
    id: SYS_ENTER_EXECVE,
    name: "sys_enter_execve",
    handle: handlers::sys_enter_execve,
}];

/// A record together with the handler that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub handler: &'static str,
    pub record: EventRecord,
}

/// Stateless router from event slots to handlers
#[derive(Clone, Copy)]
pub struct Dispatcher {
    handlers: &'static [Handler],
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLERS)
    }
}

impl Dispatcher {
    #[must_use]
    pub const fn new(handlers: &'static [Handler]) -> Self {
        Self { handlers }
    }

    /// The handler registered for exactly `id`
    #[must_use]
    pub fn lookup(&self, id: EventId) -> Option<&'static Handler> {
        self.handlers.iter().find(|handler| handler.id == id)
    }

    /// Route `data` to the handler for its header id
    ///
    /// # Errors
    /// - [`DispatchError::UnknownEvent`] if no handler matches the header id
    /// - [`DispatchError::Handler`] if the handler fails
    pub fn dispatch(
        &self,
        data: &EventData,
        strings: &dyn StringResolver,
    ) -> Result<Dispatched, DispatchError> {
        let id = data.header.event_id();
        let handler = self.lookup(id).ok_or(DispatchError::UnknownEvent(id))?;
        let record = (handler.handle)(data, strings)?;
        Ok(Dispatched { handler: handler.name, record })
    }
}
