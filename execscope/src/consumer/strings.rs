//! Consumer-side string resolution
//!
//! A string slot holds whatever the producer copied: a terminated string, or
//! exactly [`STRING_BUFFER_SIZE`] bytes with no terminator when the source was
//! truncated. Bytes after the first NUL are leftovers from earlier writes and
//! are ignored.

use execscope_common::{ExternalIndex, StringData, STRING_BUFFER_SIZE};

use crate::domain::{CpuId, ResolveError};
use crate::store::SlotReader;

/// Turns interned string references back into strings
pub trait StringResolver {
    /// Raw bytes of the string up to (not including) its terminator
    ///
    /// # Errors
    /// Returns [`ResolveError`] if the referenced slot cannot be read
    fn resolve_bytes(&self, index: ExternalIndex) -> Result<Vec<u8>, ResolveError>;

    /// The string with invalid UTF-8 replaced by U+FFFD
    ///
    /// # Errors
    /// Returns [`ResolveError`] if the referenced slot cannot be read
    fn resolve(&self, index: ExternalIndex) -> Result<String, ResolveError> {
        self.resolve_bytes(index).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Length of the string in `buffer`: up to the first NUL, or the whole buffer
#[must_use]
pub fn terminated_len(buffer: &[u8]) -> usize {
    buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len())
}

/// [`StringResolver`] over a per-CPU string store
pub struct StringTable<S> {
    store: S,
}

impl<S: SlotReader<StringData>> StringTable<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: SlotReader<StringData>> StringResolver for StringTable<S> {
    fn resolve_bytes(&self, index: ExternalIndex) -> Result<Vec<u8>, ResolveError> {
        let (cpu, slot) = index.split();
        let data = self
            .store
            .read_slot(CpuId(cpu), slot)
            .map_err(|source| ResolveError { index, source })?;

        let len = terminated_len(&data.buffer).min(STRING_BUFFER_SIZE);
        Ok(data.buffer[..len].to_vec())
    }
}
