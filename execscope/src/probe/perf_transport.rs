//! Perf event array transport
//!
//! The probe publishes each notification as one 4-byte perf sample. The
//! kernel pads raw samples so that size header plus data is 8-byte aligned,
//! which leaves a 4-byte sample unpadded: every record read here is exactly
//! one notification unless something upstream is broken, and the processor
//! rejects it otherwise.

#![allow(unsafe_code)] // poll(2) requires unsafe

use aya::maps::perf::PerfEventArrayBuffer;
use aya::maps::{MapData, PerfEventArray};
use bytes::BytesMut;
use log::debug;
use std::io;
use std::os::fd::{AsFd, AsRawFd};
use std::time::Duration;

use crate::consumer::{Delivery, NotificationTransport, NOTIFICATION_SIZE};
use crate::domain::{CpuId, TransportError};

/// Records drained per `read_events` call
const SCRATCH_BUFFERS: usize = 32;

/// Per-CPU perf buffers of the `EVENTS` map
pub struct PerfTransport {
    // Keeps the map open for the lifetime of the buffers
    _events: PerfEventArray<MapData>,
    buffers: Vec<(CpuId, PerfEventArrayBuffer<MapData>)>,
    scratch: Vec<BytesMut>,
}

impl PerfTransport {
    /// Open one buffer per CPU in `cpus`
    ///
    /// # Errors
    /// Returns [`TransportError::PerfBuffer`] if a buffer cannot be opened
    pub fn open(
        mut events: PerfEventArray<MapData>,
        cpus: &[CpuId],
        pages: Option<usize>,
    ) -> Result<Self, TransportError> {
        let mut buffers = Vec::with_capacity(cpus.len());
        for &cpu in cpus {
            buffers.push((cpu, events.open(cpu.0, pages)?));
        }
        let scratch =
            (0..SCRATCH_BUFFERS).map(|_| BytesMut::with_capacity(NOTIFICATION_SIZE)).collect();

        Ok(Self { _events: events, buffers, scratch })
    }

    fn wait(&self, timeout: Duration) -> Result<Vec<bool>, TransportError> {
        let mut fds: Vec<libc::pollfd> = self
            .buffers
            .iter()
            .map(|(_, buffer)| libc::pollfd {
                fd: buffer.as_fd().as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        #[allow(clippy::cast_possible_truncation)]
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            // A signal (Ctrl+C) woke us up; the loop checks cancellation next
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(vec![false; fds.len()]);
            }
            return Err(TransportError::Poll(err));
        }

        Ok(fds.iter().map(|fd| fd.revents & libc::POLLIN != 0).collect())
    }
}

impl NotificationTransport for PerfTransport {
    fn poll(
        &mut self,
        timeout: Duration,
        deliver: &mut dyn FnMut(Delivery<'_>),
    ) -> Result<(), TransportError> {
        let ready = self.wait(timeout)?;

        for ((cpu, buffer), _) in self.buffers.iter_mut().zip(ready).filter(|(_, ready)| *ready) {
            while buffer.readable() {
                let events = buffer.read_events(&mut self.scratch)?;
                if events.lost > 0 {
                    debug!("{cpu}: perf buffer overflowed, {} samples lost", events.lost);
                    deliver(Delivery::Lost(events.lost as u64));
                }
                for record in &mut self.scratch[..events.read] {
                    deliver(Delivery::Batch(&record[..]));
                    record.clear();
                }
                if events.read == 0 && events.lost == 0 {
                    break;
                }
            }
        }
        Ok(())
    }
}
