//! Userspace stand-ins for the kernel side of the protocol
//!
//! `FakeProbe` scripts what a traced `execve` would expose to the probe, and
//! `Harness` runs the real producer code against in-memory per-CPU arenas.

#![allow(dead_code)]

use std::cell::RefCell;

use execscope::consumer::{Dispatcher, EventProcessor};
use execscope::domain::CpuId;
use execscope::store::PerCpuArena;
use execscope_common::{
    emit_sys_enter_execve, EventData, ExternalIndex, ProbeEnv, ProducerError, Publisher,
    StringData,
};

const EFAULT: i64 = -14;

/// User memory locations the fake probe knows about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ptr {
    Filename,
    Argv,
    Arg(usize),
}

/// Scripted context of one traced `execve`
#[derive(Clone, Debug, Default)]
pub struct FakeProbe {
    pub cpu: u32,
    pub timestamp: u64,
    pub pid_tgid: u64,
    pub parent_tgid: u64,
    pub uid_gid: u64,
    /// `None` makes the path unreadable
    pub filename: Option<Vec<u8>>,
    pub args: Vec<Vec<u8>>,
    /// Index of an argument whose string cannot be read
    pub unreadable_arg: Option<usize>,
}

impl FakeProbe {
    pub fn execve(path: &str, args: &[&str]) -> Self {
        Self {
            timestamp: 1_000,
            pid_tgid: (4242 << 32) | 4243,
            parent_tgid: 1,
            uid_gid: (100 << 32) | 1000,
            filename: Some(path.as_bytes().to_vec()),
            args: args.iter().map(|arg| arg.as_bytes().to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn on_cpu(mut self, cpu: u32) -> Self {
        self.cpu = cpu;
        self
    }

    /// Bytes behind a string pointer
    fn memory(&self, src: Ptr) -> Result<&[u8], i64> {
        match src {
            Ptr::Filename => self.filename.as_deref().ok_or(EFAULT),
            Ptr::Arg(i) if self.unreadable_arg == Some(i) => Err(EFAULT),
            Ptr::Arg(i) => self.args.get(i).map(Vec::as_slice).ok_or(EFAULT),
            Ptr::Argv => Err(EFAULT),
        }
    }
}

impl ProbeEnv for FakeProbe {
    type Ptr = Ptr;

    fn cpu_id(&self) -> u32 {
        self.cpu
    }

    fn timestamp_ns(&self) -> u64 {
        self.timestamp
    }

    fn pid_tgid(&self) -> u64 {
        self.pid_tgid
    }

    fn parent_tgid(&self) -> u64 {
        self.parent_tgid
    }

    fn uid_gid(&self) -> u64 {
        self.uid_gid
    }

    /// Mirrors `bpf_probe_read_user_str`: at most `dst.len() - 1` bytes, always terminated
    fn read_str(&self, src: Ptr, dst: &mut [u8]) -> Result<usize, i64> {
        let bytes = self.memory(src)?;
        let len = bytes.len().min(dst.len() - 1);
        dst[..len].copy_from_slice(&bytes[..len]);
        dst[len] = 0;
        Ok(len)
    }

    fn read_byte(&self, src: Ptr, offset: usize) -> Result<u8, i64> {
        Ok(self.memory(src)?.get(offset).copied().unwrap_or(0))
    }

    fn read_ptr(&self, array: Ptr, index: usize) -> Result<Option<Ptr>, i64> {
        if array != Ptr::Argv {
            return Err(EFAULT);
        }
        Ok((index < self.args.len()).then_some(Ptr::Arg(index)))
    }
}

/// Collects published notifications in wire format
#[derive(Default)]
pub struct Wire {
    bytes: RefCell<Vec<u8>>,
}

impl Wire {
    /// Everything published since the last call
    pub fn drain(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.borrow_mut())
    }
}

impl Publisher for Wire {
    fn publish(&self, index: ExternalIndex) {
        self.bytes.borrow_mut().extend_from_slice(&index.to_le_bytes());
    }
}

/// Producer and consumer sharing in-memory stores
pub struct Harness {
    pub events: PerCpuArena<EventData>,
    pub strings: PerCpuArena<StringData>,
    pub wire: Wire,
}

impl Harness {
    pub fn new(cpus: u32, event_capacity: u32, string_capacity: u32) -> Self {
        Self {
            events: PerCpuArena::new(cpus, event_capacity),
            strings: PerCpuArena::new(cpus, string_capacity),
            wire: Wire::default(),
        }
    }

    /// Run the producer for one traced `execve`
    pub fn emit(&mut self, probe: &FakeProbe) -> Result<ExternalIndex, ProducerError> {
        let cpu = CpuId(probe.cpu);
        let events = self.events.cpu_mut(cpu).expect("probe CPU has an event store");
        let strings = self.strings.cpu_mut(cpu).expect("probe CPU has a string store");
        emit_sys_enter_execve(probe, events, strings, &self.wire, Ptr::Filename, Ptr::Argv)
    }

    pub fn processor(
        &self,
    ) -> EventProcessor<&PerCpuArena<EventData>, &PerCpuArena<StringData>> {
        EventProcessor::new(&self.events, &self.strings)
    }

    pub fn processor_with(
        &self,
        dispatcher: Dispatcher,
    ) -> EventProcessor<&PerCpuArena<EventData>, &PerCpuArena<StringData>> {
        EventProcessor::with_dispatcher(&self.events, &self.strings, dispatcher)
    }
}
