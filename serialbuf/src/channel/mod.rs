//! Buffered serial channel.
//!
//! This module ties a [`Transport`] to a ring buffer: a background drain
//! task fills the ring from the port's receive FIFO, the application reads
//! from the ring at its own pace. The transmit direction is not buffered.

mod drain;

pub use drain::{BurstOutcome, BurstStop, DrainStats, DrainTask};

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::time::Duration;

use log::debug;

use crate::buffer::{Consumer, Producer, RingBuffer};
use crate::config::SerialBufferConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::transport::Transport;
use drain::DrainCounters;

/// Channel activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Built, drain task not started. Reads return `None`.
    Constructed,

    /// Drain task running.
    Active,

    /// The scheduler refused the drain task. Reads return `None`.
    Faulted,
}

enum Drain {
    Pending(Producer),
    Running(Box<dyn TaskHandle>),
    Faulted,
}

/// A serial port whose receive direction is buffered by a background task.
///
/// Construction and activation are separate steps: a channel can be built
/// as part of static setup, before any scheduler exists, and started later
/// with [`activate`](Self::activate). Every operation is valid in either
/// state; before activation there is simply nothing to read.
///
/// Only one consumer exists per channel: reading methods take `&mut self`.
/// The port must not be read by anyone else while the channel is active,
/// since the drain task is its only receiver.
pub struct SerialBuffer<T> {
    consumer: Consumer,
    port: Arc<T>,
    drain: Drain,
    counters: Arc<DrainCounters>,
    task_name: &'static str,
    timeout: Duration,
}

impl<T> SerialBuffer<T> {
    /// Returns the activation state.
    pub fn state(&self) -> ChannelState {
        match self.drain {
            Drain::Pending(_) => ChannelState::Constructed,
            Drain::Running(_) => ChannelState::Active,
            Drain::Faulted => ChannelState::Faulted,
        }
    }
}

impl<T: Transport + 'static> SerialBuffer<T> {
    /// Creates a channel with a ring of `config.capacity` bytes over `port`.
    pub fn new(port: Arc<T>, config: &SerialBufferConfig) -> Result<Self> {
        let (producer, consumer) = RingBuffer::new(config.capacity)?.split();

        Ok(Self {
            consumer,
            port,
            drain: Drain::Pending(producer),
            counters: Arc::new(DrainCounters::default()),
            task_name: config.task_name,
            timeout: config.timeout,
        })
    }

    /// Starts the drain task on `scheduler`.
    ///
    /// Must be called once the scheduler is up. Activation is one-way: a
    /// second call returns [`ErrorKind::AlreadyActive`] and leaves the
    /// running task alone. If the scheduler fails to spawn, the channel
    /// becomes [`ChannelState::Faulted`] and cannot be activated again.
    pub fn activate<S: Scheduler + ?Sized>(&mut self, scheduler: &S) -> Result<()> {
        let producer = match core::mem::replace(&mut self.drain, Drain::Faulted) {
            Drain::Pending(producer) => producer,
            Drain::Running(handle) => {
                self.drain = Drain::Running(handle);
                return Err(Error::new(ErrorKind::AlreadyActive));
            }
            Drain::Faulted => return Err(Error::new(ErrorKind::Faulted)),
        };

        let mut task = DrainTask::new(producer, Arc::clone(&self.port), Arc::clone(&self.counters));
        let handle = scheduler.spawn(self.task_name, move || task.step())?;

        debug!(
            "serial buffer activated: task={} capacity={}",
            self.task_name,
            self.consumer.capacity()
        );
        self.drain = Drain::Running(handle);
        Ok(())
    }

    /// Returns true while the drain task is running.
    pub fn is_drain_alive(&self) -> bool {
        match &self.drain {
            Drain::Running(handle) => !handle.is_finished(),
            _ => false,
        }
    }

    /// Returns the ring capacity.
    pub fn capacity(&self) -> usize {
        self.consumer.capacity()
    }

    /// Returns the number of buffered bytes.
    pub fn available(&self) -> usize {
        self.consumer.available()
    }

    /// Returns how many bytes the port can accept without blocking.
    pub fn available_for_write(&self) -> usize {
        self.port.available_for_write()
    }

    /// Pops the next buffered byte, or `None` if nothing has arrived.
    pub fn read(&mut self) -> Option<u8> {
        self.consumer.try_read()
    }

    /// Returns the next buffered byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.consumer.peek()
    }

    /// Pops up to `buf.len()` buffered bytes.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.consumer.read_into(buf)
    }

    /// Discards everything buffered so far.
    pub fn clear(&mut self) {
        self.consumer.clear();
    }

    /// Blocks until the port has transmitted everything written.
    pub fn flush(&self) {
        self.port.flush();
    }

    /// Writes one byte straight to the port.
    pub fn write(&self, byte: u8) -> usize {
        self.port.write_byte(byte)
    }

    /// Returns the underlying port.
    pub fn port(&self) -> &Arc<T> {
        &self.port
    }

    /// Returns a snapshot of the drain statistics.
    pub fn stats(&self) -> DrainStats {
        self.counters.snapshot()
    }

    /// Returns the timeout used by the timed stream helpers.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the timeout used by the timed stream helpers.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for SerialBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialBuffer")
            .field("port", &self.port)
            .field("state", &self.state())
            .field("available", &self.consumer.available())
            .field("capacity", &self.consumer.capacity())
            .finish()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::scheduler::{CooperativeScheduler, Step};
    use crate::transport::{LoopbackTransport, NullTransport};

    struct FailingScheduler;

    impl Scheduler for FailingScheduler {
        fn spawn<F>(&self, _name: &str, _work: F) -> Result<Box<dyn TaskHandle>>
        where
            F: FnMut() -> Step + Send + 'static,
        {
            Err(Error::new(ErrorKind::Spawn))
        }
    }

    fn channel(
        capacity: usize,
        port: LoopbackTransport,
    ) -> (SerialBuffer<LoopbackTransport>, Arc<LoopbackTransport>) {
        let port = Arc::new(port);
        let config = SerialBufferConfig::new().with_capacity(capacity);
        let serial = SerialBuffer::new(Arc::clone(&port), &config).unwrap();
        (serial, port)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = SerialBufferConfig::new().with_capacity(0);
        let err = SerialBuffer::new(Arc::new(NullTransport::new()), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroCapacity);
    }

    #[test]
    fn test_nothing_to_read_before_activation() {
        let (mut serial, port) = channel(16, LoopbackTransport::new());
        port.inject(b"early");

        assert_eq!(serial.state(), ChannelState::Constructed);
        assert!(!serial.is_drain_alive());
        assert_eq!(serial.available(), 0);
        assert_eq!(serial.read(), None);
        assert_eq!(serial.peek(), None);
        assert_eq!(port.pending(), 5);
    }

    #[test]
    fn test_drains_full_byte_range_in_order() {
        let (mut serial, port) = channel(256, LoopbackTransport::new().with_rx_fifo(256));
        let scheduler = CooperativeScheduler::new();
        serial.activate(&scheduler).unwrap();

        let sequence: Vec<u8> = (0..=255).collect();
        assert_eq!(port.inject(&sequence), 256);
        scheduler.run_until_idle(16);

        assert_eq!(serial.available(), 256);
        for expected in 0..=255u8 {
            assert_eq!(serial.read(), Some(expected));
        }
        assert_eq!(serial.read(), None);
        assert_eq!(port.rx_lost(), 0);
    }

    #[test]
    fn test_drains_across_many_turns() {
        // A small FIFO refilled between turns, as a real UART would be
        let (mut serial, port) = channel(256, LoopbackTransport::new().with_rx_fifo(8));
        let scheduler = CooperativeScheduler::new();
        serial.activate(&scheduler).unwrap();

        for chunk in (0..=255u8).collect::<Vec<_>>().chunks(8) {
            assert_eq!(port.inject(chunk), chunk.len());
            scheduler.run_turn();
        }

        let mut out = [0u8; 300];
        let n = serial.read_into(&mut out);
        assert_eq!(n, 256);
        assert!(out[..n].iter().enumerate().all(|(i, &b)| b == i as u8));
        assert_eq!(serial.stats().bytes_drained, 256);
    }

    #[test]
    fn test_full_ring_leaves_bytes_in_port() {
        let (mut serial, port) = channel(4, LoopbackTransport::new());
        let scheduler = CooperativeScheduler::new();
        serial.activate(&scheduler).unwrap();

        port.inject(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        scheduler.run_turn();

        assert_eq!(serial.available(), 4);
        assert_eq!(port.pending(), 6);
        let stats = serial.stats();
        assert_eq!(stats.buffer_full, 1);
        assert_eq!(stats.bytes_drained, 4);

        let mut out = [0u8; 4];
        assert_eq!(serial.read_into(&mut out), 4);
        assert_eq!(out, [1, 2, 3, 4]);

        scheduler.run_turn();
        assert_eq!(serial.read_into(&mut out), 4);
        assert_eq!(out, [5, 6, 7, 8]);
    }

    #[test]
    fn test_port_fifo_overflow_loses_bytes() {
        let (mut serial, port) = channel(64, LoopbackTransport::new().with_rx_fifo(2));
        let scheduler = CooperativeScheduler::new();
        serial.activate(&scheduler).unwrap();

        assert_eq!(port.inject(&[1, 2, 3, 4, 5]), 2);
        scheduler.run_turn();

        assert_eq!(port.rx_lost(), 3);
        assert_eq!(serial.read(), Some(1));
        assert_eq!(serial.read(), Some(2));
        assert_eq!(serial.read(), None);
    }

    #[test]
    fn test_clear_resynchronises() {
        let (mut serial, port) = channel(8, LoopbackTransport::new());
        let scheduler = CooperativeScheduler::new();
        serial.activate(&scheduler).unwrap();

        port.inject(&[9, 9, 9]);
        scheduler.run_turn();
        assert_eq!(serial.available(), 3);

        serial.clear();
        assert_eq!(serial.available(), 0);

        port.inject(&[0x7E, 0x01]);
        scheduler.run_turn();
        assert_eq!(serial.peek(), Some(0x7E));
        assert_eq!(serial.read(), Some(0x7E));
        assert_eq!(serial.read(), Some(0x01));
    }

    #[test]
    fn test_activate_twice_rejected() {
        let (mut serial, _port) = channel(8, LoopbackTransport::new());
        let scheduler = CooperativeScheduler::new();

        serial.activate(&scheduler).unwrap();
        let err = serial.activate(&scheduler).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyActive);
        assert_eq!(serial.state(), ChannelState::Active);
        assert!(serial.is_drain_alive());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_spawn_failure_faults_channel() {
        let (mut serial, port) = channel(8, LoopbackTransport::new());

        let err = serial.activate(&FailingScheduler).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Spawn);
        assert_eq!(serial.state(), ChannelState::Faulted);

        port.inject(b"x");
        assert_eq!(serial.read(), None);

        let err = serial.activate(&CooperativeScheduler::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Faulted);
    }

    #[test]
    fn test_writes_bypass_ring() {
        let (mut serial, port) = channel(8, LoopbackTransport::new().with_tx_window(32));

        assert_eq!(serial.available_for_write(), 32);
        assert_eq!(serial.write(b'O'), 1);
        assert_eq!(serial.write(b'K'), 1);
        serial.flush();

        assert_eq!(port.take_written(), b"OK");
        assert_eq!(port.flushes(), 1);
        assert_eq!(serial.available(), 0);
        assert_eq!(serial.read(), None);
    }

    #[test]
    fn test_task_named_from_config() {
        let port = Arc::new(LoopbackTransport::new());
        let config = SerialBufferConfig::new().with_task_name("uart1-rx");
        let mut serial = SerialBuffer::new(port, &config).unwrap();
        let scheduler = CooperativeScheduler::new();

        serial.activate(&scheduler).unwrap();
        assert_eq!(scheduler.task_names(), vec!["uart1-rx"]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_thread_drain_delivers_in_order() {
        use crate::scheduler::ThreadScheduler;
        use std::time::{Duration, Instant};

        let (mut serial, port) = channel(1024, LoopbackTransport::new().with_rx_fifo(1024));
        let scheduler = ThreadScheduler::new().with_idle_backoff(Duration::from_micros(100));
        serial.activate(&scheduler).unwrap();
        assert!(serial.is_drain_alive());

        let sequence: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
        let mut sent = 0;
        let mut received = Vec::new();
        let start = Instant::now();

        while received.len() < sequence.len() {
            assert!(start.elapsed() < Duration::from_secs(10), "drain task stalled");
            if sent < sequence.len() {
                let end = (sent + 37).min(sequence.len());
                sent += port.inject(&sequence[sent..end]);
            }
            while let Some(byte) = serial.read() {
                received.push(byte);
            }
            std::thread::yield_now();
        }

        assert_eq!(received, sequence);
    }
}
