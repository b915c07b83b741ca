//! The producer side of a buffered serial channel.
//!
//! Handles moving bytes from the port's receive FIFO into the ring.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::trace;

use crate::buffer::Producer;
use crate::scheduler::Step;
use crate::transport::Transport;

/// Why a burst ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstStop {
    /// The ring had no free slot. Unread bytes stay in the port's FIFO.
    BufferFull,

    /// The port had nothing more to deliver.
    PortEmpty,
}

/// Result of one drain burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstOutcome {
    /// Bytes moved into the ring.
    pub stored: usize,

    /// What ended the burst.
    pub stop: BurstStop,
}

/// Statistics about drain activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    /// Bytes moved from the port into the ring.
    pub bytes_drained: usize,

    /// Bursts run.
    pub bursts: usize,

    /// Bursts cut short by a full ring.
    pub buffer_full: usize,
}

#[derive(Debug, Default)]
pub(crate) struct DrainCounters {
    bytes_drained: AtomicUsize,
    bursts: AtomicUsize,
    buffer_full: AtomicUsize,
}

impl DrainCounters {
    fn record(&self, outcome: &BurstOutcome) {
        self.bursts.fetch_add(1, Ordering::Relaxed);
        self.bytes_drained.fetch_add(outcome.stored, Ordering::Relaxed);
        if outcome.stop == BurstStop::BufferFull {
            self.buffer_full.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> DrainStats {
        DrainStats {
            bytes_drained: self.bytes_drained.load(Ordering::Relaxed),
            bursts: self.bursts.load(Ordering::Relaxed),
            buffer_full: self.buffer_full.load(Ordering::Relaxed),
        }
    }
}

/// The drain loop body: owns the ring's producer and polls the port.
///
/// Handed to a [`Scheduler`](crate::scheduler::Scheduler) by
/// [`SerialBuffer::activate`](super::SerialBuffer::activate), which runs
/// [`burst`](Self::burst) forever and yields between bursts.
#[derive(Debug)]
pub struct DrainTask<T> {
    producer: Producer,
    port: Arc<T>,
    counters: Arc<DrainCounters>,
}

impl<T: Transport> DrainTask<T> {
    pub(crate) fn new(producer: Producer, port: Arc<T>, counters: Arc<DrainCounters>) -> Self {
        Self {
            producer,
            port,
            counters,
        }
    }

    /// Moves bytes from the port into the ring until either runs out.
    ///
    /// A slot is reserved before the port is polled, so a full ring never
    /// takes a byte out of the port just to drop it.
    pub fn burst(&mut self) -> BurstOutcome {
        let mut stored = 0;
        let stop = loop {
            let Some(mut slot) = self.producer.try_reserve() else {
                break BurstStop::BufferFull;
            };
            let Some(byte) = self.port.read_byte() else {
                break BurstStop::PortEmpty;
            };
            slot.set(byte);
            slot.commit();
            stored += 1;
        };

        let outcome = BurstOutcome { stored, stop };
        self.counters.record(&outcome);
        if stop == BurstStop::BufferFull {
            trace!("ring full after {} bytes, leaving the rest in the port", stored);
        }
        outcome
    }

    /// Runs one burst and reports it in scheduler terms.
    pub fn step(&mut self) -> Step {
        if self.burst().stored > 0 {
            Step::Progress
        } else {
            Step::Idle
        }
    }
}
