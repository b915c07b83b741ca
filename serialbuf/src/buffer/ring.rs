//! Lock-free single-producer/single-consumer byte ring.
//!
//! A [`RingBuffer`] is split once into a [`Producer`] and a [`Consumer`].
//! Each handle stores exactly one index: the producer owns the write
//! position, the consumer owns the read position, and each only loads the
//! other's. Neither handle is `Clone`, so a second writer or reader cannot be
//! created.
//!
//! Positions run over `0..2 * capacity` and map onto slot `position % capacity`.
//! The extra lap bit is what tells a full buffer (`tail - head == capacity`)
//! from an empty one (`tail == head`), so every one of the `capacity` slots is
//! usable.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::error::{Error, ErrorKind, Result};

#[derive(Debug)]
struct Shared {
    slots: Box<[AtomicU8]>,

    /// Twice the capacity. Positions live in `0..span`.
    span: usize,

    /// Next position to read. Stored only by the consumer.
    head: AtomicUsize,

    /// Next position to write. Stored only by the producer.
    tail: AtomicUsize,
}

impl Shared {
    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, pos: usize) -> &AtomicU8 {
        let capacity = self.capacity();
        let index = if pos >= capacity { pos - capacity } else { pos };
        &self.slots[index]
    }

    #[inline]
    fn next(&self, pos: usize) -> usize {
        let next = pos + 1;
        if next == self.span { 0 } else { next }
    }

    /// Number of committed, unread bytes between `head` and `tail`.
    #[inline]
    fn distance(&self, head: usize, tail: usize) -> usize {
        if tail >= head {
            tail - head
        } else {
            self.span - head + tail
        }
    }
}

/// A fixed-capacity byte ring, not yet split into its two roles.
#[derive(Debug)]
pub struct RingBuffer {
    shared: Arc<Shared>,
}

impl RingBuffer {
    /// Allocates a ring holding up to `capacity` unread bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::new(ErrorKind::ZeroCapacity));
        }
        let span = capacity
            .checked_mul(2)
            .ok_or(Error::new(ErrorKind::CapacityTooLarge))?;

        let slots = (0..capacity).map(|_| AtomicU8::new(0)).collect();

        Ok(Self {
            shared: Arc::new(Shared {
                slots,
                span,
                head: AtomicUsize::new(0),
                tail: AtomicUsize::new(0),
            }),
        })
    }

    /// Returns the buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Splits the ring into its writing and reading halves.
    pub fn split(self) -> (Producer, Consumer) {
        let producer = Producer {
            shared: Arc::clone(&self.shared),
        };
        let consumer = Consumer {
            shared: self.shared,
        };
        (producer, consumer)
    }
}

/// The writing half. Only this handle advances the write position.
#[derive(Debug)]
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Returns the buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the number of bytes that can be committed right now.
    pub fn available_for_write(&self) -> usize {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);
        self.shared.capacity() - self.shared.distance(head, tail)
    }

    /// Returns true if the next reservation would fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.available_for_write() == 0
    }

    /// Reserves the slot at the write position.
    ///
    /// Returns `None` when `capacity` bytes are unread. Nothing becomes
    /// visible to the consumer until [`WriteSlot::commit`] is called; a slot
    /// dropped without committing leaves the ring unchanged.
    pub fn try_reserve(&mut self) -> Option<WriteSlot<'_>> {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);

        if self.shared.distance(head, tail) >= self.shared.capacity() {
            return None;
        }

        Some(WriteSlot {
            shared: &*self.shared,
            pos: tail,
        })
    }

    /// Reserves, stores and commits a single byte.
    ///
    /// Hands the byte back if the ring is full.
    pub fn try_push(&mut self, byte: u8) -> core::result::Result<(), u8> {
        match self.try_reserve() {
            Some(mut slot) => {
                slot.set(byte);
                slot.commit();
                Ok(())
            }
            None => Err(byte),
        }
    }
}

/// A reserved, not yet published slot.
///
/// Holding one keeps the producer mutably borrowed, so there is at most one
/// outstanding reservation and it is committed at most once.
#[derive(Debug)]
#[must_use = "a reserved slot publishes nothing until committed"]
pub struct WriteSlot<'a> {
    shared: &'a Shared,
    pos: usize,
}

impl WriteSlot<'_> {
    /// Stores `byte` into the slot.
    #[inline]
    pub fn set(&mut self, byte: u8) {
        self.shared.slot(self.pos).store(byte, Ordering::Relaxed);
    }

    /// Returns the byte currently held by the slot.
    #[inline]
    pub fn get(&self) -> u8 {
        self.shared.slot(self.pos).load(Ordering::Relaxed)
    }

    /// Advances the write position, making the slot readable.
    pub fn commit(self) {
        let next = self.shared.next(self.pos);
        self.shared.tail.store(next, Ordering::Release);
    }
}

/// The reading half. Only this handle advances the read position.
#[derive(Debug)]
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    /// Returns the buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the number of unread bytes.
    pub fn available(&self) -> usize {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);
        self.shared.distance(head, tail)
    }

    /// Returns true if there is nothing to read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Pops the oldest unread byte.
    pub fn try_read(&mut self) -> Option<u8> {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let byte = self.shared.slot(head).load(Ordering::Relaxed);
        self.shared.head.store(self.shared.next(head), Ordering::Release);
        Some(byte)
    }

    /// Returns the oldest unread byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        Some(self.shared.slot(head).load(Ordering::Relaxed))
    }

    /// Pops up to `buf.len()` bytes, returning how many were copied.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for out in buf.iter_mut() {
            match self.try_read() {
                Some(byte) => {
                    *out = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Discards every unread byte.
    ///
    /// Only the read position moves, so a reservation the producer holds
    /// while this runs stays valid and its byte is delivered once committed.
    pub fn clear(&mut self) {
        let tail = self.shared.tail.load(Ordering::Acquire);
        self.shared.head.store(tail, Ordering::Release);
    }
}
