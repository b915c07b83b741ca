//! Receive-side buffering.
//!
//! - RingBuffer: lock-free SPSC byte ring, split into a Producer and a Consumer

mod ring;

pub use ring::{Consumer, Producer, RingBuffer, WriteSlot};
