//! Serial transport abstraction.
//!
//! This module provides the `Transport` trait the buffer drains from and
//! writes through. The buffer never opens, configures or owns the port; it
//! only needs four non-blocking-ish primitives.
//!
//! # Implementations
//!
//! - `NullTransport`: Never receives, counts written bytes
//! - `LoopbackTransport`: In-memory port with a bounded receive FIFO (requires `std` feature)
//! - `StdTransport`: Wraps non-blocking std::io Read/Write types (requires `std` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use serialbuf::transport::{LoopbackTransport, Transport};
//!
//! let port = LoopbackTransport::new();
//! port.inject(b"AT\r\n");
//!
//! assert_eq!(port.read_byte(), Some(b'A'));
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

/// The hardware side of a buffered serial channel.
///
/// Methods take `&self` because the same port is used concurrently by the
/// drain task (receive direction) and by the application (transmit
/// direction). Implementations provide whatever interior synchronisation
/// the hardware needs.
pub trait Transport: Send + Sync {
    /// Returns the next received byte, or `None` if the receive FIFO is empty.
    ///
    /// Must not block.
    fn read_byte(&self) -> Option<u8>;

    /// Returns how many bytes can be written without blocking.
    fn available_for_write(&self) -> usize;

    /// Writes one byte, returning the number of bytes accepted (0 or 1).
    fn write_byte(&self, byte: u8) -> usize;

    /// Blocks until every pending byte has been transmitted.
    fn flush(&self);
}

impl<T: Transport + ?Sized> Transport for alloc::sync::Arc<T> {
    fn read_byte(&self) -> Option<u8> {
        (**self).read_byte()
    }

    fn available_for_write(&self) -> usize {
        (**self).available_for_write()
    }

    fn write_byte(&self, byte: u8) -> usize {
        (**self).write_byte(byte)
    }

    fn flush(&self) {
        (**self).flush()
    }
}

/// A null transport that discards all writes and returns nothing.
///
/// Useful for testing or measuring overhead.
#[derive(Debug, Default)]
pub struct NullTransport {
    bytes_written: AtomicUsize,
}

impl NullTransport {
    /// Creates a new null transport.
    pub fn new() -> Self {
        Self {
            bytes_written: AtomicUsize::new(0),
        }
    }

    /// Returns the total number of bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Resets the byte counter.
    pub fn reset(&self) {
        self.bytes_written.store(0, Ordering::Relaxed);
    }
}

impl Transport for NullTransport {
    fn read_byte(&self) -> Option<u8> {
        None
    }

    fn available_for_write(&self) -> usize {
        usize::MAX
    }

    fn write_byte(&self, _byte: u8) -> usize {
        self.bytes_written.fetch_add(1, Ordering::Relaxed);
        1
    }

    fn flush(&self) {}
}

#[cfg(feature = "std")]
mod loopback;
#[cfg(feature = "std")]
mod stdio;

#[cfg(feature = "std")]
pub use loopback::LoopbackTransport;
#[cfg(feature = "std")]
pub use stdio::StdTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_transport() {
        let transport = NullTransport::new();

        for byte in b"Test data" {
            assert_eq!(transport.write_byte(*byte), 1);
        }
        assert_eq!(transport.bytes_written(), 9);
        assert_eq!(transport.read_byte(), None);

        transport.reset();
        assert_eq!(transport.bytes_written(), 0);
    }

    #[test]
    fn test_arc_forwards() {
        let transport = alloc::sync::Arc::new(NullTransport::new());
        let shared = alloc::sync::Arc::clone(&transport);

        shared.write_byte(1);
        shared.flush();
        assert_eq!(transport.bytes_written(), 1);
    }
}
