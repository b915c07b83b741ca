use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use super::Transport;

/// Receive FIFO depth of a typical UART.
const DEFAULT_RX_FIFO: usize = 64;

/// An in-memory serial port for testing.
///
/// Bytes arrive through [`inject`](Self::inject) (the remote end talking)
/// and sit in a receive FIFO of bounded depth, like a UART's hardware FIFO.
/// Whatever does not fit is lost and counted. Written bytes are recorded,
/// and with [`with_loopback`](Self::with_loopback) they are also fed back
/// into the receive FIFO, like a TX/RX jumper.
#[derive(Debug)]
pub struct LoopbackTransport {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    rx: VecDeque<u8>,
    rx_depth: usize,
    rx_lost: usize,
    tx: Vec<u8>,
    tx_window: usize,
    loopback: bool,
    flushes: usize,
}

impl Inner {
    fn receive(&mut self, byte: u8) -> bool {
        if self.rx.len() >= self.rx_depth {
            self.rx_lost += 1;
            return false;
        }
        self.rx.push_back(byte);
        true
    }
}

impl LoopbackTransport {
    /// Creates a port with a 64 byte receive FIFO and no loopback.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                rx: VecDeque::new(),
                rx_depth: DEFAULT_RX_FIFO,
                rx_lost: 0,
                tx: Vec::new(),
                tx_window: usize::MAX,
                loopback: false,
                flushes: 0,
            }),
        }
    }

    /// Sets the receive FIFO depth.
    pub fn with_rx_fifo(self, depth: usize) -> Self {
        self.lock().rx_depth = depth;
        self
    }

    /// Limits how many bytes `available_for_write` reports.
    pub fn with_tx_window(self, window: usize) -> Self {
        self.lock().tx_window = window;
        self
    }

    /// Feeds written bytes back into the receive FIFO.
    pub fn with_loopback(self, enabled: bool) -> Self {
        self.lock().loopback = enabled;
        self
    }

    /// Delivers bytes from the remote end, returning how many fit in the FIFO.
    pub fn inject(&self, data: &[u8]) -> usize {
        let mut inner = self.lock();
        let mut accepted = 0;
        for &byte in data {
            if inner.receive(byte) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Returns the number of bytes waiting in the receive FIFO.
    pub fn pending(&self) -> usize {
        self.lock().rx.len()
    }

    /// Returns the number of bytes dropped by a full receive FIFO.
    pub fn rx_lost(&self) -> usize {
        self.lock().rx_lost
    }

    /// Returns and clears the transmit log.
    pub fn take_written(&self) -> Vec<u8> {
        core::mem::take(&mut self.lock().tx)
    }

    /// Returns how many times `flush` was called.
    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn read_byte(&self) -> Option<u8> {
        self.lock().rx.pop_front()
    }

    fn available_for_write(&self) -> usize {
        self.lock().tx_window
    }

    fn write_byte(&self, byte: u8) -> usize {
        let mut inner = self.lock();
        if inner.tx_window == 0 {
            return 0;
        }
        inner.tx.push(byte);
        if inner.loopback {
            inner.receive(byte);
        }
        1
    }

    fn flush(&self) {
        self.lock().flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_depth_drops_excess() {
        let port = LoopbackTransport::new().with_rx_fifo(4);

        assert_eq!(port.inject(b"abcdef"), 4);
        assert_eq!(port.pending(), 4);
        assert_eq!(port.rx_lost(), 2);

        assert_eq!(port.read_byte(), Some(b'a'));
        assert_eq!(port.inject(b"g"), 1);
        assert_eq!(port.rx_lost(), 2);
    }

    #[test]
    fn test_loopback_echoes_writes() {
        let port = LoopbackTransport::new().with_loopback(true);

        assert_eq!(port.write_byte(0x55), 1);
        assert_eq!(port.read_byte(), Some(0x55));
        assert_eq!(port.take_written(), vec![0x55]);
        assert!(port.take_written().is_empty());
    }

    #[test]
    fn test_closed_tx_window_rejects_writes() {
        let port = LoopbackTransport::new().with_tx_window(0);

        assert_eq!(port.available_for_write(), 0);
        assert_eq!(port.write_byte(1), 0);
        assert!(port.take_written().is_empty());
    }
}
