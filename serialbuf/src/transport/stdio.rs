use std::io::{self, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::warn;

use super::Transport;

/// Bytes reported by `available_for_write` when the stream gives no hint.
const DEFAULT_WRITE_WINDOW: usize = 64;

/// Wrapper for std::io types.
///
/// The wrapped stream must be in non-blocking mode (for a socket,
/// `set_nonblocking(true)`), otherwise the drain task stalls in `read_byte`.
/// `WouldBlock` is reported as "no byte" or "nothing written"; any other
/// I/O error is logged and reported the same way.
#[derive(Debug)]
pub struct StdTransport<S> {
    inner: Mutex<S>,
    write_window: usize,
}

impl<S> StdTransport<S> {
    /// Creates a new StdTransport wrapping the given stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Mutex::new(inner),
            write_window: DEFAULT_WRITE_WINDOW,
        }
    }

    /// Sets the value reported by `available_for_write`.
    pub fn with_write_window(mut self, window: usize) -> Self {
        self.write_window = window;
        self
    }

    /// Consumes the wrapper and returns the inner stream.
    pub fn into_inner(self) -> S {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Read + Write + Send> Transport for StdTransport<S> {
    fn read_byte(&self) -> Option<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.lock().read(&mut byte) {
                Ok(1) => return Some(byte[0]),
                Ok(_) => return None,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) => {
                    warn!("serial read failed: {}", e);
                    return None;
                }
            }
        }
    }

    fn available_for_write(&self) -> usize {
        self.write_window
    }

    fn write_byte(&self, byte: u8) -> usize {
        loop {
            match self.lock().write(&[byte]) {
                Ok(n) => return n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return 0,
                Err(e) => {
                    warn!("serial write failed: {}", e);
                    return 0;
                }
            }
        }
    }

    fn flush(&self) {
        loop {
            match self.lock().flush() {
                Ok(()) => return,
                Err(e)
                    if e.kind() == io::ErrorKind::Interrupted
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    std::thread::yield_now();
                }
                Err(e) => {
                    warn!("serial flush failed: {}", e);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_until_exhausted() {
        let port = StdTransport::new(Cursor::new(vec![1u8, 2, 3]));

        assert_eq!(port.read_byte(), Some(1));
        assert_eq!(port.read_byte(), Some(2));
        assert_eq!(port.read_byte(), Some(3));
        assert_eq!(port.read_byte(), None);
    }

    #[test]
    fn test_writes_pass_through() {
        let port = StdTransport::new(Cursor::new(Vec::new())).with_write_window(8);

        assert_eq!(port.available_for_write(), 8);
        assert_eq!(port.write_byte(b'x'), 1);
        port.flush();
        assert_eq!(port.into_inner().into_inner(), b"x");
    }
}
