//! Timed byte-stream helpers.
//!
//! The channel itself never blocks on reads. Waiting for data is layered on
//! top here: every helper polls, yields, and gives up once the stream's
//! timeout has elapsed since the helper was entered.

use std::thread;
use std::time::{Duration, Instant};

use crate::channel::SerialBuffer;
use crate::transport::Transport;

/// A polled byte source with a read timeout.
pub trait Stream {
    /// Returns the number of bytes readable right now.
    fn available(&self) -> usize;

    /// Pops the next byte if one is ready.
    fn read(&mut self) -> Option<u8>;

    /// Returns the next byte without consuming it, if one is ready.
    fn peek(&self) -> Option<u8>;

    /// How long the timed helpers wait for data.
    fn timeout(&self) -> Duration;

    /// Waits up to the timeout for a byte.
    fn timed_read(&mut self) -> Option<u8> {
        let start = Instant::now();
        loop {
            if let Some(byte) = self.read() {
                return Some(byte);
            }
            if start.elapsed() >= self.timeout() {
                return None;
            }
            thread::yield_now();
        }
    }

    /// Waits up to the timeout for a byte to peek at.
    fn timed_peek(&self) -> Option<u8> {
        let start = Instant::now();
        loop {
            if let Some(byte) = self.peek() {
                return Some(byte);
            }
            if start.elapsed() >= self.timeout() {
                return None;
            }
            thread::yield_now();
        }
    }

    /// Fills `buf`, waiting up to the timeout for each byte.
    ///
    /// Returns the number of bytes stored; less than `buf.len()` means a
    /// timeout.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        while count < buf.len() {
            match self.timed_read() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Like [`read_bytes`](Self::read_bytes), but also stops at `terminator`.
    ///
    /// The terminator is consumed and not stored.
    fn read_bytes_until(&mut self, terminator: u8, buf: &mut [u8]) -> usize {
        let mut count = 0;
        while count < buf.len() {
            match self.timed_read() {
                Some(byte) if byte == terminator => break,
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Consumes bytes until `target` has been read, or the timeout hits.
    ///
    /// An empty target is found immediately.
    fn find(&mut self, target: &[u8]) -> bool {
        if target.is_empty() {
            return true;
        }

        let mut matched = 0;
        while let Some(byte) = self.timed_read() {
            matched = if byte == target[matched] {
                matched + 1
            } else {
                restart_len(target, matched, byte)
            };
            if matched == target.len() {
                return true;
            }
        }
        false
    }
}

/// After reading `target[..matched]` then a mismatching `byte`, returns the
/// longest prefix of `target` that the input read so far ends with.
fn restart_len(target: &[u8], matched: usize, byte: u8) -> usize {
    (1..=matched)
        .rev()
        .find(|&k| target[k - 1] == byte && target[..k - 1] == target[matched + 1 - k..matched])
        .unwrap_or(0)
}

impl<T: Transport + 'static> Stream for SerialBuffer<T> {
    fn available(&self) -> usize {
        SerialBuffer::available(self)
    }

    fn read(&mut self) -> Option<u8> {
        SerialBuffer::read(self)
    }

    fn peek(&self) -> Option<u8> {
        SerialBuffer::peek(self)
    }

    fn timeout(&self) -> Duration {
        SerialBuffer::timeout(self)
    }
}
