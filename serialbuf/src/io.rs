//! `std::io` adapters for [`SerialBuffer`].
//!
//! Reads come out of the ring, writes go straight to the port. Both report
//! `WouldBlock` instead of `Ok(0)` when nothing could move, since `Ok(0)`
//! means end of stream to `std::io` callers.

use std::io::{self, Read, Write};

use crate::channel::SerialBuffer;
use crate::transport::Transport;

impl<T: Transport + 'static> Read for SerialBuffer<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.read_into(buf) {
            0 => Err(io::ErrorKind::WouldBlock.into()),
            n => Ok(n),
        }
    }
}

impl<T: Transport + 'static> Write for SerialBuffer<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        for &byte in buf {
            if SerialBuffer::write(self, byte) == 0 {
                break;
            }
            written += 1;
        }

        if written == 0 {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        SerialBuffer::flush(self);
        Ok(())
    }
}
