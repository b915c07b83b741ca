//! # SerialBuf - A Buffered Serial Receiver
//!
//! SerialBuf decouples a serial port's receive FIFO from the code that reads
//! it, so bytes are not dropped while the application is busy:
//!
//! - **Lock-free SPSC ring**: one producer, one consumer, atomics only
//! - **Background drain task**: empties the port FIFO in bursts, then yields
//! - **Deferred activation**: build early, start once the scheduler is up
//! - **Pluggable scheduling**: cooperative, OS thread or tokio task
//! - **Custom transport support**: Works with any port implementing `Transport`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │        read / peek / available / clear   write / flush   │
//! ├──────────────────────────────────────────────┬──────────┤
//! │                 Buffer Layer                 │          │
//! │  ┌──────────┐   ┌─────────────┐   ┌───────┐  │ passthru │
//! │  │ Consumer │◄──│ Ring Buffer │◄──│ Drain │  │          │
//! │  └──────────┘   └─────────────┘   └───▲───┘  │          │
//! ├───────────────────────────────────────┼──────┴──────────┤
//! │                    Transport Layer    │                  │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │          Serial port (read_byte/write_byte)      │   │
//! │  └─────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serialbuf::{SerialBuffer, SerialBufferConfig};
//! use serialbuf::scheduler::ThreadScheduler;
//!
//! let mut serial = SerialBuffer::new(Arc::new(port), &SerialBufferConfig::default())?;
//!
//! // Later, once threads can be spawned
//! serial.activate(&ThreadScheduler::new())?;
//!
//! while let Some(byte) = serial.read() {
//!     handle(byte);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod transport;

#[cfg(feature = "std")]
pub mod io;
#[cfg(feature = "std")]
pub mod stream;

// Re-export commonly used types
pub use buffer::{Consumer, Producer, RingBuffer};
pub use channel::{ChannelState, DrainStats, SerialBuffer};
pub use config::SerialBufferConfig;
pub use error::{Error, ErrorKind, Result};
pub use scheduler::{CooperativeScheduler, Scheduler, Step, TaskHandle};
pub use transport::Transport;

#[cfg(feature = "std")]
pub use scheduler::ThreadScheduler;
#[cfg(feature = "std")]
pub use stream::Stream;
#[cfg(feature = "tokio")]
pub use scheduler::TokioScheduler;

/// Default ring buffer capacity in bytes
pub const DEFAULT_CAPACITY: usize = 4096;

/// Default drain task name
pub const DEFAULT_TASK_NAME: &str = "serial-buffer";

/// Default timeout for the timed stream helpers in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
