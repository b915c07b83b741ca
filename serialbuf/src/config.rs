use core::time::Duration;

use crate::{DEFAULT_CAPACITY, DEFAULT_TASK_NAME, DEFAULT_TIMEOUT_MS};

/// Construction-time settings for a [`SerialBuffer`](crate::SerialBuffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialBufferConfig {
    /// Ring buffer capacity in bytes.
    pub capacity: usize,
    /// Name handed to the scheduler for the drain task.
    pub task_name: &'static str,
    /// How long the timed stream helpers poll before giving up.
    pub timeout: Duration,
}

impl SerialBufferConfig {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            task_name: DEFAULT_TASK_NAME,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_task_name(mut self, name: &'static str) -> Self {
        self.task_name = name;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SerialBufferConfig {
    fn default() -> Self {
        Self::new()
    }
}
