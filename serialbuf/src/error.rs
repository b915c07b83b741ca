use core::fmt;

/// What went wrong while constructing or activating a buffer.
///
/// The data path never produces one of these: "no byte yet" and "buffer full"
/// are ordinary outcomes and are reported as `None` / a short count instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A ring buffer was requested with zero capacity.
    ZeroCapacity,
    /// The capacity does not leave room for the doubled position space.
    CapacityTooLarge,
    /// `activate` was called on a channel whose drain task already runs.
    AlreadyActive,
    /// An earlier activation failed and the producer handle is gone.
    Faulted,
    /// The scheduler could not start the drain task.
    Spawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::ZeroCapacity => write!(f, "Ring buffer capacity must be at least 1"),
            ErrorKind::CapacityTooLarge => write!(f, "Ring buffer capacity too large"),
            ErrorKind::AlreadyActive => write!(f, "Drain task already active"),
            ErrorKind::Faulted => write!(f, "Channel faulted during an earlier activation"),
            ErrorKind::Spawn => write!(f, "Failed to spawn drain task"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl From<Error> for std::io::Error {
    fn from(err: Error) -> std::io::Error {
        let kind = match err.kind {
            ErrorKind::ZeroCapacity | ErrorKind::CapacityTooLarge => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
