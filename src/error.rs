//! Crate error types
//!
//! Error types for relay operations. Per-recipient push failures are
//! collected in a `DeliveryReport` rather than surfaced here; see the
//! `fanout` module.

/// Error type for keyed-store operations
#[derive(Debug, Clone)]
pub enum StoreError {
    /// A read (point or prefix query) against the backing store failed
    Read(String),
    /// A write (put or delete) against the backing store failed
    Write(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Read(reason) => write!(f, "store read failed: {}", reason),
            StoreError::Write(reason) => write!(f, "store write failed: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

/// Error type for a single transport push
///
/// A failed push means the session is unreachable (typically already
/// disconnected). It is always a per-recipient outcome and never aborts
/// deliveries to other recipients dispatched in the same call.
#[derive(Debug, Clone)]
pub enum PushError {
    /// The session is gone or otherwise unreachable
    Unreachable(String),
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::Unreachable(reason) => write!(f, "session unreachable: {}", reason),
        }
    }
}

impl std::error::Error for PushError {}

/// Top-level error type for relay entry points
#[derive(Debug, Clone)]
pub enum RelayError {
    /// A keyed-store operation failed; the enclosing operation was aborted
    Store(StoreError),
    /// A client action body was malformed or incomplete; nothing was written
    Validation(String),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Store(e) => write!(f, "{}", e),
            RelayError::Validation(reason) => write!(f, "invalid action body: {}", reason),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Store(e) => Some(e),
            RelayError::Validation(_) => None,
        }
    }
}

impl From<StoreError> for RelayError {
    fn from(e: StoreError) -> Self {
        RelayError::Store(e)
    }
}

/// Convenience result alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
