//! Error types for weir.

use thiserror::Error;

/// Result type alias using weir's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for weir operations.
///
/// Backpressure (full/empty channel) and shutdown-during-wait are not errors:
/// the former blocks, the latter is reported through sentinel return values.
#[derive(Error, Debug)]
pub enum Error {
    /// Allocating the backing storage for a local chunk failed.
    ///
    /// Fatal to the current `write`/copy call only; the channel is left
    /// unchanged (no partial chunk is enqueued).
    #[error("chunk allocation failed: {0}")]
    AllocationFailed(String),

    /// The runtime-side release of an external handle failed.
    ///
    /// A batch drain reports the first such failure after still attempting
    /// the remaining handles.
    #[error("handle release failed: {0}")]
    ReleaseFailed(String),

    /// The release mailbox was used after its other half was dropped.
    #[error("release queue disconnected: {0}")]
    Disconnected(String),
}
