//! Chunk types for ownership-tagged byte ranges.
//!
//! A [`Chunk`] is one unit of queued stream data. Its bytes are immutable
//! after construction and are consumed left-to-right by cursor advance only.
//! The two ownership modes are distinct at the type level:
//!
//! - `Local`: the adaptor owns the allocation and frees it when the chunk
//!   is dropped.
//! - `External`: the bytes are borrowed from a runtime-owned handle that
//!   must be released exactly once, on the runtime's own thread, through
//!   the deferred-release protocol.

use crate::error::{Error, Result};

/// A runtime-owned buffer handle whose bytes a chunk may borrow.
///
/// The handle keeps the underlying bytes alive for as long as it exists.
/// `release` consumes the handle, so releasing twice does not compile.
///
/// # Thread affinity
///
/// `release` mutates runtime-managed reference counts and must only run on
/// the runtime's designated thread. Worker threads hand consumed handles to
/// that thread via [`ReleaseBatch`](crate::release::ReleaseBatch) instead of
/// calling `release` themselves.
pub trait ExternalHandle: Send {
    /// The bytes this handle keeps alive.
    fn as_bytes(&self) -> &[u8];

    /// Release the handle back to the owning runtime.
    ///
    /// # Errors
    ///
    /// Returns the runtime's release failure; the caller reports it rather
    /// than swallowing it, but the handle is gone either way.
    fn release(self) -> Result<()>;
}

/// Placeholder handle for channels that must never carry external chunks.
///
/// `NullHandle` is uninhabited: a `Chunk<NullHandle>` is provably `Local`,
/// which is how the write-direction adaptor rules external handles out of
/// its path at compile time.
#[derive(Debug)]
pub enum NullHandle {}

impl ExternalHandle for NullHandle {
    fn as_bytes(&self) -> &[u8] {
        match *self {}
    }

    fn release(self) -> Result<()> {
        match self {}
    }
}

/// An immutable byte range enqueued as one unit.
pub struct Chunk<H> {
    origin: Origin<H>,
}

enum Origin<H> {
    /// Adaptor-owned allocation, freed on drop.
    Local(Box<[u8]>),
    /// Runtime-owned bytes, alive until the handle is released.
    External(H),
}

impl<H: ExternalHandle> Chunk<H> {
    /// Create a local chunk, taking ownership of the bytes.
    pub fn local(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            origin: Origin::Local(bytes.into()),
        }
    }

    /// Create a local chunk by copying the caller's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the backing storage cannot be
    /// reserved. Nothing is partially constructed on failure.
    pub fn copy_from(bytes: &[u8]) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|e| Error::AllocationFailed(format!("{} bytes: {}", bytes.len(), e)))?;
        data.extend_from_slice(bytes);
        Ok(Self {
            origin: Origin::Local(data.into_boxed_slice()),
        })
    }

    /// Create an external chunk wrapping a runtime-owned handle, no copy.
    pub fn external(handle: H) -> Self {
        Self {
            origin: Origin::External(handle),
        }
    }

    /// The chunk's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.origin {
            Origin::Local(data) => data,
            Origin::External(handle) => handle.as_bytes(),
        }
    }

    /// Length of the chunk in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the chunk has zero length.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Check if the chunk borrows runtime-owned bytes.
    pub fn is_external(&self) -> bool {
        matches!(self.origin, Origin::External(_))
    }

    /// Extract the external handle for deferred release.
    ///
    /// Returns `None` for local chunks, which are simply dropped. Consuming
    /// the chunk is what makes "retire exactly once" structural: there is no
    /// chunk left to retire again.
    pub fn into_handle(self) -> Option<H> {
        match self.origin {
            Origin::Local(_) => None,
            Origin::External(handle) => Some(handle),
        }
    }
}

impl<H: ExternalHandle> std::fmt::Debug for Chunk<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("len", &self.len())
            .field("external", &self.is_external())
            .finish()
    }
}
