//! Source adaptor: push-style producer to blocking demux reads.
//!
//! A [`SourceAdaptor`] sits between a runtime that pushes arbitrarily-sized
//! chunks and a media engine whose registered read callback demands exact
//! byte counts from a worker thread. Chunks queue in a [`BoundedChannel`]
//! under backpressure; `read` reassembles them into the requested size;
//! consumed external chunks retire into a pending list that the runtime
//! thread releases in one batch at operation completion.

use crate::channel::BoundedChannel;
use crate::chunk::{Chunk, ExternalHandle};
use crate::error::Result;
use crate::release::{INLINE_HANDLES, ReleaseBatch};
use smallvec::SmallVec;
use std::sync::Arc;

/// Configuration for a [`SourceAdaptor`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Bound on queued chunk count (not bytes). Capacity 0 is a rendezvous.
    pub capacity: usize,

    /// Size of the probe buffer handed to the engine's context
    /// initialization. Independent of the queue.
    pub scratch_len: usize,

    /// Name for logging purposes.
    pub name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            scratch_len: 4096,
            name: String::from("source"),
        }
    }
}

impl SourceConfig {
    /// Create a config with the given queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the adaptor name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Read-direction adaptor between a chunk-pushing runtime and a blocking
/// media-engine worker.
///
/// One worker operation owns one adaptor at a time, so the cursor and the
/// pending-release list need no locking; the channel is the only shared
/// structure.
///
/// # Example
///
/// ```rust,ignore
/// use weir::source::SourceAdaptor;
///
/// let mut source = SourceAdaptor::new();
/// let handle = source.handle();
///
/// // Runtime side:
/// handle.push_owned(data);
/// handle.finish();
///
/// // Worker side (engine read callback):
/// let got = source.read(&mut buf);
///
/// // Runtime thread, at operation completion:
/// source.finalize_pending()?;
/// ```
pub struct SourceAdaptor<H: ExternalHandle> {
    name: String,
    channel: Arc<BoundedChannel<Chunk<H>>>,
    current: Option<Cursor<H>>,
    pending: SmallVec<[H; INLINE_HANDLES]>,
    scratch: Box<[u8]>,
    bytes_read: u64,
    chunks_consumed: u64,
}

/// The chunk currently being consumed, with its read offset.
struct Cursor<H> {
    chunk: Chunk<H>,
    offset: usize,
}

/// Producer-side handle for a [`SourceAdaptor`].
///
/// Cloneable and sendable; the runtime's write path pushes chunks through
/// it and signals end of input with `finish`.
pub struct SourceHandle<H: ExternalHandle> {
    channel: Arc<BoundedChannel<Chunk<H>>>,
}

impl<H: ExternalHandle> Clone for SourceHandle<H> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<H: ExternalHandle> SourceAdaptor<H> {
    /// Create a source adaptor with default settings.
    pub fn new() -> Self {
        Self::with_config(SourceConfig::default())
    }

    /// Create a source adaptor with the given queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(SourceConfig::with_capacity(capacity))
    }

    /// Create a source adaptor from a config.
    pub fn with_config(config: SourceConfig) -> Self {
        Self {
            name: config.name,
            channel: Arc::new(BoundedChannel::new(config.capacity)),
            current: None,
            pending: SmallVec::new(),
            scratch: vec![0u8; config.scratch_len].into_boxed_slice(),
            bytes_read: 0,
            chunks_consumed: 0,
        }
    }

    /// Get a handle for pushing chunks into this adaptor.
    pub fn handle(&self) -> SourceHandle<H> {
        SourceHandle {
            channel: Arc::clone(&self.channel),
        }
    }

    /// Fill `buf` from the queued chunk stream. Worker thread only.
    ///
    /// Blocks while the stream is mid-flight and the queue is empty.
    /// Reassembles chunks byte-exactly: a `[3, 5, 2]`-byte push sequence
    /// read as `[4, 4, 2]` yields the original ten bytes in order.
    ///
    /// A return shorter than `buf.len()` (possibly 0) means end of stream:
    /// it is the sentinel, not an error. Consumed bytes are copied exactly
    /// once; exhausted external chunks retire into the pending-release list
    /// and are never freed here.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;

        while filled < buf.len() {
            if self.current.is_none() {
                match self.channel.dequeue() {
                    Some(chunk) => {
                        self.current = Some(Cursor { chunk, offset: 0 });
                    }
                    None => {
                        tracing::debug!("source '{}': end of stream", self.name);
                        break;
                    }
                }
            }

            let mut exhausted = false;
            if let Some(cursor) = self.current.as_mut() {
                // A zero-length chunk is valid input, not a sentinel; it
                // contributes nothing and retires immediately.
                let n = (cursor.chunk.len() - cursor.offset).min(buf.len() - filled);
                if n > 0 {
                    buf[filled..filled + n].copy_from_slice(
                        &cursor.chunk.as_bytes()[cursor.offset..cursor.offset + n],
                    );
                    cursor.offset += n;
                    filled += n;
                }
                exhausted = cursor.offset >= cursor.chunk.len();
            }
            if exhausted {
                // Retire the instant the cursor reaches the length, so a
                // checkpoint right after a boundary-exact read still sees
                // the chunk in the pending list.
                self.retire_current();
            }
        }

        self.bytes_read += filled as u64;
        filled
    }

    /// Shut the stream down: wake all blocked parties, stop admitting
    /// pushes. Reads drain what is queued, then report end of stream.
    ///
    /// Callable from any thread; idempotent.
    pub fn finish(&self) {
        tracing::debug!("source '{}': finished", self.name);
        self.channel.deactivate();
    }

    /// Check whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        !self.channel.is_active()
    }

    /// Take the retired external handles as a batch for deferred release.
    ///
    /// The pending list is left empty; retirement of any one handle happens
    /// exactly once no matter how often `read` runs afterwards.
    pub fn take_pending(&mut self) -> ReleaseBatch<H> {
        ReleaseBatch::from_handles(std::mem::take(&mut self.pending))
    }

    /// Release all retired handles in place. Runtime thread only.
    ///
    /// Equivalent to posting `take_pending()` to a
    /// [`ReleaseQueue`](crate::release::ReleaseQueue) and draining it on the
    /// runtime thread; use that form when the adaptor itself stays with the
    /// worker.
    ///
    /// # Errors
    ///
    /// Reports the first failed release after attempting the whole batch.
    pub fn finalize_pending(&mut self) -> Result<()> {
        let batch = self.take_pending();
        if !batch.is_empty() {
            tracing::debug!(
                "source '{}': finalizing {} pending handle(s)",
                self.name,
                batch.len()
            );
        }
        batch.release_all()
    }

    /// The probe buffer for the engine's context-initialization step.
    ///
    /// Allocate-once, immutable, independent of the queue.
    pub fn scratch(&self) -> &[u8] {
        &self.scratch
    }

    /// Number of retired handles awaiting release.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The adaptor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get statistics.
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            queued_chunks: self.channel.len(),
            pending_handles: self.pending.len(),
            bytes_read: self.bytes_read,
            chunks_consumed: self.chunks_consumed,
            finished: !self.channel.is_active(),
        }
    }

    /// Retire the current chunk: external handles go to the pending list,
    /// local allocations drop here.
    fn retire_current(&mut self) {
        if let Some(cursor) = self.current.take() {
            self.chunks_consumed += 1;
            if let Some(handle) = cursor.chunk.into_handle() {
                tracing::trace!("source '{}': retired external chunk", self.name);
                self.pending.push(handle);
            }
        }
    }
}

impl<H: ExternalHandle> Default for SourceAdaptor<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ExternalHandle> SourceHandle<H> {
    /// Enqueue an external chunk without copying. Blocks under backpressure.
    ///
    /// # Errors
    ///
    /// If the stream has already been finished the push is refused and the
    /// handle comes back untouched in `Err`, so the runtime can release it
    /// itself instead of leaking it.
    pub fn push_external(&self, handle: H) -> std::result::Result<(), H> {
        match self.channel.enqueue(Chunk::external(handle)) {
            Ok(()) => Ok(()),
            Err(chunk) => match chunk.into_handle() {
                Some(handle) => Err(handle),
                // The chunk was constructed external two lines up.
                None => unreachable!("refused external chunk lost its handle"),
            },
        }
    }

    /// Enqueue a locally-owned chunk; the adaptor frees it once consumed.
    /// Blocks under backpressure.
    ///
    /// Returns `false` if the stream has already been finished (the push is
    /// a no-op and the bytes are dropped).
    pub fn push_owned(&self, bytes: impl Into<Box<[u8]>>) -> bool {
        self.channel.enqueue(Chunk::local(bytes)).is_ok()
    }

    /// Signal that no more data will arrive. Idempotent, any thread.
    pub fn finish(&self) {
        self.channel.deactivate();
    }

    /// Check whether the stream has been finished.
    pub fn is_finished(&self) -> bool {
        !self.channel.is_active()
    }

    /// Snapshot of the queued chunk count.
    pub fn queued(&self) -> usize {
        self.channel.len()
    }
}

/// Statistics about source adaptor operation.
#[derive(Debug, Clone, Copy)]
pub struct SourceStats {
    /// Chunks currently queued.
    pub queued_chunks: usize,
    /// Retired external handles awaiting release.
    pub pending_handles: usize,
    /// Total bytes handed to the engine.
    pub bytes_read: u64,
    /// Chunks fully consumed and retired.
    pub chunks_consumed: u64,
    /// Whether the stream has been finished.
    pub finished: bool,
}
