//! Deferred release of externally-owned buffer handles.
//!
//! Handle release mutates runtime-managed reference counts that are only
//! safe to touch from the runtime's own thread. Worker threads therefore
//! never release handles: they retire consumed chunks into a pending list,
//! and the runtime thread releases the whole batch at a checkpoint
//! (completion of an asynchronous operation), off the hot I/O path.
//!
//! [`ReleaseBatch`] is the drained pending list as a value; [`ReleaseQueue`]
//! is a mailbox that turns the thread-affinity convention into value flow:
//! workers post batches through a cloneable [`ReleasePoster`], and only the
//! queue owner (held by the runtime thread) can drain and release them.

use crate::chunk::ExternalHandle;
use crate::error::{Error, Result};
use smallvec::SmallVec;

/// How many retired handles a batch holds inline before spilling to heap.
pub(crate) const INLINE_HANDLES: usize = 8;

/// A batch of retired external handles awaiting release.
///
/// Retirement order is preserved internally but release order is not part
/// of the contract; the handles are independent.
#[must_use = "dropping a batch without releasing it strands the runtime-owned handles"]
pub struct ReleaseBatch<H> {
    handles: SmallVec<[H; INLINE_HANDLES]>,
}

impl<H: ExternalHandle> ReleaseBatch<H> {
    pub(crate) fn from_handles(handles: SmallVec<[H; INLINE_HANDLES]>) -> Self {
        Self { handles }
    }

    /// Number of handles in the batch.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Release every handle through the runtime's release primitive.
    ///
    /// Must run on the runtime's designated thread. The drain is
    /// best-effort: a failed release does not stop the remaining handles
    /// from being attempted.
    ///
    /// # Errors
    ///
    /// Returns the first release failure, after the rest of the batch has
    /// still been processed.
    pub fn release_all(self) -> Result<()> {
        let mut first_err = None;
        for handle in self.handles {
            if let Err(e) = handle.release() {
                tracing::debug!("handle release failed: {}", e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Take the handles out for release through an embedder's own executor.
    pub fn into_handles(self) -> impl Iterator<Item = H> {
        self.handles.into_iter()
    }
}

impl<H: ExternalHandle> std::fmt::Debug for ReleaseBatch<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseBatch")
            .field("handles", &self.handles.len())
            .finish()
    }
}

/// Runtime-affine mailbox for release batches.
///
/// The queue lives with the runtime thread; worker contexts get cloneable
/// [`ReleasePoster`]s. Draining is non-blocking so a checkpoint never stalls
/// the runtime's callback loop.
///
/// # Example
///
/// ```rust,ignore
/// use weir::release::ReleaseQueue;
///
/// let queue = ReleaseQueue::new();
/// let poster = queue.poster();
///
/// // Worker context, at operation completion:
/// poster.post(adaptor.take_pending())?;
///
/// // Runtime thread, at its checkpoint:
/// let released = queue.drain()?;
/// ```
pub struct ReleaseQueue<H> {
    tx: kanal::Sender<ReleaseBatch<H>>,
    rx: kanal::Receiver<ReleaseBatch<H>>,
}

impl<H: ExternalHandle> ReleaseQueue<H> {
    /// Create an empty mailbox.
    ///
    /// Unbounded: batches arrive at checkpoint frequency, not per chunk, so
    /// the queue depth is bounded by outstanding operations in practice.
    pub fn new() -> Self {
        let (tx, rx) = kanal::unbounded();
        Self { tx, rx }
    }

    /// Get a poster for handing batches over from worker contexts.
    pub fn poster(&self) -> ReleasePoster<H> {
        ReleasePoster {
            tx: self.tx.clone(),
        }
    }

    /// Number of batches waiting to be drained.
    pub fn pending_batches(&self) -> usize {
        self.rx.len()
    }

    /// Release every queued batch. Non-blocking; runtime thread only.
    ///
    /// Returns the number of handles processed. A release failure does not
    /// stop the drain: the remaining batches are still attempted and the
    /// first failure is reported at the end.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::ReleaseFailed`] encountered.
    pub fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        let mut first_err = None;
        while let Ok(Some(batch)) = self.rx.try_recv() {
            processed += batch.len();
            if let Err(e) = batch.release_all() {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        if processed > 0 {
            tracing::debug!("release queue drained {} handle(s)", processed);
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }
}

impl<H: ExternalHandle> Default for ReleaseQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sender half of a [`ReleaseQueue`]. Clone and send it to worker contexts.
pub struct ReleasePoster<H> {
    tx: kanal::Sender<ReleaseBatch<H>>,
}

impl<H> Clone for ReleasePoster<H> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<H: ExternalHandle> ReleasePoster<H> {
    /// Post a batch for the runtime thread to release at its next checkpoint.
    ///
    /// Empty batches are dropped here rather than queued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] if the queue has been dropped; the
    /// batch is lost in that case, which the caller surfaces rather than
    /// ignores.
    pub fn post(&self, batch: ReleaseBatch<H>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.tx
            .send(batch)
            .map_err(|_| Error::Disconnected("release queue dropped".into()))
    }
}
