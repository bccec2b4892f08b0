//! Sink adaptor: blocking mux writes to a chunk-draining consumer.
//!
//! A [`SinkAdaptor`] carries the engine's output direction: the registered
//! write callback copies engine bytes into locally-owned chunks and
//! enqueues them under the same backpressure rule as any other producer; a
//! drain consumer (the runtime, or a flush step) dequeues the chunks and
//! forwards them to the true sink.

use crate::channel::BoundedChannel;
use crate::chunk::{Chunk, NullHandle};
use crate::error::Result;
use std::sync::Arc;

/// Configuration for a [`SinkAdaptor`].
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Bound on queued chunk count (not bytes). Capacity 0 is a rendezvous.
    pub capacity: usize,

    /// Size of the probe buffer handed to the engine's output-context
    /// initialization. Independent of the queue.
    pub scratch_len: usize,

    /// Name for logging purposes.
    pub name: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            scratch_len: 4096,
            name: String::from("sink"),
        }
    }
}

impl SinkConfig {
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

/// Write-direction adaptor between a blocking media-engine worker and a
/// chunk-draining runtime consumer.
///
/// The channel is instantiated with [`NullHandle`], so the write path
/// cannot carry an external handle by construction: every queued chunk is
/// locally owned and freed once the consumer is done with it.
pub struct SinkAdaptor {
    name: String,
    channel: Arc<BoundedChannel<Chunk<NullHandle>>>,
    scratch: Box<[u8]>,
    bytes_written: u64,
    chunks_written: u64,
}

/// Consumer-side handle for a [`SinkAdaptor`].
///
/// Cloneable and sendable; the runtime drains chunks through it.
#[derive(Clone)]
pub struct SinkHandle {
    channel: Arc<BoundedChannel<Chunk<NullHandle>>>,
}

impl SinkAdaptor {
    /// Create a sink adaptor with default settings.
    pub fn new() -> Self {
        Self::with_config(SinkConfig::default())
    }

    /// Create a sink adaptor with the given queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(SinkConfig::with_capacity(capacity))
    }

    /// Create a sink adaptor from a config.
    pub fn with_config(config: SinkConfig) -> Self {
        Self {
            name: config.name,
            channel: Arc::new(BoundedChannel::new(config.capacity)),
            scratch: vec![0u8; config.scratch_len].into_boxed_slice(),
            bytes_written: 0,
            chunks_written: 0,
        }
    }

    /// Get a handle for draining chunks out of this adaptor.
    pub fn handle(&self) -> SinkHandle {
        SinkHandle {
            channel: Arc::clone(&self.channel),
        }
    }

    /// Accept engine output bytes. Worker thread only.
    ///
    /// Copies `buf` into a fresh locally-owned chunk and enqueues it,
    /// blocking while the queue is full. Returns the byte count accepted:
    /// `buf.len()` on success, 0 once the stream has been finished (the
    /// engine reads a short write as its I/O contract dictates).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`](crate::Error::AllocationFailed)
    /// if the copy cannot be allocated; the channel is left unchanged.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let chunk = Chunk::copy_from(buf)?;
        match self.channel.enqueue(chunk) {
            Ok(()) => {
                self.bytes_written += buf.len() as u64;
                self.chunks_written += 1;
                Ok(buf.len())
            }
            Err(_) => {
                tracing::debug!("sink '{}': write after finish dropped", self.name);
                Ok(0)
            }
        }
    }

    /// Shut the stream down: wake all blocked parties, stop admitting
    /// writes. The drain side collects what is queued, then sees `None`.
    ///
    /// Callable from any thread; idempotent.
    pub fn finish(&self) {
        tracing::debug!("sink '{}': finished", self.name);
        self.channel.deactivate();
    }

    /// Check whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        !self.channel.is_active()
    }

    /// The probe buffer for the engine's output-context initialization.
    ///
    /// Allocate-once, immutable, independent of the queue.
    pub fn scratch(&self) -> &[u8] {
        &self.scratch
    }

    /// The adaptor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get statistics.
    pub fn stats(&self) -> SinkStats {
        SinkStats {
            queued_chunks: self.channel.len(),
            bytes_written: self.bytes_written,
            chunks_written: self.chunks_written,
            finished: !self.channel.is_active(),
        }
    }
}

impl Default for SinkAdaptor {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkHandle {
    /// Collect the next output chunk, blocking while the stream is
    /// mid-flight and the queue is empty.
    ///
    /// `None` means the stream is finished and fully drained.
    pub fn next_chunk(&self) -> Option<Chunk<NullHandle>> {
        self.channel.dequeue()
    }

    /// Signal that no more output is wanted. Idempotent, any thread.
    pub fn finish(&self) {
        self.channel.deactivate();
    }

    /// Snapshot of the queued chunk count.
    pub fn queued(&self) -> usize {
        self.channel.len()
    }
}

/// Statistics about sink adaptor operation.
#[derive(Debug, Clone, Copy)]
pub struct SinkStats {
    /// Chunks currently queued.
    pub queued_chunks: usize,
    /// Total bytes accepted from the engine.
    pub bytes_written: u64,
    /// Chunks enqueued.
    pub chunks_written: u64,
    /// Whether the stream has been finished.
    pub finished: bool,
}
