//! # Weir
//!
//! A bounded streaming I/O adaptor: bridges a push-style, arbitrarily-chunked
//! byte producer (a managed runtime with reference-counted buffer handles and
//! a single-threaded callback contract) to the blocking, exact-size
//! `read`/`write` surface a media-container engine drives from background
//! worker threads.
//!
//! ## Features
//!
//! - **Bounded buffering with backpressure**: producers block when the chunk
//!   queue is full, consumers when it is empty
//! - **Byte-exact reassembly**: arbitrary push sizes are recomposed into
//!   exactly the read sizes the engine demands, copying each byte once
//! - **Ownership-tagged chunks**: adaptor-owned allocations vs borrowed
//!   runtime handles, distinct at the type level
//! - **Deferred release**: consumed runtime handles are batched and released
//!   on the runtime's own thread at operation checkpoints, never from the
//!   hot I/O path
//! - **Deadlock-free shutdown**: `finish()` broadcasts to every blocked
//!   thread; queued data drains, then reads report end of stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weir::prelude::*;
//!
//! let mut source = SourceAdaptor::new();
//! let handle = source.handle();
//!
//! // Runtime side: push chunks of whatever size arrives.
//! handle.push_external(buffer_handle)?;
//! handle.push_owned(trailing_bytes);
//! handle.finish();
//!
//! // Worker side: the engine's read callback demands exact sizes.
//! let got = source.read(&mut engine_buf);
//!
//! // Runtime thread, once the operation completes:
//! source.finalize_pending()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod chunk;
pub mod error;
pub mod release;
pub mod sink;
pub mod source;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::channel::BoundedChannel;
    pub use crate::chunk::{Chunk, ExternalHandle, NullHandle};
    pub use crate::error::{Error, Result};
    pub use crate::release::{ReleaseBatch, ReleasePoster, ReleaseQueue};
    pub use crate::sink::{SinkAdaptor, SinkConfig, SinkHandle};
    pub use crate::source::{SourceAdaptor, SourceConfig, SourceHandle};
}

pub use error::{Error, Result};
