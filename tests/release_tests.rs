//! Integration tests for the deferred release protocol.
//!
//! These tests verify that:
//! - No handle is ever released from inside `read`: the release counter
//!   stays at zero until the checkpoint drain runs
//! - Each retired handle is released exactly once, however many reads
//!   follow its retirement
//! - The release mailbox carries batches from worker threads to the
//!   runtime thread and drains best-effort past failures

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use weir::release::ReleaseQueue;
use weir::source::SourceAdaptor;
use weir::{Error, Result};

/// Handle over leaked bytes, counting releases and optionally failing.
struct CountingHandle {
    data: &'static [u8],
    releases: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingHandle {
    fn new(data: &[u8], releases: &Arc<AtomicUsize>) -> Self {
        Self {
            data: Box::leak(data.to_vec().into_boxed_slice()),
            releases: Arc::clone(releases),
            fail: false,
        }
    }

    fn failing(data: &[u8], releases: &Arc<AtomicUsize>) -> Self {
        Self {
            fail: true,
            ..Self::new(data, releases)
        }
    }
}

impl weir::chunk::ExternalHandle for CountingHandle {
    fn as_bytes(&self) -> &[u8] {
        self.data
    }

    fn release(self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::ReleaseFailed("simulated runtime failure".into()))
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_release_never_happens_inside_read() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut source: SourceAdaptor<CountingHandle> = SourceAdaptor::with_capacity(16);
    let handle = source.handle();

    let count = 1000;
    let producer = {
        let releases = Arc::clone(&releases);
        thread::spawn(move || {
            for i in 0..count {
                let byte = (i % 256) as u8;
                handle
                    .push_external(CountingHandle::new(&[byte, byte], &releases))
                    .ok()
                    .unwrap();
            }
            handle.finish();
        })
    };

    let mut drained = 0usize;
    let mut buf = [0u8; 64];
    loop {
        let n = source.read(&mut buf);
        if n == 0 {
            break;
        }
        drained += n;
        // The hot path must never touch the runtime's refcounts.
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }
    producer.join().unwrap();

    assert_eq!(drained, count * 2);
    assert_eq!(source.pending_len(), count);
    assert_eq!(releases.load(Ordering::SeqCst), 0);

    source.finalize_pending().unwrap();
    assert_eq!(releases.load(Ordering::SeqCst), count);
}

#[test]
fn test_no_double_release() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut source: SourceAdaptor<CountingHandle> = SourceAdaptor::new();
    let handle = source.handle();

    handle
        .push_external(CountingHandle::new(&[1, 2, 3], &releases))
        .ok()
        .unwrap();
    handle.finish();

    let mut buf = [0u8; 16];
    assert_eq!(source.read(&mut buf), 3);
    // Hammer the end-of-stream path; retirement already happened.
    for _ in 0..100 {
        assert_eq!(source.read(&mut buf), 0);
    }

    source.finalize_pending().unwrap();
    source.finalize_pending().unwrap();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_mailbox_carries_batches_across_threads() {
    let releases = Arc::new(AtomicUsize::new(0));
    let queue: ReleaseQueue<CountingHandle> = ReleaseQueue::new();
    let poster = queue.poster();

    let worker = {
        let releases = Arc::clone(&releases);
        thread::spawn(move || {
            let mut source: SourceAdaptor<CountingHandle> = SourceAdaptor::new();
            let handle = source.handle();
            for _ in 0..10 {
                handle
                    .push_external(CountingHandle::new(&[0xAB; 4], &releases))
                    .ok()
                    .unwrap();
            }
            handle.finish();

            let mut buf = [0u8; 40];
            assert_eq!(source.read(&mut buf), 40);

            // Worker hands the batch over instead of releasing in place.
            poster.post(source.take_pending()).unwrap();
        })
    };
    worker.join().unwrap();

    assert_eq!(releases.load(Ordering::SeqCst), 0);
    // Runtime thread, at its checkpoint:
    assert_eq!(queue.drain().unwrap(), 10);
    assert_eq!(releases.load(Ordering::SeqCst), 10);
}

#[test]
fn test_partial_release_failure_reports_first_error() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut source: SourceAdaptor<CountingHandle> = SourceAdaptor::new();
    let handle = source.handle();

    handle
        .push_external(CountingHandle::new(&[1], &releases))
        .ok()
        .unwrap();
    handle
        .push_external(CountingHandle::failing(&[2], &releases))
        .ok()
        .unwrap();
    handle
        .push_external(CountingHandle::new(&[3], &releases))
        .ok()
        .unwrap();
    handle.finish();

    let mut buf = [0u8; 3];
    assert_eq!(source.read(&mut buf), 3);

    let err = source.finalize_pending().unwrap_err();
    assert!(matches!(err, Error::ReleaseFailed(_)));
    // Every handle was still attempted.
    assert_eq!(releases.load(Ordering::SeqCst), 3);
    assert_eq!(source.pending_len(), 0);
}

#[test]
fn test_take_pending_empties_the_list() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut source: SourceAdaptor<CountingHandle> = SourceAdaptor::new();
    let handle = source.handle();

    handle
        .push_external(CountingHandle::new(&[1, 2], &releases))
        .ok()
        .unwrap();
    handle.finish();

    let mut buf = [0u8; 2];
    assert_eq!(source.read(&mut buf), 2);

    let batch = source.take_pending();
    assert_eq!(batch.len(), 1);
    assert_eq!(source.pending_len(), 0);
    assert!(source.take_pending().is_empty());

    batch.release_all().unwrap();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_local_chunks_never_reach_the_pending_list() {
    let mut source: SourceAdaptor<CountingHandle> = SourceAdaptor::new();
    let handle = source.handle();

    for _ in 0..50 {
        assert!(handle.push_owned(vec![0u8; 8]));
    }
    handle.finish();

    let mut buf = [0u8; 64];
    while source.read(&mut buf) > 0 {}

    assert_eq!(source.pending_len(), 0);
    assert!(source.take_pending().is_empty());
}
