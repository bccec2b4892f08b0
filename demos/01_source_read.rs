//! Source adaptor demo: a producer thread pushes uneven chunks, a worker
//! reassembles them into fixed-size reads.
//!
//! Run with: cargo run --example 01_source_read

use std::thread;
use weir::source::SourceAdaptor;

/// Stand-in for a runtime-owned buffer handle.
struct DemoHandle(Vec<u8>);

impl weir::chunk::ExternalHandle for DemoHandle {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn release(self) -> weir::Result<()> {
        println!("released a {}-byte handle", self.0.len());
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut source: SourceAdaptor<DemoHandle> = SourceAdaptor::with_capacity(8);
    let handle = source.handle();

    let producer = thread::spawn(move || {
        for size in [3usize, 5, 2, 7, 13] {
            let chunk: Vec<u8> = (0..size as u8).collect();
            handle.push_external(DemoHandle(chunk)).ok().unwrap();
        }
        handle.finish();
    });

    let mut buf = [0u8; 4];
    loop {
        let n = source.read(&mut buf);
        if n == 0 {
            break;
        }
        println!("read {:2} bytes: {:?}", n, &buf[..n]);
    }
    producer.join().unwrap();

    // Runtime-thread checkpoint: release everything consumed above.
    source.finalize_pending().unwrap();
    println!("stats: {:?}", source.stats());
}
