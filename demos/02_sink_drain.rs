//! Sink adaptor demo: an engine thread writes output bytes, the runtime
//! side drains them chunk by chunk.
//!
//! Run with: cargo run --example 02_sink_drain

use std::thread;
use weir::sink::SinkAdaptor;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut sink = SinkAdaptor::with_capacity(4);
    let handle = sink.handle();

    let engine = thread::spawn(move || {
        for i in 0..10u8 {
            let accepted = sink.write(&[i; 6]).unwrap();
            assert_eq!(accepted, 6);
        }
        sink.finish();
        println!("engine done: {:?}", sink.stats());
    });

    let mut total = 0usize;
    while let Some(chunk) = handle.next_chunk() {
        total += chunk.len();
        println!("drained {:2} bytes: {:?}", chunk.len(), chunk.as_bytes());
    }
    engine.join().unwrap();
    println!("drained {} bytes total", total);
}
