//! Basic usage example demonstrating a buffered serial receiver.
//!
//! This example shows how to:
//! - Build a buffer before any scheduler exists
//! - Activate it on a background thread
//! - Read at the application's own pace while the port keeps receiving
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serialbuf::transport::LoopbackTransport;
use serialbuf::{SerialBuffer, SerialBufferConfig, Stream, ThreadScheduler};

fn main() {
    println!("=== SerialBuf Basic Usage Example ===\n");

    // A port with a 16 byte hardware FIFO: anything more is lost unless drained
    let port = Arc::new(LoopbackTransport::new().with_rx_fifo(16));

    // Example 1: Construction
    println!("1. Construction:");
    let config = SerialBufferConfig::new()
        .with_capacity(1024)
        .with_task_name("uart-rx")
        .with_timeout(Duration::from_millis(50));
    let mut serial = SerialBuffer::new(Arc::clone(&port), &config).expect("create failed");
    println!("   Capacity: {} bytes", serial.capacity());
    println!("   State: {:?}\n", serial.state());

    // Example 2: Activation
    println!("2. Activation:");
    let scheduler = ThreadScheduler::new().with_idle_backoff(Duration::from_micros(100));
    serial.activate(&scheduler).expect("activate failed");
    println!("   State: {:?}", serial.state());
    println!("   Drain alive: {}\n", serial.is_drain_alive());

    // Example 3: A slow application
    println!("3. Busy consumer:");
    let remote = {
        let port = Arc::clone(&port);
        thread::spawn(move || {
            for line in 0..20 {
                let text = format!("line {:02}\n", line);
                for chunk in text.as_bytes().chunks(4) {
                    while port.inject(chunk) < chunk.len() {
                        thread::yield_now();
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
        })
    };

    // Pretend to be busy while 160 bytes arrive through a 16 byte FIFO
    thread::sleep(Duration::from_millis(100));
    remote.join().expect("remote panicked");
    println!("   Buffered after stall: {} bytes", serial.available());
    println!("   Lost in port FIFO: {}\n", port.rx_lost());

    // Example 4: Reading lines
    println!("4. Reading lines:");
    let start = Instant::now();
    let mut line = [0u8; 32];
    let mut lines = 0;
    loop {
        let n = serial.read_bytes_until(b'\n', &mut line);
        if n == 0 {
            break;
        }
        lines += 1;
        if lines <= 3 {
            println!("   {:?}", String::from_utf8_lossy(&line[..n]));
        }
    }
    println!("   Lines read: {} in {:?}\n", lines, start.elapsed());

    // Example 5: Statistics
    println!("5. Drain statistics:");
    let stats = serial.stats();
    println!("   Bytes drained: {}", stats.bytes_drained);
    println!("   Bursts: {}", stats.bursts);
    println!("   Buffer full: {}", stats.buffer_full);

    println!("\n=== Example Complete ===");
}
