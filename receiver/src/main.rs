mod sequence;

use log::{error, info, warn};
use serialbuf::transport::StdTransport;
use serialbuf::{SerialBuffer, SerialBufferConfig, TokioScheduler, Transport};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sequence::Lcg;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";
const BUFFER_SIZE: usize = 4096;

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const IDLE_BACKOFF: Duration = Duration::from_micros(200);
const DISPLAY_INTERVAL: Duration = Duration::from_secs(5);

/// How long to discard input after asking the sender to restart.
const RESET_QUIET: Duration = Duration::from_secs(4);

#[derive(Debug, Default)]
struct Counters {
    num_received: usize,
    max_in_buffer: usize,
    total_received: usize,
}

/// Asks the sender to restart its sequence and drops everything in flight.
async fn reset_sequence<T: Transport + 'static>(serial: &mut SerialBuffer<T>, lcg: &mut Lcg) {
    if serial.write(0) == 0 {
        warn!("Could not send reset request");
    }
    serial.flush();

    serial.clear();
    let start = Instant::now();
    while start.elapsed() < RESET_QUIET {
        serial.clear();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    lcg.reset();
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());
    // Optional pause after each report, to play a busy application
    let stall = args
        .next()
        .and_then(|ms| ms.parse::<u64>().ok())
        .map(Duration::from_millis);

    let listener = TcpListener::bind(&addr).expect("Failed to bind listener");
    info!("Receiver listening on {}", addr);
    let (stream, peer) = listener.accept().expect("Failed to accept connection");
    info!("Sender connected from {}", peer);
    stream
        .set_nonblocking(true)
        .expect("Failed to switch socket to non-blocking mode");

    let port = Arc::new(StdTransport::new(stream));
    let config = SerialBufferConfig::new().with_capacity(BUFFER_SIZE);
    let mut serial = SerialBuffer::new(port, &config).expect("Failed to create serial buffer");

    let scheduler = TokioScheduler::current().with_idle_backoff(IDLE_BACKOFF);
    serial
        .activate(&scheduler)
        .expect("Failed to start drain task");

    let mut lcg = Lcg::new();
    let mut counters = Counters::default();
    reset_sequence(&mut serial, &mut lcg).await;

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last_display = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = ticker.tick() => {}
        }

        let mut num_read = 0;
        while let Some(c) = serial.read() {
            let expected = lcg.next_byte();

            num_read += 1;
            counters.num_received += 1;
            counters.total_received += 1;

            if c != expected {
                info!(
                    "invalid data got={:02x} expected={:02x} totalReceived={} - restarting sequence",
                    c, expected, counters.total_received
                );

                let next = lcg.next_byte();
                if c == next {
                    info!("dropped a byte, next byte is {:02x}", next);
                }

                counters = Counters::default();
                num_read = 0;
                reset_sequence(&mut serial, &mut lcg).await;
                break;
            }
        }

        if num_read > counters.max_in_buffer {
            counters.max_in_buffer = num_read;
        }

        if last_display.elapsed() >= DISPLAY_INTERVAL {
            last_display = Instant::now();

            let drain = serial.stats();
            info!(
                "numReceived={} maxInBuffer={} totalReceived={} drained={} bursts={} bufferFull={}",
                counters.num_received,
                counters.max_in_buffer,
                counters.total_received,
                drain.bytes_drained,
                drain.bursts,
                drain.buffer_full
            );

            counters.num_received = 0;
            counters.max_in_buffer = 0;

            if let Some(pause) = stall {
                info!("stalling {} ms", pause.as_millis());
                tokio::time::sleep(pause).await;
            }
        }

        if !serial.is_drain_alive() {
            error!("Drain task stopped");
            break;
        }
    }

    info!("Receiver finished, {} bytes verified", counters.total_received);
}
