mod sequence;

use log::{info, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use sequence::Lcg;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";

/// Bytes generated per write, roughly one UART TX FIFO.
const CHUNK_SIZE: usize = 64;

/// How long to stay silent after the receiver asks for a reset.
const RESET_QUIET: Duration = Duration::from_secs(5);

const DISPLAY_INTERVAL: Duration = Duration::from_secs(5);

/// Reads whatever the receiver sent. A 0x00 byte is a reset request.
fn poll_reset(stream: &mut TcpStream) -> io::Result<bool> {
    let mut buf = [0u8; 64];
    match stream.read(&mut buf) {
        Ok(0) => Err(ErrorKind::UnexpectedEof.into()),
        Ok(n) => Ok(buf[..n].contains(&0)),
        Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

/// Throws away input for `period`, sending nothing.
fn discard_input(stream: &mut TcpStream, period: Duration) {
    let mut buf = [0u8; 256];
    let start = Instant::now();
    while start.elapsed() < period {
        match stream.read(&mut buf) {
            Ok(n) if n > 0 => continue,
            _ => thread::sleep(Duration::from_millis(10)),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    info!("Connecting to receiver at {}...", addr);
    let mut stream = TcpStream::connect(&addr).expect("Failed to connect to receiver");
    stream
        .set_nonblocking(true)
        .expect("Failed to switch socket to non-blocking mode");
    info!("Connected!");

    let mut lcg = Lcg::new();
    let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE);
    let mut total_sent: u64 = 0;
    let mut last_display = Instant::now();

    loop {
        match poll_reset(&mut stream) {
            Ok(true) => {
                info!("resetting sequence");
                lcg.reset();
                pending.clear();
                discard_input(&mut stream, RESET_QUIET);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Connection lost: {}", e);
                break;
            }
        }

        // Keep the link as full as possible without blocking
        if pending.is_empty() {
            pending.extend((0..CHUNK_SIZE).map(|_| lcg.next_byte()));
        }
        match stream.write(&pending) {
            Ok(0) => {
                warn!("Receiver closed the connection");
                break;
            }
            Ok(n) => {
                pending.drain(..n);
                total_sent += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(Duration::from_millis(1)),
            Err(e) => {
                warn!("Write failed: {}", e);
                break;
            }
        }

        if last_display.elapsed() >= DISPLAY_INTERVAL {
            last_display = Instant::now();
            info!("totalSent={}", total_sent);
        }
    }

    info!("Sender finished, {} bytes sent", total_sent);
}
