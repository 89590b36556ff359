//! Monitor fan-out (C8): two independent TCP listeners broadcasting every
//! accepted frame to whoever is connected, isolating slow subscribers with
//! the drop-oldest [`Registry`] rather than blocking the ingest path.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::registry::{Registry, Subscriber};

const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

/// Render one validated sample as the human-readable data-port line.
pub fn format_data_line(theta_deg: f64, dist_mm: i64) -> String {
    format!("Theta: {theta_deg:.2}, Distance: {dist_mm}\n")
}

/// Render a status-port record: counts plus a wall-clock timestamp and the
/// delay between that timestamp and when this record is built.
pub fn format_status_record(received: u64, deleted: u64, frame_timestamp_us: u64) -> String {
    let now_us = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_micros() as u64;
    let delay_sec = now_us.saturating_sub(frame_timestamp_us) as f64 / 1_000_000.0;

    let total_us = now_us % 86_400_000_000;
    let hours = total_us / 3_600_000_000;
    let minutes = (total_us / 60_000_000) % 60;
    let seconds = (total_us / 1_000_000) % 60;
    let millis = (total_us / 1_000) % 1_000;

    format!(
        "\nReceived data count: {received}\nDelete data count: {deleted}\nTime: {hours:02}:{minutes:02}:{seconds:02}.{millis:03} Delay: {delay_sec:.3}sec\n"
    )
}

/// Accepts connections on one TCP port forever, registering each as a
/// subscriber and spawning its dedicated sender thread. Returns only on a
/// listener-level I/O error (the caller treats that as fatal to this port).
pub fn run_broadcast_listener(listener: TcpListener, registry: Arc<Registry>) -> std::io::Result<()> {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                log::warn!("monitor accept failed: {e}");
                continue;
            }
        };
        let id = registry.next_id();
        let (subscriber, queue, closed) = Subscriber::new(id, SUBSCRIBER_QUEUE_CAPACITY);
        let subscriber = Arc::new(subscriber);
        registry.add(subscriber.clone());

        let registry = registry.clone();
        std::thread::spawn(move || {
            send_loop(stream, queue, closed);
            registry.remove(id);
        });
    }
    Ok(())
}

fn send_loop(mut stream: TcpStream, queue: Arc<crate::registry::DropOldestQueue>, closed: Arc<std::sync::atomic::AtomicBool>) {
    while let Some(line) = queue.pop_blocking(&closed) {
        if stream.write_all(line.as_bytes()).is_err() {
            closed.store(true, std::sync::atomic::Ordering::Release);
            break;
        }
    }
}
