//! Ingest server (C6): accepts the sensor-side connection, decodes frames
//! off it, validates the samples, and hands them to the monitor fan-out.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use crate::codec::decode_frame;
use crate::error::{DecodeError, IngestServerError};
use crate::fanout::{format_data_line, format_status_record, run_broadcast_listener};
use crate::registry::Registry;
use crate::validator::filter_samples;

const RECV_CHUNK_BYTES: usize = 8192;

/// Ports the ingest server listens on: one for the sensor-side client, two
/// for monitor subscribers.
pub struct ServerAddrs {
    pub lidar_addr: String,
    pub data_addr: String,
    pub status_addr: String,
}

/// Binds all three listeners and runs forever. Each monitor port runs its
/// own accept loop on a dedicated thread; the sensor port is handled on
/// the calling thread, since spec treats at most one active sensor
/// connection as the expected case.
pub fn run_ingest_server(addrs: ServerAddrs) -> std::io::Result<()> {
    let data_registry = Arc::new(Registry::new());
    let status_registry = Arc::new(Registry::new());

    let data_listener = TcpListener::bind(&addrs.data_addr)?;
    let status_listener = TcpListener::bind(&addrs.status_addr)?;
    let lidar_listener = TcpListener::bind(&addrs.lidar_addr)?;

    {
        let registry = data_registry.clone();
        std::thread::spawn(move || {
            if let Err(e) = run_broadcast_listener(data_listener, registry) {
                log::error!("data-port listener failed: {e}");
            }
        });
    }
    {
        let registry = status_registry.clone();
        std::thread::spawn(move || {
            if let Err(e) = run_broadcast_listener(status_listener, registry) {
                log::error!("status-port listener failed: {e}");
            }
        });
    }

    for stream in lidar_listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                log::warn!("sensor accept failed: {e}");
                continue;
            }
        };
        if let Err(e) = handle_sensor_connection(stream, &data_registry, &status_registry) {
            log::warn!("sensor connection handler closed: {e}");
        }
    }
    Ok(())
}

/// Reads the sensor connection to completion (or error), decoding and
/// broadcasting every frame along the way. Returns once the connection is
/// closed (cleanly or not); the caller's accept loop just moves on to the
/// next connection (C6's `TransportRecvError` policy: close handler, await
/// next accept).
fn handle_sensor_connection(
    mut stream: TcpStream,
    data_registry: &Arc<Registry>,
    status_registry: &Arc<Registry>,
) -> Result<(), IngestServerError> {
    let mut accumulator: Vec<u8> = Vec::new();
    let mut chunk = [0u8; RECV_CHUNK_BYTES];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                log::info!("sensor connection closed");
                return Ok(());
            }
            Ok(n) => n,
            Err(e) => return Err(IngestServerError::Recv(e)),
        };
        accumulator.extend_from_slice(&chunk[..n]);

        match decode_frame(&accumulator) {
            Ok(frame) => {
                // "Received" is the total decoded sample count for this
                // rotation, before filtering removes anything; "deleted" is
                // however many of those the validator just dropped. Both are
                // per-rotation, not running totals.
                let received = frame.samples.len() as u64;
                let (kept, dropped) = filter_samples(frame.samples);

                // A rotation this short or long after filtering is not worth
                // showing on the data port, but its counts still belong on
                // the status port.
                if (300..=700).contains(&kept.len()) {
                    for (theta, dist) in &kept {
                        data_registry.broadcast(format_data_line(*theta, *dist));
                    }
                }
                let status = format_status_record(received, dropped as u64, frame.timestamp_us);
                status_registry.broadcast(status);

                accumulator.clear();
            }
            Err(DecodeError::UnexpectedEndOfFrame) => {
                // Truncated mid-sample: keep accumulating, the rest of the
                // frame may still be in flight.
            }
            Err(DecodeError::FrameTooShort { .. }) => {
                // Fewer than 8 bytes buffered so far; same as above, wait
                // for more.
            }
        }
    }
}
