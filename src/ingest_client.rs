//! Ingest client (C5): drives the sensor's line source through the
//! segmenter and codec, and sends each encoded rotation to the server. A
//! send failure, or a connection that never comes up, is not fatal to the
//! process — the outer loop just tries again.

use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::codec::encode_rotation;
use crate::error::IngestClientError;
use crate::line_source::{LineEvent, LineSource};
use crate::segmenter::Segmenter;
use crate::types::RotationPacket;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);
const LINE_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Runs forever: connect, stream rotations, and on any failure tear down
/// the sensor driver and reconnect. `sensor_cmd` is the driver's argv.
pub fn run_ingest_client(server_addr: &str, sensor_cmd: &[String]) -> ! {
    loop {
        match run_session(server_addr, sensor_cmd) {
            Ok(()) => log::info!("ingest session ended cleanly"),
            Err(e) => log::warn!("ingest session failed: {e}"),
        }
        std::thread::sleep(RECONNECT_BACKOFF);
    }
}

fn run_session(server_addr: &str, sensor_cmd: &[String]) -> Result<(), IngestClientError> {
    let addr = server_addr
        .parse()
        .map_err(|_| IngestClientError::Connect {
            addr: server_addr.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "unparseable server address"),
        })?;

    let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            IngestClientError::ConnectTimeout { addr: server_addr.to_string(), timeout: CONNECT_TIMEOUT }
        } else {
            IngestClientError::Connect { addr: server_addr.to_string(), source: e }
        }
    })?;

    let (mut source, rx) = LineSource::spawn(sensor_cmd)
        .map_err(|e| IngestClientError::Connect { addr: server_addr.to_string(), source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()) })?;

    let mut segmenter = Segmenter::new();
    let result = drive(&mut stream, &rx, &mut segmenter);
    source.terminate();
    result
}

fn drive(
    stream: &mut TcpStream,
    rx: &crossbeam_channel::Receiver<LineEvent>,
    segmenter: &mut Segmenter,
) -> Result<(), IngestClientError> {
    loop {
        match rx.recv_timeout(LINE_RECV_TIMEOUT) {
            Ok(LineEvent::Measurement(m)) => segmenter.push(m),
            Ok(LineEvent::Boundary) => match segmenter.on_boundary() {
                Ok(rotation) => {
                    let sample_count = rotation.measurements.len();
                    match encode_rotation(&rotation) {
                        Ok(frame) => {
                            let packet = RotationPacket { frame, sample_count };
                            stream.write_all(&packet.frame).map_err(IngestClientError::Send)?;
                            log::debug!(
                                "sent rotation of {} samples, {} bytes",
                                packet.sample_count,
                                packet.frame.len()
                            );
                        }
                        Err(e) => log::warn!("dropping rotation: encode failed: {e}"),
                    }
                }
                Err(reason) => log::warn!("dropping rotation: {reason}"),
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Err(IngestClientError::Send(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sensor driver line source disconnected",
            ))),
        }
    }
}
