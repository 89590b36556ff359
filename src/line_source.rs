//! Sensor driver line source (C1): spawns the rangefinder's driver process
//! and funnels its stdout, one classified event per line, onto a bounded
//! channel for the segmenter.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::error::LineSourceError;
use crate::parser::{is_boundary_marker, parse_line};
use crate::types::Measurement;

const LINE_CHANNEL_CAPACITY: usize = 4096;
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// One classified line from the driver: either a measurement to buffer, or
/// the marker that ends the rotation currently in progress and starts the
/// next.
#[derive(Debug, Clone, Copy)]
pub enum LineEvent {
    Measurement(Measurement),
    Boundary,
}

/// Owns the sensor driver subprocess and the thread reading its stdout.
/// There is at most one driver process per `LineSource`; replacing it
/// (on a fatal read error) always tears the old one down first.
pub struct LineSource {
    child: Child,
    reader_handle: Option<std::thread::JoinHandle<()>>,
}

impl LineSource {
    /// Spawn `cmd` and begin reading its stdout on a background thread,
    /// pushing classified lines onto a bounded channel. The channel's
    /// receiver is returned for the caller (the segmenter's driving loop)
    /// to consume.
    pub fn spawn(cmd: &[String]) -> Result<(Self, Receiver<LineEvent>), LineSourceError> {
        let (program, args) = cmd.split_first().ok_or_else(|| {
            LineSourceError::Spawn(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty driver command"))
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(LineSourceError::Spawn)?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let (tx, rx): (Sender<LineEvent>, Receiver<LineEvent>) = crossbeam_channel::bounded(LINE_CHANNEL_CAPACITY);

        let reader_handle = std::thread::spawn(move || read_loop(stdout, tx));

        Ok((Self { child, reader_handle: Some(reader_handle) }, rx))
    }

    /// Terminate the driver process: SIGTERM, poll for exit up to
    /// [`GRACEFUL_SHUTDOWN_TIMEOUT`], then SIGKILL if it's still alive.
    pub fn terminate(&mut self) {
        self.terminate_with_grace(GRACEFUL_SHUTDOWN_TIMEOUT);
    }

    /// Same as [`Self::terminate`] but with a caller-chosen grace period,
    /// so tests can exercise the forced-kill branch without waiting out
    /// the real [`GRACEFUL_SHUTDOWN_TIMEOUT`].
    fn terminate_with_grace(&mut self, grace: Duration) {
        send_sigterm(&self.child);

        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                Err(_) => break,
            }
        }

        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) {
    // No portable graceful-termination signal off Unix; terminate() falls
    // straight through to the poll loop and then SIGKILL-equivalent kill().
}

fn read_loop(stdout: std::process::ChildStdout, tx: Sender<LineEvent>) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("sensor driver stdout read error: {e}");
                break;
            }
        };

        // A boundary-marked line both ends the previous rotation and, if it
        // parses, carries the first measurement of the next one: emit the
        // boundary event before the measurement so the segmenter evaluates
        // the old buffer first.
        let boundary = is_boundary_marker(&line);
        let measurement = parse_line(&line);

        if boundary && tx.send(LineEvent::Boundary).is_err() {
            break;
        }
        if let Some(m) = measurement {
            if tx.send(LineEvent::Measurement(m)).is_err() {
                break;
            }
        }
    }
}
