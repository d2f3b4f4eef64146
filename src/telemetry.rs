//! Telemetry push channel: payload shape and the background reader.
//!
//! One JSON object per line. Hardware and the simulation backend both
//! emit `{waves, leds, is_hardware}`, but any field may be absent and a
//! garbled field must not take down the rest of the payload; each field
//! is coerced independently.

use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::frame::WaveFrame;

/// One push-channel message, fields untrusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryPayload {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub waves: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub leds: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub is_hardware: Value,
}

impl TelemetryPayload {
    /// The validated waveform, if the field is present and an array.
    pub fn frame(&self) -> Option<WaveFrame> {
        self.waves.as_array().map(|v| WaveFrame::from_values(v))
    }

    /// LED states. The stream emits both booleans and 0/1 integers, so
    /// entries are read with numeric truthiness.
    pub fn leds(&self) -> Option<Vec<bool>> {
        self.leds
            .as_array()
            .map(|v| v.iter().map(coerce_led).collect())
    }

    pub fn hardware(&self) -> Option<bool> {
        match &self.is_hardware {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
            _ => None,
        }
    }
}

fn coerce_led(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Handle to the background telemetry reader.
///
/// The thread owns the socket; payloads arrive through the channel in
/// arrival order and are drained once per render tick. On EOF or a read
/// error the thread clears `connected` and exits; reconnecting is a
/// user action, never an automatic retry.
pub struct TelemetryStream {
    rx: mpsc::Receiver<TelemetryPayload>,
    connected: Arc<AtomicBool>,
}

impl TelemetryStream {
    pub fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let connected = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel();

        let flag = Arc::clone(&connected);
        let peer = addr.to_string();
        thread::spawn(move || {
            read_loop(stream, tx, &peer);
            flag.store(false, Ordering::Relaxed);
        });

        info!("telemetry stream connected to {}", addr);
        Ok(Self { rx, connected })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Everything that arrived since the last tick, oldest first.
    pub fn drain(&self) -> impl Iterator<Item = TelemetryPayload> + '_ {
        self.rx.try_iter()
    }

    /// Blocking receive for headless consumers.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TelemetryPayload> {
        self.rx.recv_timeout(timeout).ok()
    }
}

fn read_loop(stream: TcpStream, tx: mpsc::Sender<TelemetryPayload>, peer: &str) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<TelemetryPayload>(trimmed) {
                    Ok(payload) => {
                        if tx.send(payload).is_err() {
                            // Receiver side is gone; nothing to deliver to.
                            return;
                        }
                    }
                    Err(e) => warn!("dropping malformed telemetry line from {}: {}", peer, e),
                }
            }
            Err(e) => {
                warn!("telemetry read error from {}: {}", peer, e);
                break;
            }
        }
    }
    info!("telemetry stream from {} closed", peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::net::TcpListener;

    #[test]
    fn absent_fields_read_as_absent() {
        let payload: TelemetryPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.frame().is_none());
        assert!(payload.leds().is_none());
        assert!(payload.hardware().is_none());
    }

    #[test]
    fn non_array_waves_is_absent_but_other_fields_survive() {
        let payload: TelemetryPayload =
            serde_json::from_value(json!({"waves": "garbage", "leds": [1, 0, true, "x"]}))
                .unwrap();
        assert!(payload.frame().is_none());
        assert_eq!(payload.leds(), Some(vec![true, false, true, false]));
    }

    #[test]
    fn numeric_hardware_flag_uses_truthiness() {
        let payload: TelemetryPayload =
            serde_json::from_value(json!({"is_hardware": 1})).unwrap();
        assert_eq!(payload.hardware(), Some(true));
        let payload: TelemetryPayload =
            serde_json::from_value(json!({"is_hardware": 0})).unwrap();
        assert_eq!(payload.hardware(), Some(false));
    }

    #[test]
    fn stream_delivers_lines_in_arrival_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"{\"waves\": [1]}\n").unwrap();
            sock.write_all(b"not json\n").unwrap();
            sock.write_all(b"{\"waves\": [2]}\n").unwrap();
        });

        let stream = TelemetryStream::connect(&addr.to_string()).unwrap();
        let first = stream.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = stream.recv_timeout(Duration::from_secs(5)).unwrap();
        server.join().unwrap();

        assert_eq!(first.frame().unwrap().samples(), &[1]);
        assert_eq!(second.frame().unwrap().samples(), &[2]);

        // Connection closed after the server hung up; the flag follows.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stream.is_connected() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!stream.is_connected());
    }
}
