//! Oracle wire protocol and request plumbing.
//!
//! One JSON object per line in both directions. Interactive callers go
//! through [`OracleWorker`], which owns a background thread fed by a
//! one-slot channel and polled once per frame; the session's in-flight
//! mark is what keeps requests down to one at a time, the slot is the
//! backstop.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::debugger::{DebugOp, DebuggerSnapshot, SessionError};

/// Requests understood by the execution oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OracleRequest {
    Load { source: String },
    Step,
    Reset,
    Info,
}

/// Replies from the oracle: a full snapshot, or an error surfaced to the
/// user verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OracleReply {
    Snapshot(DebuggerSnapshot),
    Error {
        error: String,
        #[serde(default)]
        traceback: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle connection failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed oracle reply: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("{error}")]
    Remote {
        error: String,
        traceback: Option<String>,
    },
}

impl OracleError {
    /// What the session records and the HUD displays.
    pub fn to_session_error(&self) -> SessionError {
        match self {
            OracleError::Remote { error, traceback } => SessionError {
                message: error.clone(),
                traceback: traceback.clone(),
            },
            other => SessionError {
                message: other.to_string(),
                traceback: None,
            },
        }
    }
}

/// Blocking connect-per-request oracle client.
#[derive(Debug, Clone)]
pub struct OracleClient {
    addr: String,
    timeout: Duration,
}

impl OracleClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn call(&self, request: &OracleRequest) -> Result<DebuggerSnapshot, OracleError> {
        let mut stream = TcpStream::connect(&self.addr)?;
        stream.set_read_timeout(Some(self.timeout))?;
        let mut reader = BufReader::new(stream.try_clone()?);

        let line = serde_json::to_string(request)?;
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;

        let mut reply = String::new();
        reader.read_line(&mut reply)?;
        match serde_json::from_str::<OracleReply>(reply.trim())? {
            OracleReply::Snapshot(snapshot) => Ok(snapshot),
            OracleReply::Error { error, traceback } => {
                Err(OracleError::Remote { error, traceback })
            }
        }
    }
}

/// Outcome of one worker request, polled from the UI thread.
pub type WorkerDone = (DebugOp, Result<DebuggerSnapshot, OracleError>);

/// Background request runner.
///
/// Requests enter through a one-slot channel and results come back on a
/// done channel drained once per frame, so the UI thread never blocks on
/// the network. If the consuming side disappears mid-request, the late
/// result is dropped with the channel.
pub struct OracleWorker {
    tx: mpsc::SyncSender<(DebugOp, OracleRequest)>,
    rx_done: mpsc::Receiver<WorkerDone>,
}

impl OracleWorker {
    pub fn spawn(client: OracleClient) -> Self {
        let (tx, rx) = mpsc::sync_channel::<(DebugOp, OracleRequest)>(1);
        let (tx_done, rx_done) = mpsc::channel::<WorkerDone>();

        thread::spawn(move || {
            while let Ok((op, request)) = rx.recv() {
                let result = client.call(&request);
                if let Err(e) = &result {
                    warn!("oracle {:?} failed: {}", op, e);
                }
                if tx_done.send((op, result)).is_err() {
                    break;
                }
            }
        });

        Self { tx, rx_done }
    }

    /// Hand one request to the worker. Refuses when the slot is taken or
    /// the thread is gone, returning the request to the caller; the
    /// trigger is dropped, not queued.
    pub fn submit(
        &self,
        op: DebugOp,
        request: OracleRequest,
    ) -> Result<(), (DebugOp, OracleRequest)> {
        self.tx.try_send((op, request)).map_err(|e| match e {
            mpsc::TrySendError::Full(v) => v,
            mpsc::TrySendError::Disconnected(v) => v,
        })
    }

    /// Non-blocking poll for a finished request.
    pub fn poll_done(&self) -> Option<WorkerDone> {
        self.rx_done.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::DebugStatus;
    use serde_json::json;
    use std::net::TcpListener;

    #[test]
    fn request_wire_shape() {
        let line = serde_json::to_string(&OracleRequest::Load {
            source: "circuit = Circuit()".to_string(),
        })
        .unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&line).unwrap(),
            json!({"type": "Load", "source": "circuit = Circuit()"})
        );

        let step: OracleRequest = serde_json::from_str(r#"{"type":"Step"}"#).unwrap();
        assert!(matches!(step, OracleRequest::Step));
    }

    #[test]
    fn reply_decodes_snapshot_and_error() {
        let reply: OracleReply = serde_json::from_value(json!({
            "type": "Snapshot",
            "status": "Loaded",
            "current_step": 0,
            "total_steps": 2,
        }))
        .unwrap();
        match reply {
            OracleReply::Snapshot(s) => {
                assert_eq!(s.status, DebugStatus::Loaded);
                assert_eq!(s.current_step, 0);
            }
            OracleReply::Error { .. } => panic!("expected a snapshot"),
        }

        let reply: OracleReply =
            serde_json::from_value(json!({"type": "Error", "error": "SyntaxError"})).unwrap();
        match reply {
            OracleReply::Error { error, traceback } => {
                assert_eq!(error, "SyntaxError");
                assert!(traceback.is_none());
            }
            OracleReply::Snapshot(_) => panic!("expected an error"),
        }
    }

    /// One-shot fake oracle: accepts a single connection, reads one
    /// request line, answers with `reply`.
    fn fake_oracle(reply: serde_json::Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(sock.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut sock = sock;
            sock.write_all(reply.to_string().as_bytes()).unwrap();
            sock.write_all(b"\n").unwrap();
        });
        addr
    }

    #[test]
    fn client_round_trips_a_snapshot() {
        let addr = fake_oracle(json!({
            "type": "Snapshot",
            "status": "Loaded",
            "current_step": 0,
            "total_steps": 3,
            "current_gate_info": "Circuit Loaded",
        }));
        let client = OracleClient::new(addr).with_timeout(Duration::from_secs(5));
        let snapshot = client.call(&OracleRequest::Info).unwrap();
        assert_eq!(snapshot.total_steps, 3);
    }

    #[test]
    fn client_surfaces_remote_errors_verbatim() {
        let addr = fake_oracle(json!({
            "type": "Error",
            "error": "SyntaxError",
            "traceback": "Traceback (most recent call last): ...",
        }));
        let client = OracleClient::new(addr).with_timeout(Duration::from_secs(5));
        let err = client.call(&OracleRequest::Step).unwrap_err();
        match &err {
            OracleError::Remote { error, traceback } => {
                assert_eq!(error, "SyntaxError");
                assert!(traceback.as_deref().unwrap().starts_with("Traceback"));
            }
            other => panic!("expected a remote error, got {other:?}"),
        }
        assert_eq!(err.to_session_error().message, "SyntaxError");
    }

    #[test]
    fn worker_round_trips_without_blocking_the_caller() {
        let addr = fake_oracle(json!({
            "type": "Snapshot",
            "status": "Loaded",
            "current_step": 0,
            "total_steps": 1,
        }));
        let worker = OracleWorker::spawn(
            OracleClient::new(addr).with_timeout(Duration::from_secs(5)),
        );
        worker.submit(DebugOp::Query, OracleRequest::Info).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let done = loop {
            if let Some(done) = worker.poll_done() {
                break done;
            }
            assert!(std::time::Instant::now() < deadline, "worker never finished");
            thread::sleep(Duration::from_millis(5));
        };
        let (op, result) = done;
        assert_eq!(op, DebugOp::Query);
        assert_eq!(result.unwrap().total_steps, 1);
    }

    #[test]
    fn connection_failure_is_an_io_error() {
        // Nothing listens here; the connect fails fast.
        let client =
            OracleClient::new("127.0.0.1:1").with_timeout(Duration::from_millis(200));
        match client.call(&OracleRequest::Info) {
            Err(OracleError::Io(_)) => {}
            other => panic!("expected an io error, got {other:?}"),
        }
    }
}
