//! Debugger session state machine.
//!
//! The execution oracle owns the truth about circuit state; this module
//! keeps the client consistent with it. States form a closed set and
//! every operation passes through [`DebuggerSession::begin`] /
//! [`DebuggerSession::apply`], so there is exactly one place that can
//! refuse a misuse and exactly one place that commits a response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::frame::WaveFrame;

/// Closed set of debugger states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DebugStatus {
    #[default]
    NoCircuit,
    Loaded,
    Stepping,
    Finished,
    Error,
}

impl DebugStatus {
    pub fn label(self) -> &'static str {
        match self {
            DebugStatus::NoCircuit => "No Circuit",
            DebugStatus::Loaded => "Loaded",
            DebugStatus::Stepping => "Stepping",
            DebugStatus::Finished => "Finished",
            DebugStatus::Error => "Error",
        }
    }
}

/// Probability of reading |0> / |1> on one qubit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QubitProbability {
    #[serde(rename = "0")]
    pub p0: f64,
    #[serde(rename = "1")]
    pub p1: f64,
}

/// Complete oracle-reported state after a debugger operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DebuggerSnapshot {
    pub status: DebugStatus,
    pub current_step: i64,
    pub total_steps: i64,
    #[serde(default)]
    pub current_gate_info: String,
    #[serde(default)]
    pub qubit_probabilities: BTreeMap<String, QubitProbability>,
    /// Raw waveform for the visualization pipeline. Untrusted; it goes
    /// through the same per-sample validation as live telemetry.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub sphy_waves: Value,
}

impl DebuggerSnapshot {
    pub fn waveform(&self) -> Option<WaveFrame> {
        self.sphy_waves.as_array().map(|v| WaveFrame::from_values(v))
    }
}

/// The four operations a session can issue against the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugOp {
    Load,
    Step,
    Reset,
    Query,
}

/// A remote failure, kept verbatim for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionError {
    pub message: String,
    pub traceback: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{op:?} is not available while the session is {state:?}")]
    InvalidState { op: DebugOp, state: DebugStatus },
    #[error("another debugger request is already in flight")]
    Busy,
}

/// Client-side debugger session.
///
/// At most one mutating request is outstanding: `begin` marks it,
/// `apply` clears it, and every UI trigger is disabled while it is
/// marked. A second trigger is dropped, never queued.
#[derive(Debug, Default)]
pub struct DebuggerSession {
    state: DebugStatus,
    snapshot: Option<DebuggerSnapshot>,
    in_flight: Option<DebugOp>,
    last_error: Option<SessionError>,
}

impl DebuggerSession {
    pub fn state(&self) -> DebugStatus {
        self.state
    }

    /// Latest applied snapshot. Retained across failures: an error never
    /// partially rewrites what the oracle last reported.
    pub fn snapshot(&self) -> Option<&DebuggerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn in_flight(&self) -> Option<DebugOp> {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Whether `op` may be issued right now. This is the signal the UI
    /// uses to enable/disable its controls.
    pub fn can(&self, op: DebugOp) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        match op {
            DebugOp::Load | DebugOp::Query => true,
            DebugOp::Step => matches!(self.state, DebugStatus::Loaded | DebugStatus::Stepping),
            DebugOp::Reset => self.state != DebugStatus::NoCircuit,
        }
    }

    pub fn can_load(&self) -> bool {
        self.can(DebugOp::Load)
    }

    pub fn can_step(&self) -> bool {
        self.can(DebugOp::Step)
    }

    pub fn can_reset(&self) -> bool {
        self.can(DebugOp::Reset)
    }

    /// Mark `op` as in flight. Rejects while busy or from a state that
    /// does not permit the operation.
    pub fn begin(&mut self, op: DebugOp) -> Result<(), TransitionError> {
        if self.in_flight.is_some() {
            return Err(TransitionError::Busy);
        }
        if !self.can(op) {
            return Err(TransitionError::InvalidState {
                op,
                state: self.state,
            });
        }
        self.in_flight = Some(op);
        Ok(())
    }

    /// Drop the in-flight mark without applying anything. Used when a
    /// request could not actually be handed to the transport.
    pub fn retract(&mut self) {
        self.in_flight = None;
    }

    /// Commit the oracle's response for `op`.
    ///
    /// Success rewrites the snapshot and derives the next state; failure
    /// moves to `Error`, keeps the prior snapshot, and stores the remote
    /// message verbatim. Recovery from `Error` is an explicit load or
    /// reset.
    pub fn apply(&mut self, op: DebugOp, result: Result<DebuggerSnapshot, SessionError>) {
        self.in_flight = None;
        match result {
            Ok(snapshot) => {
                self.last_error = None;
                self.state = match op {
                    DebugOp::Load | DebugOp::Reset => DebugStatus::Loaded,
                    DebugOp::Step => {
                        if snapshot.current_step < snapshot.total_steps {
                            DebugStatus::Stepping
                        } else {
                            DebugStatus::Finished
                        }
                    }
                    DebugOp::Query => snapshot.status,
                };
                info!(
                    "debugger {:?} -> {:?} (step {}/{})",
                    op, self.state, snapshot.current_step, snapshot.total_steps
                );
                self.snapshot = Some(snapshot);
            }
            Err(err) => {
                info!("debugger {:?} failed: {}", op, err.message);
                self.state = DebugStatus::Error;
                self.last_error = Some(err);
            }
        }
    }

    /// One line for the status field: the state label, or the error
    /// message while in `Error`.
    pub fn status_text(&self) -> String {
        match (&self.state, &self.last_error) {
            (DebugStatus::Error, Some(err)) => err.message.clone(),
            (state, _) => state.label().to_string(),
        }
    }
}
