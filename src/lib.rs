//! Client-side core for the SPHY quantum development environment:
//! waveform telemetry pipeline (validation, downsampling, history ring,
//! fan-out) and the debugger session state machine that keeps the client
//! consistent with the remote execution oracle.

pub mod chart;
pub mod debugger;
pub mod frame;
pub mod history;
pub mod oracle;
pub mod router;
pub mod telemetry;
