//! Headless client for the SPHY execution oracle and telemetry stream.
//!
//! Examples:
//!   sphy-cli info
//!   sphy-cli load bell_pair.py
//!   sphy-cli step
//!   sphy-cli step 5
//!   sphy-cli reset
//!   sphy-cli watch 10
//!
//! By default it talks to the oracle at 127.0.0.1:9178; override with
//! `--addr host:port`. `watch` reads the telemetry push stream at
//! 127.0.0.1:9179 by default; override with `--telemetry host:port`.

use std::fs;
use std::process;
use std::time::Duration;

use sphy::debugger::{DebugOp, DebugStatus, DebuggerSession, DebuggerSnapshot};
use sphy::oracle::{OracleClient, OracleRequest};
use sphy::telemetry::TelemetryStream;

fn usage() -> ! {
    eprintln!("sphy-cli (talks to the oracle @ 127.0.0.1:9178 by default)");
    eprintln!("Usage: sphy-cli [--addr host:port] [--telemetry host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  info                 Show the oracle's current snapshot");
    eprintln!("  load <file>          Load circuit source for debugging");
    eprintln!("  step [n]             Execute one (or n) debugger steps");
    eprintln!("  reset                Return the loaded circuit to step 0");
    eprintln!("  watch [frames]       Print telemetry frames as they arrive (default 10)");
    process::exit(1);
}

struct CliConfig {
    oracle_addr: String,
    telemetry_addr: String,
    args: Vec<String>,
}

fn parse_args() -> CliConfig {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut oracle_addr = "127.0.0.1:9178".to_string();
    let mut telemetry_addr = "127.0.0.1:9179".to_string();

    loop {
        if args.len() >= 2 && args[0] == "--addr" {
            oracle_addr = args[1].clone();
            args.drain(0..2);
        } else if args.len() >= 2 && args[0] == "--telemetry" {
            telemetry_addr = args[1].clone();
            args.drain(0..2);
        } else {
            break;
        }
    }

    if args.is_empty() {
        usage();
    }

    CliConfig {
        oracle_addr,
        telemetry_addr,
        args,
    }
}

fn print_snapshot(snapshot: &DebuggerSnapshot) {
    println!(
        "status={} step={}/{} gate={:?}",
        snapshot.status.label(),
        snapshot.current_step,
        snapshot.total_steps,
        snapshot.current_gate_info,
    );
    for (qubit, prob) in &snapshot.qubit_probabilities {
        println!("  {qubit}: |0> {:.4}  |1> {:.4}", prob.p0, prob.p1);
    }
    if let Some(frame) = snapshot.waveform() {
        let peak = frame.samples().iter().copied().max().unwrap_or(0);
        println!("  waveform: {} samples, peak {}", frame.len(), peak);
    }
}

/// Run one operation through the session so the CLI obeys the same
/// state machine as the UI.
fn run_op(
    session: &mut DebuggerSession,
    client: &OracleClient,
    op: DebugOp,
    request: OracleRequest,
) -> Result<(), String> {
    session.begin(op).map_err(|e| e.to_string())?;
    let result = client.call(&request);
    match result {
        Ok(snapshot) => {
            session.apply(op, Ok(snapshot.clone()));
            print_snapshot(&snapshot);
            Ok(())
        }
        Err(e) => {
            let session_error = e.to_session_error();
            let mut text = session_error.message.clone();
            if let Some(tb) = &session_error.traceback {
                text = format!("{text}\n{tb}");
            }
            session.apply(op, Err(session_error));
            Err(text)
        }
    }
}

/// Resync with the oracle before a mutating command, so the CLI starts
/// from the state the oracle is actually in.
fn resync(session: &mut DebuggerSession, client: &OracleClient) {
    if session.begin(DebugOp::Query).is_err() {
        return;
    }
    let result = client
        .call(&OracleRequest::Info)
        .map_err(|e| e.to_session_error());
    session.apply(DebugOp::Query, result);
}

fn watch(addr: &str, frames: usize) -> Result<(), String> {
    let stream = TelemetryStream::connect(addr).map_err(|e| format!("connect {addr}: {e}"))?;
    let mut seen = 0usize;
    while seen < frames {
        let Some(payload) = stream.recv_timeout(Duration::from_secs(30)) else {
            if !stream.is_connected() {
                return Err("telemetry stream closed".to_string());
            }
            return Err("timed out waiting for telemetry".to_string());
        };
        seen += 1;

        let wave = payload
            .frame()
            .map(|f| {
                let peak = f.samples().iter().copied().max().unwrap_or(0);
                format!("{} samples, peak {}", f.len(), peak)
            })
            .unwrap_or_else(|| "-".to_string());
        let leds = payload
            .leds()
            .map(|l| {
                l.iter()
                    .map(|&on| if on { '#' } else { '.' })
                    .collect::<String>()
            })
            .unwrap_or_else(|| "-".to_string());
        let mode = match payload.hardware() {
            Some(true) => "HARDWARE",
            Some(false) => "SIMULATION",
            None => "-",
        };
        println!("[{seen:>3}] wave: {wave}  leds: {leds}  mode: {mode}");
    }
    Ok(())
}

fn main() {
    let cfg = parse_args();
    let client = OracleClient::new(cfg.oracle_addr.clone());
    let mut session = DebuggerSession::default();

    let result = match cfg.args[0].as_str() {
        "info" => run_op(&mut session, &client, DebugOp::Query, OracleRequest::Info),
        "load" => {
            let Some(path) = cfg.args.get(1) else { usage() };
            match fs::read_to_string(path) {
                Ok(source) => run_op(
                    &mut session,
                    &client,
                    DebugOp::Load,
                    OracleRequest::Load { source },
                ),
                Err(e) => Err(format!("read {path}: {e}")),
            }
        }
        "step" => {
            let count: usize = cfg
                .args
                .get(1)
                .map(|s| s.parse().unwrap_or_else(|_| usage()))
                .unwrap_or(1);
            resync(&mut session, &client);
            if session.state() == DebugStatus::Error {
                Err(session.status_text())
            } else {
                let mut outcome = Ok(());
                for _ in 0..count {
                    if !session.can_step() {
                        println!("(step unavailable: {})", session.status_text());
                        break;
                    }
                    outcome =
                        run_op(&mut session, &client, DebugOp::Step, OracleRequest::Step);
                    if outcome.is_err() {
                        break;
                    }
                }
                outcome
            }
        }
        "reset" => {
            resync(&mut session, &client);
            if !session.can_reset() {
                Err(format!("reset unavailable: {}", session.status_text()))
            } else {
                run_op(&mut session, &client, DebugOp::Reset, OracleRequest::Reset)
            }
        }
        "watch" => {
            let frames: usize = cfg
                .args
                .get(1)
                .map(|s| s.parse().unwrap_or_else(|_| usage()))
                .unwrap_or(10);
            watch(&cfg.telemetry_addr, frames)
        }
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
