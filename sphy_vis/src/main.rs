//! SPHY telemetry and debugger client.
//!
//! One free-running frame loop: drain the telemetry channel, poll the
//! oracle worker, apply camera input, render. Data arrival never drives
//! repainting: the loop repaints every tick from current state, so an
//! irregular stream cannot stutter the view.

use std::env;
use std::fs;
use std::path::PathBuf;

use macroquad::prelude::*;
use tracing::{info, warn};

use sphy::debugger::{DebugOp, DebuggerSession};
use sphy::frame::RING_COLS;
use sphy::history::RING_ROWS;
use sphy::oracle::{OracleClient, OracleRequest, OracleWorker};
use sphy::router::TelemetryRouter;
use sphy::telemetry::TelemetryStream;

mod camera;
mod chart;
mod hud;
mod volumetric;

use camera::OrbitCamera;
use chart::ChartPanel;
use volumetric::VolumetricSurface;

// Space reserved for controls + HUD text.
const TOP_UI_H: f32 = 190.0;
const UI_MARGIN: f32 = 12.0;
const UI_GAP: f32 = 6.0;
const BTN_H: f32 = 28.0;
const BTN_W: f32 = 110.0;
const CHART_H: f32 = 180.0;
const HUD_LINE_H: f32 = 20.0;
const CONSOLE_LINES: usize = 3;

#[derive(Debug, Clone)]
struct VisConfig {
    oracle_addr: String,
    telemetry_addr: String,
    circuit_path: PathBuf,
}

impl VisConfig {
    fn from_env_and_args() -> Self {
        let mut oracle_addr =
            env::var("SPHY_ORACLE_ADDR").unwrap_or_else(|_| "127.0.0.1:9178".to_string());
        let mut telemetry_addr =
            env::var("SPHY_TELEMETRY_ADDR").unwrap_or_else(|_| "127.0.0.1:9179".to_string());
        let mut circuit_path = env::var("SPHY_CIRCUIT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("circuit.py"));

        let mut args = env::args().skip(1);
        while let Some(a) = args.next() {
            match a.as_str() {
                "--oracle" => {
                    if let Some(v) = args.next() {
                        oracle_addr = v;
                    }
                }
                "--telemetry" => {
                    if let Some(v) = args.next() {
                        telemetry_addr = v;
                    }
                }
                "--circuit" => {
                    if let Some(v) = args.next() {
                        circuit_path = PathBuf::from(v);
                    }
                }
                _ => {}
            }
        }

        Self {
            oracle_addr,
            telemetry_addr,
            circuit_path,
        }
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "SPHY Scope".to_string(),
        window_width: 1280,
        window_height: 800,
        ..Default::default()
    }
}

fn push_console(console: &mut Vec<String>, line: String) {
    console.push(line);
    if console.len() > CONSOLE_LINES {
        let drop = console.len() - CONSOLE_LINES;
        console.drain(0..drop);
    }
}

/// Issue one oracle operation if the session permits it right now. A
/// refused trigger is dropped, never queued.
fn request(
    session: &mut DebuggerSession,
    worker: &OracleWorker,
    console: &mut Vec<String>,
    op: DebugOp,
    req: OracleRequest,
) {
    if session.begin(op).is_err() {
        return;
    }
    if worker.submit(op, req).is_err() {
        session.retract();
        push_console(console, format!("{op:?} dropped: request slot busy"));
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt::init();
    let cfg = VisConfig::from_env_and_args();
    info!(
        "oracle @ {}, telemetry @ {}",
        cfg.oracle_addr, cfg.telemetry_addr
    );

    let mut router = TelemetryRouter::new();
    let mut session = DebuggerSession::default();
    let worker = OracleWorker::spawn(OracleClient::new(cfg.oracle_addr.clone()));

    let mut telemetry = match TelemetryStream::connect(&cfg.telemetry_addr) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!("telemetry connect {} failed: {}", cfg.telemetry_addr, e);
            None
        }
    };

    let mut orbit = OrbitCamera::new();
    let mut volumetric = VolumetricSurface::new(RING_ROWS, RING_COLS);
    // Built lazily on the first frame that has data, reused afterwards.
    let mut chart_panel: Option<ChartPanel> = None;
    let mut console: Vec<String> = Vec::new();

    // Resync with an oracle that may already hold a loaded circuit
    // (process restart is the page-reload of this client).
    request(
        &mut session,
        &worker,
        &mut console,
        DebugOp::Query,
        OracleRequest::Info,
    );

    loop {
        // Data first, render second; this part also runs when the
        // window is degenerate, so the session keeps working headless.
        if let Some(stream) = &telemetry {
            for payload in stream.drain() {
                router.ingest(&payload);
            }
        }

        if let Some((op, result)) = worker.poll_done() {
            match result {
                Ok(snapshot) => {
                    push_console(
                        &mut console,
                        format!(
                            "{:?}: step {}/{} {}",
                            op,
                            snapshot.current_step,
                            snapshot.total_steps,
                            snapshot.current_gate_info
                        ),
                    );
                    router.ingest_snapshot(&snapshot);
                    session.apply(op, Ok(snapshot));
                }
                Err(e) => {
                    let err = e.to_session_error();
                    push_console(&mut console, format!("{op:?} failed: {}", err.message));
                    if let Some(tb) = &err.traceback {
                        if let Some(last) = tb.lines().rev().find(|l| !l.trim().is_empty()) {
                            push_console(&mut console, last.trim().to_string());
                        }
                    }
                    session.apply(op, Err(err));
                }
            }
        }

        let screen_w = screen_width();
        let screen_h = screen_height();
        if screen_w < 2.0 || screen_h < 2.0 {
            next_frame().await;
            continue;
        }

        let top_panel = Rect::new(0.0, 0.0, screen_w, TOP_UI_H);
        let chart_rect = Rect::new(
            UI_MARGIN,
            screen_h - CHART_H - UI_MARGIN,
            (screen_w * 0.45).clamp(220.0, 560.0),
            CHART_H,
        );

        let (mx, my) = mouse_position();
        let ui_captured =
            top_panel.contains(vec2(mx, my)) || chart_rect.contains(vec2(mx, my));
        let dt = get_frame_time();
        orbit.update(dt, ui_captured);

        clear_background(Color::from_rgba(13, 17, 23, 255));

        let cam = orbit.camera();
        set_camera(&cam);
        volumetric.draw_floor();
        volumetric.sync(router.ring(), &cam);
        volumetric.draw();
        set_default_camera();

        if chart_panel.is_none() && !router.chart().is_empty() {
            chart_panel = Some(ChartPanel::new());
        }
        if let Some(panel) = &mut chart_panel {
            panel.draw(chart_rect, router.chart());
        }

        // Header bar.
        draw_rectangle(0.0, 0.0, screen_w, TOP_UI_H, Color::new(0.07, 0.07, 0.09, 0.92));
        draw_line(0.0, TOP_UI_H, screen_w, TOP_UI_H, 1.0, DARKGRAY);

        let b_load = Rect::new(UI_MARGIN, UI_MARGIN, BTN_W, BTN_H);
        let b_step = Rect::new(UI_MARGIN + BTN_W + UI_GAP, UI_MARGIN, BTN_W, BTN_H);
        let b_reset = Rect::new(UI_MARGIN + 2.0 * (BTN_W + UI_GAP), UI_MARGIN, BTN_W, BTN_H);

        if hud::button(b_load, "Load Circuit", session.can_load()) {
            match fs::read_to_string(&cfg.circuit_path) {
                Ok(source) => {
                    push_console(
                        &mut console,
                        format!("loading {}", cfg.circuit_path.display()),
                    );
                    request(
                        &mut session,
                        &worker,
                        &mut console,
                        DebugOp::Load,
                        OracleRequest::Load { source },
                    );
                }
                Err(e) => push_console(
                    &mut console,
                    format!("read {}: {}", cfg.circuit_path.display(), e),
                ),
            }
        }
        if hud::button(b_step, "Step", session.can_step()) {
            request(
                &mut session,
                &worker,
                &mut console,
                DebugOp::Step,
                OracleRequest::Step,
            );
        }
        if hud::button(b_reset, "Reset", session.can_reset()) {
            request(
                &mut session,
                &worker,
                &mut console,
                DebugOp::Reset,
                OracleRequest::Reset,
            );
        }

        let stream_alive = telemetry
            .as_ref()
            .map(|s| s.is_connected())
            .unwrap_or(false);
        if !stream_alive {
            let b_re = Rect::new(
                UI_MARGIN + 3.0 * (BTN_W + UI_GAP),
                UI_MARGIN,
                BTN_W,
                BTN_H,
            );
            if hud::button(b_re, "Reconnect", true) {
                match TelemetryStream::connect(&cfg.telemetry_addr) {
                    Ok(stream) => {
                        push_console(&mut console, "telemetry reconnected".to_string());
                        telemetry = Some(stream);
                    }
                    Err(e) => push_console(
                        &mut console,
                        format!("reconnect {}: {}", cfg.telemetry_addr, e),
                    ),
                }
            }
        }

        // Right side: mode badge + LED row.
        let badge = Rect::new(screen_w - UI_MARGIN - BTN_W, UI_MARGIN, BTN_W, BTN_H);
        hud::mode_badge(badge, router.hardware());
        let led_w = router.leds().len() as f32 * 20.0;
        hud::led_row(
            badge.x - led_w - UI_GAP,
            UI_MARGIN + BTN_H * 0.5,
            router.leds(),
        );

        // HUD text block.
        let mut y = UI_MARGIN + BTN_H + 24.0;
        draw_text(
            &format!("Debugger: {}", session.status_text()),
            UI_MARGIN,
            y,
            20.0,
            WHITE,
        );
        y += HUD_LINE_H;
        if let Some(snap) = session.snapshot() {
            draw_text(
                &format!(
                    "Step {}/{}  {}",
                    snap.current_step, snap.total_steps, snap.current_gate_info
                ),
                UI_MARGIN,
                y,
                18.0,
                LIGHTGRAY,
            );
            y += HUD_LINE_H;
            if !snap.qubit_probabilities.is_empty() {
                let probs = snap
                    .qubit_probabilities
                    .iter()
                    .map(|(q, p)| format!("{q}: |0> {:.3} |1> {:.3}", p.p0, p.p1))
                    .collect::<Vec<_>>()
                    .join("   ");
                draw_text(&probs, UI_MARGIN, y, 18.0, LIGHTGRAY);
                y += HUD_LINE_H;
            }
        }
        let stream_label = if stream_alive { "live" } else { "disconnected" };
        draw_text(
            &format!(
                "Telemetry: {} | frames {} | fps {:.0}",
                stream_label,
                router.frames_ingested(),
                get_fps()
            ),
            UI_MARGIN,
            y,
            18.0,
            GRAY,
        );
        y += HUD_LINE_H;

        for line in &console {
            draw_text(line, UI_MARGIN, y, 16.0, Color::from_rgba(139, 148, 158, 255));
            y += HUD_LINE_H - 4.0;
        }

        next_frame().await;
    }
}
