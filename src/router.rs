//! Telemetry fan-out.
//!
//! Live telemetry and synthesized debugger snapshots both land here and
//! feed the chart and the history ring identically. The router is the
//! only writer of the ring; the render loop only reads it.

use tracing::warn;

use crate::chart::ChartSeries;
use crate::debugger::DebuggerSnapshot;
use crate::frame::WaveFrame;
use crate::history::HistoryRing;
use crate::telemetry::TelemetryPayload;

/// LED indicators on the target board.
pub const LED_COUNT: usize = 4;

/// Single entry point for inbound frames.
#[derive(Debug)]
pub struct TelemetryRouter {
    chart: ChartSeries,
    ring: HistoryRing,
    leds: Vec<bool>,
    hardware: bool,
    frames: u64,
    warned_bad_waves: bool,
}

impl TelemetryRouter {
    pub fn new() -> Self {
        Self {
            chart: ChartSeries::default(),
            ring: HistoryRing::default(),
            leds: vec![false; LED_COUNT],
            hardware: false,
            frames: 0,
            warned_bad_waves: false,
        }
    }

    /// Apply one push-channel payload.
    ///
    /// Absent fields leave prior state untouched: a payload without
    /// `leds` keeps the last LED display, a payload without a usable
    /// waveform updates indicators only, and nothing here can panic on
    /// partial input.
    pub fn ingest(&mut self, payload: &TelemetryPayload) {
        if let Some(frame) = payload.frame() {
            self.accept_frame(&frame);
        } else if !payload.waves.is_null() && !self.warned_bad_waves {
            self.warned_bad_waves = true;
            warn!("telemetry carried a non-array waveform field; ignoring (logged once)");
        }

        if let Some(leds) = payload.leds() {
            self.leds = leds;
        }
        if let Some(hardware) = payload.hardware() {
            self.hardware = hardware;
        }
    }

    /// Debugger re-injection path: a snapshot that carries a waveform is
    /// treated exactly like live telemetry, except the debugger has no
    /// hardware channel, so mode pins to simulation and the LED row shows
    /// the all-off placeholder.
    pub fn ingest_snapshot(&mut self, snapshot: &DebuggerSnapshot) {
        let Some(frame) = snapshot.waveform() else {
            return;
        };
        self.accept_frame(&frame);
        for led in &mut self.leds {
            *led = false;
        }
        self.hardware = false;
    }

    fn accept_frame(&mut self, frame: &WaveFrame) {
        self.chart.set_frame(frame);
        self.ring.push(frame.downsampled(self.ring.cols()));
        self.frames += 1;
    }

    pub fn chart(&self) -> &ChartSeries {
        &self.chart
    }

    pub fn ring(&self) -> &HistoryRing {
        &self.ring
    }

    pub fn leds(&self) -> &[bool] {
        &self.leds
    }

    pub fn hardware(&self) -> bool {
        self.hardware
    }

    /// Frames accepted into the visualization path since startup.
    pub fn frames_ingested(&self) -> u64 {
        self.frames
    }
}

impl Default for TelemetryRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> TelemetryPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn full_payload_feeds_chart_ring_and_indicators() {
        let mut router = TelemetryRouter::new();
        router.ingest(&payload(json!({
            "waves": [0, 4095, 2048],
            "leds": [true, false, true, false],
            "is_hardware": true,
        })));

        assert_eq!(router.chart().samples(), &[0, 4095, 2048]);
        assert_eq!(router.frames_ingested(), 1);
        assert!(router.hardware());
        assert_eq!(router.leds(), &[true, false, true, false]);
        // Ring row 0 carries the downsampled frame, padded to width.
        let row = router.ring().row(0).unwrap();
        assert_eq!(&row[..3], &[0, 4095, 2048]);
        assert!(row[3..].iter().all(|&s| s == 0));
    }

    #[test]
    fn omitted_leds_keep_prior_display_state() {
        let mut router = TelemetryRouter::new();
        router.ingest(&payload(json!({"leds": [1, 1, 0, 0]})));
        router.ingest(&payload(json!({"waves": [5, 5, 5]})));
        assert_eq!(router.leds(), &[true, true, false, false]);
    }

    #[test]
    fn missing_or_garbage_waves_leave_visuals_untouched() {
        let mut router = TelemetryRouter::new();
        router.ingest(&payload(json!({"waves": [9, 9]})));
        let revision = router.chart().revision();

        router.ingest(&payload(json!({})));
        router.ingest(&payload(json!({"waves": "zap"})));
        router.ingest(&payload(json!({"waves": 17})));

        assert_eq!(router.chart().revision(), revision);
        assert_eq!(router.chart().samples(), &[9, 9]);
        assert_eq!(router.frames_ingested(), 1);
    }

    #[test]
    fn debugger_snapshot_forces_simulation_and_leds_off() {
        let mut router = TelemetryRouter::new();
        router.ingest(&payload(json!({
            "leds": [1, 1, 1, 1],
            "is_hardware": true,
        })));

        let snapshot: DebuggerSnapshot = serde_json::from_value(json!({
            "status": "Stepping",
            "current_step": 1,
            "total_steps": 2,
            "sphy_waves": [7, 8, 9],
        }))
        .unwrap();
        router.ingest_snapshot(&snapshot);

        assert!(!router.hardware());
        assert!(router.leds().iter().all(|&l| !l));
        assert_eq!(router.chart().samples(), &[7, 8, 9]);
    }

    #[test]
    fn snapshot_without_waveform_changes_nothing() {
        let mut router = TelemetryRouter::new();
        router.ingest(&payload(json!({"leds": [1, 0, 0, 0], "is_hardware": true})));

        router.ingest_snapshot(&DebuggerSnapshot::default());
        assert!(router.hardware());
        assert_eq!(router.leds(), &[true, false, false, false]);
    }
}
