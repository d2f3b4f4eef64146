//! 2D running-waveform panel.
//!
//! Shows the latest raw frame, index on X, fixed 12-bit amplitude
//! domain on Y. The polyline is cached and rebuilt only when the series
//! revision or the panel geometry changes.

use macroquad::prelude::*;

use sphy::chart::ChartSeries;
use sphy::frame::WAVE_MAX;

use crate::hud;

const PAD: f32 = 12.0;
const SERIES_COLOR: Color = Color::new(0.18, 0.63, 0.26, 1.0);

pub struct ChartPanel {
    points: Vec<Vec2>,
    revision: u64,
    last_rect: (f32, f32, f32, f32),
}

impl ChartPanel {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            revision: u64::MAX,
            last_rect: (0.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn draw(&mut self, rect: Rect, series: &ChartSeries) {
        if rect.w < 2.0 || rect.h < 2.0 {
            return;
        }

        hud::draw_panel(rect);
        draw_text(
            "SPHY Wave (12-bit)",
            rect.x + PAD,
            rect.y + 18.0,
            16.0,
            LIGHTGRAY,
        );
        draw_text(
            &format!("{WAVE_MAX}"),
            rect.x + 4.0,
            rect.y + PAD + 8.0,
            12.0,
            GRAY,
        );
        draw_text("0", rect.x + 4.0, rect.y + rect.h - 4.0, 12.0, GRAY);

        let geometry = (rect.x, rect.y, rect.w, rect.h);
        if series.revision() != self.revision || geometry != self.last_rect {
            self.rebuild(rect, series);
            self.revision = series.revision();
            self.last_rect = geometry;
        }

        for pair in self.points.windows(2) {
            draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 1.5, SERIES_COLOR);
        }
    }

    fn rebuild(&mut self, rect: Rect, series: &ChartSeries) {
        self.points.clear();
        let samples = series.samples();
        if samples.is_empty() {
            return;
        }

        let inner_w = rect.w - 2.0 * PAD;
        let inner_h = rect.h - 2.0 * PAD;
        let span = (samples.len().saturating_sub(1)).max(1) as f32;
        for (i, &amp) in samples.iter().enumerate() {
            let x = rect.x + PAD + (i as f32 / span) * inner_w;
            let y = rect.y + rect.h - PAD
                - (f32::from(amp) / f32::from(WAVE_MAX)) * inner_h;
            self.points.push(vec2(x, y));
        }
    }
}
