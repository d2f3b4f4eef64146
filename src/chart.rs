//! Series model for the 2D running-waveform view.

use crate::frame::WaveFrame;

/// Latest raw frame plus a change counter.
///
/// The revision only advances when the data actually changes, so a
/// repeated identical frame is invisible to the paint side and cached
/// geometry stays valid.
#[derive(Debug, Clone, Default)]
pub struct ChartSeries {
    samples: Vec<u16>,
    revision: u64,
}

impl ChartSeries {
    /// Replace the displayed series with `frame`. Idempotent for
    /// identical frames.
    pub fn set_frame(&mut self, frame: &WaveFrame) {
        if self.samples == frame.samples() {
            return;
        }
        self.samples.clear();
        self.samples.extend_from_slice(frame.samples());
        self.revision += 1;
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Monotonic counter; equal revisions mean identical data.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_frames_do_not_advance_the_revision() {
        let mut series = ChartSeries::default();
        let frame = WaveFrame::from_samples(vec![1, 2, 3]);

        series.set_frame(&frame);
        let first = series.revision();
        series.set_frame(&frame);
        series.set_frame(&frame.clone());

        assert_eq!(series.revision(), first);
        assert_eq!(series.samples(), &[1, 2, 3]);
    }

    #[test]
    fn changed_frames_advance_the_revision() {
        let mut series = ChartSeries::default();
        series.set_frame(&WaveFrame::from_samples(vec![1]));
        let first = series.revision();
        series.set_frame(&WaveFrame::from_samples(vec![2]));
        assert!(series.revision() > first);
        assert_eq!(series.samples(), &[2]);
    }
}
