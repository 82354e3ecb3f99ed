//! Read-only waveform data for display. Nothing here mutates a clip.

use crate::Clip;

/// One downsampled point: horizontal pixel and mean amplitude of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformPoint {
    pub x: f64,
    pub amplitude: f32,
}

/// Maps the active window of a clip onto an editor surface `width` pixels
/// wide. `samples` is one decoded channel of the clip's whole recording.
#[derive(Debug, Clone, Copy)]
pub struct WaveformView<'a> {
    samples: &'a [f32],
    sample_start: usize,
    sample_end: usize,
    width: f64,
    window: usize,
    position: f64,
    duration: f64,
}

impl<'a> WaveformView<'a> {
    pub fn new(clip: &Clip, samples: &'a [f32], width: f64, window: usize) -> Self {
        let len = samples.len();
        let to_index = |seconds: f64| -> usize {
            if clip.raw_duration <= 0.0 {
                return 0;
            }
            let ratio = ((seconds - clip.origin) / clip.raw_duration).clamp(0.0, 1.0);
            (ratio * len as f64).round() as usize
        };

        Self {
            samples,
            sample_start: to_index(clip.start),
            sample_end: to_index(clip.end),
            width: width.max(0.0),
            window: window.max(1),
            position: clip.position,
            duration: clip.duration(),
        }
    }

    /// A fresh pass over the points. Each call starts from the beginning,
    /// and the returned iterator can itself be cloned to restart.
    pub fn points(&self) -> WaveformPoints<'a> {
        WaveformPoints {
            samples: self.samples,
            cursor: self.sample_start,
            sample_start: self.sample_start,
            sample_end: self.sample_end,
            width: self.width,
            window: self.window,
        }
    }

    /// Horizontal pixel of the playline inside this view, if the transport
    /// is currently over the clip.
    pub fn playline_x(&self, transport_seconds: f64) -> Option<f64> {
        if self.duration <= 0.0 {
            return None;
        }
        let ratio = (transport_seconds - self.position) / self.duration;
        (0.0..=1.0)
            .contains(&ratio)
            .then(|| ratio * self.width)
    }
}

#[derive(Debug, Clone)]
pub struct WaveformPoints<'a> {
    samples: &'a [f32],
    cursor: usize,
    sample_start: usize,
    sample_end: usize,
    width: f64,
    window: usize,
}

impl Iterator for WaveformPoints<'_> {
    type Item = WaveformPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.sample_end {
            return None;
        }

        let i = self.cursor;
        let chunk_end = (i + self.window).min(self.samples.len());
        let chunk = self.samples.get(i..chunk_end).unwrap_or(&[]);
        let amplitude = chunk.iter().sum::<f32>() / self.window as f32;

        let span = (self.sample_end - self.sample_start) as f64;
        let x = (i - self.sample_start) as f64 / span * self.width;

        self.cursor += self.window;
        Some(WaveformPoint { x, amplitude })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sample_end.saturating_sub(self.cursor).div_ceil(self.window);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioHandle, ChannelId, ClipId};

    fn clip(position: f64, start: f64, end: f64, origin: f64, raw: f64) -> Clip {
        Clip {
            id: ClipId(1),
            channel_id: ChannelId(0),
            position,
            start,
            end,
            origin,
            raw_duration: raw,
            muted: false,
            solo: false,
            loaded: true,
            audio: AudioHandle::new("take"),
        }
    }

    #[test]
    fn test_points_cover_only_cropped_window() {
        // 1000 samples over 10s, window cropped to [2, 4]
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let view = WaveformView::new(&clip(0.0, 2.0, 4.0, 0.0, 10.0), &samples, 200.0, 50);

        let points: Vec<WaveformPoint> = view.points().collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[2].x, 100.0);
        // First window averages samples 200..250
        assert!((points[0].amplitude - 224.5).abs() < 1e-3);
    }

    #[test]
    fn test_points_are_restartable() {
        let samples = vec![0.25f32; 400];
        let view = WaveformView::new(&clip(0.0, 0.0, 4.0, 0.0, 4.0), &samples, 100.0, 100);

        let mut first = view.points();
        first.next();
        let resumed = first.clone().count();
        assert_eq!(resumed, 3);
        assert_eq!(view.points().count(), 4);
        assert_eq!(view.points().size_hint(), (4, Some(4)));
    }

    #[test]
    fn test_playline_maps_timeline_into_view() {
        let samples = vec![0.0f32; 100];
        let view = WaveformView::new(&clip(10.0, 0.0, 4.0, 0.0, 4.0), &samples, 400.0, 10);

        assert_eq!(view.playline_x(11.0), Some(100.0));
        assert_eq!(view.playline_x(9.0), None);
        assert_eq!(view.playline_x(15.0), None);
    }
}
