/// Horizontal scale shared by every component that converts between
/// layout coordinates and seconds.
pub const PIXELS_PER_SECOND: f64 = 100.0;

/// Visual height of one channel lane, in pixels.
pub const CHANNEL_HEIGHT: f64 = 100.0;

/// Seeks landing closer than this to zero snap to zero.
pub const SEEK_FLOOR_SECONDS: f64 = 0.1;

const RULER_MINOR_PIXELS: f64 = 25.0;
const RULER_MAJOR_PIXELS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub pixels_per_second: f64,
    pub channel_height: f64,
}

impl TimeScale {
    pub fn new(pixels_per_second: f64, channel_height: f64) -> Self {
        Self {
            pixels_per_second,
            channel_height,
        }
    }

    pub fn seconds_to_pixels(&self, seconds: f64) -> f64 {
        seconds * self.pixels_per_second
    }

    pub fn pixels_to_seconds(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_second
    }

    /// Lane under a vertical offset (pixels from the top of the first
    /// lane), clamped to the lanes that exist.
    pub fn lane_at(&self, y: f64, lanes: usize) -> Option<usize> {
        if lanes == 0 || !y.is_finite() {
            return None;
        }
        let lane = (y / self.channel_height).floor().max(0.0) as usize;
        Some(lane.min(lanes - 1))
    }

    /// Transport second for a click or drag at `x` pixels.
    pub fn seek_target(&self, x: f64) -> f64 {
        let seconds = self.pixels_to_seconds(x);
        if seconds < SEEK_FLOOR_SECONDS { 0.0 } else { seconds }
    }

    /// Tick marks for a ruler spanning `transport_length` seconds.
    pub fn ruler(&self, transport_length: f64) -> impl Iterator<Item = RulerMark> + '_ {
        let width = self.seconds_to_pixels(transport_length.max(0.0));
        let count = (width / RULER_MINOR_PIXELS).ceil() as usize;
        (0..count).map(move |i| {
            let pixels = i as f64 * RULER_MINOR_PIXELS;
            RulerMark {
                pixels,
                seconds: self.pixels_to_seconds(pixels),
                major: pixels % RULER_MAJOR_PIXELS == 0.0,
            }
        })
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(PIXELS_PER_SECOND, CHANNEL_HEIGHT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerMark {
    pub pixels: f64,
    pub seconds: f64,
    pub major: bool,
}

impl RulerMark {
    /// Major marks past the origin carry a seconds label.
    pub fn label(&self) -> Option<String> {
        (self.major && self.pixels > 0.0).then(|| format!("{}", self.seconds))
    }
}

/// Round `seconds` to the nearest multiple of `grid`.
pub fn snap(seconds: f64, grid: f64) -> f64 {
    if grid <= 0.0 || !grid.is_finite() {
        return seconds;
    }
    (seconds / grid).round() * grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

impl Timecode {
    pub fn from_seconds(seconds: f64) -> Self {
        let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
        Self {
            minutes: (total_millis / 60_000) as u32,
            seconds: ((total_millis / 1000) % 60) as u32,
            millis: (total_millis % 1000) as u32,
        }
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:02}.{:03}", self.minutes, self.seconds, self.millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_round_trip_at_default_scale() {
        let scale = TimeScale::default();

        assert_eq!(scale.seconds_to_pixels(1.5), 150.0);
        assert_eq!(scale.pixels_to_seconds(250.0), 2.5);
    }

    #[test]
    fn test_lane_at_clamps_to_existing_lanes() {
        let scale = TimeScale::default();

        assert_eq!(scale.lane_at(0.0, 3), Some(0));
        assert_eq!(scale.lane_at(99.9, 3), Some(0));
        assert_eq!(scale.lane_at(100.0, 3), Some(1));
        assert_eq!(scale.lane_at(-40.0, 3), Some(0));
        assert_eq!(scale.lane_at(1000.0, 3), Some(2));
        assert_eq!(scale.lane_at(10.0, 0), None);
    }

    #[test]
    fn test_seek_target_floors_near_zero() {
        let scale = TimeScale::default();

        assert_eq!(scale.seek_target(5.0), 0.0);
        assert_eq!(scale.seek_target(10.0), 0.1);
        assert_eq!(scale.seek_target(420.0), 4.2);
    }

    #[test]
    fn test_ruler_marks() {
        let scale = TimeScale::default();
        let marks: Vec<RulerMark> = scale.ruler(1.0).collect();

        assert_eq!(marks.len(), 4);
        assert!(marks[0].major);
        assert!(!marks[1].major);
        assert!(marks[2].major);
        assert_eq!(marks[0].label(), None);
        assert_eq!(marks[2].label().as_deref(), Some("0.5"));
    }

    #[test]
    fn test_snap_rounds_to_nearest_grid_unit() {
        assert_eq!(snap(1.24, 0.5), 1.0);
        assert_eq!(snap(1.26, 0.5), 1.5);
        assert_eq!(snap(3.3, 0.0), 3.3);
    }

    #[test]
    fn test_timecode_display() {
        assert_eq!(Timecode::from_seconds(83.0456).to_string(), "1:23.046");
        assert_eq!(Timecode::from_seconds(0.0).to_string(), "0:00.000");
    }
}
