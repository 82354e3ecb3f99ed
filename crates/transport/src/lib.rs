pub mod protocol;
pub mod waveform;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use protocol::{AudioEngine, ClipPlayback, Command, EngineEvent, MixPlan, Status};
pub use waveform::{WaveformPoint, WaveformPoints, WaveformView};

/// Shortest playable window a clip may be cropped down to, in seconds.
pub const MIN_CLIP_SECONDS: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Opaque reference to a recorded audio resource (a blob URL, a file path,
/// a cache key). Cloning only bumps a refcount, so split halves share it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AudioHandle(Arc<str>);

impl AudioHandle {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioHandle({:?})", &*self.0)
    }
}

/// What the recording subsystem hands over once a capture has stopped.
#[derive(Debug, Clone)]
pub struct RecordingDescriptor {
    pub start_seconds: f64,
    pub stop_seconds: f64,
    pub raw_duration_seconds: f64,
    pub audio: AudioHandle,
}

/// A placed, croppable reference to a recorded audio segment.
///
/// Times are in seconds. `start`/`end` are absolute recording seconds: the
/// recorded buffer covers `[origin, origin + raw_duration]` and the active
/// window `[start, end]` always lies inside it. `position` is where the
/// window's first sample sits on the timeline.
#[derive(Debug, Clone)]
pub struct Clip {
    pub id: ClipId,
    pub channel_id: ChannelId,
    pub position: f64,
    pub start: f64,
    pub end: f64,
    pub origin: f64,
    pub raw_duration: f64,
    pub muted: bool,
    pub solo: bool,
    pub loaded: bool,
    pub audio: AudioHandle,
}

impl Clip {
    /// Length of the active window in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Timeline second at which this clip stops sounding.
    pub fn timeline_end(&self) -> f64 {
        self.position + self.duration()
    }

    /// Read offset into the recorded buffer, in seconds.
    pub fn buffer_offset(&self) -> f64 {
        self.start - self.origin
    }

    /// Last second covered by the recorded buffer.
    pub fn buffer_end(&self) -> f64 {
        self.origin + self.raw_duration
    }

    pub fn timeline_to_window(&self, timeline_seconds: f64) -> f64 {
        timeline_seconds - self.position + self.start
    }

    pub fn window_to_timeline(&self, window_seconds: f64) -> f64 {
        window_seconds - self.start + self.position
    }

    /// Whether `window_seconds` lies strictly inside the active window.
    pub fn strictly_contains(&self, window_seconds: f64) -> bool {
        window_seconds > self.start && window_seconds < self.end
    }

    /// Whether a timeline second falls inside the audible span.
    pub fn covers(&self, timeline_seconds: f64) -> bool {
        timeline_seconds >= self.position && timeline_seconds < self.timeline_end()
    }

    /// Checks the structural invariants a committed clip must satisfy.
    pub fn is_well_formed(&self) -> bool {
        const EPS: f64 = 1e-9;
        self.position >= 0.0
            && self.start <= self.end
            && self.end <= self.start + self.raw_duration + EPS
            && self.start >= self.origin - EPS
            && self.end <= self.buffer_end() + EPS
            && [self.position, self.start, self.end, self.origin, self.raw_duration]
                .iter()
                .all(|v| v.is_finite())
    }
}

/// A lane on the timeline. Clips are kept in insertion order; anything
/// needing time order sorts a copy via [`Channel::clips_by_time`].
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    /// Use insert_clip()/remove_clip() so channel_id stays in sync.
    clips: Vec<Clip>,
    pub muted: bool,
    pub solo: bool,
}

impl Channel {
    pub fn new(id: ChannelId, name: String) -> Self {
        Self {
            id,
            name,
            clips: Vec::new(),
            muted: false,
            solo: false,
        }
    }

    /// Get read-only access to clips
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ClipId) -> bool {
        self.clips.iter().any(|c| c.id == id)
    }

    /// Append a clip, taking ownership of its channel back-reference.
    pub fn insert_clip(&mut self, mut clip: Clip) {
        clip.channel_id = self.id;
        self.clips.push(clip);
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<Clip> {
        let index = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(index))
    }

    /// Clips ordered by timeline position (ties keep insertion order).
    pub fn clips_by_time(&self) -> Vec<&Clip> {
        let mut sorted: Vec<&Clip> = self.clips.iter().collect();
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position));
        sorted
    }

    /// Furthest timeline second reached by any clip on this channel.
    pub fn end(&self) -> f64 {
        self.clips
            .iter()
            .map(Clip::timeline_end)
            .fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
