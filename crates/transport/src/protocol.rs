//! Messages exchanged between the session and the audio engine, and the
//! trait the session drives the engine through.

use std::sync::Arc;

use crate::{AudioHandle, ClipId};

/// Session → engine. Pushed through a lock-free ring buffer; mix plans
/// travel on their own ring so the audio thread never frees them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    /// `seq` increases with every seek so stale status can be discarded.
    Seek { seconds: f64, seq: u64 },
    SetLength { seconds: f64 },
}

/// Engine → session, once per processed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    /// Transport position, tagged with the last seek the engine applied.
    Position { seconds: f64, seq: u64 },
}

/// Discrete notifications the engine raises on its own clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    ReachedEnd { seconds: f64 },
}

/// How one clip should be scheduled by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlayback {
    pub clip: ClipId,
    pub audio: AudioHandle,
    /// Timeline second the clip starts sounding at.
    pub position: f64,
    /// Read offset into the recorded buffer.
    pub offset: f64,
    pub duration: f64,
    pub audible: bool,
}

impl ClipPlayback {
    pub fn end(&self) -> f64 {
        self.position + self.duration
    }
}

/// The full routing intent for one committed timeline state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixPlan {
    pub clips: Vec<ClipPlayback>,
}

impl MixPlan {
    /// Clips that should be heard at a given timeline second.
    pub fn audible_at(&self, seconds: f64) -> impl Iterator<Item = &ClipPlayback> + '_ {
        self.clips
            .iter()
            .filter(move |c| c.audible && seconds >= c.position && seconds < c.end())
    }
}

/// The external transport. Implementations own the sample-accurate clock;
/// the session only issues requests and reads back what the engine reports.
pub trait AudioEngine {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_transport_length(&mut self, seconds: f64);
    fn current_seconds(&mut self) -> f64;
    /// Replace the scheduled clips with `plan`.
    fn sync_mix(&mut self, plan: Arc<MixPlan>);
    /// Drain notifications raised since the last call.
    fn poll_events(&mut self) -> Vec<EngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playback(id: u64, position: f64, duration: f64, audible: bool) -> ClipPlayback {
        ClipPlayback {
            clip: ClipId(id),
            audio: AudioHandle::new(format!("take-{id}")),
            position,
            offset: 0.0,
            duration,
            audible,
        }
    }

    #[test]
    fn test_audible_at_filters_span_and_flag() {
        let plan = MixPlan {
            clips: vec![
                playback(1, 0.0, 2.0, true),
                playback(2, 1.0, 2.0, false),
                playback(3, 1.5, 1.0, true),
            ],
        };

        let at_one: Vec<u64> = plan.audible_at(1.0).map(|c| c.clip.0).collect();
        assert_eq!(at_one, vec![1]);

        let at_two: Vec<u64> = plan.audible_at(2.0).map(|c| c.clip.0).collect();
        assert_eq!(at_two, vec![3]);
    }
}
