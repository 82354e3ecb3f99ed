//! Serializable views of the timeline for front ends.
//!
//! These are plain data copies taken at one revision; they hold no
//! references back into the store.

use serde::{Deserialize, Serialize};

use crate::store::Timeline;
use crate::time::Timecode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub revision: u64,
    pub transport_length: f64,
    pub current_time: f64,
    pub timecode: String,
    pub playing: bool,
    pub recording: bool,
    pub selected_clip: Option<u64>,
    pub selected_channel: Option<u64>,
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: u64,
    pub name: String,
    pub muted: bool,
    pub solo: bool,
    pub clips: Vec<ClipSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSummary {
    pub id: u64,
    pub position: f64,
    pub start: f64,
    pub end: f64,
    pub raw_duration: f64,
    pub muted: bool,
    pub solo: bool,
    pub loaded: bool,
    pub audio: String,
}

impl TimelineSnapshot {
    pub fn capture(timeline: &Timeline, revision: u64) -> Self {
        Self {
            revision,
            transport_length: timeline.transport_length(),
            current_time: timeline.current_time(),
            timecode: Timecode::from_seconds(timeline.current_time()).to_string(),
            playing: timeline.is_playing(),
            recording: timeline.is_recording(),
            selected_clip: timeline.selected_clip().map(|id| id.0),
            selected_channel: timeline.selected_channel().map(|id| id.0),
            channels: timeline
                .channels()
                .iter()
                .map(|channel| ChannelSummary {
                    id: channel.id.0,
                    name: channel.name.clone(),
                    muted: channel.muted,
                    solo: channel.solo,
                    clips: channel
                        .clips_by_time()
                        .into_iter()
                        .map(|clip| ClipSummary {
                            id: clip.id.0,
                            position: clip.position,
                            start: clip.start,
                            end: clip.end,
                            raw_duration: clip.raw_duration,
                            muted: clip.muted,
                            solo: clip.solo,
                            loaded: clip.loaded,
                            audio: clip.audio.as_str().to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
