//! The authoritative timeline state and the reducer that transitions it.
//!
//! Every change goes through [`TimelineStore::dispatch`]. The store applies
//! one [`Action`] at a time to a private copy of the current [`Timeline`];
//! if the action is refused the copy is discarded, otherwise it becomes the
//! new shared snapshot and listeners are told what changed.

use std::sync::Arc;

use overdub_transport::{Channel, ChannelId, Clip, ClipId, RecordingDescriptor};

use crate::clip_ops::{self, find_clip};
use crate::error::{EditError, Reference, finite};

pub const DEFAULT_TRANSPORT_LENGTH: f64 = 60.0;

#[derive(Debug, Clone)]
pub enum Action {
    AddChannel { name: Option<String> },
    RemoveChannel(ChannelId),
    RenameChannel { id: ChannelId, name: String },
    SelectChannel(ChannelId),
    DeselectChannels,
    ToggleChannelMute(ChannelId),
    ToggleChannelSolo(ChannelId),

    SelectClip(ClipId),
    DeselectClip,
    ScheduleRecording(RecordingDescriptor),
    ClipLoaded(ClipId),
    MoveClip {
        id: ClipId,
        delta: f64,
        target_channel: Option<usize>,
        snap: Option<f64>,
    },
    CropClip { id: ClipId, left: f64, right: f64 },
    SplitClip { id: ClipId, at: f64 },
    DeleteClip(ClipId),
    ToggleMute(ClipId),
    ToggleSolo(ClipId),

    SetTransportLength(f64),
    SetTransportPosition(f64),
    Play,
    /// Stop playback and commit where it stopped.
    Pause { at: f64 },
    SetRecording(bool),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddChannel { .. } => "add_channel",
            Action::RemoveChannel(_) => "remove_channel",
            Action::RenameChannel { .. } => "rename_channel",
            Action::SelectChannel(_) => "select_channel",
            Action::DeselectChannels => "deselect_channels",
            Action::ToggleChannelMute(_) => "toggle_channel_mute",
            Action::ToggleChannelSolo(_) => "toggle_channel_solo",
            Action::SelectClip(_) => "select_clip",
            Action::DeselectClip => "deselect_clip",
            Action::ScheduleRecording(_) => "schedule_recording",
            Action::ClipLoaded(_) => "clip_loaded",
            Action::MoveClip { .. } => "move_clip",
            Action::CropClip { .. } => "crop_clip",
            Action::SplitClip { .. } => "split_clip",
            Action::DeleteClip(_) => "delete_clip",
            Action::ToggleMute(_) => "toggle_mute",
            Action::ToggleSolo(_) => "toggle_solo",
            Action::SetTransportLength(_) => "set_transport_length",
            Action::SetTransportPosition(_) => "set_transport_position",
            Action::Play => "play",
            Action::Pause { .. } => "pause",
            Action::SetRecording(_) => "set_recording",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    ChannelAdded(ChannelId),
    ChannelRemoved { id: ChannelId, clips: Vec<ClipId> },
    ChannelRenamed(ChannelId),
    ChannelChanged(ChannelId),
    ChannelSelectionChanged(Option<ChannelId>),
    ClipAdded { id: ClipId, channel: ChannelId },
    ClipChanged(ClipId),
    ClipMoved { id: ClipId, from: ChannelId, to: ChannelId },
    ClipSplit { left: ClipId, right: ClipId },
    ClipRemoved(ClipId),
    SelectionChanged(Option<ClipId>),
    TransportLengthChanged(f64),
    CurrentTimeChanged(f64),
    PlayingChanged(bool),
    RecordingChanged(bool),
}

impl TimelineEvent {
    /// Whether this event changes what the engine should be playing.
    pub fn affects_mix(&self) -> bool {
        matches!(
            self,
            TimelineEvent::ChannelAdded(_)
                | TimelineEvent::ChannelRemoved { .. }
                | TimelineEvent::ChannelChanged(_)
                | TimelineEvent::ClipAdded { .. }
                | TimelineEvent::ClipChanged(_)
                | TimelineEvent::ClipMoved { .. }
                | TimelineEvent::ClipSplit { .. }
                | TimelineEvent::ClipRemoved(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Timeline {
    channels: Vec<Channel>,
    selected_clip: Option<ClipId>,
    selected_channel: Option<ChannelId>,
    transport_length: f64,
    playing: bool,
    recording: bool,
    current_time: f64,
    next_clip_id: u64,
    next_channel_id: u64,
}

impl Timeline {
    pub fn new(transport_length: f64) -> Self {
        let transport_length = if transport_length.is_finite() {
            transport_length.max(0.0)
        } else {
            DEFAULT_TRANSPORT_LENGTH
        };
        Self {
            channels: Vec::new(),
            selected_clip: None,
            selected_channel: None,
            transport_length,
            playing: false,
            recording: false,
            current_time: 0.0,
            next_clip_id: 0,
            next_channel_id: 0,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn channel_index(&self, id: ChannelId) -> Option<usize> {
        self.channels.iter().position(|c| c.id == id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        find_clip(&self.channels, id).map(|(_, clip)| clip)
    }

    /// Index of the lane a clip currently sits on.
    pub fn lane_of(&self, id: ClipId) -> Option<usize> {
        find_clip(&self.channels, id).map(|(index, _)| index)
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> + '_ {
        self.channels.iter().flat_map(|c| c.clips().iter())
    }

    pub fn selected_clip(&self) -> Option<ClipId> {
        self.selected_clip
    }

    pub fn selected_channel(&self) -> Option<ChannelId> {
        self.selected_channel
    }

    pub fn transport_length(&self) -> f64 {
        self.transport_length
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Furthest timeline second reached by any clip.
    pub fn furthest_clip_end(&self) -> f64 {
        self.channels.iter().map(Channel::end).fold(0.0, f64::max)
    }

    /// Every way the state currently breaks its invariants; empty when sound.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for channel in &self.channels {
            for clip in channel.clips() {
                if clip.channel_id != channel.id {
                    violations.push(format!("{} claims {} but lives in {}", clip.id, clip.channel_id, channel.id));
                }
                if !clip.is_well_formed() {
                    violations.push(format!("{} is malformed: {clip:?}", clip.id));
                }
                if !seen.insert(clip.id) {
                    violations.push(format!("{} appears more than once", clip.id));
                }
            }
        }
        if let Some(id) = self.selected_clip {
            if self.clip(id).is_none() {
                violations.push(format!("selected {id} does not exist"));
            }
        }
        if let Some(id) = self.selected_channel {
            if self.channel(id).is_none() {
                violations.push(format!("selected {id} does not exist"));
            }
        }
        if !(0.0..=self.transport_length).contains(&self.current_time) {
            violations.push(format!(
                "current time {} outside [0, {}]",
                self.current_time, self.transport_length
            ));
        }
        if self.transport_length + 1e-9 < self.furthest_clip_end() {
            violations.push(format!(
                "transport length {} shorter than furthest clip end {}",
                self.transport_length,
                self.furthest_clip_end()
            ));
        }
        violations
    }

    fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel, EditError> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EditError::InvalidReference(Reference::Channel(id)))
    }

    fn clip_mut(&mut self, id: ClipId) -> Result<&mut Clip, EditError> {
        self.channels
            .iter_mut()
            .find_map(|c| c.clip_mut(id))
            .ok_or(EditError::InvalidReference(Reference::Clip(id)))
    }

    fn existing_clip(&self, id: ClipId) -> Result<&Clip, EditError> {
        self.clip(id).ok_or(EditError::InvalidReference(Reference::Clip(id)))
    }

    fn replace_clip(&mut self, edited: Clip) -> Result<(), EditError> {
        let slot = self.clip_mut(edited.id)?;
        *slot = edited;
        Ok(())
    }

    fn push_channel(&mut self, name: Option<String>) -> ChannelId {
        let id = ChannelId(self.next_channel_id);
        self.next_channel_id += 1;
        let name = name.unwrap_or_else(|| format!("Channel {}", self.channels.len() + 1));
        self.channels.push(Channel::new(id, name));
        id
    }

    fn take_clip_id(&mut self) -> ClipId {
        let id = ClipId(self.next_clip_id);
        self.next_clip_id += 1;
        id
    }

    fn apply(&mut self, action: Action) -> Result<Vec<TimelineEvent>, EditError> {
        let mut events = Vec::new();

        match action {
            Action::AddChannel { name } => {
                let id = self.push_channel(name);
                events.push(TimelineEvent::ChannelAdded(id));
            }
            Action::RemoveChannel(id) => {
                let index = self
                    .channel_index(id)
                    .ok_or(EditError::InvalidReference(Reference::Channel(id)))?;
                let removed = self.channels.remove(index);
                let clips: Vec<ClipId> = removed.clips().iter().map(|c| c.id).collect();

                if self.selected_clip.is_some_and(|selected| clips.contains(&selected)) {
                    self.selected_clip = None;
                    events.push(TimelineEvent::SelectionChanged(None));
                }
                if self.selected_channel == Some(id) {
                    self.selected_channel = None;
                    events.push(TimelineEvent::ChannelSelectionChanged(None));
                }
                events.push(TimelineEvent::ChannelRemoved { id, clips });
            }
            Action::RenameChannel { id, name } => {
                let channel = self.channel_mut(id)?;
                if channel.name != name {
                    channel.name = name;
                    events.push(TimelineEvent::ChannelRenamed(id));
                }
            }
            Action::SelectChannel(id) => {
                self.channel_mut(id)?;
                if self.selected_channel != Some(id) {
                    self.selected_channel = Some(id);
                    events.push(TimelineEvent::ChannelSelectionChanged(Some(id)));
                }
            }
            Action::DeselectChannels => {
                if self.selected_channel.take().is_some() {
                    events.push(TimelineEvent::ChannelSelectionChanged(None));
                }
            }
            Action::ToggleChannelMute(id) => {
                let channel = self.channel_mut(id)?;
                channel.muted = !channel.muted;
                events.push(TimelineEvent::ChannelChanged(id));
            }
            Action::ToggleChannelSolo(id) => {
                let channel = self.channel_mut(id)?;
                channel.solo = !channel.solo;
                events.push(TimelineEvent::ChannelChanged(id));
            }

            Action::SelectClip(id) => {
                self.existing_clip(id)?;
                if self.selected_clip != Some(id) {
                    self.selected_clip = Some(id);
                    events.push(TimelineEvent::SelectionChanged(Some(id)));
                }
            }
            Action::DeselectClip => {
                if self.selected_clip.take().is_some() {
                    events.push(TimelineEvent::SelectionChanged(None));
                }
            }
            Action::ScheduleRecording(recording) => {
                let channel = match self.selected_channel.or_else(|| self.channels.first().map(|c| c.id)) {
                    Some(id) => id,
                    None => {
                        let id = self.push_channel(None);
                        events.push(TimelineEvent::ChannelAdded(id));
                        id
                    }
                };
                let id = self.take_clip_id();
                let clip = clip_ops::clip_from_recording(&recording, id, channel)?;
                self.channel_mut(channel)?.insert_clip(clip);
                events.push(TimelineEvent::ClipAdded { id, channel });

                if self.recording {
                    self.recording = false;
                    events.push(TimelineEvent::RecordingChanged(false));
                }
            }
            Action::ClipLoaded(id) => {
                let clip = self.clip_mut(id)?;
                if !clip.loaded {
                    clip.loaded = true;
                    events.push(TimelineEvent::ClipChanged(id));
                }
            }
            Action::MoveClip {
                id,
                delta,
                target_channel,
                snap,
            } => {
                let moved = clip_ops::move_clip(self.existing_clip(id)?, delta, snap)?;
                self.replace_clip(moved)?;
                events.push(TimelineEvent::ClipChanged(id));

                if let Some(target) = target_channel {
                    match clip_ops::relocate_clip(&mut self.channels, id, target) {
                        Ok(Some((from, to))) => events.push(TimelineEvent::ClipMoved { id, from, to }),
                        Ok(None) => {}
                        Err(err) => {
                            tracing::debug!(%id, %err, "keeping clip on its channel");
                        }
                    }
                }
            }
            Action::CropClip { id, left, right } => {
                let cropped = clip_ops::crop_clip(self.existing_clip(id)?, left, right)?;
                self.replace_clip(cropped)?;
                events.push(TimelineEvent::ClipChanged(id));
            }
            Action::SplitClip { id, at } => {
                let (index, clip) = find_clip(&self.channels, id)
                    .ok_or(EditError::InvalidReference(Reference::Clip(id)))?;
                let right_id = ClipId(self.next_clip_id);
                let (left, right) = clip_ops::split_clip(clip, at, right_id)?;
                self.take_clip_id();

                self.replace_clip(left)?;
                self.channels[index].insert_clip(right);
                events.push(TimelineEvent::ClipSplit {
                    left: id,
                    right: right_id,
                });
            }
            Action::DeleteClip(id) => {
                let (index, _) = find_clip(&self.channels, id)
                    .ok_or(EditError::InvalidReference(Reference::Clip(id)))?;
                self.channels[index].remove_clip(id);
                if self.selected_clip == Some(id) {
                    self.selected_clip = None;
                    events.push(TimelineEvent::SelectionChanged(None));
                }
                events.push(TimelineEvent::ClipRemoved(id));
            }
            Action::ToggleMute(id) => {
                let toggled = clip_ops::toggle_mute(self.existing_clip(id)?)?;
                self.replace_clip(toggled)?;
                events.push(TimelineEvent::ClipChanged(id));
            }
            Action::ToggleSolo(id) => {
                let toggled = clip_ops::toggle_solo(self.existing_clip(id)?)?;
                self.replace_clip(toggled)?;
                events.push(TimelineEvent::ClipChanged(id));
            }

            Action::SetTransportLength(length) => {
                let length = finite("transport length", length)?;
                if length < 0.0 {
                    return Err(EditError::InvalidRange {
                        what: "transport length",
                        value: length,
                    });
                }
                let length = length.max(self.furthest_clip_end());
                if length != self.transport_length {
                    self.transport_length = length;
                    events.push(TimelineEvent::TransportLengthChanged(length));
                }
            }
            Action::SetTransportPosition(seconds) => {
                let seconds = finite("transport position", seconds)?.clamp(0.0, self.transport_length);
                if seconds != self.current_time {
                    self.current_time = seconds;
                    events.push(TimelineEvent::CurrentTimeChanged(seconds));
                }
            }
            Action::Play => {
                if !self.playing {
                    self.playing = true;
                    events.push(TimelineEvent::PlayingChanged(true));
                }
            }
            Action::Pause { at } => {
                if self.playing {
                    self.playing = false;
                    events.push(TimelineEvent::PlayingChanged(false));
                }
                if at.is_finite() {
                    let at = at.clamp(0.0, self.transport_length);
                    if at != self.current_time {
                        self.current_time = at;
                        events.push(TimelineEvent::CurrentTimeChanged(at));
                    }
                }
            }
            Action::SetRecording(recording) => {
                if self.recording != recording {
                    self.recording = recording;
                    events.push(TimelineEvent::RecordingChanged(recording));
                }
            }
        }

        Ok(events)
    }

    /// Re-establish the derived invariants after an action.
    fn settle(&mut self, events: &mut Vec<TimelineEvent>) {
        let furthest = self.furthest_clip_end();
        if self.transport_length < furthest {
            self.transport_length = furthest;
            events.push(TimelineEvent::TransportLengthChanged(furthest));
        }

        let clamped = self.current_time.clamp(0.0, self.transport_length);
        if clamped != self.current_time {
            self.current_time = clamped;
            events.push(TimelineEvent::CurrentTimeChanged(clamped));
        }
    }
}

type Listener = Box<dyn FnMut(&Timeline, &[TimelineEvent])>;

pub struct TimelineStore {
    state: Arc<Timeline>,
    listeners: Vec<Listener>,
    revision: u64,
}

impl TimelineStore {
    pub fn new(transport_length: f64) -> Self {
        Self {
            state: Arc::new(Timeline::new(transport_length)),
            listeners: Vec::new(),
            revision: 0,
        }
    }

    pub fn state(&self) -> &Timeline {
        &self.state
    }

    /// A snapshot that stays valid no matter what is dispatched later.
    pub fn snapshot(&self) -> Arc<Timeline> {
        Arc::clone(&self.state)
    }

    /// Number of committed state changes so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Timeline, &[TimelineEvent]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Apply one action to completion. Refused actions and actions that
    /// change nothing return no events and leave the snapshot untouched.
    pub fn dispatch(&mut self, action: Action) -> Vec<TimelineEvent> {
        let name = action.name();
        let mut next = Timeline::clone(&self.state);

        let mut events = match next.apply(action) {
            Ok(events) => events,
            Err(err) => {
                tracing::debug!(action = name, %err, "action absorbed as no-op");
                return Vec::new();
            }
        };
        next.settle(&mut events);

        if events.is_empty() {
            return events;
        }

        self.state = Arc::new(next);
        self.revision += 1;
        tracing::debug!(action = name, revision = self.revision, ?events, "committed");

        for listener in &mut self.listeners {
            listener(&self.state, &events);
        }
        events
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSPORT_LENGTH)
    }
}
