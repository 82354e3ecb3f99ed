use std::sync::Arc;

use overdub_engine::{EngineHandle, TransportRuntime};
use overdub_transport::{AudioEngine, AudioHandle, ClipId, RecordingDescriptor, WaveformView};

use crate::clock::TransportClock;
use crate::gesture::{CropEdge, CropGesture, DragRelease};
use crate::mix::MixSync;
use crate::playhead::{AnimationState, CancelToken, Clock, MonotonicClock, PlayheadAnimator, PlayheadFrame};
use crate::snapshot::TimelineSnapshot;
use crate::store::{Action, DEFAULT_TRANSPORT_LENGTH, Timeline, TimelineEvent, TimelineStore};
use crate::time::TimeScale;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub scale: TimeScale,
    /// Grid clip moves snap to, if any.
    pub snap_grid: Option<f64>,
    pub transport_length: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            scale: TimeScale::default(),
            snap_grid: None,
            transport_length: DEFAULT_TRANSPORT_LENGTH,
        }
    }
}

/// One editing session: the store plus everything that reacts to it.
///
/// All edits go through [`Session::dispatch`] (or a gesture helper that ends
/// in it). After each commit the session pushes mix changes to the engine,
/// keeps the engine transport in step with `current_time`, and rebuilds the
/// playhead animation when its span changed.
pub struct Session<E: AudioEngine, C: Clock> {
    store: TimelineStore,
    transport: TransportClock<E>,
    playhead: PlayheadAnimator<C>,
    mix: MixSync,
    crop: CropGesture,
    snap_grid: Option<f64>,
    recording_started: Option<f64>,
}

impl Session<EngineHandle, MonotonicClock> {
    /// A session on the built-in engine, timed by the wall clock. The
    /// caller drives the returned runtime from its audio callback.
    pub fn headless(options: SessionOptions, sample_rate: u32) -> (Self, TransportRuntime) {
        let (engine, runtime) = overdub_engine::start(sample_rate);
        (Self::new(engine, MonotonicClock::new(), options), runtime)
    }
}

impl<E: AudioEngine, C: Clock> Session<E, C> {
    pub fn new(engine: E, clock: C, options: SessionOptions) -> Self {
        let store = TimelineStore::new(options.transport_length);
        let transport_length = store.state().transport_length();

        let mut transport = TransportClock::new(engine, options.scale);
        transport.set_transport_length(transport_length);

        let mut playhead = PlayheadAnimator::new(clock);
        playhead.schedule(0.0, transport_length);

        let mut mix = MixSync::new();
        if let Some(plan) = mix.sync(store.state()) {
            transport.push_mix(plan);
        }

        tracing::info!(transport_length, snap_grid = ?options.snap_grid, "session started");

        Self {
            store,
            transport,
            playhead,
            mix,
            crop: CropGesture::Idle,
            snap_grid: options.snap_grid,
            recording_started: None,
        }
    }

    pub fn state(&self) -> &Timeline {
        self.store.state()
    }

    pub fn timeline(&self) -> Arc<Timeline> {
        self.store.snapshot()
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot::capture(self.store.state(), self.store.revision())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Timeline, &[TimelineEvent]) + 'static) {
        self.store.subscribe(listener);
    }

    pub fn scale(&self) -> &TimeScale {
        self.transport.scale()
    }

    pub fn snap_grid(&self) -> Option<f64> {
        self.snap_grid
    }

    pub fn set_snap(&mut self, grid: Option<f64>) {
        self.snap_grid = grid.filter(|g| g.is_finite() && *g > 0.0);
    }

    pub fn crop_gesture(&self) -> CropGesture {
        self.crop
    }

    pub fn playhead_state(&self) -> AnimationState {
        self.playhead.state()
    }

    /// Token that stops the running playhead animation. The next
    /// [`frame`](Self::frame) commits the engine position and rebuilds.
    pub fn cancel_token(&self) -> CancelToken {
        self.playhead.token()
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<TimelineEvent> {
        let events = self.store.dispatch(action);
        self.react(&events);
        events
    }

    fn react(&mut self, events: &[TimelineEvent]) {
        if events.is_empty() {
            return;
        }
        let playing = self.store.state().is_playing();

        let mut mix_dirty = false;
        let mut resync = false;
        let mut rebuild = false;
        let mut start = false;

        for event in events {
            mix_dirty |= event.affects_mix();
            match *event {
                TimelineEvent::ChannelRemoved { .. } | TimelineEvent::ClipRemoved(_) => {
                    resync |= playing;
                }
                TimelineEvent::TransportLengthChanged(length) => {
                    self.transport.set_transport_length(length);
                    if playing {
                        resync = true;
                    } else {
                        rebuild = true;
                    }
                }
                TimelineEvent::CurrentTimeChanged(seconds) => {
                    self.transport.seek(seconds);
                    rebuild = true;
                }
                TimelineEvent::PlayingChanged(true) => {
                    self.transport.play();
                    start = true;
                }
                TimelineEvent::PlayingChanged(false) => {
                    self.transport.pause();
                    rebuild = true;
                }
                _ => {}
            }
        }

        if let Some(armed) = self.crop.armed_clip() {
            let state = self.store.state();
            if state.clip(armed).is_none() || state.selected_clip().is_some_and(|s| s != armed) {
                tracing::debug!(%armed, "crop disarmed");
                self.crop.disarm();
            }
        }

        if mix_dirty {
            if let Some(plan) = self.mix.sync(self.store.state()) {
                self.transport.push_mix(plan);
            }
        }

        if resync {
            self.resync();
        } else if rebuild {
            self.rebuild_playhead();
        } else if start && !self.playhead.play() {
            self.rebuild_playhead();
        }
    }

    /// Commit the engine's real position and restart the animation from
    /// it. Used when something invalidates the running animation.
    fn resync(&mut self) {
        self.playhead.cancel();
        let at = self.transport.current_seconds();
        tracing::debug!(at, "resyncing playhead to engine position");
        // No engine seek: the position came from the engine
        self.store.dispatch(Action::SetTransportPosition(at));
        self.rebuild_playhead();
    }

    fn rebuild_playhead(&mut self) {
        let state = self.store.state();
        let (from, to, playing) = (state.current_time(), state.transport_length(), state.is_playing());

        self.playhead.cancel();
        self.playhead.schedule(from, to);
        if playing {
            self.playhead.play();
        }
    }

    /// Where the transport is right now: the engine while playing,
    /// otherwise the committed `current_time`.
    pub fn transport_seconds(&mut self) -> f64 {
        if self.store.state().is_playing() {
            self.transport.current_seconds()
        } else {
            self.store.state().current_time()
        }
    }

    /// Start playback. Does nothing when the transport is already at its end.
    pub fn play(&mut self) -> bool {
        let state = self.store.state();
        if state.is_playing() {
            return true;
        }
        if state.current_time() >= state.transport_length() {
            tracing::debug!(current_time = state.current_time(), "at transport end, not starting");
            return false;
        }
        !self.dispatch(Action::Play).is_empty()
    }

    /// Stop playback where the playhead visibly is.
    pub fn pause(&mut self) {
        if !self.store.state().is_playing() {
            return;
        }
        let at = self.playhead.pause();
        self.dispatch(Action::Pause { at });
    }

    pub fn toggle_play(&mut self) {
        if self.store.state().is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek(&mut self, seconds: f64) -> Vec<TimelineEvent> {
        self.dispatch(Action::SetTransportPosition(seconds))
    }

    /// Seek to a click or playhead drag at `x` pixels on the ruler.
    pub fn click_to_seek(&mut self, x: f64) -> Vec<TimelineEvent> {
        let target = self.transport.seek_target(x);
        self.seek(target)
    }

    pub fn set_transport_length(&mut self, seconds: f64) -> Vec<TimelineEvent> {
        self.dispatch(Action::SetTransportLength(seconds))
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.playhead.set_rate(rate);
    }

    /// Drain engine notifications into the store.
    pub fn poll(&mut self) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        for action in self.transport.poll() {
            events.extend(self.dispatch(action));
        }
        events
    }

    /// Advance the playhead by one visual frame.
    pub fn frame(&mut self) -> PlayheadFrame {
        let frame = self.playhead.tick();
        if frame.state == AnimationState::Cancelled && self.store.state().is_playing() {
            self.resync();
            return self.playhead.tick();
        }
        frame
    }

    pub fn playhead_x(&self) -> f64 {
        self.transport.scale().seconds_to_pixels(self.playhead.position())
    }

    pub fn start_recording(&mut self) {
        if self.store.state().is_recording() {
            return;
        }
        let at = self.transport_seconds();
        self.recording_started = Some(at);
        tracing::info!(at, "recording started");
        self.dispatch(Action::SetRecording(true));
    }

    /// Close the take begun by [`start_recording`](Self::start_recording).
    /// When the transport did not move the take spans its own duration.
    pub fn finish_recording(&mut self, audio: AudioHandle, raw_duration: f64) -> Option<ClipId> {
        let Some(start) = self.recording_started.take() else {
            tracing::debug!("finish_recording without a take in progress");
            return None;
        };
        let now = self.transport_seconds();
        let stop = if now > start { now } else { start + raw_duration };
        tracing::info!(start, stop, "recording finished");

        self.ingest_recording(RecordingDescriptor {
            start_seconds: start,
            stop_seconds: stop,
            raw_duration_seconds: raw_duration,
            audio,
        })
    }

    /// Place a completed recording as a new, not yet loaded clip.
    pub fn ingest_recording(&mut self, recording: RecordingDescriptor) -> Option<ClipId> {
        self.dispatch(Action::ScheduleRecording(recording))
            .iter()
            .find_map(|event| match event {
                TimelineEvent::ClipAdded { id, .. } => Some(*id),
                _ => None,
            })
    }

    pub fn mark_loaded(&mut self, clip: ClipId) -> Vec<TimelineEvent> {
        self.dispatch(Action::ClipLoaded(clip))
    }

    /// Finish a pointer drag on a clip body.
    pub fn release_clip_drag(&mut self, clip: ClipId, release: DragRelease) -> Vec<TimelineEvent> {
        let lanes = self.store.state().channels().len();
        let action = release.into_action(clip, self.transport.scale(), lanes, self.snap_grid);
        self.dispatch(action)
    }

    /// Split a clip at a timeline second rather than a window second.
    pub fn split_clip_at(&mut self, clip: ClipId, timeline_seconds: f64) -> Vec<TimelineEvent> {
        let Some(at) = self.store.state().clip(clip).map(|c| c.timeline_to_window(timeline_seconds)) else {
            return Vec::new();
        };
        self.dispatch(Action::SplitClip { id: clip, at })
    }

    /// Crop-tool press on a clip: arms on the first press, commits on the
    /// second press on the same clip.
    pub fn press_crop(&mut self, clip: ClipId) -> Vec<TimelineEvent> {
        let Some(target) = self.store.state().clip(clip) else {
            return Vec::new();
        };
        match self.crop.press(target) {
            Some(action) => self.dispatch(action),
            None => Vec::new(),
        }
    }

    pub fn set_crop_edge(&mut self, edge: CropEdge, seconds: f64) {
        self.crop.set_edge(edge, seconds);
    }

    /// Crop handle dragged `pixels` inward in an editor `editor_width` wide.
    pub fn drag_crop_handle(&mut self, edge: CropEdge, pixels: f64, editor_width: f64) {
        let Some(duration) = self
            .crop
            .armed_clip()
            .and_then(|id| self.store.state().clip(id))
            .map(|clip| clip.duration())
        else {
            return;
        };
        self.crop.set_edge_from_pixels(edge, pixels, editor_width, duration);
    }

    pub fn cancel_crop(&mut self) {
        self.crop.disarm();
    }

    /// Waveform of a clip's active window for an editor `width` pixels wide.
    pub fn waveform<'a>(&self, clip: ClipId, samples: &'a [f32], width: f64, window: usize) -> Option<WaveformView<'a>> {
        let clip = self.store.state().clip(clip)?;
        Some(WaveformView::new(clip, samples, width, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playhead::ManualClock;
    use overdub_transport::ChannelId;
    use std::time::Duration;

    const RATE: u32 = 48_000;
    const STEP: Duration = Duration::from_millis(10);
    const FRAMES_PER_STEP: usize = 480;

    struct Rig {
        session: Session<EngineHandle, ManualClock>,
        runtime: TransportRuntime,
        clock: ManualClock,
    }

    fn rig(transport_length: f64) -> Rig {
        let (engine, runtime) = overdub_engine::start(RATE);
        let clock = ManualClock::new();
        let session = Session::new(
            engine,
            clock.clone(),
            SessionOptions {
                transport_length,
                ..SessionOptions::default()
            },
        );
        Rig { session, runtime, clock }
    }

    impl Rig {
        /// Run engine, notifications and frames in lockstep for `seconds`.
        fn advance(&mut self, seconds: f64) {
            let steps = (seconds / STEP.as_secs_f64()).round() as usize;
            for _ in 0..steps {
                self.clock.advance(STEP);
                self.runtime.process(FRAMES_PER_STEP);
                self.session.poll();
                self.session.frame();
            }
        }

        fn loaded_clip(&mut self, start: f64, stop: f64) -> ClipId {
            let id = self
                .session
                .ingest_recording(RecordingDescriptor {
                    start_seconds: start,
                    stop_seconds: stop,
                    raw_duration_seconds: stop - start,
                    audio: AudioHandle::new("take"),
                })
                .unwrap();
            self.session.mark_loaded(id);
            id
        }
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_split_after_move_scenario() {
        let mut rig = rig(120.0);
        rig.session.dispatch(Action::AddChannel { name: Some("A".to_string()) });
        let clip = rig.loaded_clip(0.0, 5.0);
        rig.session.dispatch(Action::MoveClip { id: clip, delta: 10.0, target_channel: None, snap: None });

        rig.session.dispatch(Action::MoveClip { id: clip, delta: 3.0, target_channel: None, snap: None });
        assert_eq!(rig.session.state().clip(clip).unwrap().position, 13.0);

        let events = rig.session.split_clip_at(clip, 14.0);
        let right = match events.as_slice() {
            [TimelineEvent::ClipSplit { right, .. }] => *right,
            other => panic!("unexpected events {other:?}"),
        };

        let state = rig.session.state();
        let left = state.clip(clip).unwrap();
        let right = state.clip(right).unwrap();
        assert_eq!((left.position, left.start, left.end), (13.0, 0.0, 1.0));
        assert_eq!((right.position, right.start, right.end), (14.0, 1.0, 5.0));
        assert_eq!(left.timeline_end(), right.position);
        assert_eq!(left.duration() + right.duration(), 5.0);
        assert_eq!(state.transport_length(), 120.0);
        assert!(state.invariant_violations().is_empty());
    }

    #[test]
    fn test_pause_commits_and_resume_continues() {
        let mut rig = rig(60.0);

        assert!(rig.session.play());
        rig.advance(1.5);
        rig.session.pause();

        assert!(!rig.session.state().is_playing());
        assert_close(rig.session.state().current_time(), 1.5, 1e-6);
        assert_eq!(rig.session.playhead_state(), AnimationState::Scheduled);

        rig.advance(1.0);
        assert_close(rig.session.transport_seconds(), 1.5, 1e-6);

        rig.session.play();
        rig.advance(1.0);
        assert_close(rig.session.transport_seconds(), 2.5, 1e-6);
        assert_close(rig.session.playhead_x(), 250.0, 1e-4);
    }

    #[test]
    fn test_reaching_end_pauses_and_play_stays_put() {
        let mut rig = rig(2.0);

        rig.session.play();
        rig.advance(3.0);

        assert!(!rig.session.state().is_playing());
        assert_close(rig.session.state().current_time(), 2.0, 1e-9);
        assert!(!rig.session.play());
        assert!(!rig.session.state().is_playing());
    }

    #[test]
    fn test_seek_during_playback_restarts_animation_from_new_position() {
        let mut rig = rig(60.0);
        rig.session.play();
        rig.advance(1.0);

        let token = rig.session.cancel_token();
        rig.session.seek(10.0);

        assert!(token.is_cancelled());
        assert!(!rig.session.cancel_token().is_cancelled());
        assert_eq!(rig.session.playhead_state(), AnimationState::Running);
        assert_close(rig.session.playhead_x(), 1000.0, 1e-9);
        assert!(rig.session.state().is_playing());

        rig.advance(0.5);
        assert_close(rig.session.transport_seconds(), 10.5, 1e-6);
        assert_close(rig.session.playhead_x(), 1050.0, 1e-6);
    }

    #[test]
    fn test_burst_of_seeks_before_play_keeps_engine_in_step() {
        let mut rig = rig(60.0);
        for i in 1..=70 {
            rig.session.seek(i as f64 / 10.0);
        }

        assert!(rig.session.play());
        rig.advance(1.0);

        assert!(rig.session.state().is_playing());
        assert!(rig.runtime.is_playing());
        let transport = rig.session.transport_seconds();
        assert_close(transport, rig.runtime.position_seconds(), 1e-9);
        // The engine picks up the queued seek and play one block late
        assert_close(transport, 8.0, 0.02);
    }

    #[test]
    fn test_end_of_transport_is_seen_after_unread_blocks() {
        let mut rig = rig(1.0);
        rig.session.play();

        for _ in 0..200 {
            rig.runtime.process(FRAMES_PER_STEP);
        }
        rig.session.poll();

        assert!(!rig.session.state().is_playing());
        assert_close(rig.session.state().current_time(), 1.0, 1e-9);
        assert!(!rig.session.play());
    }

    #[test]
    fn test_click_to_seek_moves_engine_and_store() {
        let mut rig = rig(60.0);

        rig.session.click_to_seek(5.0);
        assert_eq!(rig.session.state().current_time(), 0.0);

        rig.session.click_to_seek(420.0);
        assert_eq!(rig.session.state().current_time(), 4.2);
        rig.runtime.process(0);
        assert_close(rig.runtime.position_seconds(), 4.2, 1.0 / RATE as f64);
    }

    #[test]
    fn test_deleting_channel_during_playback_resyncs() {
        let mut rig = rig(60.0);
        rig.session.dispatch(Action::AddChannel { name: None });
        let clip = rig.loaded_clip(0.0, 10.0);

        rig.session.play();
        rig.advance(2.0);
        assert_eq!(rig.runtime.audible_clips(), vec![clip]);

        let events = rig.session.dispatch(Action::RemoveChannel(ChannelId(0)));
        assert!(matches!(events[0], TimelineEvent::ChannelRemoved { .. }));

        let state = rig.session.state();
        assert!(state.is_playing());
        assert_eq!(state.clips().count(), 0);
        assert_close(state.current_time(), 2.0, 1e-6);
        assert_eq!(rig.session.playhead_state(), AnimationState::Running);

        rig.advance(0.5);
        assert!(rig.runtime.audible_clips().is_empty());
        assert_close(rig.session.transport_seconds(), 2.5, 1e-6);
    }

    #[test]
    fn test_external_cancel_commits_within_one_frame() {
        let mut rig = rig(60.0);
        rig.session.play();
        rig.advance(1.23);

        rig.session.cancel_token().cancel();
        rig.advance(0.01);

        assert_close(rig.session.state().current_time(), 1.23, STEP.as_secs_f64() + 1e-6);
        assert_eq!(rig.session.playhead_state(), AnimationState::Running);
        assert!(rig.session.state().is_playing());
    }

    #[test]
    fn test_shrinking_length_during_playback_stops_at_new_end() {
        let mut rig = rig(60.0);
        rig.session.play();
        rig.advance(3.0);

        rig.session.set_transport_length(2.0);
        assert_close(rig.session.state().current_time(), 2.0, 1e-9);

        rig.advance(0.05);
        assert!(!rig.session.state().is_playing());
        assert_close(rig.session.state().current_time(), 2.0, 1e-9);
    }

    #[test]
    fn test_drag_across_lanes_and_back() {
        let mut rig = rig(60.0);
        rig.session.dispatch(Action::AddChannel { name: Some("A".to_string()) });
        rig.session.dispatch(Action::AddChannel { name: Some("B".to_string()) });
        let clip = rig.loaded_clip(0.0, 4.0);

        fn crossings(events: &[TimelineEvent]) -> usize {
            events
                .iter()
                .filter(|e| matches!(e, TimelineEvent::ClipMoved { .. }))
                .count()
        }

        let down = DragRelease { dx: 100.0, y: 150.0, moved: true };
        assert_eq!(crossings(&rig.session.release_clip_drag(clip, down)), 1);
        assert_eq!(rig.session.state().clip(clip).unwrap().channel_id, ChannelId(1));
        assert_eq!(rig.session.state().clip(clip).unwrap().position, 1.0);

        let up = DragRelease { dx: -100.0, y: 20.0, moved: true };
        assert_eq!(crossings(&rig.session.release_clip_drag(clip, up)), 1);
        let state = rig.session.state();
        assert_eq!(state.clip(clip).unwrap().channel_id, ChannelId(0));
        assert_eq!(state.clip(clip).unwrap().position, 0.0);
        assert_eq!(state.channels()[0].clips().len(), 1);
        assert!(state.channels()[1].is_empty());
    }

    #[test]
    fn test_click_on_clip_selects_without_moving() {
        let mut rig = rig(60.0);
        let clip = rig.loaded_clip(1.0, 4.0);

        let click = DragRelease { dx: 0.0, y: 10.0, moved: false };
        rig.session.release_clip_drag(clip, click);

        assert_eq!(rig.session.state().selected_clip(), Some(clip));
        assert_eq!(rig.session.state().clip(clip).unwrap().position, 1.0);
    }

    #[test]
    fn test_snap_applies_to_drags() {
        let mut rig = rig(60.0);
        let clip = rig.loaded_clip(0.0, 4.0);
        rig.session.set_snap(Some(0.5));

        let drag = DragRelease { dx: 130.0, y: 0.0, moved: true };
        rig.session.release_clip_drag(clip, drag);

        assert_eq!(rig.session.state().clip(clip).unwrap().position, 1.5);
    }

    #[test]
    fn test_two_phase_crop_through_handles() {
        let mut rig = rig(60.0);
        let clip = rig.loaded_clip(0.0, 4.0);

        assert!(rig.session.press_crop(clip).is_empty());
        rig.session.drag_crop_handle(CropEdge::Left, 50.0, 400.0);
        rig.session.set_crop_edge(CropEdge::Right, 1.0);

        let events = rig.session.press_crop(clip);
        assert_eq!(events, vec![TimelineEvent::ClipChanged(clip)]);

        let cropped = rig.session.state().clip(clip).unwrap();
        assert_eq!((cropped.start, cropped.end, cropped.position), (0.5, 3.0, 0.0));
        assert_eq!(rig.session.crop_gesture(), CropGesture::Idle);
    }

    #[test]
    fn test_selecting_another_clip_disarms_crop() {
        let mut rig = rig(60.0);
        let first = rig.loaded_clip(0.0, 4.0);
        let second = rig.loaded_clip(5.0, 6.0);

        rig.session.dispatch(Action::SelectClip(first));
        rig.session.press_crop(first);
        rig.session.dispatch(Action::SelectClip(second));

        assert_eq!(rig.session.crop_gesture(), CropGesture::Idle);
    }

    #[test]
    fn test_recording_take_spans_transport_motion() {
        let mut rig = rig(60.0);
        rig.session.dispatch(Action::AddChannel { name: None });

        rig.session.play();
        rig.advance(1.0);
        rig.session.start_recording();
        assert!(rig.session.state().is_recording());
        rig.advance(2.0);

        let clip = rig.session.finish_recording(AudioHandle::new("take-1"), 2.0).unwrap();

        let state = rig.session.state();
        assert!(!state.is_recording());
        let clip = state.clip(clip).unwrap();
        assert_close(clip.position, 1.0, 1e-6);
        assert_close(clip.end, 3.0, 1e-6);
        assert!(!clip.loaded);
    }

    #[test]
    fn test_headless_session_starts_idle() {
        let (session, runtime) = Session::headless(SessionOptions::default(), 44_100);

        assert_eq!(runtime.sample_rate(), 44_100);
        assert_eq!(session.state().transport_length(), DEFAULT_TRANSPORT_LENGTH);
        assert_eq!(session.playhead_state(), AnimationState::Scheduled);
    }

    #[test]
    fn test_waveform_tracks_clip_window() {
        let mut rig = rig(60.0);
        let clip = rig.loaded_clip(2.0, 6.0);
        rig.session.dispatch(Action::CropClip { id: clip, left: 1.0, right: 1.0 });
        let samples = vec![0.5_f32; 400];

        let view = rig.session.waveform(clip, &samples, 200.0, 10).unwrap();

        // Window [3, 5] of a [2, 6] take is samples 100..300
        assert_eq!(view.points().count(), 20);
        assert_eq!(view.playline_x(3.0), Some(100.0));
        assert_eq!(view.playline_x(10.0), None);
        assert!(rig.session.waveform(ClipId(99), &samples, 200.0, 10).is_none());
    }

    #[test]
    fn test_listeners_see_session_commits() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut rig = rig(60.0);
        let commits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&commits);
        rig.session.subscribe(move |_, _| counter.set(counter.get() + 1));

        rig.session.dispatch(Action::AddChannel { name: None });
        rig.session.dispatch(Action::RemoveChannel(ChannelId(7)));
        rig.session.seek(3.0);

        assert_eq!(commits.get(), 2);
        assert_eq!(rig.session.snapshot().revision, 2);
    }
}
