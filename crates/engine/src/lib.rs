//! Headless, sample-accurate transport.
//!
//! [`start`] returns two halves joined by lock-free ring buffers: an
//! [`EngineHandle`] that the session drives through [`AudioEngine`], and a
//! [`TransportRuntime`] that whoever owns the audio clock advances with
//! [`TransportRuntime::process`] (an audio callback, or a test loop).
//!
//! Commands that do not fit in the ring wait in an ordered backlog on the
//! handle and are flushed whenever the runtime has drained some room, so a
//! session that issues many edits between audio blocks never loses one.
//! Reaching the end of the transport is published through an atomic marker
//! rather than the status ring, so it survives a full ring.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use basedrop::{Collector, Handle, Shared};
use overdub_transport::{AudioEngine, ClipId, Command, EngineEvent, MixPlan, Status};

type SharedMix = Shared<MixPlan>;

const COMMAND_CAPACITY: usize = 64;
const STATUS_CAPACITY: usize = 64;
const MIX_CAPACITY: usize = 4;

fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}

fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}

/// Latest end-of-transport reached by the runtime. `tagged` holds the seek
/// seq plus one, zero meaning nothing unread.
#[derive(Default)]
struct EndMarker {
    tagged: AtomicU64,
    seconds: AtomicU64,
}

impl EndMarker {
    fn publish(&self, seconds: f64, seq: u64) {
        self.seconds.store(seconds.to_bits(), Ordering::Relaxed);
        self.tagged.store(seq.wrapping_add(1), Ordering::Release);
    }

    fn take(&self) -> Option<(f64, u64)> {
        let tagged = self.tagged.swap(0, Ordering::Acquire);
        (tagged != 0).then(|| (f64::from_bits(self.seconds.load(Ordering::Relaxed)), tagged - 1))
    }
}

/// Whether `next` makes a queued `last` redundant when nothing runs between
/// them.
fn supersedes(last: &Command, next: &Command) -> bool {
    matches!(
        (last, next),
        (Command::Seek { .. }, Command::Seek { .. })
            | (Command::SetLength { .. }, Command::SetLength { .. })
            | (Command::Play | Command::Pause, Command::Play | Command::Pause)
    )
}

pub struct EngineHandle {
    commands: rtrb::Producer<Command>,
    status: rtrb::Consumer<Status>,
    mix: rtrb::Producer<SharedMix>,
    end: Arc<EndMarker>,
    collector: Collector,
    handle: Handle,
    /// Commands waiting for room in the ring, oldest first.
    backlog: VecDeque<Command>,
    pending_mix: Option<SharedMix>,
    position: f64,
    seek_seq: u64,
    events: VecDeque<EngineEvent>,
}

pub struct TransportRuntime {
    commands: rtrb::Consumer<Command>,
    status: rtrb::Producer<Status>,
    mix: rtrb::Consumer<SharedMix>,
    end: Arc<EndMarker>,
    current_mix: Option<SharedMix>,
    sample_rate: u32,
    playing: bool,
    position: u64,
    length: u64,
    seek_seq: u64,
}

pub fn start(sample_rate: u32) -> (EngineHandle, TransportRuntime) {
    let collector = Collector::new();
    let handle = collector.handle();

    let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(COMMAND_CAPACITY);
    let (status_tx, status_rx) = rtrb::RingBuffer::<Status>::new(STATUS_CAPACITY);
    let (mix_tx, mix_rx) = rtrb::RingBuffer::<SharedMix>::new(MIX_CAPACITY);
    let end = Arc::new(EndMarker::default());

    let engine = EngineHandle {
        commands: command_tx,
        status: status_rx,
        mix: mix_tx,
        end: Arc::clone(&end),
        collector,
        handle,
        backlog: VecDeque::new(),
        pending_mix: None,
        position: 0.0,
        seek_seq: 0,
        events: VecDeque::new(),
    };

    let runtime = TransportRuntime {
        commands: command_rx,
        status: status_tx,
        mix: mix_rx,
        end,
        current_mix: None,
        sample_rate: sample_rate.max(1),
        playing: false,
        position: 0,
        length: u64::MAX,
        seek_seq: 0,
    };

    (engine, runtime)
}

impl EngineHandle {
    fn push(&mut self, command: Command) {
        self.flush();
        if self.backlog.is_empty() && self.commands.push(command).is_ok() {
            return;
        }

        match self.backlog.back_mut() {
            Some(last) if supersedes(last, &command) => *last = command,
            _ => {
                tracing::debug!(?command, backlog = self.backlog.len() + 1, "engine command ring full, queueing");
                self.backlog.push_back(command);
            }
        }
    }

    /// Move queued commands and the newest undelivered mix into their rings
    /// as far as room allows.
    fn flush(&mut self) {
        while let Some(&command) = self.backlog.front() {
            if self.commands.push(command).is_err() {
                break;
            }
            self.backlog.pop_front();
        }

        if let Some(mix) = self.pending_mix.take() {
            if let Err(rtrb::PushError::Full(mix)) = self.mix.push(mix) {
                self.pending_mix = Some(mix);
            }
        }
    }

    /// Commands accepted but not yet handed to the runtime.
    pub fn queued_commands(&self) -> usize {
        self.backlog.len()
    }

    fn drain_status(&mut self) {
        self.flush();

        while let Ok(status) = self.status.pop() {
            match status {
                Status::Position { seconds, seq } if seq >= self.seek_seq => {
                    self.position = seconds;
                }
                stale => {
                    tracing::trace!(?stale, latest_seek = self.seek_seq, "discarding stale status");
                }
            }
        }

        if let Some((seconds, seq)) = self.end.take() {
            if seq >= self.seek_seq {
                self.position = seconds;
                self.events.push_back(EngineEvent::ReachedEnd { seconds });
            } else {
                tracing::trace!(seconds, seq, latest_seek = self.seek_seq, "discarding stale end of transport");
            }
        }
    }
}

impl AudioEngine for EngineHandle {
    fn play(&mut self) {
        self.push(Command::Play);
    }

    fn pause(&mut self) {
        self.push(Command::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.seek_seq += 1;
        self.position = seconds;
        self.push(Command::Seek {
            seconds,
            seq: self.seek_seq,
        });
    }

    fn set_transport_length(&mut self, seconds: f64) {
        self.push(Command::SetLength { seconds });
    }

    fn current_seconds(&mut self) -> f64 {
        self.drain_status();
        self.position
    }

    fn sync_mix(&mut self, plan: Arc<MixPlan>) {
        let shared = Shared::new(&self.handle, (*plan).clone());
        // Only the newest plan matters, so a waiting one is replaced
        self.pending_mix = Some(shared);
        self.flush();
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.drain_status();
        self.collector.collect();
        self.events.drain(..).collect()
    }
}

impl TransportRuntime {
    /// Advance the transport by `frames` samples, applying any queued
    /// commands first. Reports the resulting position once per call.
    pub fn process(&mut self, frames: usize) {
        // Swap in a new mix if available (lock-free)
        while let Ok(mix) = self.mix.pop() {
            self.current_mix = Some(mix);
        }

        while let Ok(cmd) = self.commands.pop() {
            match cmd {
                Command::Play => self.playing = true,
                Command::Pause => self.playing = false,
                Command::Seek { seconds, seq } => {
                    self.position = seconds_to_frames(seconds, self.sample_rate);
                    self.seek_seq = seq;
                }
                Command::SetLength { seconds } => {
                    self.length = seconds_to_frames(seconds, self.sample_rate);
                }
            }
        }

        if self.playing {
            self.position = self.position.saturating_add(frames as u64);
            if self.position >= self.length {
                self.position = self.length;
                self.playing = false;
                self.end.publish(self.position_seconds(), self.seek_seq);
                return;
            }
        }

        // Positions supersede each other; a full ring only delays the next
        let _ = self.status.push(Status::Position {
            seconds: self.position_seconds(),
            seq: self.seek_seq,
        });
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_frames(&self) -> u64 {
        self.position
    }

    pub fn position_seconds(&self) -> f64 {
        frames_to_seconds(self.position, self.sample_rate)
    }

    /// Clips the current mix would make audible at the transport position.
    pub fn audible_clips(&self) -> Vec<ClipId> {
        let at = self.position_seconds();
        self.current_mix
            .as_ref()
            .map(|mix| mix.audible_at(at).map(|c| c.clip).collect())
            .unwrap_or_default()
    }
}
