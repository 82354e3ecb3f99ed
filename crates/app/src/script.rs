//! Line-oriented session scripts, run against a headless session on a
//! manual clock so the result is deterministic.
//!
//! ```text
//! # comments and blank lines are ignored
//! length 120
//! channel Vocals
//! record 0 5          # take over [0, 5], becomes clip 0
//! load 0
//! move 0 10
//! split 0 11.5        # timeline seconds
//! play
//! advance 2.5
//! pause
//! ```
//!
//! Clips are addressed by id, channels by lane index.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use overdub_core::{
    Action, AudioHandle, ChannelId, ClipId, CropEdge, DragRelease, EngineHandle, ManualClock,
    RecordingDescriptor, Session, TimelineSnapshot, TransportRuntime,
};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    AddChannel(Option<String>),
    RenameChannel { lane: usize, name: String },
    SelectChannel(usize),
    DeselectChannels,
    DeleteChannel(usize),
    MuteChannel(usize),
    SoloChannel(usize),
    Record { start: f64, stop: f64 },
    RecordStart,
    RecordStop { duration: f64 },
    Load(u64),
    Select(u64),
    Deselect,
    Move { clip: u64, delta: f64, lane: Option<usize> },
    Drag { clip: u64, dx: f64, y: f64 },
    Crop { clip: u64, left: f64, right: f64 },
    Split { clip: u64, at: f64 },
    Delete(u64),
    Mute(u64),
    Solo(u64),
    Length(f64),
    Seek(f64),
    Click(f64),
    Snap(Option<f64>),
    Play,
    Pause,
    Advance(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    steps: Vec<(usize, Step)>,
}

impl Script {
    pub fn parse(source: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let step = parse_step(line).with_context(|| format!("line {}: `{}`", index + 1, raw.trim()))?;
            steps.push((index + 1, step));
        }
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

fn parse_step(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let command = words.next().ok_or_else(|| anyhow!("empty command"))?;
    let args: Vec<&str> = words.collect();

    let rest = |from: usize| (args.len() > from).then(|| args[from..].join(" "));

    let step = match command {
        "channel" => Step::AddChannel(rest(0)),
        "rename-channel" => Step::RenameChannel {
            lane: arg(&args, 0, "lane")?,
            name: rest(1).ok_or_else(|| anyhow!("missing name"))?,
        },
        "select-channel" => Step::SelectChannel(arg(&args, 0, "lane")?),
        "deselect-channels" => Step::DeselectChannels,
        "delete-channel" => Step::DeleteChannel(arg(&args, 0, "lane")?),
        "mute-channel" => Step::MuteChannel(arg(&args, 0, "lane")?),
        "solo-channel" => Step::SoloChannel(arg(&args, 0, "lane")?),
        "record" => Step::Record {
            start: arg(&args, 0, "start")?,
            stop: arg(&args, 1, "stop")?,
        },
        "record-start" => Step::RecordStart,
        "record-stop" => Step::RecordStop {
            duration: arg(&args, 0, "duration")?,
        },
        "load" => Step::Load(arg(&args, 0, "clip")?),
        "select" => Step::Select(arg(&args, 0, "clip")?),
        "deselect" => Step::Deselect,
        "move" => Step::Move {
            clip: arg(&args, 0, "clip")?,
            delta: arg(&args, 1, "delta")?,
            lane: optional_arg(&args, 2, "lane")?,
        },
        "drag" => Step::Drag {
            clip: arg(&args, 0, "clip")?,
            dx: arg(&args, 1, "dx")?,
            y: arg(&args, 2, "y")?,
        },
        "crop" => Step::Crop {
            clip: arg(&args, 0, "clip")?,
            left: arg(&args, 1, "left")?,
            right: arg(&args, 2, "right")?,
        },
        "split" => Step::Split {
            clip: arg(&args, 0, "clip")?,
            at: arg(&args, 1, "time")?,
        },
        "delete" => Step::Delete(arg(&args, 0, "clip")?),
        "mute" => Step::Mute(arg(&args, 0, "clip")?),
        "solo" => Step::Solo(arg(&args, 0, "clip")?),
        "length" => Step::Length(arg(&args, 0, "seconds")?),
        "seek" => Step::Seek(arg(&args, 0, "seconds")?),
        "click" => Step::Click(arg(&args, 0, "pixels")?),
        "snap" => match args.first() {
            Some(&"off") => Step::Snap(None),
            _ => Step::Snap(Some(arg(&args, 0, "grid")?)),
        },
        "play" => Step::Play,
        "pause" => Step::Pause,
        "advance" => Step::Advance(arg(&args, 0, "seconds")?),
        other => bail!("unknown command `{other}`"),
    };
    Ok(step)
}

fn arg<T: FromStr>(args: &[&str], index: usize, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = args.get(index).ok_or_else(|| anyhow!("missing {name}"))?;
    raw.parse().with_context(|| format!("invalid {name} `{raw}`"))
}

fn optional_arg<T: FromStr>(args: &[&str], index: usize, name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if index < args.len() {
        arg(args, index, name).map(Some)
    } else {
        Ok(None)
    }
}

/// A headless session plus the pieces that drive it in lockstep.
pub struct ScriptRunner {
    session: Session<EngineHandle, ManualClock>,
    runtime: TransportRuntime,
    clock: ManualClock,
    frame: Duration,
    takes: u64,
}

impl ScriptRunner {
    pub fn new(config: &Config) -> Self {
        let (engine, runtime) = overdub_engine::start(config.sample_rate);
        let clock = ManualClock::new();
        let session = Session::new(engine, clock.clone(), config.session_options());

        Self {
            session,
            runtime,
            clock,
            frame: Duration::from_millis(config.frame_interval_ms.max(1)),
            takes: 0,
        }
    }

    pub fn run(&mut self, script: &Script) -> Result<TimelineSnapshot> {
        for (line, step) in &script.steps {
            tracing::debug!(line, ?step, "step");
            self.step(step).with_context(|| format!("line {line}"))?;
        }
        Ok(self.session.snapshot())
    }

    fn channel(&self, lane: usize) -> Result<ChannelId> {
        self.session
            .state()
            .channels()
            .get(lane)
            .map(|c| c.id)
            .ok_or_else(|| anyhow!("no channel at lane {lane}"))
    }

    fn next_take(&mut self) -> AudioHandle {
        self.takes += 1;
        AudioHandle::new(format!("take-{}", self.takes))
    }

    fn step(&mut self, step: &Step) -> Result<()> {
        let session = &mut self.session;
        match *step {
            Step::AddChannel(ref name) => {
                session.dispatch(Action::AddChannel { name: name.clone() });
            }
            Step::RenameChannel { lane, ref name } => {
                let id = self.channel(lane)?;
                self.session.dispatch(Action::RenameChannel { id, name: name.clone() });
            }
            Step::SelectChannel(lane) => {
                let id = self.channel(lane)?;
                self.session.dispatch(Action::SelectChannel(id));
            }
            Step::DeselectChannels => {
                session.dispatch(Action::DeselectChannels);
            }
            Step::DeleteChannel(lane) => {
                let id = self.channel(lane)?;
                self.session.dispatch(Action::RemoveChannel(id));
            }
            Step::MuteChannel(lane) => {
                let id = self.channel(lane)?;
                self.session.dispatch(Action::ToggleChannelMute(id));
            }
            Step::SoloChannel(lane) => {
                let id = self.channel(lane)?;
                self.session.dispatch(Action::ToggleChannelSolo(id));
            }
            Step::Record { start, stop } => {
                let audio = self.next_take();
                self.session.ingest_recording(RecordingDescriptor {
                    start_seconds: start,
                    stop_seconds: stop,
                    raw_duration_seconds: stop - start,
                    audio,
                });
            }
            Step::RecordStart => session.start_recording(),
            Step::RecordStop { duration } => {
                let audio = self.next_take();
                self.session.finish_recording(audio, duration);
            }
            Step::Load(clip) => {
                session.mark_loaded(ClipId(clip));
            }
            Step::Select(clip) => {
                session.dispatch(Action::SelectClip(ClipId(clip)));
            }
            Step::Deselect => {
                session.dispatch(Action::DeselectClip);
            }
            Step::Move { clip, delta, lane } => {
                let snap = session.snap_grid();
                session.dispatch(Action::MoveClip {
                    id: ClipId(clip),
                    delta,
                    target_channel: lane,
                    snap,
                });
            }
            Step::Drag { clip, dx, y } => {
                session.release_clip_drag(ClipId(clip), DragRelease { dx, y, moved: true });
            }
            Step::Crop { clip, left, right } => {
                let id = ClipId(clip);
                session.press_crop(id);
                session.set_crop_edge(CropEdge::Left, left);
                session.set_crop_edge(CropEdge::Right, right);
                session.press_crop(id);
            }
            Step::Split { clip, at } => {
                session.split_clip_at(ClipId(clip), at);
            }
            Step::Delete(clip) => {
                session.dispatch(Action::DeleteClip(ClipId(clip)));
            }
            Step::Mute(clip) => {
                session.dispatch(Action::ToggleMute(ClipId(clip)));
            }
            Step::Solo(clip) => {
                session.dispatch(Action::ToggleSolo(ClipId(clip)));
            }
            Step::Length(seconds) => {
                session.set_transport_length(seconds);
            }
            Step::Seek(seconds) => {
                session.seek(seconds);
            }
            Step::Click(pixels) => {
                session.click_to_seek(pixels);
            }
            Step::Snap(grid) => session.set_snap(grid),
            Step::Play => {
                if !session.play() {
                    tracing::info!("play ignored: transport is at its end");
                }
            }
            Step::Pause => session.pause(),
            Step::Advance(seconds) => self.advance(seconds),
        }
        Ok(())
    }

    /// Run engine blocks, engine notifications and visual frames in
    /// lockstep for `seconds` of manual time.
    fn advance(&mut self, seconds: f64) {
        let frame_seconds = self.frame.as_secs_f64();
        let frames_per_step = (self.runtime.sample_rate() as f64 * frame_seconds).round() as usize;
        let steps = (seconds.max(0.0) / frame_seconds).round() as usize;

        for _ in 0..steps {
            self.clock.advance(self.frame);
            self.runtime.process(frames_per_step);
            self.session.poll();
            self.session.frame();
        }
    }
}
