pub mod clip_ops;
pub mod clock;
pub mod error;
pub mod gesture;
pub mod mix;
pub mod playhead;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod time;

pub use clock::TransportClock;
pub use error::{EditError, Reference};
pub use gesture::{CropEdge, CropGesture, DragRelease};
pub use mix::{MixSync, plan_mix};
pub use playhead::{
    AnimationState, CancelToken, Clock, ManualClock, MonotonicClock, PlayheadAnimator, PlayheadFrame,
};
pub use session::{Session, SessionOptions};
pub use snapshot::{ChannelSummary, ClipSummary, TimelineSnapshot};
pub use store::{Action, DEFAULT_TRANSPORT_LENGTH, Timeline, TimelineEvent, TimelineStore};
pub use time::{PIXELS_PER_SECOND, RulerMark, TimeScale, Timecode};

pub use overdub_engine::{EngineHandle, TransportRuntime};
pub use overdub_transport::{
    AudioEngine, AudioHandle, Channel, ChannelId, Clip, ClipId, MIN_CLIP_SECONDS, RecordingDescriptor,
    WaveformPoint, WaveformView,
};
