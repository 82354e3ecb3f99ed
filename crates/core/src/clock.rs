//! Boundary between the session and the audio engine's transport.

use std::sync::Arc;

use overdub_transport::{AudioEngine, EngineEvent, MixPlan};

use crate::store::Action;
use crate::time::TimeScale;

/// Owns the engine and converts at its edge: seconds in, seconds out, with
/// pixel input resolved through the shared [`TimeScale`] exactly once.
pub struct TransportClock<E: AudioEngine> {
    engine: E,
    scale: TimeScale,
}

impl<E: AudioEngine> TransportClock<E> {
    pub fn new(engine: E, scale: TimeScale) -> Self {
        Self { engine, scale }
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn play(&mut self) {
        self.engine.play();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn seek(&mut self, seconds: f64) {
        self.engine.seek(seconds.max(0.0));
    }

    /// Seconds a click at `x` pixels seeks to, after the near-zero floor.
    pub fn seek_target(&self, x: f64) -> f64 {
        self.scale.seek_target(x)
    }

    pub fn set_transport_length(&mut self, seconds: f64) {
        self.engine.set_transport_length(seconds);
    }

    pub fn current_seconds(&mut self) -> f64 {
        self.engine.current_seconds()
    }

    pub fn push_mix(&mut self, plan: Arc<MixPlan>) {
        self.engine.sync_mix(plan);
    }

    /// Drain engine notifications as store actions.
    pub fn poll(&mut self) -> Vec<Action> {
        self.engine
            .poll_events()
            .into_iter()
            .map(|event| match event {
                EngineEvent::ReachedEnd { seconds } => {
                    tracing::debug!(seconds, "engine reached transport end");
                    Action::Pause { at: seconds }
                }
            })
            .collect()
    }
}
