//! Translate timeline intent (placement, mute, solo) into the plan the
//! engine plays from. The store never touches the engine; the session runs
//! [`MixSync`] after each commit that changes what should be heard and
//! hands any new plan to the transport.

use std::sync::Arc;

use overdub_transport::{ClipPlayback, MixPlan};

use crate::clip_ops::is_audible;
use crate::store::Timeline;

/// Build a mix plan from a timeline. Clips still loading are left out since
/// the engine has nothing to read yet.
pub fn plan_mix(timeline: &Timeline) -> MixPlan {
    let any_solo = timeline
        .channels()
        .iter()
        .any(|channel| channel.solo || channel.clips().iter().any(|c| c.loaded && c.solo));

    let clips = timeline
        .channels()
        .iter()
        .flat_map(|channel| {
            channel
                .clips_by_time()
                .into_iter()
                .filter(|clip| clip.loaded)
                .map(move |clip| ClipPlayback {
                    clip: clip.id,
                    audio: clip.audio.clone(),
                    position: clip.position,
                    offset: clip.buffer_offset(),
                    duration: clip.duration(),
                    audible: is_audible(clip, channel, any_solo),
                })
        })
        .collect();

    MixPlan { clips }
}

#[derive(Default)]
pub struct MixSync {
    last: Option<Arc<MixPlan>>,
}

impl MixSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// The timeline's mix, unless it matches the last one returned.
    pub fn sync(&mut self, timeline: &Timeline) -> Option<Arc<MixPlan>> {
        let plan = plan_mix(timeline);
        if self.last.as_deref() == Some(&plan) {
            return None;
        }

        let plan = Arc::new(plan);
        tracing::debug!(clips = plan.clips.len(), "mix plan changed");
        self.last = Some(Arc::clone(&plan));
        Some(plan)
    }
}
