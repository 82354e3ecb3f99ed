//! Pure functions for clip edits, designed to be testable without the audio engine.
//!
//! Every delta is an increment applied to the current value, never an
//! absolute replacement. Functions return the edited copy and leave the input
//! untouched, so a rejected edit has nothing to roll back.

use overdub_transport::{
    Channel, ChannelId, Clip, ClipId, MIN_CLIP_SECONDS, RecordingDescriptor,
};

use crate::error::{EditError, Reference, finite};
use crate::time::snap;

/// Shift a clip along the timeline by `delta` seconds, optionally rounding
/// the result to the nearest `snap_grid` unit. Never moves before zero.
pub fn move_clip(clip: &Clip, delta: f64, snap_grid: Option<f64>) -> Result<Clip, EditError> {
    let delta = finite("move delta", delta)?;

    let mut position = clip.position + delta;
    if let Some(grid) = snap_grid {
        position = snap(position, grid);
    }
    let position = finite("move position", position)?;

    let mut moved = clip.clone();
    moved.position = position.max(0.0);
    Ok(moved)
}

/// Inset the active window by `left` seconds at the start and `right`
/// seconds at the end. Negative insets widen the window back toward the
/// recorded material. The result is clamped to the recorded buffer and
/// never narrower than [`MIN_CLIP_SECONDS`]; `position` is unchanged.
pub fn crop_clip(clip: &Clip, left: f64, right: f64) -> Result<Clip, EditError> {
    if !clip.loaded {
        return Err(EditError::ResourceNotReady(clip.id));
    }
    let left = finite("crop left", left)?;
    let right = finite("crop right", right)?;

    let lo = clip.origin;
    let hi = clip.buffer_end();
    if hi - lo < MIN_CLIP_SECONDS {
        return Err(EditError::range("recorded duration", clip.raw_duration));
    }

    // max/min rather than clamp: start + MIN may round past hi
    let start = (clip.start + left).max(lo).min(hi - MIN_CLIP_SECONDS);
    let end = (clip.end - right).max(start + MIN_CLIP_SECONDS).min(hi);

    let mut cropped = clip.clone();
    cropped.start = start;
    cropped.end = end;
    Ok(cropped)
}

/// Cut a clip in two at `split_point` (window seconds, strictly inside
/// `(start, end)`). The left half keeps the id; the right half gets
/// `right_id` and sits where its material already played.
pub fn split_clip(clip: &Clip, split_point: f64, right_id: ClipId) -> Result<(Clip, Clip), EditError> {
    if !clip.loaded {
        return Err(EditError::ResourceNotReady(clip.id));
    }
    if !clip.strictly_contains(split_point) {
        return Err(EditError::range("split point", split_point));
    }

    let mut left = clip.clone();
    left.end = split_point;

    let mut right = clip.clone();
    right.id = right_id;
    right.position = clip.position + (split_point - clip.start);
    right.start = split_point;

    Ok((left, right))
}

pub fn toggle_mute(clip: &Clip) -> Result<Clip, EditError> {
    if !clip.loaded {
        return Err(EditError::ResourceNotReady(clip.id));
    }
    let mut toggled = clip.clone();
    toggled.muted = !clip.muted;
    Ok(toggled)
}

pub fn toggle_solo(clip: &Clip) -> Result<Clip, EditError> {
    if !clip.loaded {
        return Err(EditError::ResourceNotReady(clip.id));
    }
    let mut toggled = clip.clone();
    toggled.solo = !clip.solo;
    Ok(toggled)
}

/// Turn a finished recording into an unloaded clip on `channel_id`.
pub fn clip_from_recording(
    recording: &RecordingDescriptor,
    id: ClipId,
    channel_id: ChannelId,
) -> Result<Clip, EditError> {
    let start = finite("recording start", recording.start_seconds)?;
    let stop = finite("recording stop", recording.stop_seconds)?;
    let raw_duration = finite("recorded duration", recording.raw_duration_seconds)?.max(0.0);

    Ok(Clip {
        id,
        channel_id,
        position: start.max(0.0),
        start,
        end: stop.clamp(start, start + raw_duration),
        origin: start,
        raw_duration,
        muted: false,
        solo: false,
        loaded: false,
        audio: recording.audio.clone(),
    })
}

/// Locate a clip: (channel index, clip).
pub fn find_clip(channels: &[Channel], id: ClipId) -> Option<(usize, &Clip)> {
    channels
        .iter()
        .enumerate()
        .find_map(|(index, channel)| channel.clip(id).map(|clip| (index, clip)))
}

/// Move a clip's membership to the channel at `target`. Returns the
/// (from, to) channel ids when membership changed, `None` when the clip
/// already lives there.
pub fn relocate_clip(
    channels: &mut [Channel],
    id: ClipId,
    target: usize,
) -> Result<Option<(ChannelId, ChannelId)>, EditError> {
    let (source, _) = find_clip(channels, id).ok_or(EditError::InvalidReference(Reference::Clip(id)))?;
    if target >= channels.len() {
        return Err(EditError::InvalidReference(Reference::ChannelIndex(target)));
    }
    if source == target {
        return Ok(None);
    }

    let clip = channels[source]
        .remove_clip(id)
        .ok_or(EditError::InvalidReference(Reference::Clip(id)))?;
    let from = channels[source].id;
    let to = channels[target].id;
    channels[target].insert_clip(clip);
    Ok(Some((from, to)))
}

/// Routing rule: mute always silences; when anything is soloed only soloed
/// material (clip or its channel) plays; unloaded clips are inert.
pub fn is_audible(clip: &Clip, channel: &Channel, any_solo: bool) -> bool {
    clip.loaded
        && !clip.muted
        && !channel.muted
        && (!any_solo || clip.solo || channel.solo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use overdub_transport::AudioHandle;

    fn make_clip(id: u64, position: f64, start: f64, end: f64) -> Clip {
        Clip {
            id: ClipId(id),
            channel_id: ChannelId(0),
            position,
            start,
            end,
            origin: start,
            raw_duration: end - start,
            muted: false,
            solo: false,
            loaded: true,
            audio: AudioHandle::new(format!("take-{id}")),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_move_is_an_increment() {
        let clip = make_clip(1, 10.0, 0.0, 5.0);

        let moved = move_clip(&clip, 3.0, None).unwrap();
        assert_eq!(moved.position, 13.0);

        let moved_back = move_clip(&moved, -3.0, None).unwrap();
        assert_eq!(moved_back.position, 10.0);
    }

    #[test]
    fn test_move_never_goes_negative() {
        let clip = make_clip(1, 2.0, 0.0, 5.0);

        let moved = move_clip(&clip, -10.0, None).unwrap();
        assert_eq!(moved.position, 0.0);
    }

    #[test]
    fn test_move_snaps_before_commit() {
        let clip = make_clip(1, 1.0, 0.0, 5.0);

        let moved = move_clip(&clip, 0.3, Some(0.5)).unwrap();
        assert_eq!(moved.position, 1.5);
    }

    #[test]
    fn test_move_rejects_non_finite_delta() {
        let clip = make_clip(1, 1.0, 0.0, 5.0);

        assert!(matches!(
            move_clip(&clip, f64::NAN, None),
            Err(EditError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_move_rejects_overflowing_position() {
        let clip = make_clip(1, 0.0, 0.0, 5.0);
        let once = move_clip(&clip, 1e308, None).unwrap();
        assert!(once.is_well_formed());

        assert!(matches!(
            move_clip(&once, 1e308, None),
            Err(EditError::InvalidRange { what: "move position", .. })
        ));
    }

    #[test]
    fn test_crop_insets_window_without_moving() {
        let clip = make_clip(1, 4.0, 0.0, 10.0);

        let cropped = crop_clip(&clip, 2.0, 3.0).unwrap();
        assert_eq!(cropped.start, 2.0);
        assert_eq!(cropped.end, 7.0);
        assert_eq!(cropped.position, 4.0);
    }

    #[test]
    fn test_crop_clamps_to_minimal_width() {
        // start=0, end=10, raw=10, left=-5, right=20
        let clip = make_clip(1, 0.0, 0.0, 10.0);

        let cropped = crop_clip(&clip, -5.0, 20.0).unwrap();
        assert_eq!(cropped.start, 0.0);
        assert_close(cropped.end, MIN_CLIP_SECONDS);
        assert!(cropped.is_well_formed());
    }

    #[test]
    fn test_crop_can_restore_cropped_material() {
        let clip = make_clip(1, 0.0, 0.0, 10.0);
        let cropped = crop_clip(&clip, 3.0, 3.0).unwrap();

        let restored = crop_clip(&cropped, -100.0, -100.0).unwrap();
        assert_eq!(restored.start, 0.0);
        assert_eq!(restored.end, 10.0);
    }

    #[test]
    fn test_crop_left_past_end_keeps_window_inside_buffer() {
        let clip = make_clip(1, 0.0, 0.0, 10.0);

        let cropped = crop_clip(&clip, 50.0, 0.0).unwrap();
        assert_close(cropped.start, 10.0 - MIN_CLIP_SECONDS);
        assert_eq!(cropped.end, 10.0);
        assert!(cropped.is_well_formed());
    }

    #[test]
    fn test_crop_requires_loaded_clip() {
        let mut clip = make_clip(7, 0.0, 0.0, 10.0);
        clip.loaded = false;

        assert_eq!(
            crop_clip(&clip, 1.0, 1.0).unwrap_err(),
            EditError::ResourceNotReady(ClipId(7))
        );
    }

    #[test]
    fn test_split_divides_window_and_conserves_duration() {
        // start=2, end=10, position=5 split at 6
        let mut clip = make_clip(1, 5.0, 2.0, 10.0);
        clip.origin = 0.0;
        clip.raw_duration = 12.0;

        let (left, right) = split_clip(&clip, 6.0, ClipId(2)).unwrap();

        assert_eq!((left.id, left.position, left.start, left.end), (ClipId(1), 5.0, 2.0, 6.0));
        assert_eq!((right.id, right.position, right.start, right.end), (ClipId(2), 9.0, 6.0, 10.0));
        assert_eq!(left.duration() + right.duration(), clip.duration());
        assert_eq!(left.timeline_end(), right.position);
        assert_eq!(left.audio, right.audio);
        assert_eq!(left.channel_id, right.channel_id);
    }

    #[test]
    fn test_split_outside_window_is_rejected() {
        let clip = make_clip(1, 5.0, 2.0, 10.0);

        for point in [2.0, 10.0, 1.0, 11.0] {
            assert!(
                matches!(split_clip(&clip, point, ClipId(9)), Err(EditError::InvalidRange { .. })),
                "split at {point} should be rejected"
            );
        }
    }

    #[test]
    fn test_mute_and_solo_are_independent() {
        let clip = make_clip(1, 0.0, 0.0, 1.0);

        let muted = toggle_mute(&clip).unwrap();
        let both = toggle_solo(&muted).unwrap();
        assert!(both.muted && both.solo);

        let unmuted = toggle_mute(&both).unwrap();
        assert!(!unmuted.muted && unmuted.solo);
    }

    #[test]
    fn test_clip_from_recording_starts_unloaded() {
        let recording = RecordingDescriptor {
            start_seconds: 3.0,
            stop_seconds: 7.5,
            raw_duration_seconds: 4.5,
            audio: AudioHandle::new("blob:take"),
        };

        let clip = clip_from_recording(&recording, ClipId(4), ChannelId(2)).unwrap();

        assert_eq!(clip.position, 3.0);
        assert_eq!((clip.start, clip.end, clip.origin), (3.0, 7.5, 3.0));
        assert_eq!(clip.channel_id, ChannelId(2));
        assert!(!clip.loaded);
        assert!(clip.is_well_formed());
    }

    #[test]
    fn test_clip_from_recording_clamps_stop_into_buffer() {
        let recording = RecordingDescriptor {
            start_seconds: 1.0,
            stop_seconds: 9.0,
            raw_duration_seconds: 2.0,
            audio: AudioHandle::new("blob:short"),
        };

        let clip = clip_from_recording(&recording, ClipId(1), ChannelId(0)).unwrap();
        assert_eq!(clip.end, 3.0);
    }

    #[test]
    fn test_relocate_there_and_back() {
        let mut channels = vec![
            Channel::new(ChannelId(10), "A".to_string()),
            Channel::new(ChannelId(11), "B".to_string()),
        ];
        channels[0].insert_clip(make_clip(1, 0.0, 0.0, 1.0));

        let moved = relocate_clip(&mut channels, ClipId(1), 1).unwrap();
        assert_eq!(moved, Some((ChannelId(10), ChannelId(11))));
        assert!(channels[0].is_empty());
        assert_eq!(channels[1].clips()[0].channel_id, ChannelId(11));

        let back = relocate_clip(&mut channels, ClipId(1), 0).unwrap();
        assert_eq!(back, Some((ChannelId(11), ChannelId(10))));
        assert_eq!(channels[0].clips()[0].channel_id, ChannelId(10));
        assert!(channels[1].is_empty());

        assert_eq!(relocate_clip(&mut channels, ClipId(1), 0).unwrap(), None);
    }

    #[test]
    fn test_relocate_to_missing_lane_fails() {
        let mut channels = vec![Channel::new(ChannelId(0), "A".to_string())];
        channels[0].insert_clip(make_clip(1, 0.0, 0.0, 1.0));

        assert_eq!(
            relocate_clip(&mut channels, ClipId(1), 3).unwrap_err(),
            EditError::InvalidReference(Reference::ChannelIndex(3))
        );
        assert_eq!(channels[0].clips().len(), 1);
    }

    #[test]
    fn test_audibility_rules() {
        let channel = Channel::new(ChannelId(0), "A".to_string());
        let mut clip = make_clip(1, 0.0, 0.0, 1.0);

        assert!(is_audible(&clip, &channel, false));
        // Something else is soloed
        assert!(!is_audible(&clip, &channel, true));

        clip.solo = true;
        assert!(is_audible(&clip, &channel, true));

        // Mute wins over solo
        clip.muted = true;
        assert!(!is_audible(&clip, &channel, true));

        clip.muted = false;
        clip.loaded = false;
        assert!(!is_audible(&clip, &channel, false));
    }
}
