//! Pointer gestures translated into store actions.

use overdub_transport::{Clip, ClipId};

use crate::store::Action;
use crate::time::TimeScale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropEdge {
    Left,
    Right,
}

/// Two-step crop: the first press on a clip arms handles, a second press on
/// the same clip commits whatever insets the handles were dragged to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CropGesture {
    #[default]
    Idle,
    Armed {
        clip: ClipId,
        left: f64,
        right: f64,
    },
}

impl CropGesture {
    pub fn armed_clip(&self) -> Option<ClipId> {
        match self {
            CropGesture::Idle => None,
            CropGesture::Armed { clip, .. } => Some(*clip),
        }
    }

    /// Handle a crop-tool press on `clip`. Returns the action to dispatch
    /// when the press completes a crop.
    pub fn press(&mut self, clip: &Clip) -> Option<Action> {
        if !clip.loaded {
            return None;
        }

        match *self {
            CropGesture::Armed { clip: armed, left, right } if armed == clip.id => {
                *self = CropGesture::Idle;
                Some(Action::CropClip { id: armed, left, right })
            }
            _ => {
                *self = CropGesture::Armed {
                    clip: clip.id,
                    left: 0.0,
                    right: 0.0,
                };
                None
            }
        }
    }

    /// Set an edge inset directly, in seconds.
    pub fn set_edge(&mut self, edge: CropEdge, seconds: f64) {
        if let CropGesture::Armed { left, right, .. } = self {
            match edge {
                CropEdge::Left => *left = seconds,
                CropEdge::Right => *right = seconds,
            }
        }
    }

    /// Set an edge inset from a handle dragged `pixels` inward across an
    /// editor `editor_width` pixels wide that shows the whole clip.
    pub fn set_edge_from_pixels(&mut self, edge: CropEdge, pixels: f64, editor_width: f64, clip_duration: f64) {
        if editor_width <= 0.0 {
            return;
        }
        self.set_edge(edge, pixels / editor_width * clip_duration);
    }

    pub fn disarm(&mut self) {
        *self = CropGesture::Idle;
    }
}

/// End of a pointer drag on a clip body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRelease {
    /// Horizontal travel in pixels.
    pub dx: f64,
    /// Vertical pointer offset from the top of the first lane.
    pub y: f64,
    pub moved: bool,
}

impl DragRelease {
    /// A release without motion is a click and selects; otherwise the clip
    /// moves by the horizontal travel onto whichever lane the pointer is over.
    pub fn into_action(self, clip: ClipId, scale: &TimeScale, lanes: usize, snap: Option<f64>) -> Action {
        if !self.moved {
            return Action::SelectClip(clip);
        }
        Action::MoveClip {
            id: clip,
            delta: scale.pixels_to_seconds(self.dx),
            target_channel: scale.lane_at(self.y, lanes),
            snap,
        }
    }
}
