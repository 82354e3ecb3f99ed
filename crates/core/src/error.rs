use std::fmt;

use overdub_transport::{ChannelId, ClipId};

/// What an edit pointed at that turned out not to exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    Clip(ClipId),
    Channel(ChannelId),
    ChannelIndex(usize),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Clip(id) => write!(f, "{id}"),
            Reference::Channel(id) => write!(f, "{id}"),
            Reference::ChannelIndex(index) => write!(f, "channel lane {index}"),
        }
    }
}

/// Reasons an edit is refused. The store never surfaces these to the user;
/// a refused edit leaves the timeline exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("{0} does not exist")]
    InvalidReference(Reference),

    #[error("{what} out of range: {value}")]
    InvalidRange { what: &'static str, value: f64 },

    #[error("{0} has not finished loading")]
    ResourceNotReady(ClipId),
}

impl EditError {
    pub(crate) fn range(what: &'static str, value: f64) -> Self {
        Self::InvalidRange { what, value }
    }
}

pub(crate) fn finite(what: &'static str, value: f64) -> Result<f64, EditError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EditError::range(what, value))
    }
}
