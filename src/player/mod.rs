mod media;
mod tracker;

pub use media::MediaElement;
pub use tracker::{
    FORWARD_STEP, LoadCause, ListenStore, PERSIST_INTERVAL, PlaybackTracker, PlayerOptions,
    PlayerState, REWIND_STEP,
};
