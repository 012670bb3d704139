// src/audio/playback.rs
use async_trait::async_trait;
use std::sync::Arc;

use crate::audio::error::AudioError;

/// How a single play request of a handle came to an end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The resource reached its end.
    Ended,
    /// The resource failed while playing.
    Failed(String),
}

/// Callback invoked by a handle when the current play request ends or fails.
///
/// A handle invokes it at most once per successful `play` call. It may be
/// invoked from any task, so implementations forward it to the player's
/// command channel instead of touching player state directly.
pub type FinishCallback = Arc<dyn Fn(PlaybackOutcome) + Send + Sync + 'static>;

/// A loaded, playable audio resource.
///
/// All methods are synchronous: they only change the resource's transport
/// state. Completion is reported through the [`FinishCallback`] passed to
/// [`AudioHandle::play`].
pub trait AudioHandle: Send + Sync {
    /// Starts (or continues) playback from the current position.
    ///
    /// Replaces any callback registered by an earlier `play` call.
    fn play(&mut self, on_finish: FinishCallback) -> Result<(), AudioError>;

    /// Halts playback, keeping the current position.
    fn pause(&mut self);

    /// Moves the position back to zero. Playback state is unchanged.
    fn rewind(&mut self);

    /// Sets the playback rate, `1.0` being normal speed.
    fn set_playback_rate(&mut self, rate: f32);

    /// Halts playback and drops any resources held by the handle.
    /// A released handle refuses to play.
    fn release(&mut self);
}

/// Turns an audio URL into a playable handle.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Loads the resource behind `url`, resolving once it is ready to play.
    async fn load(&self, url: &str) -> Result<Box<dyn AudioHandle>, AudioError>;
}
