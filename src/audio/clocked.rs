// src/audio/clocked.rs
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::audio::error::AudioError;
use crate::audio::playback::{AudioHandle, FinishCallback, PlaybackOutcome};

const LOG_TARGET: &str = "r_lessonaudio::audio::clocked";

/// A handle whose playback is driven by a clock instead of an output device.
///
/// Position advances at `rate` while playing; the finish callback fires once
/// the remaining duration has elapsed.
pub struct ClockedHandle {
    url: String,
    duration: Duration,
    position: Duration,
    rate: f32,
    started_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    on_finish: Option<FinishCallback>,
    released: bool,
}

impl ClockedHandle {
    pub fn new(url: impl Into<String>, duration: Duration) -> Self {
        Self {
            url: url.into(),
            duration,
            position: Duration::ZERO,
            rate: 1.0,
            started_at: None,
            timer: None,
            on_finish: None,
            released: false,
        }
    }

    /// Current position, including time elapsed since playback started.
    pub fn position(&self) -> Duration {
        match self.started_at {
            Some(started) => self.advance_from(started),
            None => self.position,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn playback_rate(&self) -> f32 {
        self.rate
    }

    fn advance_from(&self, started: Instant) -> Duration {
        let played = started.elapsed().mul_f32(self.rate);
        (self.position + played).min(self.duration)
    }

    /// Folds elapsed play time into `position` and disarms the timer.
    fn halt_clock(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.position = self.advance_from(started);
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn arm_clock(&mut self) {
        let Some(on_finish) = self.on_finish.clone() else {
            return;
        };
        let remaining = self
            .duration
            .saturating_sub(self.position)
            .div_f32(self.rate);
        let url = self.url.clone();
        trace!(target: LOG_TARGET, %url, ?remaining, "Arming playback clock.");
        self.started_at = Some(Instant::now());
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            debug!(target: LOG_TARGET, %url, "Playback reached end of resource.");
            on_finish(PlaybackOutcome::Ended);
        }));
    }
}

impl AudioHandle for ClockedHandle {
    fn play(&mut self, on_finish: FinishCallback) -> Result<(), AudioError> {
        if self.released {
            return Err(AudioError::InvalidState(format!(
                "handle for {} has been released",
                self.url
            )));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(AudioError::PlaybackError(format!(
                "unsupported playback rate {}",
                self.rate
            )));
        }
        self.halt_clock();
        self.on_finish = Some(on_finish);
        self.arm_clock();
        Ok(())
    }

    fn pause(&mut self) {
        self.halt_clock();
    }

    fn rewind(&mut self) {
        let was_playing = self.is_playing();
        self.halt_clock();
        self.position = Duration::ZERO;
        if was_playing {
            self.arm_clock();
        }
    }

    fn set_playback_rate(&mut self, rate: f32) {
        let was_playing = self.is_playing();
        self.halt_clock();
        self.rate = rate;
        if was_playing && rate.is_finite() && rate > 0.0 {
            self.arm_clock();
        }
    }

    fn release(&mut self) {
        self.halt_clock();
        self.on_finish = None;
        self.released = true;
    }
}

impl Drop for ClockedHandle {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
