// src/audio/silent.rs
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

use crate::audio::clocked::ClockedHandle;
use crate::audio::error::AudioError;
use crate::audio::playback::{AudioBackend, AudioHandle};

/// Backend that fabricates fixed-length silent handles.
///
/// Used for dry runs where no audio files exist yet. URLs marked missing fail
/// to load, like a 404 would.
#[derive(Debug, Clone)]
pub struct SilentBackend {
    item_duration: Duration,
    missing: HashSet<String>,
}

impl SilentBackend {
    pub fn new(item_duration: Duration) -> Self {
        Self {
            item_duration,
            missing: HashSet::new(),
        }
    }

    pub fn with_missing<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.extend(urls.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl AudioBackend for SilentBackend {
    async fn load(&self, url: &str) -> Result<Box<dyn AudioHandle>, AudioError> {
        if self.missing.contains(url) {
            return Err(AudioError::LoadError(format!("{} not found", url)));
        }
        Ok(Box::new(ClockedHandle::new(url, self.item_duration)))
    }
}
