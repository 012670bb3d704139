// src/audio/preload.rs
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::audio::playback::{AudioBackend, AudioHandle};
use crate::player::QueueItem;

const LOG_TARGET: &str = "r_lessonaudio::audio::preload";

/// Preloaded handles keyed by audio URL. URLs that failed to load are absent.
#[derive(Default)]
pub struct AudioHandleMap {
    handles: HashMap<String, Box<dyn AudioHandle>>,
}

impl AudioHandleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, handle: Box<dyn AudioHandle>) {
        self.handles.insert(url.into(), handle);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.handles.contains_key(url)
    }

    pub fn get_mut(&mut self, url: &str) -> Option<&mut (dyn AudioHandle + 'static)> {
        self.handles.get_mut(url).map(|handle| handle.as_mut())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Releases every handle and empties the map.
    pub fn release_all(&mut self) {
        for (_, mut handle) in self.handles.drain() {
            handle.release();
        }
    }
}

impl std::fmt::Debug for AudioHandleMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handles.keys()).finish()
    }
}

/// Loads every queue item's audio concurrently and waits for all attempts to
/// settle. A failed load leaves no entry for that URL; it never fails the
/// whole operation.
#[instrument(skip(queue, backend), fields(queue_len = queue.len()))]
pub async fn preload(queue: &[QueueItem], backend: &dyn AudioBackend) -> AudioHandleMap {
    let mut urls: Vec<&str> = Vec::new();
    for url in queue.iter().filter_map(|item| item.audio_url.as_deref()) {
        if !url.is_empty() && !urls.contains(&url) {
            urls.push(url);
        }
    }
    info!(target: LOG_TARGET, "Pre-loading {} audio files...", urls.len());

    let attempts = urls.iter().map(|url| async move { (*url, backend.load(url).await) });
    let results = join_all(attempts).await;

    let mut map = AudioHandleMap::new();
    for (url, result) in results {
        match result {
            Ok(handle) => map.insert(url, handle),
            Err(e) => warn!(target: LOG_TARGET, %url, "Failed to load audio: {}", e),
        }
    }
    info!(target: LOG_TARGET, "Pre-loaded {} of {} audio files.", map.len(), urls.len());
    map
}
