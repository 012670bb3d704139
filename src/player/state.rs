use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::audio::PlaybackOutcome;
use crate::config::PlaybackSettings;
use crate::lesson::{LearnedItems, Lesson};
use crate::player::QueueItem;

/// Shared learned-items provider handed to the player on initialization.
#[derive(Clone)]
pub struct LearnedFilter(pub Arc<dyn LearnedItems>);

impl std::fmt::Debug for LearnedFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LearnedFilter")
    }
}

/// Commands that can be sent to the Player task.
#[derive(Debug)]
pub enum PlayerCommand {
    /// Builds the queue for a lesson and preloads its audio.
    /// Replies with the number of queue items once preloading settled.
    Initialize {
        lesson: Box<Lesson>,
        audio_base: String,
        settings: PlaybackSettings,
        learned: LearnedFilter,
        reply: Option<oneshot::Sender<usize>>,
    },
    Play(PlaybackSettings),
    Pause,
    Resume(PlaybackSettings),
    Stop,
    SkipToNext(PlaybackSettings),
    SkipToPrevious(PlaybackSettings),
    PlaySingleItem { index: usize, settings: PlaybackSettings },
    JumpToExample { section_idx: usize, example_idx: usize, settings: PlaybackSettings },
    GetState(oneshot::Sender<PlaybackSnapshot>),
    Cleanup,
    Shutdown,
    /// A sequenced item's handle finished. Sent by handle callbacks.
    ItemFinished { generation: u64, outcome: PlaybackOutcome },
    /// A standalone item's handle finished. Sent by handle callbacks.
    SingleItemFinished { generation: u64, index: usize, outcome: PlaybackOutcome },
    /// The end-of-item pause elapsed. Sent by the pause timer.
    ContinueAfterPause { generation: u64 },
}

/// Observable state of the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_item_index: Option<usize>,
    pub current_item: Option<QueueItem>,
    pub reading_queue: Vec<QueueItem>,
}

/// Updates broadcast by the Player task about its state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStateUpdate {
    Initialized {
        queue_len: usize,
        loaded: usize,
    },
    ItemStarted {
        index: usize,
        item: QueueItem,
        rate: f32,
    },
    ItemSkipped {
        index: usize,
        reason: String,
    },
    PauseScheduled {
        after_index: usize,
        pause: Duration,
        generation: u64,
    },
    SingleItemStarted {
        index: usize,
        item: QueueItem,
    },
    Paused {
        index: Option<usize>,
    },
    Stopped,
    Cleared,
}
