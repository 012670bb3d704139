use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, instrument, trace};

use crate::audio::{AudioBackend, AudioHandleMap};
use crate::config::PlaybackSettings;

mod command_handler;
mod playback_starter;
mod queue;
mod run_loop;
mod state;
pub mod timing;

// Re-export key types for convenience
pub use queue::{build_queue, QueueItem, QueueItemKind};
pub use state::{LearnedFilter, PlaybackSnapshot, PlayerCommand, PlayerStateUpdate};

/// Sequences a lesson's reading queue over preloaded audio handles.
///
/// The player owns all playback state and is driven exclusively through
/// [`PlayerCommand`]s, transport calls and handle/timer completions alike, so
/// every transition runs to completion before the next one starts.
pub struct Player {
    // --- Configuration ---
    backend: Arc<dyn AudioBackend>,
    settings: PlaybackSettings,

    // --- Queue ---
    queue: Vec<QueueItem>,
    handles: AudioHandleMap,

    // --- State ---
    is_playing: bool,
    is_paused: bool,
    current_item_index: Option<usize>,
    /// URL of the handle currently associated with playback.
    current_audio: Option<String>,
    /// Identifies the current sequenced play request; completions and pause
    /// continuations carrying an older value are ignored.
    generation: u64,
    /// Same as `generation`, for standalone item plays.
    single_generation: u64,
    /// Rate of the last standalone play, reused for its follow-up answer.
    single_rate: f32,

    // --- Communication ---
    command_rx: mpsc::Receiver<PlayerCommand>,
    /// Handle completions and pause continuations. Unbounded so a completion
    /// is never dropped while the transport channel is full.
    internal_command_rx: mpsc::UnboundedReceiver<PlayerCommand>,
    internal_command_tx: mpsc::UnboundedSender<PlayerCommand>,
    state_update_tx: broadcast::Sender<PlayerStateUpdate>,
}

const PLAYER_LOG_TARGET: &str = "r_lessonaudio::player";

impl Player {
    /// Creates a new Player instance and the command channel sender.
    /// The Player itself should be run in a separate task using `Player::run`.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        state_update_capacity: usize,
        command_buffer_size: usize,
    ) -> (Self, mpsc::Sender<PlayerCommand>) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer_size);
        let (internal_command_tx, internal_command_rx) = mpsc::unbounded_channel();
        let (state_update_tx, _) = broadcast::channel(state_update_capacity);

        let player = Player {
            backend,
            settings: PlaybackSettings::default(),
            queue: Vec::new(),
            handles: AudioHandleMap::new(),
            is_playing: false,
            is_paused: false,
            current_item_index: None,
            current_audio: None,
            generation: 0,
            single_generation: 0,
            single_rate: 1.0,
            command_rx,
            internal_command_rx,
            internal_command_tx,
            state_update_tx,
        };

        (player, command_tx)
    }

    /// Subscribes to player state updates.
    pub fn subscribe_state_updates(&self) -> broadcast::Receiver<PlayerStateUpdate> {
        self.state_update_tx.subscribe()
    }

    /// Constructs the observable state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            is_paused: self.is_paused,
            current_item_index: self.current_item_index,
            current_item: self.current_item().cloned(),
            reading_queue: self.queue.clone(),
        }
    }

    /// Queue item at the current index, if the index is valid.
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.current_item_index.and_then(|index| self.queue.get(index))
    }

    pub fn reading_queue(&self) -> &[QueueItem] {
        &self.queue
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn current_item_index(&self) -> Option<usize> {
        self.current_item_index
    }

    /// Applies a command directly, bypassing the channel.
    pub async fn handle_command(&mut self, command: PlayerCommand) {
        run_loop::dispatch(self, command).await;
    }

    /// Runs the player's command processing loop. This should be spawned as a Tokio task.
    #[instrument(skip(self))]
    pub async fn run(&mut self) {
        run_loop::run_player_loop(self).await;
    }

    // --- Private Helper Methods ---

    /// Sends a state update via the broadcast channel.
    fn broadcast_update(&self, update: PlayerStateUpdate) {
        trace!(target: PLAYER_LOG_TARGET, "Broadcasting state update: {:?}", update);
        if self.state_update_tx.send(update).is_err() {
            // No receivers; nothing is listening yet.
            debug!(target: PLAYER_LOG_TARGET, "No active listeners for state update.");
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn next_single_generation(&mut self) -> u64 {
        self.single_generation += 1;
        self.single_generation
    }

    /// Index the next advance moves to.
    fn next_index(&self) -> usize {
        self.current_item_index.map_or(0, |index| index + 1)
    }

    fn is_at_last_item(&self) -> bool {
        match self.current_item_index {
            Some(index) => index + 1 >= self.queue.len(),
            None => self.queue.is_empty(),
        }
    }
}
