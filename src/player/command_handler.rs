use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

use super::playback_starter::{self, StartFrom};
use super::{
    build_queue, timing, LearnedFilter, Player, PlayerCommand, PlayerStateUpdate, QueueItemKind,
    PLAYER_LOG_TARGET,
};
use crate::audio::{preload, FinishCallback, PlaybackOutcome};
use crate::config::PlaybackSettings;
use crate::lesson::{AudioUrlScheme, Lesson};

#[instrument(skip(player, lesson, learned), fields(title = ?lesson.title))]
pub async fn handle_initialize(
    player: &mut Player,
    lesson: &Lesson,
    audio_base: String,
    settings: PlaybackSettings,
    learned: LearnedFilter,
) -> usize {
    info!(target: PLAYER_LOG_TARGET, audio_base = %audio_base, audio_speed = settings.audio_speed, "Initializing audio for lesson.");
    playback_starter::stop_playback(player);
    player.handles.release_all();

    player.settings = settings;
    let urls = AudioUrlScheme::new(audio_base);
    player.queue = build_queue(lesson, &urls, learned.0.as_ref(), &settings);

    let backend = Arc::clone(&player.backend);
    player.handles = preload(&player.queue, backend.as_ref()).await;

    player.is_playing = false;
    player.is_paused = false;
    player.current_item_index = None;
    player.current_audio = None;
    player.next_generation();

    let queue_len = player.queue.len();
    player.broadcast_update(PlayerStateUpdate::Initialized {
        queue_len,
        loaded: player.handles.len(),
    });
    info!(target: PLAYER_LOG_TARGET, queue_len, "Audio initialized.");
    queue_len
}

#[instrument(skip(player, settings))]
pub fn handle_play(player: &mut Player, settings: PlaybackSettings) {
    if player.queue.is_empty() {
        warn!(target: PLAYER_LOG_TARGET, "Play: No items in reading queue.");
        return;
    }
    if player.is_playing {
        debug!(target: PLAYER_LOG_TARGET, "Play: Already playing.");
        return;
    }

    let resuming = player.is_paused && player.current_item_index.is_some();
    player.is_playing = true;
    player.is_paused = false;
    player.settings = settings;
    info!(target: PLAYER_LOG_TARGET, current = ?player.current_item_index, resuming, "Handling Play command.");

    if resuming {
        playback_starter::play_current_item(player, StartFrom::CurrentPosition);
    } else {
        playback_starter::play_next_item(player);
    }
}

#[instrument(skip(player))]
pub fn handle_pause(player: &mut Player) {
    if !player.is_playing {
        debug!(target: PLAYER_LOG_TARGET, "Pause: Not playing.");
        return;
    }
    info!(target: PLAYER_LOG_TARGET, current = ?player.current_item_index, "Handling Pause command.");
    player.is_playing = false;
    player.is_paused = true;
    player.next_generation();
    playback_starter::halt_current(player, false);
    player.broadcast_update(PlayerStateUpdate::Paused {
        index: player.current_item_index,
    });
}

#[instrument(skip(player))]
pub fn handle_stop(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling Stop command.");
    playback_starter::stop_playback(player);
}

#[instrument(skip(player, settings))]
pub fn handle_next(player: &mut Player, settings: PlaybackSettings) {
    if player.is_at_last_item() {
        info!(target: PLAYER_LOG_TARGET, "Next: Already at end of queue.");
        return;
    }
    info!(target: PLAYER_LOG_TARGET, current = ?player.current_item_index, "Handling Next command.");
    player.settings = settings;
    playback_starter::halt_current(player, false);
    playback_starter::play_next_item(player);
}

#[instrument(skip(player, settings))]
pub fn handle_previous(player: &mut Player, settings: PlaybackSettings) {
    let Some(index) = player.current_item_index.filter(|index| *index > 0) else {
        info!(target: PLAYER_LOG_TARGET, "Previous: Already at start of queue.");
        return;
    };
    info!(target: PLAYER_LOG_TARGET, current = index, "Handling Previous command.");
    player.settings = settings;
    playback_starter::halt_current(player, false);
    player.current_item_index = Some(index - 1);
    playback_starter::play_current_item(player, StartFrom::Beginning);
}

/// Plays one item on its own; sequencer state is left untouched.
#[instrument(skip(player, settings))]
pub fn handle_play_single_item(player: &mut Player, index: usize, settings: PlaybackSettings) {
    let Some(item) = player.queue.get(index).cloned() else {
        warn!(target: PLAYER_LOG_TARGET, index, "No item at index.");
        return;
    };
    let Some(url) = item.audio_url.clone().filter(|url| player.handles.contains(url)) else {
        warn!(target: PLAYER_LOG_TARGET, index, "No audio found for item.");
        return;
    };

    if player.current_audio.as_deref() != Some(url.as_str()) {
        playback_starter::halt_current(player, false);
    }

    let generation = player.next_single_generation();
    let tx = player.internal_command_tx.clone();
    let on_finish: FinishCallback = Arc::new(move |outcome| {
        if tx.send(PlayerCommand::SingleItemFinished { generation, index, outcome }).is_err() {
            debug!(target: PLAYER_LOG_TARGET, index, "Player gone before single item finished.");
        }
    });

    player.single_rate = settings.effective_audio_speed();
    player.current_audio = Some(url.clone());
    if let Some(handle) = player.handles.get_mut(&url) {
        handle.rewind();
        handle.set_playback_rate(player.single_rate);
        if let Err(e) = handle.play(on_finish) {
            warn!(target: PLAYER_LOG_TARGET, index, "Error playing single item: {}", e);
            return;
        }
    }
    info!(target: PLAYER_LOG_TARGET, index, kind = ?item.kind, "Playing single item.");
    player.broadcast_update(PlayerStateUpdate::SingleItemStarted { index, item });
}

/// Follows a standalone question with its answer, when the answer is next.
#[instrument(skip(player, outcome))]
pub fn handle_single_item_finished(player: &mut Player, generation: u64, index: usize, outcome: PlaybackOutcome) {
    if generation != player.single_generation {
        trace!(target: PLAYER_LOG_TARGET, generation, "Ignoring stale single item completion.");
        return;
    }
    if let PlaybackOutcome::Failed(e) = outcome {
        warn!(target: PLAYER_LOG_TARGET, index, "Single item audio error: {}", e);
        return;
    }

    let (Some(item), Some(next)) = (player.queue.get(index), player.queue.get(index + 1)) else {
        return;
    };
    if next.kind != QueueItemKind::Answer || !next.same_example_as(item) {
        return;
    }
    let Some(url) = next.audio_url.clone().filter(|url| player.handles.contains(url)) else {
        return;
    };
    let answer = next.clone();

    let on_finish: FinishCallback = Arc::new(move |outcome| {
        if let PlaybackOutcome::Failed(e) = outcome {
            warn!(target: PLAYER_LOG_TARGET, "Error playing answer: {}", e);
        }
    });
    player.current_audio = Some(url.clone());
    let rate = player.single_rate;
    if let Some(handle) = player.handles.get_mut(&url) {
        handle.rewind();
        handle.set_playback_rate(rate);
        if let Err(e) = handle.play(on_finish) {
            warn!(target: PLAYER_LOG_TARGET, "Error playing answer: {}", e);
            return;
        }
    }
    info!(target: PLAYER_LOG_TARGET, index = index + 1, "Playing answer too.");
    player.broadcast_update(PlayerStateUpdate::SingleItemStarted {
        index: index + 1,
        item: answer,
    });
}

#[instrument(skip(player, settings))]
pub fn handle_jump_to_example(player: &mut Player, section_idx: usize, example_idx: usize, settings: PlaybackSettings) {
    let target = player.queue.iter().position(|item| {
        item.kind == QueueItemKind::Question
            && item.section_idx == Some(section_idx)
            && item.example_idx == Some(example_idx)
    });
    let Some(index) = target else {
        warn!(target: PLAYER_LOG_TARGET, section_idx, example_idx, "Jump: Example not in queue.");
        return;
    };
    info!(target: PLAYER_LOG_TARGET, index, is_playing = player.is_playing, "Jumping to example.");

    if player.is_playing {
        playback_starter::halt_current(player, false);
        player.settings = settings;
        player.current_item_index = index.checked_sub(1);
        playback_starter::play_next_item(player);
    } else {
        player.current_item_index = Some(index);
        handle_play_single_item(player, index, settings);
    }
}

/// Applies the end-of-item pause rule and moves on.
#[instrument(skip(player, outcome))]
pub fn handle_item_finished(player: &mut Player, generation: u64, outcome: PlaybackOutcome) {
    if generation != player.generation {
        trace!(target: PLAYER_LOG_TARGET, generation, current = player.generation, "Ignoring stale item completion.");
        return;
    }
    if !player.is_playing {
        return;
    }

    match outcome {
        PlaybackOutcome::Failed(e) => {
            warn!(target: PLAYER_LOG_TARGET, current = ?player.current_item_index, "Audio playback error: {}", e);
            playback_starter::play_next_item(player);
        }
        PlaybackOutcome::Ended => {
            let Some(index) = player.current_item_index else {
                playback_starter::play_next_item(player);
                return;
            };
            let pause = match player.queue.get(index) {
                Some(item) => timing::end_of_item_pause(item, player.queue.get(index + 1), player.settings.read_answers),
                None => Default::default(),
            };
            if pause.is_zero() {
                playback_starter::play_next_item(player);
            } else {
                playback_starter::schedule_continuation(player, index, pause);
            }
        }
    }
}

pub fn handle_continue_after_pause(player: &mut Player, generation: u64) {
    if generation != player.generation || !player.is_playing {
        debug!(target: PLAYER_LOG_TARGET, generation, "Pause elapsed after playback changed; not advancing.");
        return;
    }
    playback_starter::play_next_item(player);
}

#[instrument(skip(player))]
pub fn handle_cleanup(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling Cleanup command.");
    playback_starter::stop_playback(player);
    player.handles.release_all();
    player.queue.clear();
    player.current_audio = None;
    player.broadcast_update(PlayerStateUpdate::Cleared);
}
