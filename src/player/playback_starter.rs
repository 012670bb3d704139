// src/player/playback_starter.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::audio::{AudioError, FinishCallback};
use crate::player::{timing, Player, PlayerCommand, PlayerStateUpdate, PLAYER_LOG_TARGET};

/// Where a handle starts playing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StartFrom {
    Beginning,
    CurrentPosition,
}

/// Callback routing a sequenced item's completion back to the player task.
fn sequenced_callback(tx: mpsc::UnboundedSender<PlayerCommand>, generation: u64) -> FinishCallback {
    Arc::new(move |outcome| {
        if tx.send(PlayerCommand::ItemFinished { generation, outcome }).is_err() {
            debug!(target: PLAYER_LOG_TARGET, generation, "Player gone before item finished.");
        }
    })
}

/// Halts the handle currently associated with playback, if any.
pub(super) fn halt_current(player: &mut Player, rewind: bool) {
    if let Some(url) = &player.current_audio {
        if let Some(handle) = player.handles.get_mut(url) {
            handle.pause();
            if rewind {
                handle.rewind();
            }
        }
    }
}

/// Resets playback to idle and invalidates any pending completion.
pub(super) fn stop_playback(player: &mut Player) {
    player.is_playing = false;
    player.is_paused = false;
    player.current_item_index = None;
    halt_current(player, true);
    player.current_audio = None;
    player.next_generation();
    info!(target: PLAYER_LOG_TARGET, "Stopped.");
    player.broadcast_update(PlayerStateUpdate::Stopped);
}

/// Configures and starts the handle of the item at `index`.
fn start_item(player: &mut Player, index: usize, from: StartFrom) -> Result<(), AudioError> {
    let item = player.queue[index].clone();
    let url = item
        .audio_url
        .clone()
        .ok_or_else(|| AudioError::InvalidState(format!("item {} has no audio", index)))?;
    if !player.handles.contains(&url) {
        return Err(AudioError::InvalidState(format!("no preloaded audio for {}", url)));
    }

    if player.current_audio.as_deref() != Some(url.as_str()) {
        halt_current(player, false);
    }

    let rate = timing::playback_rate(item.kind, player.settings.effective_audio_speed());
    let generation = player.next_generation();
    let on_finish = sequenced_callback(player.internal_command_tx.clone(), generation);
    player.current_audio = Some(url.clone());

    if let Some(handle) = player.handles.get_mut(&url) {
        if from == StartFrom::Beginning {
            handle.rewind();
        }
        handle.set_playback_rate(rate);
        handle.play(on_finish)?;
    }

    debug!(target: PLAYER_LOG_TARGET, index, kind = ?item.kind, rate, "Playing item.");
    player.broadcast_update(PlayerStateUpdate::ItemStarted { index, item, rate });
    Ok(())
}

/// Advances to the next playable item, skipping items without audio.
/// Reaching the end of the queue stops playback.
#[instrument(skip(player), fields(current = ?player.current_item_index, queue_len = player.queue.len()))]
pub(super) fn play_next_item(player: &mut Player) {
    loop {
        let index = player.next_index();
        if index >= player.queue.len() {
            info!(target: PLAYER_LOG_TARGET, "Reached end of queue.");
            stop_playback(player);
            return;
        }
        player.current_item_index = Some(index);

        let playable = player.queue[index]
            .audio_url
            .as_deref()
            .map_or(false, |url| player.handles.contains(url));
        if !playable {
            debug!(target: PLAYER_LOG_TARGET, index, "No audio for item, skipping.");
            player.broadcast_update(PlayerStateUpdate::ItemSkipped {
                index,
                reason: "no audio".to_string(),
            });
            continue;
        }

        match start_item(player, index, StartFrom::Beginning) {
            Ok(()) => return,
            Err(e) => {
                warn!(target: PLAYER_LOG_TARGET, index, "Error playing item: {}", e);
                player.broadcast_update(PlayerStateUpdate::ItemSkipped {
                    index,
                    reason: e.to_string(),
                });
                if !player.is_playing {
                    return;
                }
            }
        }
    }
}

/// Plays the item at the current index again, either continuing where its
/// handle stopped or from its start.
#[instrument(skip(player), fields(current = ?player.current_item_index))]
pub(super) fn play_current_item(player: &mut Player, from: StartFrom) {
    let Some(index) = player.current_item_index.filter(|index| *index < player.queue.len()) else {
        warn!(target: PLAYER_LOG_TARGET, "Invalid current item index, stopping.");
        stop_playback(player);
        return;
    };

    let playable = player.queue[index]
        .audio_url
        .as_deref()
        .map_or(false, |url| player.handles.contains(url));
    if !playable {
        debug!(target: PLAYER_LOG_TARGET, index, "No audio for current item, advancing.");
        play_next_item(player);
        return;
    }

    if let Err(e) = start_item(player, index, from) {
        warn!(target: PLAYER_LOG_TARGET, index, "Error playing current item: {}", e);
        if player.is_playing {
            play_next_item(player);
        }
    }
}

/// Continues with the next item after `pause`, unless playback changed meanwhile.
pub(super) fn schedule_continuation(player: &mut Player, after_index: usize, pause: Duration) {
    let generation = player.generation;
    let tx = player.internal_command_tx.clone();
    debug!(target: PLAYER_LOG_TARGET, after_index, ?pause, "Pausing before next item.");
    player.broadcast_update(PlayerStateUpdate::PauseScheduled {
        after_index,
        pause,
        generation,
    });
    tokio::spawn(async move {
        tokio::time::sleep(pause).await;
        if tx.send(PlayerCommand::ContinueAfterPause { generation }).is_err() {
            debug!(target: PLAYER_LOG_TARGET, generation, "Player gone before pause elapsed.");
        }
    });
}
