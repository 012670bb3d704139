// src/player/run_loop.rs
use super::{command_handler, Player, PlayerCommand, PLAYER_LOG_TARGET};
use tracing::{info, trace};

/// Applies a single command to the player.
pub(super) async fn dispatch(player: &mut Player, command: PlayerCommand) {
    match command {
        PlayerCommand::Initialize { lesson, audio_base, settings, learned, reply } => {
            let queue_len = command_handler::handle_initialize(player, &lesson, audio_base, settings, learned).await;
            if let Some(reply) = reply {
                let _ = reply.send(queue_len); // Ignore error if receiver dropped
            }
        }
        PlayerCommand::Play(settings) | PlayerCommand::Resume(settings) => command_handler::handle_play(player, settings),
        PlayerCommand::Pause => command_handler::handle_pause(player),
        PlayerCommand::Stop => command_handler::handle_stop(player),
        PlayerCommand::SkipToNext(settings) => command_handler::handle_next(player, settings),
        PlayerCommand::SkipToPrevious(settings) => command_handler::handle_previous(player, settings),
        PlayerCommand::PlaySingleItem { index, settings } => command_handler::handle_play_single_item(player, index, settings),
        PlayerCommand::JumpToExample { section_idx, example_idx, settings } => {
            command_handler::handle_jump_to_example(player, section_idx, example_idx, settings)
        }
        PlayerCommand::GetState(responder) => {
            let _ = responder.send(player.snapshot()); // Ignore error if receiver dropped
        }
        PlayerCommand::Cleanup => command_handler::handle_cleanup(player),
        PlayerCommand::ItemFinished { generation, outcome } => command_handler::handle_item_finished(player, generation, outcome),
        PlayerCommand::SingleItemFinished { generation, index, outcome } => {
            command_handler::handle_single_item_finished(player, generation, index, outcome)
        }
        PlayerCommand::ContinueAfterPause { generation } => command_handler::handle_continue_after_pause(player, generation),
        PlayerCommand::Shutdown => {
            // The run loop intercepts Shutdown; applied directly it only cleans up.
            command_handler::handle_cleanup(player);
        }
    }
}

/// Runs the player's command processing loop.
pub async fn run_player_loop(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Player run loop started.");

    loop {
        // Completions are older than any transport command that is waiting.
        let command = tokio::select! {
            biased;
            Some(command) = player.internal_command_rx.recv() => command,
            command = player.command_rx.recv() => match command {
                Some(command) => command,
                None => {
                    info!(target: PLAYER_LOG_TARGET, "Command channel closed. Exiting run loop.");
                    break;
                }
            },
        };
        trace!(target: PLAYER_LOG_TARGET, "Received command: {:?}", command);
        if matches!(command, PlayerCommand::Shutdown) {
            info!(target: PLAYER_LOG_TARGET, "Shutdown command received. Exiting run loop.");
            break;
        }
        dispatch(player, command).await;
    }

    info!(target: PLAYER_LOG_TARGET, "Player run loop finished. Performing final cleanup.");
    command_handler::handle_cleanup(player);
}
