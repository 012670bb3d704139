//! Integration tests for end-to-end lesson playback
//!
//! The player runs in its own task, exactly as the binary drives it, with
//! clocked handles so the virtual clock determines every transition.

use crate::test_utils::{wav_bytes, write_sample_lesson, SAMPLE_LESSON};
use r_lessonaudio::audio::{AudioBackend, HttpAudioBackend, SilentBackend};
use r_lessonaudio::config::PlaybackSettings;
use r_lessonaudio::lesson::{load_lesson, parse_lesson, resolve_audio_base, Lesson, NothingLearned};
use r_lessonaudio::player::{LearnedFilter, Player, PlayerCommand, PlayerStateUpdate, QueueItemKind};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

#[cfg(test)]
mod player_integration_tests {
    use super::*;

    const BASE: &str = "/lessons/de/en/01-greetings/audio";

    struct Running {
        commands: mpsc::Sender<PlayerCommand>,
        updates: broadcast::Receiver<PlayerStateUpdate>,
        task: JoinHandle<()>,
    }

    async fn start(backend: Arc<dyn AudioBackend>, lesson: Lesson, audio_base: &str) -> Result<(Running, usize), Box<dyn Error>> {
        let (mut player, commands) = Player::new(backend, 256, 32);
        let updates = player.subscribe_state_updates();
        let task = tokio::spawn(async move { player.run().await });

        let (tx, rx) = oneshot::channel();
        commands
            .send(PlayerCommand::Initialize {
                lesson: Box::new(lesson),
                audio_base: audio_base.to_string(),
                settings: PlaybackSettings::default(),
                learned: LearnedFilter(Arc::new(NothingLearned)),
                reply: Some(tx),
            })
            .await?;
        let queue_len = rx.await?;
        Ok((Running { commands, updates, task }, queue_len))
    }

    /// Collects updates until playback stops.
    async fn until_stopped(updates: &mut broadcast::Receiver<PlayerStateUpdate>) -> Vec<PlayerStateUpdate> {
        let mut seen = Vec::new();
        loop {
            match updates.recv().await {
                Ok(PlayerStateUpdate::Stopped) => return seen,
                Ok(update) => seen.push(update),
                Err(e) => panic!("update stream ended: {}", e),
            }
        }
    }

    fn drain(updates: &mut broadcast::Receiver<PlayerStateUpdate>) {
        while updates.try_recv().is_ok() {}
    }

    fn started_indices(updates: &[PlayerStateUpdate]) -> Vec<usize> {
        updates
            .iter()
            .filter_map(|update| match update {
                PlayerStateUpdate::ItemStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    fn pauses(updates: &[PlayerStateUpdate]) -> Vec<Duration> {
        updates
            .iter()
            .filter_map(|update| match update {
                PlayerStateUpdate::PauseScheduled { pause, .. } => Some(*pause),
                _ => None,
            })
            .collect()
    }

    async fn shutdown(running: Running) -> Result<(), Box<dyn Error>> {
        running.commands.send(PlayerCommand::Shutdown).await?;
        running.task.await?;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lesson_plays_in_order() -> Result<(), Box<dyn Error>> {
        let lesson = parse_lesson(SAMPLE_LESSON, Some("01-greetings"))?;
        let backend = Arc::new(SilentBackend::new(Duration::from_millis(500)));
        let (mut running, queue_len) = start(backend, lesson, BASE).await?;
        assert_eq!(queue_len, 6);
        drain(&mut running.updates);

        let started_at = tokio::time::Instant::now();
        running.commands.send(PlayerCommand::Play(PlaybackSettings::default())).await?;
        let updates = until_stopped(&mut running.updates).await;

        assert_eq!(started_indices(&updates), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(
            pauses(&updates),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1200),
                Duration::from_millis(800),
                Duration::from_millis(800),
            ]
        );
        let rates: Vec<f32> = updates
            .iter()
            .filter_map(|update| match update {
                PlayerStateUpdate::ItemStarted { item, rate, .. } if item.kind == QueueItemKind::SectionTitle => {
                    Some(*rate)
                }
                _ => None,
            })
            .collect();
        assert_eq!(rates.len(), 1);
        assert!((rates[0] - 0.7).abs() < 1e-6);

        // Five items at normal speed, the section title slowed down, plus the pauses.
        let expected = Duration::from_millis(5 * 500) + Duration::from_secs_f32(0.5 / 0.7) + Duration::from_millis(3800);
        let elapsed = started_at.elapsed();
        assert!(elapsed >= expected - Duration::from_millis(20), "{:?} < {:?}", elapsed, expected);
        assert!(elapsed <= expected + Duration::from_millis(50), "{:?} > {:?}", elapsed, expected);

        let (tx, rx) = oneshot::channel();
        running.commands.send(PlayerCommand::GetState(tx)).await?;
        let snapshot = rx.await?;
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.current_item_index, None);
        assert_eq!(snapshot.reading_queue.len(), 6);

        shutdown(running).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_audio_is_skipped_during_playback() -> Result<(), Box<dyn Error>> {
        let lesson = parse_lesson(SAMPLE_LESSON, Some("01-greetings"))?;
        let missing = [format!("{}/0-0-q.mp3", BASE), format!("{}/0-0-a.mp3", BASE)];
        let backend = Arc::new(SilentBackend::new(Duration::from_millis(200)).with_missing(missing));
        let (mut running, _) = start(backend, lesson, BASE).await?;

        let mut loaded = None;
        while let Ok(update) = running.updates.try_recv() {
            if let PlayerStateUpdate::Initialized { loaded: count, .. } = update {
                loaded = Some(count);
            }
        }
        assert_eq!(loaded, Some(4));

        running.commands.send(PlayerCommand::Play(PlaybackSettings::default())).await?;
        let updates = until_stopped(&mut running.updates).await;
        assert_eq!(started_indices(&updates), vec![0, 1, 4, 5]);
        let skipped = updates
            .iter()
            .filter(|update| matches!(update, PlayerStateUpdate::ItemSkipped { .. }))
            .count();
        assert_eq!(skipped, 2);

        shutdown(running).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_mid_lesson() -> Result<(), Box<dyn Error>> {
        let lesson = parse_lesson(SAMPLE_LESSON, Some("01-greetings"))?;
        let backend = Arc::new(SilentBackend::new(Duration::from_millis(500)));
        let (mut running, _) = start(backend, lesson, BASE).await?;
        drain(&mut running.updates);

        running.commands.send(PlayerCommand::Play(PlaybackSettings::default())).await?;
        tokio::time::sleep(Duration::from_millis(250)).await;
        running.commands.send(PlayerCommand::Pause).await?;

        // Nothing advances while paused.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let (tx, rx) = oneshot::channel();
        running.commands.send(PlayerCommand::GetState(tx)).await?;
        let snapshot = rx.await?;
        assert!(snapshot.is_paused);
        assert_eq!(snapshot.current_item_index, Some(0));

        drain(&mut running.updates);
        running.commands.send(PlayerCommand::Resume(PlaybackSettings::default())).await?;
        let updates = until_stopped(&mut running.updates).await;
        assert_eq!(started_indices(&updates), vec![0, 1, 2, 3, 4, 5]);

        shutdown(running).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_on_shutdown() -> Result<(), Box<dyn Error>> {
        let lesson = parse_lesson(SAMPLE_LESSON, Some("01-greetings"))?;
        let backend = Arc::new(SilentBackend::new(Duration::from_millis(500)));
        let (mut running, _) = start(backend, lesson, BASE).await?;
        running.commands.send(PlayerCommand::Play(PlaybackSettings::default())).await?;
        running.commands.send(PlayerCommand::Shutdown).await?;
        running.task.await?;

        let mut cleared = false;
        while let Ok(update) = running.updates.try_recv() {
            cleared |= update == PlayerStateUpdate::Cleared;
        }
        assert!(cleared);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_local_audio_files() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let lesson_path = write_sample_lesson(dir.path())?;
        let lesson = load_lesson(lesson_path.to_str().ok_or("non-utf8 path")?).await?;

        let base_url = format!("{}/", dir.path().display());
        let audio_base = resolve_audio_base(&lesson, "de", "en", &base_url);
        std::fs::create_dir_all(&audio_base)?;
        for file in ["title", "0-title", "0-0-q", "0-0-a", "0-1-q", "0-1-a"] {
            // 0.25 s each at 8 kHz
            std::fs::write(format!("{}/{}.mp3", audio_base, file), wav_bytes(8000, 2000))?;
        }

        let backend = Arc::new(HttpAudioBackend::new());
        let (mut running, queue_len) = start(backend, lesson, &audio_base).await?;
        let mut loaded = None;
        while let Ok(update) = running.updates.try_recv() {
            if let PlayerStateUpdate::Initialized { loaded: count, .. } = update {
                loaded = Some(count);
            }
        }
        assert_eq!(loaded, Some(queue_len));

        running.commands.send(PlayerCommand::Play(PlaybackSettings::default())).await?;
        let updates = until_stopped(&mut running.updates).await;
        assert_eq!(started_indices(&updates), vec![0, 1, 2, 3, 4, 5]);

        shutdown(running).await
    }
}
