#[cfg(feature = "alsa-output")]
use r_lessonaudio::audio::{AlsaOutput, DeviceAudioBackend};
use r_lessonaudio::audio::{AudioBackend, HttpAudioBackend, SilentBackend};
use r_lessonaudio::config::Settings;
use r_lessonaudio::init_app_dirs;
use r_lessonaudio::lesson::{load_lesson, resolve_audio_base, Lesson, ProgressStore};
use r_lessonaudio::logging::init_logging;
use r_lessonaudio::player::{LearnedFilter, PlaybackSnapshot, Player, PlayerCommand};
use r_lessonaudio::ui::{parse_command, Cli, UiCommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

/// Length of every placeholder item in dry-run mode.
const DRY_RUN_ITEM_DURATION: Duration = Duration::from_millis(1500);

type CommandSender = mpsc::Sender<PlayerCommand>;

#[cfg(feature = "alsa-output")]
fn output_backend(device: &str) -> Arc<dyn AudioBackend> {
    info!(%device, "Playing audio on ALSA device.");
    Arc::new(DeviceAudioBackend::new(Arc::new(AlsaOutput::new(device))))
}

#[cfg(not(feature = "alsa-output"))]
fn output_backend(device: &str) -> Arc<dyn AudioBackend> {
    warn!(%device, "Built without ALSA output; audio will only keep time.");
    Arc::new(HttpAudioBackend::new())
}

async fn snapshot(commands: &CommandSender) -> Result<PlaybackSnapshot, Box<dyn Error>> {
    let (tx, rx) = oneshot::channel();
    commands.send(PlayerCommand::GetState(tx)).await?;
    Ok(rx.await?)
}

/// Rebuilds the reading queue and preloads its audio.
async fn initialize(
    commands: &CommandSender,
    lesson: &Lesson,
    audio_base: &str,
    settings: &Settings,
    progress: &ProgressStore,
) -> Result<usize, Box<dyn Error>> {
    let (tx, rx) = oneshot::channel();
    let learned = progress.topic(&settings.learning, &settings.teaching);
    commands
        .send(PlayerCommand::Initialize {
            lesson: Box::new(lesson.clone()),
            audio_base: audio_base.to_string(),
            settings: settings.playback,
            learned: LearnedFilter(Arc::new(learned)),
            reply: Some(tx),
        })
        .await?;
    Ok(rx.await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse command-line arguments and initialize CLI
    let cli = Cli::new();
    let args = &cli.args;
    init_logging(args.log_json)?;

    // Initialize application directories
    init_app_dirs()?;

    // Load configuration from file or create default
    let config_path = match &args.config {
        Some(path) => PathBuf::from(path),
        None => Settings::default_path(),
    };
    let mut settings = Settings::load(&config_path)?;
    args.apply_to(&mut settings);
    settings.validate()?;

    let progress_path = settings.resolved_progress_path();
    let mut progress = ProgressStore::load(&progress_path);

    let lesson = load_lesson(&args.lesson).await?;
    let audio_base = match &args.audio_base {
        Some(base) => base.clone(),
        None => resolve_audio_base(&lesson, &settings.learning, &settings.teaching, &settings.base_url),
    };
    info!(lesson = %lesson.folder_name(), %audio_base, dry_run = args.dry_run, "Lesson loaded.");

    let backend: Arc<dyn AudioBackend> = if args.dry_run {
        Arc::new(SilentBackend::new(DRY_RUN_ITEM_DURATION))
    } else if args.no_output {
        Arc::new(HttpAudioBackend::new())
    } else {
        output_backend(&settings.alsa_device)
    };

    let (mut player, commands) = Player::new(backend, 64, 32);
    let mut updates = player.subscribe_state_updates();
    let player_task = tokio::spawn(async move { player.run().await });

    println!("Loading audio...");
    initialize(&commands, &lesson, &audio_base, &settings, &progress).await?;
    let title = lesson.title.clone().unwrap_or_else(|| lesson.folder_name());
    cli.display_queue(&title, &snapshot(&commands).await?.reading_queue);
    cli.display_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // stdin closed
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        cli.display_error(&*e);
                        continue;
                    }
                };
                let playback = settings.playback;
                match command {
                    UiCommand::Quit => break,
                    UiCommand::TogglePlay => {
                        if snapshot(&commands).await?.is_playing {
                            commands.send(PlayerCommand::Pause).await?;
                        } else {
                            commands.send(PlayerCommand::Play(playback)).await?;
                        }
                    }
                    UiCommand::Stop => commands.send(PlayerCommand::Stop).await?,
                    UiCommand::Next => commands.send(PlayerCommand::SkipToNext(playback)).await?,
                    UiCommand::Previous => commands.send(PlayerCommand::SkipToPrevious(playback)).await?,
                    UiCommand::Jump { section, example } => {
                        commands
                            .send(PlayerCommand::JumpToExample {
                                section_idx: section,
                                example_idx: example,
                                settings: playback,
                            })
                            .await?
                    }
                    UiCommand::Item(index) => {
                        commands.send(PlayerCommand::PlaySingleItem { index, settings: playback }).await?
                    }
                    UiCommand::ToggleLearned(id) => {
                        let learned = progress.toggle_learned(&settings.learning, &settings.teaching, &id);
                        if let Err(e) = progress.save(&progress_path) {
                            cli.display_error(&e);
                        }
                        println!("{} {}.", id, if learned { "learned" } else { "not learned" });
                        initialize(&commands, &lesson, &audio_base, &settings, &progress).await?;
                        cli.display_queue(&title, &snapshot(&commands).await?.reading_queue);
                    }
                    UiCommand::Queue => cli.display_queue(&title, &snapshot(&commands).await?.reading_queue),
                    UiCommand::Help => cli.display_help(),
                }
            }
            update = updates.recv() => match update {
                Ok(update) => cli.display_update(&update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Display fell behind player updates.");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    commands.send(PlayerCommand::Shutdown).await?;
    player_task.await?;
    Ok(())
}
