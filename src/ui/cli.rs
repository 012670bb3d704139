//! Command-line interface implementation

use clap::Parser;
use std::error::Error;

use crate::config::Settings;
use crate::player::{PlayerStateUpdate, QueueItem, QueueItemKind};

/// Command-line arguments for r-lessonaudio
#[derive(Parser, Debug)]
#[command(author, version, about = "Plays lesson audio in reading order", long_about = None)]
pub struct Args {
    /// Lesson file (YAML or JSON), lesson folder, or URL
    pub lesson: String,

    /// Code of the language being learned
    #[arg(short, long, env = "LESSONAUDIO_LEARNING")]
    pub learning: Option<String>,

    /// Code of the language the lesson is taught in
    #[arg(short, long, env = "LESSONAUDIO_TEACHING")]
    pub teaching: Option<String>,

    /// Audio folder to use instead of resolving it from the lesson
    #[arg(long, env = "LESSONAUDIO_AUDIO_BASE")]
    pub audio_base: Option<String>,

    /// Playback speed multiplier
    #[arg(short = 's', long)]
    pub audio_speed: Option<f32>,

    /// Do not read answers
    #[arg(long)]
    pub no_read_answers: bool,

    /// Keep examples whose related items are all learned
    #[arg(long)]
    pub show_learned: bool,

    /// Progress file path
    #[arg(short, long, env = "LESSONAUDIO_PROGRESS")]
    pub progress: Option<String>,

    /// Config file path
    #[arg(short, long, env = "LESSONAUDIO_CONFIG")]
    pub config: Option<String>,

    /// ALSA device to play audio on
    #[arg(long, env = "LESSONAUDIO_ALSA_DEVICE")]
    pub alsa_device: Option<String>,

    /// Load audio files but only keep time instead of playing them
    #[arg(long)]
    pub no_output: bool,

    /// Play silent placeholder audio instead of loading files
    #[arg(long, conflicts_with = "no_output")]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Overrides loaded settings with the values given on the command line.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(learning) = &self.learning {
            settings.learning = learning.clone();
        }
        if let Some(teaching) = &self.teaching {
            settings.teaching = teaching.clone();
        }
        if let Some(speed) = self.audio_speed {
            settings.playback.audio_speed = speed;
        }
        if self.no_read_answers {
            settings.playback.read_answers = false;
        }
        if self.show_learned {
            settings.playback.hide_learned_examples = false;
        }
        if let Some(progress) = &self.progress {
            settings.progress_path = Some(progress.clone());
        }
        if let Some(device) = &self.alsa_device {
            settings.alsa_device = device.clone();
        }
    }
}

/// A command typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    TogglePlay,
    Stop,
    Next,
    Previous,
    Jump { section: usize, example: usize },
    Item(usize),
    ToggleLearned(String),
    Queue,
    Help,
    Quit,
}

/// Parses one line of interactive input.
pub fn parse_command(input: &str) -> Result<UiCommand, Box<dyn Error>> {
    let mut parts = input.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("Empty command".into());
    };
    let args: Vec<&str> = parts.collect();

    let command = match (word.to_lowercase().as_str(), args.as_slice()) {
        ("p" | "play" | "pause", []) => UiCommand::TogglePlay,
        ("s" | "stop", []) => UiCommand::Stop,
        ("n" | "next", []) => UiCommand::Next,
        ("b" | "back" | "prev", []) => UiCommand::Previous,
        ("j" | "jump", [section, example]) => UiCommand::Jump {
            section: section.parse()?,
            example: example.parse()?,
        },
        ("i" | "item", [index]) => UiCommand::Item(index.parse()?),
        ("l" | "learn", [id]) => UiCommand::ToggleLearned(id.to_string()),
        ("queue", []) => UiCommand::Queue,
        ("h" | "help" | "?", []) => UiCommand::Help,
        ("q" | "quit", []) => UiCommand::Quit,
        _ => return Err(format!("Unknown command: {}", input.trim()).into()),
    };
    Ok(command)
}

fn kind_label(kind: QueueItemKind) -> &'static str {
    match kind {
        QueueItemKind::LessonTitle => "Lesson",
        QueueItemKind::SectionTitle => "Section",
        QueueItemKind::Question => "Q",
        QueueItemKind::Answer => "A",
    }
}

/// One queue line: index, kind, example position and text.
pub fn format_item(index: usize, item: &QueueItem) -> String {
    let position = match (item.section_idx, item.example_idx) {
        (Some(section), Some(example)) => format!("{}.{}", section, example),
        (Some(section), None) => section.to_string(),
        _ => String::new(),
    };
    let text = if item.text.chars().count() > 60 {
        format!("{:.57}...", item.text)
    } else {
        item.text.clone()
    };
    format!("{:<5} {:<8} {:<6} {}", index, kind_label(item.kind), position, text)
}

/// Text shown for a state update, if it is worth showing.
pub fn format_update(update: &PlayerStateUpdate) -> Option<String> {
    match update {
        PlayerStateUpdate::Initialized { queue_len, loaded } => {
            Some(format!("Loaded audio for {} of {} items.", loaded, queue_len))
        }
        PlayerStateUpdate::ItemStarted { index, item, .. } => Some(format!("> {}", format_item(*index, item))),
        PlayerStateUpdate::SingleItemStarted { index, item } => Some(format!("* {}", format_item(*index, item))),
        PlayerStateUpdate::ItemSkipped { index, reason } => Some(format!("Skipped item {} ({})", index, reason)),
        PlayerStateUpdate::Paused { .. } => Some("Paused.".to_string()),
        PlayerStateUpdate::Stopped => Some("Stopped.".to_string()),
        PlayerStateUpdate::PauseScheduled { .. } | PlayerStateUpdate::Cleared => None,
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli {
            args: Args::parse(),
        }
    }

    /// Display the reading queue
    pub fn display_queue(&self, title: &str, queue: &[QueueItem]) {
        println!("\n{}", title);
        println!("{:<5} {:<8} {:<6} {}", "#", "Type", "Pos", "Text");
        println!("{}", "-".repeat(80));
        for (index, item) in queue.iter().enumerate() {
            println!("{}", format_item(index, item));
        }
        println!();
    }

    /// Display a player state update
    pub fn display_update(&self, update: &PlayerStateUpdate) {
        if let Some(line) = format_update(update) {
            println!("{}", line);
        }
    }

    pub fn display_help(&self) {
        println!("Commands:");
        println!("  p            play / pause");
        println!("  s            stop");
        println!("  n / b        next / previous item");
        println!("  j <s> <e>    jump to example <e> of section <s>");
        println!("  i <index>    play a single queue item");
        println!("  l <id>       toggle an item as learned and rebuild the queue");
        println!("  queue        show the reading queue");
        println!("  q            quit");
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}
