//! Audio file locations for a lesson

use tracing::debug;
use url::Url;

use super::models::Lesson;

const LOG_TARGET: &str = "r_lessonaudio::lesson::audio_path";

/// Which recording of a lesson an audio file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSlot {
    LessonTitle,
    SectionTitle { section: usize },
    Question { section: usize, example: usize },
    Answer { section: usize, example: usize },
}

/// Derives audio URLs from a resolved base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUrlScheme {
    base: String,
}

impl AudioUrlScheme {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/').to_string();
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url_for(&self, slot: AudioSlot) -> String {
        let file = match slot {
            AudioSlot::LessonTitle => "title.mp3".to_string(),
            AudioSlot::SectionTitle { section } => format!("{}-title.mp3", section),
            AudioSlot::Question { section, example } => format!("{}-{}-q.mp3", section, example),
            AudioSlot::Answer { section, example } => format!("{}-{}-a.mp3", section, example),
        };
        format!("{}/{}", self.base, file)
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Resolves the folder holding a lesson's audio files.
///
/// Lessons loaded from a URL keep their audio next to them. Otherwise a
/// remote teaching or learning location wins over the local folder layout
/// `{base_url}lessons/{learning}/{teaching}/{folder}/audio`.
pub fn resolve_audio_base(lesson: &Lesson, learning: &str, teaching: &str, base_url: &str) -> String {
    let folder = lesson.folder_name();
    let base = match &lesson.source {
        Some(source) if source.is_url() => format!("{}/audio", source.path),
        _ if is_http_url(teaching) => format!("{}/{}/audio", teaching, folder),
        _ if is_http_url(learning) => format!("{}/{}/{}/audio", learning, teaching, folder),
        _ => format!("{}lessons/{}/{}/{}/audio", base_url, learning, teaching, folder),
    };
    debug!(target: LOG_TARGET, %base, "Resolved audio base.");
    base
}
