// src/player/timing.rs
use std::time::Duration;

use crate::player::{QueueItem, QueueItemKind};

pub const LESSON_TITLE_PAUSE: Duration = Duration::from_millis(1000);
pub const SECTION_TITLE_PAUSE: Duration = Duration::from_millis(1200);
pub const BETWEEN_EXAMPLES_PAUSE: Duration = Duration::from_millis(800);
pub const BETWEEN_SECTIONS_PAUSE: Duration = Duration::from_millis(1800);

/// Section titles are read slower than everything else.
pub const SECTION_TITLE_RATE_FACTOR: f32 = 0.7;

/// Playback rate for an item of the given kind.
pub fn playback_rate(kind: QueueItemKind, audio_speed: f32) -> f32 {
    match kind {
        QueueItemKind::SectionTitle => audio_speed * SECTION_TITLE_RATE_FACTOR,
        _ => audio_speed,
    }
}

/// Silence to insert after `item` ends before the next item starts.
///
/// An answer, or a question when answers are not read, closes an example;
/// the gap is longer when the next item starts a different section.
pub fn end_of_item_pause(item: &QueueItem, next: Option<&QueueItem>, read_answers: bool) -> Duration {
    match item.kind {
        QueueItemKind::SectionTitle => SECTION_TITLE_PAUSE,
        QueueItemKind::LessonTitle => LESSON_TITLE_PAUSE,
        QueueItemKind::Answer => example_gap(item, next),
        QueueItemKind::Question if !read_answers => example_gap(item, next),
        QueueItemKind::Question => Duration::ZERO,
    }
}

fn example_gap(item: &QueueItem, next: Option<&QueueItem>) -> Duration {
    match next {
        Some(next) if next.section_idx != item.section_idx => BETWEEN_SECTIONS_PAUSE,
        _ => BETWEEN_EXAMPLES_PAUSE,
    }
}
