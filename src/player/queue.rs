// src/player/queue.rs
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PlaybackSettings;
use crate::lesson::{AudioSlot, AudioUrlScheme, Example, LearnedItems, Lesson};
use crate::player::PLAYER_LOG_TARGET;

/// Kind of speakable content a queue item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueItemKind {
    LessonTitle,
    SectionTitle,
    Question,
    Answer,
}

/// One unit of speakable content in the reading queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    #[serde(rename = "type")]
    pub kind: QueueItemKind,
    pub text: String,
    /// Absent means the item is skipped during playback.
    pub audio_url: Option<String>,
    /// `None` for the lesson title.
    pub section_idx: Option<usize>,
    /// `None` for titles.
    pub example_idx: Option<usize>,
}

impl QueueItem {
    /// Whether `other` belongs to the same section and example.
    pub fn same_example_as(&self, other: &QueueItem) -> bool {
        self.section_idx == other.section_idx && self.example_idx == other.example_idx
    }
}

fn is_visible(example: &Example, learned: &dyn LearnedItems, settings: &PlaybackSettings) -> bool {
    if !settings.hide_learned_examples || example.rel.is_empty() {
        return true;
    }
    !learned.are_all_learned(&example.rel)
}

/// Flattens a lesson into its reading queue.
///
/// Order: lesson title, then per section with at least one visible example
/// its title followed by each visible example's question and (when answers
/// are read and present) answer. A lesson without sections yields nothing,
/// not even its title.
pub fn build_queue(
    lesson: &Lesson,
    urls: &AudioUrlScheme,
    learned: &dyn LearnedItems,
    settings: &PlaybackSettings,
) -> Vec<QueueItem> {
    let mut queue = Vec::new();
    let Some(sections) = &lesson.sections else {
        return queue;
    };

    debug!(target: PLAYER_LOG_TARGET, base = %urls.base(), hide_learned = settings.hide_learned_examples, "Building reading queue.");

    if let Some(title) = &lesson.title {
        queue.push(QueueItem {
            kind: QueueItemKind::LessonTitle,
            text: title.clone(),
            audio_url: Some(urls.url_for(AudioSlot::LessonTitle)),
            section_idx: None,
            example_idx: None,
        });
    }

    for (section_idx, section) in sections.iter().enumerate() {
        let visible: Vec<(usize, &Example)> = section
            .examples
            .iter()
            .enumerate()
            .filter(|(_, example)| is_visible(example, learned, settings))
            .collect();

        if visible.is_empty() {
            debug!(target: PLAYER_LOG_TARGET, section_idx, title = %section.title, "Skipping section without visible examples.");
            continue;
        }

        queue.push(QueueItem {
            kind: QueueItemKind::SectionTitle,
            text: section.title.clone(),
            audio_url: Some(urls.url_for(AudioSlot::SectionTitle { section: section_idx })),
            section_idx: Some(section_idx),
            example_idx: None,
        });

        for (example_idx, example) in visible {
            queue.push(QueueItem {
                kind: QueueItemKind::Question,
                text: example.q.clone(),
                audio_url: Some(urls.url_for(AudioSlot::Question {
                    section: section_idx,
                    example: example_idx,
                })),
                section_idx: Some(section_idx),
                example_idx: Some(example_idx),
            });

            let answer = example.a.as_deref().filter(|a| !a.is_empty());
            if let (true, Some(answer)) = (settings.read_answers, answer) {
                queue.push(QueueItem {
                    kind: QueueItemKind::Answer,
                    text: answer.to_string(),
                    audio_url: Some(urls.url_for(AudioSlot::Answer {
                        section: section_idx,
                        example: example_idx,
                    })),
                    section_idx: Some(section_idx),
                    example_idx: Some(example_idx),
                });
            }
        }
    }

    info!(target: PLAYER_LOG_TARGET, "Built queue with {} items.", queue.len());
    queue
}
