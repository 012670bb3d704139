//! Learned-item progress

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::models::RelatedItem;
use crate::config::ConfigError;

const LOG_TARGET: &str = "r_lessonaudio::lesson::progress";

/// Answers whether every related item of an example has been learned.
pub trait LearnedItems: Send + Sync {
    /// Returns false for an empty list.
    fn are_all_learned(&self, items: &[RelatedItem]) -> bool;
}

impl<F> LearnedItems for F
where
    F: Fn(&[RelatedItem]) -> bool + Send + Sync,
{
    fn are_all_learned(&self, items: &[RelatedItem]) -> bool {
        self(items)
    }
}

/// Provider for which nothing is learned yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NothingLearned;

impl LearnedItems for NothingLearned {
    fn are_all_learned(&self, _items: &[RelatedItem]) -> bool {
        false
    }
}

/// Learned flags per `learning:teaching` topic, persisted as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ProgressStore {
    topics: BTreeMap<String, BTreeMap<String, bool>>,
}

fn topic_key(learning: &str, teaching: &str) -> String {
    format!("{}:{}", learning, teaching)
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads progress from a file. A missing or corrupt file yields empty progress.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(target: LOG_TARGET, path = %path.display(), "No progress loaded: {}", e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(store) => store,
            Err(e) => {
                warn!(target: LOG_TARGET, path = %path.display(), "Error loading progress: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn is_learned(&self, learning: &str, teaching: &str, item_id: &str) -> bool {
        self.topics
            .get(&topic_key(learning, teaching))
            .and_then(|items| items.get(item_id))
            .copied()
            .unwrap_or(false)
    }

    /// Flips the learned flag of an item and returns the new value.
    pub fn toggle_learned(&mut self, learning: &str, teaching: &str, item_id: &str) -> bool {
        let items = self.topics.entry(topic_key(learning, teaching)).or_default();
        if items.remove(item_id).unwrap_or(false) {
            false
        } else {
            items.insert(item_id.to_string(), true);
            true
        }
    }

    /// View of a single topic, usable as a [`LearnedItems`] provider.
    pub fn topic(&self, learning: &str, teaching: &str) -> TopicProgress {
        let learned = self
            .topics
            .get(&topic_key(learning, teaching))
            .map(|items| {
                items
                    .iter()
                    .filter(|(_, learned)| **learned)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();
        TopicProgress { learned }
    }
}

/// Snapshot of the learned item ids of one topic.
#[derive(Debug, Clone, Default)]
pub struct TopicProgress {
    learned: HashSet<String>,
}

impl LearnedItems for TopicProgress {
    fn are_all_learned(&self, items: &[RelatedItem]) -> bool {
        if items.is_empty() {
            return false;
        }
        items
            .iter()
            .all(|item| item.id().map_or(false, |id| self.learned.contains(id)))
    }
}
