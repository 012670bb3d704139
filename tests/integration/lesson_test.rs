//! Integration tests for lesson loading and queue construction

use crate::test_utils::{write_sample_lesson, write_sample_lesson_folder, SAMPLE_LESSON, SAMPLE_LESSON_YAML};
use r_lessonaudio::config::PlaybackSettings;
use r_lessonaudio::lesson::{load_lesson, parse_lesson, resolve_audio_base, AudioUrlScheme, ProgressStore};
use r_lessonaudio::player::{build_queue, QueueItemKind};
use std::error::Error;
use tempfile::tempdir;

#[cfg(test)]
mod lesson_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_load_local_lesson() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = write_sample_lesson(dir.path())?;

        let lesson = load_lesson(path.to_str().ok_or("non-utf8 path")?).await?;
        assert_eq!(lesson.title.as_deref(), Some("Greetings"));
        assert_eq!(lesson.folder_name(), "01-greetings");
        assert!(lesson.source.is_none());

        let base = resolve_audio_base(&lesson, "de", "en", "/");
        assert_eq!(base, "/lessons/de/en/01-greetings/audio");
        Ok(())
    }

    #[tokio::test]
    async fn test_load_yaml_lesson_folder() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let folder = write_sample_lesson_folder(dir.path())?;

        let from_folder = load_lesson(folder.to_str().ok_or("non-utf8 path")?).await?;
        assert_eq!(from_folder.folder_name(), "01-greetings");
        assert_eq!(from_folder, parse_lesson(SAMPLE_LESSON, Some("01-greetings"))?);

        let content = folder.join("content.yaml");
        let from_file = load_lesson(content.to_str().ok_or("non-utf8 path")?).await?;
        assert_eq!(from_file, from_folder);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_yaml_lesson_file() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("02-greetings.yml");
        std::fs::write(&path, SAMPLE_LESSON_YAML)?;

        let lesson = load_lesson(path.to_str().ok_or("non-utf8 path")?).await?;
        assert_eq!(lesson.folder_name(), "02-greetings");
        assert_eq!(lesson.sections.as_ref().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_lesson_fails() {
        assert!(load_lesson("/nonexistent/01-lesson.json").await.is_err());
    }

    #[test]
    fn test_learned_examples_are_hidden() -> Result<(), Box<dyn Error>> {
        let lesson = parse_lesson(SAMPLE_LESSON, Some("01-greetings"))?;
        let urls = AudioUrlScheme::new(resolve_audio_base(&lesson, "de", "en", "/"));
        let settings = PlaybackSettings::default();

        let mut progress = ProgressStore::new();
        let full = build_queue(&lesson, &urls, &progress.topic("de", "en"), &settings);
        assert_eq!(full.len(), 6);
        assert_eq!(full[2].audio_url.as_deref(), Some("/lessons/de/en/01-greetings/audio/0-0-q.mp3"));

        progress.toggle_learned("de", "en", "hallo");
        let reduced = build_queue(&lesson, &urls, &progress.topic("de", "en"), &settings);
        let questions: Vec<_> = reduced
            .iter()
            .filter(|item| item.kind == QueueItemKind::Question)
            .map(|item| item.text.as_str())
            .collect();
        assert_eq!(questions, vec!["Guten Morgen!"]);
        assert_eq!(reduced[2].example_idx, Some(1));

        progress.toggle_learned("de", "en", "morgen");
        let empty = build_queue(&lesson, &urls, &progress.topic("de", "en"), &settings);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].kind, QueueItemKind::LessonTitle);
        Ok(())
    }
}
