//! Integration tests for configuration management
//!
//! These tests verify that settings and progress persist correctly
//! across module boundaries.

use r_lessonaudio::config::Settings;
use r_lessonaudio::lesson::{LearnedItems, ProgressStore, RelatedItem};
use std::error::Error;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.learning = "fr".to_string();
        settings.teaching = "de".to_string();
        settings.playback.audio_speed = 1.25;
        settings.playback.read_answers = false;
        settings.progress_path = Some(dir.path().join("progress.json").display().to_string());

        settings.validate()?;
        settings.save(&config_path)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded.learning, "fr");
        assert_eq!(loaded.teaching, "de");
        assert_eq!(loaded.playback.audio_speed, 1.25);
        assert!(!loaded.playback.read_answers);
        assert!(loaded.playback.hide_learned_examples);
        assert_eq!(loaded.resolved_progress_path(), dir.path().join("progress.json"));

        let mut updated = loaded;
        updated.playback.audio_speed = 0.75;
        updated.save(&config_path)?;
        assert_eq!(Settings::load(&config_path)?.playback.audio_speed, 0.75);

        Ok(())
    }

    /// Test invalid configuration handling
    #[test]
    fn test_invalid_config_validation() {
        let mut settings = Settings::default();
        settings.playback.audio_speed = 0.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Audio speed"));

        let mut settings = Settings::default();
        settings.teaching = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    /// Learned flags survive a save/load cycle and drive the topic view
    #[test]
    fn test_progress_lifecycle() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("progress.json");

        let mut progress = ProgressStore::load(&path);
        assert!(progress.toggle_learned("de", "en", "hallo"));
        progress.save(&path)?;

        let reloaded = ProgressStore::load(&path);
        assert!(reloaded.is_learned("de", "en", "hallo"));
        assert!(!reloaded.is_learned("fr", "en", "hallo"));

        let topic = reloaded.topic("de", "en");
        let hallo = vec![RelatedItem(vec!["hallo".to_string(), "interjection".to_string()])];
        assert!(topic.are_all_learned(&hallo));
        assert!(!topic.are_all_learned(&[]));
        Ok(())
    }
}
