//! Lesson loading from local files or remote URLs
//!
//! Lesson documents are YAML (`content.yaml`) or JSON. The format is picked
//! from the document itself, since a location does not always carry an
//! extension.

use reqwest::Client;
use std::error::Error;
use std::io;
use std::path::Path;
use tracing::{debug, info, instrument};

use super::models::{Lesson, LessonSource};

const LOG_TARGET: &str = "r_lessonaudio::lesson::loader";

/// File a lesson folder keeps its content in.
pub const LESSON_CONTENT_FILE: &str = "content.yaml";

const LESSON_EXTENSIONS: [&str; 3] = [".yaml", ".yml", ".json"];

/// Error types for lesson loading
#[derive(Debug)]
pub enum LessonError {
    IoError(io::Error),
    NetworkError(reqwest::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
}

impl std::fmt::Display for LessonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LessonError::IoError(e) => write!(f, "I/O error: {}", e),
            LessonError::NetworkError(e) => write!(f, "Network error: {}", e),
            LessonError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            LessonError::YamlError(e) => write!(f, "YAML parse error: {}", e),
        }
    }
}

impl Error for LessonError {}

impl From<io::Error> for LessonError {
    fn from(e: io::Error) -> Self {
        LessonError::IoError(e)
    }
}

impl From<reqwest::Error> for LessonError {
    fn from(e: reqwest::Error) -> Self {
        LessonError::NetworkError(e)
    }
}

impl From<serde_json::Error> for LessonError {
    fn from(e: serde_json::Error) -> Self {
        LessonError::JsonError(e)
    }
}

impl From<serde_yaml::Error> for LessonError {
    fn from(e: serde_yaml::Error) -> Self {
        LessonError::YamlError(e)
    }
}

/// Serialization format of a lesson document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonFormat {
    Json,
    Yaml,
}

impl LessonFormat {
    /// JSON documents open with an object; everything else is read as YAML.
    pub fn detect(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            LessonFormat::Json
        } else {
            LessonFormat::Yaml
        }
    }
}

/// Parses a lesson document and fills in `_filename` from `name` if absent.
pub fn parse_lesson(content: &str, name: Option<&str>) -> Result<Lesson, LessonError> {
    let format = LessonFormat::detect(content);
    debug!(target: LOG_TARGET, ?format, "Parsing lesson document");
    let mut lesson: Lesson = match format {
        LessonFormat::Json => serde_json::from_str(content)?,
        LessonFormat::Yaml => serde_yaml::from_str(content)?,
    };
    if lesson.filename.is_none() {
        lesson.filename = name.map(str::to_string);
    }
    Ok(lesson)
}

/// Lesson name for the last segment of a location.
///
/// Lesson extensions are stripped. A `content.yaml` takes its name from the
/// folder holding it.
pub fn lesson_stem(location: &str) -> Option<&str> {
    let trimmed = location.trim_end_matches('/');
    let (parent, file) = match trimmed.rsplit_once('/') {
        Some((parent, file)) => (Some(parent), file),
        None => (None, trimmed),
    };
    let stem = LESSON_EXTENSIONS
        .iter()
        .find_map(|ext| file.strip_suffix(ext))
        .unwrap_or(file);
    if stem == "content" {
        return parent.and_then(|parent| parent.rsplit('/').next()).filter(|name| !name.is_empty());
    }
    Some(stem).filter(|name| !name.is_empty())
}

/// Loads a lesson from a file, a lesson folder or an `http(s)://` URL.
///
/// A folder (or a URL ending in `/`) is read through its `content.yaml`.
/// Remote lessons are tagged with a `url` source whose path is the lesson's
/// folder, so their audio resolves next to them.
#[instrument]
pub async fn load_lesson(location: &str) -> Result<Lesson, LessonError> {
    if crate::audio::is_remote(location) {
        let url = if location.ends_with('/') {
            format!("{}{}", location, LESSON_CONTENT_FILE)
        } else {
            location.to_string()
        };
        info!(target: LOG_TARGET, "Fetching lesson from {}", url);
        let content = Client::new()
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let folder = url.rsplit_once('/').map_or(url.as_str(), |(folder, _)| folder);
        let mut lesson = parse_lesson(&content, lesson_stem(&url))?;
        if lesson.source.is_none() {
            lesson.source = Some(LessonSource {
                kind: "url".to_string(),
                path: folder.to_string(),
            });
        }
        Ok(lesson)
    } else {
        let path = Path::new(location);
        let file = if tokio::fs::metadata(path).await?.is_dir() {
            path.join(LESSON_CONTENT_FILE)
        } else {
            path.to_path_buf()
        };
        info!(target: LOG_TARGET, "Reading lesson from {}", file.display());
        let content = tokio::fs::read_to_string(&file).await?;
        let name = file.to_str().and_then(lesson_stem);
        parse_lesson(&content, name)
    }
}
