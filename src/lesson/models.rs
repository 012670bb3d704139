//! Data models for lesson content

use serde::{Deserialize, Serialize};

/// A lesson as served by the content provider.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Lesson {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
    /// Folder name of the lesson, without extension
    #[serde(rename = "_filename", default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Where the lesson was loaded from
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LessonSource>,
    #[serde(default)]
    pub sections: Option<Vec<Section>>,
}

/// Origin of a lesson that was loaded from outside the bundled folders.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LessonSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

impl LessonSource {
    pub fn is_url(&self) -> bool {
        self.kind == "url"
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// A question/answer pair, optionally tagged with the items it exercises.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Example {
    pub q: String,
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub rel: Vec<RelatedItem>,
}

/// A related-item tuple; the first element is the item's unique id.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct RelatedItem(pub Vec<String>);

impl RelatedItem {
    pub fn id(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl Lesson {
    /// Folder name used for audio paths: `_filename`, else `NN-lesson`.
    pub fn folder_name(&self) -> String {
        match &self.filename {
            Some(name) => name.clone(),
            None => format!("{:02}-lesson", self.number.unwrap_or_default()),
        }
    }
}
