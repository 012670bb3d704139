//! Lesson content, audio locations and learned-item progress

mod audio_path;
mod loader;
pub mod models;
mod progress;

pub use audio_path::*;
pub use loader::*;
pub use models::*;
pub use progress::*;
