//! Audio loading and playback handles

mod clocked;
mod decoder;
mod device;
mod error;
mod http;
mod output;
mod playback;
mod preload;
mod resample;
mod silent;

pub use clocked::ClockedHandle;
pub use decoder::{decode_pcm, DecodedAudio};
pub use device::{DeviceAudioBackend, DeviceHandle};
pub use error::AudioError;
pub use http::{probe_duration, HttpAudioBackend};
pub(crate) use http::is_remote;
#[cfg(feature = "alsa-output")]
pub use output::AlsaOutput;
pub use output::{OutputDevice, PcmSink};
pub use playback::*;
pub use preload::{preload, AudioHandleMap};
pub use resample::{render_ratio, resample_interleaved};
pub use silent::SilentBackend;
