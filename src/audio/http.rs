// src/audio/http.rs
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, trace};

use crate::audio::clocked::ClockedHandle;
use crate::audio::error::AudioError;
use crate::audio::playback::{AudioBackend, AudioHandle};

const LOG_TARGET: &str = "r_lessonaudio::audio::http";

/// Loads audio from `http(s)://` URLs or local paths and probes its duration.
///
/// Handles only keep time; nothing is sent to an output device.
pub struct HttpAudioBackend {
    client: Client,
}

impl HttpAudioBackend {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioBackend for HttpAudioBackend {
    #[instrument(skip(self), fields(url = %url))]
    async fn load(&self, url: &str) -> Result<Box<dyn AudioHandle>, AudioError> {
        let bytes = fetch_audio(&self.client, url).await?;
        if bytes.is_empty() {
            return Err(AudioError::LoadError(format!("{} is empty", url)));
        }
        let extension = extension_of(url);
        let probe_url = url.to_string();
        // Probing walks the container synchronously.
        let duration = tokio::task::spawn_blocking(move || {
            probe_duration(bytes, extension.as_deref(), &probe_url)
        })
        .await??;
        debug!(target: LOG_TARGET, %url, ?duration, "Audio ready to play.");
        Ok(Box::new(ClockedHandle::new(url, duration)))
    }
}

pub(crate) fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Reads a resource over HTTP, or from disk for plain and `file://` paths.
pub(crate) async fn fetch_audio(client: &Client, url: &str) -> Result<Bytes, AudioError> {
    if is_remote(url) {
        trace!(target: LOG_TARGET, %url, "Fetching remote audio.");
        let response = client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        trace!(target: LOG_TARGET, %path, "Reading local audio.");
        Ok(Bytes::from(tokio::fs::read(path).await?))
    }
}

pub(crate) fn extension_of(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Determines the playing time of an encoded audio buffer.
///
/// Uses the frame count from the codec parameters when the container
/// provides one, otherwise sums packet durations of the default track.
pub fn probe_duration(bytes: Bytes, extension: Option<&str>, url: &str) -> Result<Duration, AudioError> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), MediaSourceStreamOptions::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or(AudioError::MissingCodecParams("default track"))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let time_base = match (params.time_base, params.sample_rate) {
        (Some(tb), _) => tb,
        (None, Some(rate)) => symphonia::core::units::TimeBase::new(1, rate),
        (None, None) => return Err(AudioError::MissingCodecParams("time base")),
    };

    let total_ts = match params.n_frames {
        Some(frames) => frames,
        None => {
            let mut ts = 0u64;
            while let Ok(packet) = format.next_packet() {
                if packet.track_id() == track_id {
                    ts += packet.dur();
                }
            }
            ts
        }
    };
    if total_ts == 0 {
        return Err(AudioError::UnknownDuration(url.to_string()));
    }

    let time = time_base.calc_time(total_ts);
    Ok(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
}
