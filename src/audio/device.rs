// src/audio/device.rs
use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, instrument, trace, warn};

use crate::audio::decoder::{decode_pcm, DecodedAudio};
use crate::audio::error::AudioError;
use crate::audio::http::{extension_of, fetch_audio};
use crate::audio::output::{OutputDevice, PcmSink};
use crate::audio::playback::{AudioBackend, AudioHandle, FinishCallback, PlaybackOutcome};
use crate::audio::resample::{render_ratio, resample_interleaved};

const LOG_TARGET: &str = "r_lessonaudio::audio::device";

/// Frames handed to the sink per write.
const WRITE_CHUNK_FRAMES: usize = 1024;

/// Loads audio like [`HttpAudioBackend`](crate::audio::HttpAudioBackend) but
/// decodes it fully so handles can play it on an output device.
pub struct DeviceAudioBackend {
    client: Client,
    output: Arc<dyn OutputDevice>,
}

impl DeviceAudioBackend {
    pub fn new(output: Arc<dyn OutputDevice>) -> Self {
        Self {
            client: Client::new(),
            output,
        }
    }
}

#[async_trait]
impl AudioBackend for DeviceAudioBackend {
    #[instrument(skip(self), fields(url = %url))]
    async fn load(&self, url: &str) -> Result<Box<dyn AudioHandle>, AudioError> {
        let bytes = fetch_audio(&self.client, url).await?;
        if bytes.is_empty() {
            return Err(AudioError::LoadError(format!("{} is empty", url)));
        }
        let extension = extension_of(url);
        let decode_url = url.to_string();
        let audio = tokio::task::spawn_blocking(move || decode_pcm(bytes, extension.as_deref(), &decode_url)).await??;
        debug!(target: LOG_TARGET, %url, duration = ?audio.duration(), "Audio decoded and ready to play.");
        Ok(Box::new(DeviceHandle::new(url, Arc::new(audio), self.output.clone())))
    }
}

/// Transport state shared between a handle and its writer thread.
#[derive(Debug, Default)]
struct Transport {
    /// Source frame the next write starts from.
    position: usize,
    /// Identifies the writer allowed to run; bumping it halts the current one.
    request: u64,
    playing: bool,
}

/// A decoded resource played through an [`OutputDevice`].
///
/// Each play request spawns a writer thread that resamples the remainder of
/// the resource for the current rate and device, then feeds the sink in
/// chunks, publishing its position after every chunk.
pub struct DeviceHandle {
    url: String,
    audio: Arc<DecodedAudio>,
    output: Arc<dyn OutputDevice>,
    transport: Arc<Mutex<Transport>>,
    rate: f32,
    on_finish: Option<FinishCallback>,
    released: bool,
}

impl DeviceHandle {
    pub fn new(url: impl Into<String>, audio: Arc<DecodedAudio>, output: Arc<dyn OutputDevice>) -> Self {
        Self {
            url: url.into(),
            audio,
            output,
            transport: Arc::new(Mutex::new(Transport::default())),
            rate: 1.0,
            on_finish: None,
            released: false,
        }
    }

    /// Current position in the resource at normal speed.
    pub fn position(&self) -> Duration {
        self.audio.frame_time(lock(&self.transport).position)
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.transport).playing
    }

    /// Stops the running writer, if any. Returns whether one was running.
    fn halt_writer(&mut self) -> bool {
        let mut transport = lock(&self.transport);
        transport.request += 1;
        std::mem::replace(&mut transport.playing, false)
    }

    fn spawn_writer(&mut self) -> Result<(), AudioError> {
        let Some(on_finish) = self.on_finish.clone() else {
            return Ok(());
        };
        let request = {
            let mut transport = lock(&self.transport);
            transport.request += 1;
            transport.playing = true;
            transport.request
        };
        let writer = Writer {
            url: self.url.clone(),
            audio: self.audio.clone(),
            output: self.output.clone(),
            transport: self.transport.clone(),
            rate: self.rate,
            request,
        };
        thread::Builder::new()
            .name("pcm-writer".to_string())
            .spawn(move || writer.run(on_finish))
            .map(|_| ())
            .map_err(|e| {
                lock(&self.transport).playing = false;
                AudioError::InitializationError(format!("Failed to spawn writer thread: {}", e))
            })
    }
}

impl AudioHandle for DeviceHandle {
    fn play(&mut self, on_finish: FinishCallback) -> Result<(), AudioError> {
        if self.released {
            return Err(AudioError::InvalidState(format!(
                "handle for {} has been released",
                self.url
            )));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(AudioError::PlaybackError(format!(
                "unsupported playback rate {}",
                self.rate
            )));
        }
        self.halt_writer();
        self.on_finish = Some(on_finish);
        self.spawn_writer()
    }

    fn pause(&mut self) {
        self.halt_writer();
    }

    fn rewind(&mut self) {
        let was_playing = self.halt_writer();
        lock(&self.transport).position = 0;
        if was_playing {
            if let Err(e) = self.spawn_writer() {
                error!(target: LOG_TARGET, url = %self.url, "Failed to restart after rewind: {}", e);
            }
        }
    }

    fn set_playback_rate(&mut self, rate: f32) {
        let was_playing = self.halt_writer();
        self.rate = rate;
        if was_playing && rate.is_finite() && rate > 0.0 {
            if let Err(e) = self.spawn_writer() {
                error!(target: LOG_TARGET, url = %self.url, "Failed to restart at new rate: {}", e);
            }
        }
    }

    fn release(&mut self) {
        self.halt_writer();
        self.on_finish = None;
        self.released = true;
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.halt_writer();
    }
}

fn lock(transport: &Mutex<Transport>) -> MutexGuard<'_, Transport> {
    // The transport holds plain values; a panicked writer leaves them usable.
    transport.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One play request, from the handle's position to the end of the resource.
struct Writer {
    url: String,
    audio: Arc<DecodedAudio>,
    output: Arc<dyn OutputDevice>,
    transport: Arc<Mutex<Transport>>,
    rate: f32,
    request: u64,
}

impl Writer {
    fn run(self, on_finish: FinishCallback) {
        match self.write_to_end() {
            Ok(true) => {
                debug!(target: LOG_TARGET, url = %self.url, "Playback reached end of resource.");
                on_finish(PlaybackOutcome::Ended);
            }
            Ok(false) => trace!(target: LOG_TARGET, url = %self.url, request = self.request, "Writer halted."),
            Err(e) => {
                let current = {
                    let mut transport = lock(&self.transport);
                    let current = transport.request == self.request;
                    if current {
                        transport.playing = false;
                    }
                    current
                };
                if current {
                    warn!(target: LOG_TARGET, url = %self.url, "Playback failed: {}", e);
                    on_finish(PlaybackOutcome::Failed(e.to_string()));
                }
            }
        }
    }

    /// Returns `Ok(true)` when the resource played to its end, `Ok(false)`
    /// when a newer request took over.
    fn write_to_end(&self) -> Result<bool, AudioError> {
        let start = match self.start_frame() {
            Some(start) => start,
            None => return Ok(false),
        };
        let channels = self.audio.channels();
        let total = self.audio.frames();

        if start < total {
            let mut sink = self.output.open(channels, self.audio.sample_rate())?;
            let ratio = render_ratio(self.audio.sample_rate(), sink.sample_rate(), self.rate);
            let rendered = resample_interleaved(self.audio.samples_from(start), channels, ratio)?;
            trace!(target: LOG_TARGET, url = %self.url, start, ratio, "Writing rendered audio.");
            if !self.feed(sink.as_mut(), &rendered, start, ratio)? {
                sink.discard();
                return Ok(false);
            }
            sink.drain()?;
        }

        let mut transport = lock(&self.transport);
        if transport.request != self.request {
            return Ok(false);
        }
        transport.position = total;
        transport.playing = false;
        Ok(true)
    }

    fn start_frame(&self) -> Option<usize> {
        let transport = lock(&self.transport);
        (transport.request == self.request).then_some(transport.position)
    }

    /// Writes `rendered` in chunks. Returns `Ok(false)` once halted.
    fn feed(&self, sink: &mut dyn PcmSink, rendered: &[i16], start: usize, ratio: f64) -> Result<bool, AudioError> {
        let channels = self.audio.channels();
        let rendered_frames = rendered.len() / channels;
        let mut written = 0;
        while written < rendered_frames {
            let end = (written + WRITE_CHUNK_FRAMES).min(rendered_frames);
            let accepted = sink.write(&rendered[written * channels..end * channels])?;
            written += accepted.min(end - written);

            let mut transport = lock(&self.transport);
            if transport.request != self.request {
                return Ok(false);
            }
            let source_frames = (written as f64 / ratio).round() as usize;
            transport.position = (start + source_frames).min(self.audio.frames());
        }
        Ok(true)
    }
}
