// src/audio/decoder.rs
use bytes::Bytes;
use std::io::{Cursor, ErrorKind};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace, warn};

use crate::audio::error::AudioError;

const LOG_TARGET: &str = "r_lessonaudio::audio::decoder";

/// A fully decoded resource as interleaved S16 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    samples: Vec<i16>,
    channels: usize,
    sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<i16>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub fn duration(&self) -> Duration {
        self.frame_time(self.frames())
    }

    /// Playing time of `frames` frames at normal speed.
    pub fn frame_time(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// Interleaved samples from `frame` to the end.
    pub fn samples_from(&self, frame: usize) -> &[i16] {
        let start = frame.min(self.frames()) * self.channels;
        &self.samples[start..]
    }
}

/// Decodes the default track of an encoded buffer into S16 samples.
///
/// Packets that fail to decode are skipped, like a streaming decoder would.
/// The stream must keep one signal spec throughout.
pub fn decode_pcm(bytes: Bytes, extension: Option<&str>, url: &str) -> Result<DecodedAudio, AudioError> {
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
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<i16> = Vec::new();
    let mut layout: Option<(usize, u32)> = None;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                debug!(target: LOG_TARGET, %url, "Stream requested a decoder reset; stopping at current frame.");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                warn!(target: LOG_TARGET, %url, "Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        let packet_layout = (spec.channels.count(), spec.rate);
        match layout {
            None => layout = Some(packet_layout),
            Some(expected) if expected != packet_layout => {
                return Err(AudioError::DecodingError(format!(
                    "{} changes from {:?} to {:?} (channels, rate) mid-stream",
                    url, expected, packet_layout
                )));
            }
            Some(_) => {}
        }

        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        trace!(target: LOG_TARGET, samples = buffer.samples().len(), "Decoded packet.");
        samples.extend_from_slice(buffer.samples());
    }

    match layout {
        Some((channels, sample_rate)) if !samples.is_empty() => {
            let audio = DecodedAudio::new(samples, channels, sample_rate);
            debug!(
                target: LOG_TARGET,
                %url,
                channels,
                sample_rate,
                frames = audio.frames(),
                skipped,
                "Decoded audio."
            );
            Ok(audio)
        }
        _ => Err(AudioError::UnknownDuration(url.to_string())),
    }
}
