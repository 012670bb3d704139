// src/audio/resample.rs
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use tracing::trace;

use crate::audio::error::AudioError;

const LOG_TARGET: &str = "r_lessonaudio::audio::resample";

/// Input frames per resampler call.
const CHUNK_FRAMES: usize = 512;

/// Output/input frame ratio that plays `source_rate` audio at `rate` speed
/// on a device running at `device_rate`.
pub fn render_ratio(source_rate: u32, device_rate: u32, rate: f32) -> f64 {
    device_rate as f64 / (source_rate as f64 * rate as f64)
}

/// Resamples interleaved S16 audio by `ratio` (output frames per input frame).
///
/// The resampler's delay is trimmed, so the output holds
/// `ceil(frames * ratio)` frames aligned with the input.
pub fn resample_interleaved(samples: &[i16], channels: usize, ratio: f64) -> Result<Vec<i16>, AudioError> {
    if channels == 0 || samples.len() < channels {
        return Ok(Vec::new());
    }
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(AudioError::ResamplingError(format!("invalid ratio {}", ratio)));
    }
    if (ratio - 1.0).abs() < 1e-9 {
        return Ok(samples.to_vec());
    }

    let input = deinterleave(samples, channels);
    let frames = input[0].len();
    let expected = (frames as f64 * ratio).ceil() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, params, CHUNK_FRAMES, channels)
        .map_err(|e| AudioError::ResamplingError(format!("Failed to create resampler: {}", e)))?;
    let delay = resampler.output_delay();
    trace!(target: LOG_TARGET, frames, ratio, delay, "Resampling buffer.");

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];
    let mut consumed = 0;
    while consumed < frames {
        let needed = resampler.input_frames_next();
        let end = (consumed + needed).min(frames);
        let chunk: Vec<&[f32]> = input.iter().map(|plane| &plane[consumed..end]).collect();
        let produced = if end - consumed == needed {
            resampler.process(chunk.as_slice(), None)
        } else {
            resampler.process_partial(Some(chunk.as_slice()), None)
        }
        .map_err(|e| AudioError::ResamplingError(e.to_string()))?;
        append_planes(&mut output, produced);
        consumed = end;
    }

    // Flush the delay line until the tail of the input has come out.
    while output[0].len() < delay + expected {
        let produced = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AudioError::ResamplingError(e.to_string()))?;
        if produced.first().map_or(true, Vec::is_empty) {
            break;
        }
        append_planes(&mut output, produced);
    }

    let available = output[0].len().saturating_sub(delay).min(expected);
    let mut interleaved = Vec::with_capacity(available * channels);
    for frame in delay..delay + available {
        for plane in &output {
            interleaved.push(to_s16(plane[frame]));
        }
    }
    Ok(interleaved)
}

fn deinterleave(samples: &[i16], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planes = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, sample) in planes.iter_mut().zip(frame) {
            plane.push(*sample as f32 / 32768.0);
        }
    }
    planes
}

fn append_planes(output: &mut [Vec<f32>], produced: Vec<Vec<f32>>) {
    for (plane, chunk) in output.iter_mut().zip(produced) {
        plane.extend_from_slice(&chunk);
    }
}

fn to_s16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
