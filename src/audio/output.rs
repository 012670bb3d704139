// src/audio/output.rs
use crate::audio::error::AudioError;

/// An opened PCM stream accepting interleaved S16 frames.
///
/// Sinks are driven from a dedicated writer thread, so every call may block.
pub trait PcmSink: Send {
    /// Rate the device actually runs at, which may differ from the one requested.
    fn sample_rate(&self) -> u32;

    /// Writes interleaved samples, returning the number of frames accepted.
    /// `Ok(0)` means the device recovered from an underrun and the write
    /// should be retried.
    fn write(&mut self, samples: &[i16]) -> Result<usize, AudioError>;

    /// Blocks until everything written has been played.
    fn drain(&mut self) -> Result<(), AudioError>;

    /// Discards buffered frames immediately.
    fn discard(&mut self);
}

/// Something that can open PCM streams for playback.
pub trait OutputDevice: Send + Sync {
    fn open(&self, channels: usize, sample_rate: u32) -> Result<Box<dyn PcmSink>, AudioError>;
}

#[cfg(feature = "alsa-output")]
pub use alsa_pcm::AlsaOutput;

#[cfg(feature = "alsa-output")]
mod alsa_pcm {
    use alsa::nix::errno::Errno;
    use alsa::pcm::{Access, Format, HwParams, State as PcmState, PCM};
    use alsa::{Direction, ValueOr};
    use std::ffi::CString;
    use tracing::{debug, info, instrument, warn};

    use super::{OutputDevice, PcmSink};
    use crate::audio::error::AudioError;

    const LOG_TARGET: &str = "r_lessonaudio::audio::alsa";

    /// Opens playback streams on a named ALSA device.
    #[derive(Debug, Clone)]
    pub struct AlsaOutput {
        device_name: String,
    }

    impl AlsaOutput {
        pub fn new(device_name: &str) -> Self {
            Self {
                device_name: device_name.to_string(),
            }
        }
    }

    impl OutputDevice for AlsaOutput {
        #[instrument(skip(self), fields(device = %self.device_name))]
        fn open(&self, channels: usize, sample_rate: u32) -> Result<Box<dyn PcmSink>, AudioError> {
            let device = CString::new(self.device_name.clone())
                .map_err(|e| AudioError::InitializationError(format!("Invalid device name: {}", e)))?;
            let pcm = PCM::open(&device, Direction::Playback, false)?;

            let actual_rate = {
                let hwp = HwParams::any(&pcm)?;
                hwp.set_access(Access::RWInterleaved)?;
                hwp.set_format(Format::s16())?;
                hwp.set_channels(channels as u32)?;
                hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
                let actual_rate = hwp.get_rate()?;
                if actual_rate != sample_rate {
                    warn!(
                        target: LOG_TARGET,
                        "ALSA rate negotiation: requested={}, actual={}", sample_rate, actual_rate
                    );
                }
                pcm.hw_params(&hwp)?;

                let swp = pcm.sw_params_current()?;
                let buffer_size = hwp.get_buffer_size()?;
                let period_size = hwp.get_period_size()?;
                swp.set_start_threshold(buffer_size - period_size)?;
                pcm.sw_params(&swp)?;
                debug!(target: LOG_TARGET, buffer_size, period_size, "ALSA parameters applied.");
                actual_rate
            };

            info!(target: LOG_TARGET, channels, rate = actual_rate, "Opened ALSA device '{}'.", self.device_name);
            Ok(Box::new(AlsaSink {
                pcm,
                rate: actual_rate,
            }))
        }
    }

    struct AlsaSink {
        pcm: PCM,
        rate: u32,
    }

    impl PcmSink for AlsaSink {
        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn write(&mut self, samples: &[i16]) -> Result<usize, AudioError> {
            let io = self.pcm.io_i16()?;
            match io.writei(samples) {
                Ok(frames) => Ok(frames),
                Err(e) if e.errno() == Errno::EPIPE => {
                    warn!(target: LOG_TARGET, "ALSA buffer underrun, recovering.");
                    self.pcm
                        .recover(Errno::EPIPE as i32, true)
                        .map_err(|e| AudioError::AlsaError(format!("ALSA recovery failed: {}", e)))?;
                    Ok(0)
                }
                Err(e) => Err(AudioError::AlsaError(e.to_string())),
            }
        }

        fn drain(&mut self) -> Result<(), AudioError> {
            match self.pcm.state() {
                PcmState::Running | PcmState::Prepared => {
                    // A short clip may never reach the start threshold.
                    if self.pcm.state() == PcmState::Prepared {
                        self.pcm.start()?;
                    }
                    self.pcm.drain()?;
                    Ok(())
                }
                _ => Ok(()),
            }
        }

        fn discard(&mut self) {
            if matches!(self.pcm.state(), PcmState::Running | PcmState::Prepared | PcmState::Paused) {
                if let Err(e) = self.pcm.drop() {
                    warn!(target: LOG_TARGET, "Error dropping ALSA buffer (ignored): {}", e);
                }
            }
        }
    }
}
