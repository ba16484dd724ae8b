//! Microphone input abstraction.
//!
//! The capture loop consumes the `AudioInput` contract: blocking reads of a
//! fixed-duration frame of 16-bit samples at the target rate. The production
//! implementation sits on cpal. `cpal::Stream` is not `Send`, so the stream
//! lives on a dedicated thread and hands sample blocks over a channel; the
//! reading side assembles frames, folds stereo to mono, and decimates down
//! to the target rate.
//!
//! Device acquisition is scoped: dropping the input releases the stream and
//! joins the capture thread on every exit path.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Target capture format (what the VAD and the engine expect).
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Target sample rate (device output is decimated down if higher)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Frame duration for each read, in milliseconds
    pub frame_duration_ms: u64,
}

impl AudioInputConfig {
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * 2
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }
}

impl Default for AudioInputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Whisper expects 16kHz
            channels: 1,        // Mono
            frame_duration_ms: 100,
        }
    }
}

/// Blocking microphone read contract consumed by the capture loop.
pub trait AudioInput: Send {
    /// Read one frame of approximately `duration` worth of samples in the
    /// target format. Blocks until enough audio has arrived or the driver
    /// stalls, in which case an error is returned and the caller retries.
    fn read_frame(&mut self, duration: Duration) -> Result<Vec<i16>>;

    /// Input name for logging
    fn name(&self) -> &str;
}

/// Opens inputs; the seam that lets tests substitute scripted devices.
pub trait InputFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioInput>>;
}

/// Factory for the default cpal input device.
pub struct CpalInputFactory {
    config: AudioInputConfig,
}

impl CpalInputFactory {
    pub fn new(config: AudioInputConfig) -> Self {
        Self { config }
    }
}

impl InputFactory for CpalInputFactory {
    fn open(&self) -> Result<Box<dyn AudioInput>> {
        Ok(Box::new(CpalInput::open(self.config.clone())?))
    }
}

/// cpal-backed microphone input.
pub struct CpalInput {
    config: AudioInputConfig,
    source_rate: u32,
    source_channels: u16,
    rx: mpsc::Receiver<Vec<i16>>,
    pending: Vec<i16>,
    shutdown: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CpalInput {
    /// Open the default input device and start streaming.
    pub fn open(config: AudioInputConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_input_config()
            .context("Failed to query default input config")?;
        let source_rate = supported.sample_rate().0;
        let source_channels = supported.channels();
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();

        debug!(
            "Opening input device '{}': {} Hz, {} ch, {:?}",
            device_name, source_rate, source_channels, sample_format
        );

        let (tx, rx) = mpsc::channel::<Vec<i16>>();
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        // The stream must be created and kept alive on its own thread
        let thread = thread::spawn(move || {
            let err_fn = |e| warn!("Audio stream error: {}", e);

            let stream = match sample_format {
                cpal::SampleFormat::F32 => device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let samples: Vec<i16> = data
                            .iter()
                            .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
                            .collect();
                        tx.send(samples).ok();
                    },
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::I16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        tx.send(data.to_vec()).ok();
                    },
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::U16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        let samples: Vec<i16> =
                            data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                        tx.send(samples).ok();
                    },
                    err_fn,
                    None,
                ),
                other => {
                    ready_tx
                        .send(Err(format!("Unsupported sample format: {:?}", other)))
                        .ok();
                    return;
                }
            };

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    ready_tx.send(Err(format!("Failed to build input stream: {}", e))).ok();
                    return;
                }
            };

            if let Err(e) = stream.play() {
                ready_tx.send(Err(format!("Failed to start input stream: {}", e))).ok();
                return;
            }

            ready_tx.send(Ok(())).ok();

            while !thread_shutdown.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            // Stream dropped here, releasing the device
        });

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                bail!("{}", e);
            }
            Err(_) => {
                shutdown.store(true, Ordering::SeqCst);
                let _ = thread.join();
                bail!("Timed out waiting for input stream to start");
            }
        }

        Ok(Self {
            config,
            source_rate,
            source_channels,
            rx,
            pending: Vec::new(),
            shutdown,
            thread: Some(thread),
        })
    }

    /// Fold interleaved stereo to mono by summing channels.
    fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
        samples
            .chunks_exact(2)
            .map(|pair| {
                let sum = pair[0] as i32 + pair[1] as i32;
                sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
            })
            .collect()
    }

    /// Downsample by decimation: take every Nth sample.
    fn downsample(samples: Vec<i16>, source_rate: u32, target_rate: u32) -> Vec<i16> {
        if source_rate <= target_rate {
            return samples;
        }
        let ratio = (source_rate / target_rate).max(1) as usize;
        samples.into_iter().step_by(ratio).collect()
    }
}

impl AudioInput for CpalInput {
    fn read_frame(&mut self, duration: Duration) -> Result<Vec<i16>> {
        let needed = (self.source_rate as u128 * self.source_channels as u128
            * duration.as_millis()
            / 1000) as usize;

        // Allow one extra frame of driver buffering before giving up
        let deadline = Instant::now() + duration * 2 + Duration::from_millis(200);

        while self.pending.len() < needed {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or_else(|| anyhow!("Microphone read timed out"))?;
            let block = self
                .rx
                .recv_timeout(remaining)
                .context("Microphone read timed out")?;
            self.pending.extend(block);
        }

        let raw: Vec<i16> = self.pending.drain(..needed).collect();

        let mono = if self.source_channels == 2 && self.config.channels == 1 {
            Self::stereo_to_mono(&raw)
        } else {
            raw
        };

        Ok(Self::downsample(mono, self.source_rate, self.config.sample_rate))
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio capture thread panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_fold_sums_and_clamps() {
        let folded = CpalInput::stereo_to_mono(&[100, 200, -50, -70, 30000, 30000]);
        assert_eq!(folded, vec![300, -120, i16::MAX]);
    }

    #[test]
    fn downsample_decimates_by_integer_ratio() {
        let samples: Vec<i16> = (0..12).collect();
        let out = CpalInput::downsample(samples, 48000, 16000);
        assert_eq!(out, vec![0, 3, 6, 9]);
    }

    #[test]
    fn downsample_passes_through_at_target_rate() {
        let samples: Vec<i16> = (0..8).collect();
        let out = CpalInput::downsample(samples.clone(), 16000, 16000);
        assert_eq!(out, samples);
    }

    #[test]
    fn config_byte_rate() {
        let config = AudioInputConfig::default();
        assert_eq!(config.bytes_per_second(), 32000);
        assert_eq!(config.frame_duration(), Duration::from_millis(100));
    }
}
