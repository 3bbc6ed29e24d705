//! Audio sources feeding the estimator: microphone (cpal), WAV file (hound)
//! and a procedural tone (glicol).
//!
//! Every source down-mixes to mono, chops the stream into fixed blocks and
//! runs the estimator on the thread that produced the samples. Estimates
//! leave through the latest-value channel.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use glicol::Engine;
use tracing::{info, warn};

use super::channel::EstimateSender;
use super::estimator::PitchEstimator;
use crate::error::WaveError;
use crate::params::{audio_constants::BLOCK_SIZE, EstimatorConfig};

/// Where live audio comes from
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureSource {
    /// Input device by index, or the default device
    Microphone { device_index: Option<usize> },
    /// WAV file replayed in real time, looping
    File(PathBuf),
    /// Procedural tone with a slow vibrato around `frequency_hz`
    Synth { frequency_hz: f32 },
}

impl CaptureSource {
    pub fn describe(&self) -> String {
        match self {
            CaptureSource::Microphone { device_index: None } => "microphone".to_string(),
            CaptureSource::Microphone {
                device_index: Some(i),
            } => format!("input device #{}", i),
            CaptureSource::File(path) => format!("file {}", path.display()),
            CaptureSource::Synth { frequency_hz } => format!("synth {:.0} Hz", frequency_hz),
        }
    }
}

/// Mono sample sink: accumulates fixed blocks and runs the estimator
pub struct EstimatorWorker {
    estimator: PitchEstimator,
    pending: Vec<f32>,
    sender: EstimateSender,
}

impl EstimatorWorker {
    pub fn new(config: EstimatorConfig, sender: EstimateSender) -> Self {
        Self {
            estimator: PitchEstimator::new(config),
            pending: Vec::with_capacity(BLOCK_SIZE),
            sender,
        }
    }

    /// Push one mono sample
    pub fn push(&mut self, sample: f32) {
        self.pending.push(sample);
        if self.pending.len() == BLOCK_SIZE {
            if let Some(estimate) = self.estimator.push_block(&self.pending) {
                self.sender.send(estimate);
            }
            self.pending.clear();
        }
    }

    /// Push interleaved frames of any device sample type, averaging channels to mono
    pub fn push_interleaved<T>(&mut self, data: &[T], channels: usize)
    where
        T: Sample,
        f32: cpal::FromSample<T>,
    {
        for frame in data.chunks(channels.max(1)) {
            let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
            self.push(sum / frame.len() as f32);
        }
    }
}

enum CaptureHandle {
    Stream(cpal::Stream),
    Worker {
        stop: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    },
    Stopped,
}

/// Running capture; stopping (or dropping) releases the device or joins the worker
pub struct AudioCapture {
    handle: CaptureHandle,
    sample_rate_hz: u32,
    description: String,
}

impl AudioCapture {
    /// Start capturing from `source`, posting estimates to `sender`
    pub fn start(
        source: &CaptureSource,
        config: &EstimatorConfig,
        sender: EstimateSender,
    ) -> Result<Self, WaveError> {
        config.validate()?;
        match source {
            CaptureSource::Microphone { device_index } => {
                start_microphone(*device_index, config, sender)
            }
            CaptureSource::File(path) => start_file(path, config, sender),
            CaptureSource::Synth { frequency_hz } => start_synth(*frequency_hz, config, sender),
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.handle, CaptureHandle::Stopped)
    }

    /// Tear down synchronously. Safe to call more than once.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.handle, CaptureHandle::Stopped) {
            CaptureHandle::Stream(stream) => {
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause input stream: {}", e);
                }
                drop(stream);
                info!("Stopped {}", self.description);
            }
            CaptureHandle::Worker { stop, mut handle } => {
                stop.store(true, Ordering::Relaxed);
                if let Some(handle) = handle.take() {
                    if handle.join().is_err() {
                        warn!("Audio worker for {} panicked", self.description);
                    }
                }
                info!("Stopped {}", self.description);
            }
            CaptureHandle::Stopped => {}
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Names of the available input devices, in index order
pub fn list_input_devices() -> Result<Vec<String>, WaveError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| WaveError::Audio(format!("Failed to enumerate input devices: {}", e)))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect())
}

fn start_microphone(
    device_index: Option<usize>,
    config: &EstimatorConfig,
    sender: EstimateSender,
) -> Result<AudioCapture, WaveError> {
    let host = cpal::default_host();
    let device = match device_index {
        Some(index) => host
            .input_devices()
            .map_err(|e| WaveError::Audio(format!("Failed to enumerate input devices: {}", e)))?
            .nth(index)
            .ok_or_else(|| WaveError::Audio(format!("No input device #{}", index)))?,
        None => host
            .default_input_device()
            .ok_or_else(|| WaveError::Audio("No audio input device found".to_string()))?,
    };

    let supported = device
        .default_input_config()
        .map_err(|e| WaveError::Audio(format!("Failed to get input config: {}", e)))?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    if stream_config.channels == 0 {
        return Err(WaveError::Audio("Input device reported 0 channels".to_string()));
    }

    let sample_rate_hz = stream_config.sample_rate.0;
    let worker = EstimatorWorker::new(config.clone().with_sample_rate(sample_rate_hz), sender);
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!(
        "Audio input: {} @ {}Hz, {} channel(s), {:?}",
        name, sample_rate_hz, stream_config.channels, sample_format
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_input::<f32>(&device, &stream_config, worker),
        cpal::SampleFormat::F64 => build_input::<f64>(&device, &stream_config, worker),
        cpal::SampleFormat::I16 => build_input::<i16>(&device, &stream_config, worker),
        cpal::SampleFormat::I32 => build_input::<i32>(&device, &stream_config, worker),
        cpal::SampleFormat::U16 => build_input::<u16>(&device, &stream_config, worker),
        cpal::SampleFormat::U8 => build_input::<u8>(&device, &stream_config, worker),
        other => Err(WaveError::Audio(format!(
            "Unsupported input sample format {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| WaveError::Audio(format!("Failed to start input stream: {}", e)))?;

    Ok(AudioCapture {
        handle: CaptureHandle::Stream(stream),
        sample_rate_hz,
        description: name,
    })
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut worker: EstimatorWorker,
) -> Result<cpal::Stream, WaveError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| worker.push_interleaved(data, channels),
            |err| warn!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| WaveError::Audio(format!("Failed to build input stream: {}", e)))
}

/// Decode a WAV file to mono f32
pub fn read_wav_mono(path: &Path) -> Result<(Vec<f32>, u32), WaveError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| WaveError::Audio(format!("Failed to open {}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| WaveError::Audio(format!("Failed to decode {}: {}", path.display(), e)))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    WaveError::Audio(format!("Failed to decode {}: {}", path.display(), e))
                })?
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

fn start_file(
    path: &Path,
    config: &EstimatorConfig,
    sender: EstimateSender,
) -> Result<AudioCapture, WaveError> {
    let (samples, sample_rate_hz) = read_wav_mono(path)?;
    if samples.is_empty() {
        return Err(WaveError::Audio(format!("{} contains no samples", path.display())));
    }
    if sample_rate_hz == 0 {
        return Err(WaveError::Audio(format!("{} has a zero sample rate", path.display())));
    }
    info!(
        "Audio file: {} ({:.1}s @ {}Hz)",
        path.display(),
        samples.len() as f32 / sample_rate_hz as f32,
        sample_rate_hz
    );

    let mut worker = EstimatorWorker::new(config.clone().with_sample_rate(sample_rate_hz), sender);
    let block = Duration::from_secs_f64(BLOCK_SIZE as f64 / sample_rate_hz as f64);

    let (stop, handle) = spawn_paced(block, move |index| {
        let start = (index * BLOCK_SIZE) % samples.len();
        for offset in 0..BLOCK_SIZE {
            worker.push(samples[(start + offset) % samples.len()]);
        }
    })?;

    Ok(AudioCapture {
        handle: CaptureHandle::Worker {
            stop,
            handle: Some(handle),
        },
        sample_rate_hz,
        description: path.display().to_string(),
    })
}

/// Glicol code for a sine with slow vibrato
fn synth_code(frequency_hz: f32) -> String {
    let frequency_hz = if frequency_hz.is_finite() {
        frequency_hz.clamp(20.0, 4000.0)
    } else {
        220.0
    };
    format!(
        "~vib: sin 0.25 >> mul {:.3} >> add {:.3}\no: sin ~vib >> mul 0.3\n",
        frequency_hz * 0.05,
        frequency_hz
    )
}

fn start_synth(
    frequency_hz: f32,
    config: &EstimatorConfig,
    sender: EstimateSender,
) -> Result<AudioCapture, WaveError> {
    let sample_rate_hz = config.sample_rate_hz;
    let code = synth_code(frequency_hz);

    let mut engine = Engine::<BLOCK_SIZE>::new();
    engine.set_sr(sample_rate_hz as usize);
    engine.update_with_code(&code);
    engine
        .update()
        .map_err(|e| WaveError::Audio(format!("Glicol engine init failed: {:?}", e)))?;
    info!("Audio synth: {:.0} Hz @ {}Hz", frequency_hz, sample_rate_hz);

    let mut worker = EstimatorWorker::new(config.clone(), sender);
    let block = Duration::from_secs_f64(BLOCK_SIZE as f64 / sample_rate_hz as f64);

    let (stop, handle) = spawn_paced(block, move |_| {
        let (buffers, _) = engine.next_block(vec![]);
        for i in 0..BLOCK_SIZE {
            worker.push(buffers[0][i]);
        }
    })?;

    Ok(AudioCapture {
        handle: CaptureHandle::Worker {
            stop,
            handle: Some(handle),
        },
        sample_rate_hz,
        description: format!("synth {:.0} Hz", frequency_hz),
    })
}

/// Run `produce_block` once per block period until the stop flag is set.
///
/// Paced against a fixed start instant so sleep jitter does not accumulate.
fn spawn_paced<F>(
    block: Duration,
    mut produce_block: F,
) -> Result<(Arc<AtomicBool>, thread::JoinHandle<()>), WaveError>
where
    F: FnMut(usize) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let handle = thread::Builder::new()
        .name("wavelab-audio".to_string())
        .spawn(move || {
            let start = Instant::now();
            let mut index = 0usize;
            while !stop_flag.load(Ordering::Relaxed) {
                produce_block(index);
                index += 1;

                let due = start + block * index as u32;
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
            }
        })
        .map_err(WaveError::Io)?;

    Ok((stop, handle))
}
