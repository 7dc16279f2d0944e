//! Rodio Output Backend
//!
//! Plays scheduler voices through the default output device. Each playback
//! instance owns one rodio [`Sink`]; pan is applied by a small stereo
//! wrapper source that reads its gains from a shared atomic so it can be
//! changed while the sink is playing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    RodioBackend                      │
//! │  ┌──────────────┐  ┌───────────┐  ┌───────────────┐  │
//! │  │ OutputStream │──│ Instances │──│   SoundBank   │  │
//! │  │   (device)   │  │  (sinks)  │  │ (clip cache)  │  │
//! │  └──────────────┘  └───────────┘  └───────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::f32::consts::FRAC_PI_4;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use ambience_common::{AudioError, AudioResult, PlaybackId, SoundId};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, warn};

use crate::audio_backend::PlaybackBackend;
use crate::audio_resource::{PlaybackIdGenerator, SoundBank, SoundClip};

/// Wraps rodio's output stream.
pub struct AudioDevice {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    handle: OutputStreamHandle,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice").finish_non_exhaustive()
    }
}

impl AudioDevice {
    /// Open the default output device.
    pub fn new() -> AudioResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceInitFailed(e.to_string()))?;

        info!("Audio device initialized");

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Create a new paused sink.
    pub fn create_sink(&self) -> AudioResult<Sink> {
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| AudioError::InstanceCreationFailed(e.to_string()))?;
        sink.pause();
        Ok(sink)
    }
}

/// One live instance: a sink plus its not-yet-started clip.
struct DeviceInstance {
    sink: Sink,
    clip: SoundClip,
    pan: Arc<AtomicU32>,
    looped: bool,
    started: bool,
}

impl std::fmt::Debug for DeviceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceInstance")
            .field("sound", &self.clip.id)
            .field("looped", &self.looped)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

/// Playback backend backed by the system audio device.
#[derive(Debug)]
pub struct RodioBackend {
    device: Option<AudioDevice>,
    bank: SoundBank,
    instances: AHashMap<PlaybackId, DeviceInstance>,
    handles: PlaybackIdGenerator,
}

impl RodioBackend {
    /// Open the default device. If that fails the backend still works but
    /// reports itself unavailable, which makes the scheduler idle.
    #[must_use]
    pub fn new(bank: SoundBank) -> Self {
        let device = match AudioDevice::new() {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("Running without audio output: {e}");
                None
            },
        };

        Self {
            device,
            bank,
            instances: AHashMap::new(),
            handles: PlaybackIdGenerator::new(),
        }
    }

    /// Number of live instances.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.instances.len()
    }
}

impl PlaybackBackend for RodioBackend {
    fn is_available(&self) -> bool {
        self.device.is_some()
    }

    fn create_instance(&mut self, sound: SoundId) -> AudioResult<PlaybackId> {
        let device = self.device.as_ref().ok_or(AudioError::NoDevice)?;
        let clip = self
            .bank
            .get(sound)
            .cloned()
            .ok_or(AudioError::SoundNotFound(sound))?;
        let sink = device.create_sink()?;

        let id = self.handles.next();
        debug!("Created sink {id} for '{}'", clip.name);
        self.instances.insert(
            id,
            DeviceInstance {
                sink,
                clip,
                pan: Arc::new(AtomicU32::new(0.0f32.to_bits())),
                looped: false,
                started: false,
            },
        );
        Ok(id)
    }

    fn apply_fade_pitch_pan(&mut self, instance: PlaybackId, volume: f32, pitch: f32, pan: f32) {
        if let Some(inst) = self.instances.get(&instance) {
            inst.sink.set_volume(volume.clamp(0.0, 1.0));
            inst.sink.set_speed(pitch_to_speed(pitch));
            inst.pan
                .store(pan.clamp(-1.0, 1.0).to_bits(), Ordering::Relaxed);
        }
    }

    fn volume(&self, instance: PlaybackId) -> f32 {
        self.instances
            .get(&instance)
            .map_or(0.0, |inst| inst.sink.volume())
    }

    fn set_volume(&mut self, instance: PlaybackId, volume: f32) {
        if let Some(inst) = self.instances.get(&instance) {
            inst.sink.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    fn set_looped(&mut self, instance: PlaybackId, looped: bool) {
        if let Some(inst) = self.instances.get_mut(&instance) {
            if inst.started {
                warn!("Loop flag changed after {instance} started; ignored");
                return;
            }
            inst.looped = looped;
        }
    }

    fn play(&mut self, instance: PlaybackId) {
        let Some(inst) = self.instances.get_mut(&instance) else {
            return;
        };

        if !inst.started {
            let clip = &inst.clip;
            let buffer =
                SamplesBuffer::new(clip.channels, clip.sample_rate, (*clip.samples).clone());
            if inst.looped {
                inst.sink
                    .append(PannedSource::new(buffer.repeat_infinite(), inst.pan.clone()));
            } else {
                inst.sink.append(PannedSource::new(buffer, inst.pan.clone()));
            }
            inst.started = true;
        }
        inst.sink.play();
    }

    fn dispose(&mut self, instance: PlaybackId) {
        if let Some(inst) = self.instances.remove(&instance) {
            inst.sink.stop();
            debug!("Disposed sink {instance}");
        }
    }
}

/// Pitch offset in octaves to playback speed.
fn pitch_to_speed(pitch: f32) -> f32 {
    2.0f32.powf(pitch.clamp(-1.0, 1.0))
}

/// Constant-power gains for a pan position.
fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Stereo output of a mono or stereo source with a live pan position.
struct PannedSource<S> {
    input: S,
    pan: Arc<AtomicU32>,
    pending_right: Option<f32>,
}

impl<S> PannedSource<S> {
    fn new(input: S, pan: Arc<AtomicU32>) -> Self {
        Self {
            input,
            pan,
            pending_right: None,
        }
    }
}

impl<S> Iterator for PannedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if let Some(right) = self.pending_right.take() {
            return Some(right);
        }

        let (left_gain, right_gain) = pan_gains(f32::from_bits(self.pan.load(Ordering::Relaxed)));
        let channels = self.input.channels();
        let left = self.input.next()?;
        let right = if channels >= 2 {
            let right = self.input.next().unwrap_or(0.0);
            // Drop anything past the front pair
            for _ in 2..channels {
                self.input.next();
            }
            right
        } else {
            left
        };

        self.pending_right = Some(right * right_gain);
        Some(left * left_gain)
    }
}

impl<S> Source for PannedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        let channels = usize::from(self.input.channels().max(1));
        self.input.current_frame_len().map(|len| len / channels * 2)
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.input.total_duration()
    }
}
