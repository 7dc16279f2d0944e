//! Playback Backend
//!
//! The scheduler never touches an audio device directly. Everything it does
//! to a voice goes through [`PlaybackBackend`]: create an instance, push
//! fade/pitch/pan, read and write volume, start it, dispose of it.
//!
//! Device calls are fire-and-forget. They are the one part of a frame that
//! cannot be replayed, so setters report nothing back and only instance
//! creation can fail.
//!
//! Two backends ship with the kernel:
//!
//! - [`VirtualBackend`]: in-process bookkeeping with no sound output. Used by
//!   tests, headless runs and machines without an output device.
//! - `RodioBackend` (feature `rodio`): real output through the default
//!   device, see [`crate::audio_device`].

use ahash::{AHashMap, AHashSet};
use ambience_common::{PlaybackId, SoundId};
use tracing::{debug, warn};

use crate::audio_resource::{PlaybackIdGenerator, PlaybackState};

pub use ambience_common::{AudioError, AudioResult};

/// Default number of simultaneous playback instances.
pub const MAX_INSTANCES: usize = 32;

/// Playback instance operations consumed by the scheduler.
pub trait PlaybackBackend {
    /// Whether the output device can currently play anything.
    fn is_available(&self) -> bool;

    /// Create a stopped instance of `sound`.
    fn create_instance(&mut self, sound: SoundId) -> AudioResult<PlaybackId>;

    /// Apply volume, pitch offset and pan in one call.
    fn apply_fade_pitch_pan(&mut self, instance: PlaybackId, volume: f32, pitch: f32, pan: f32);

    /// Current volume (0.0 for unknown instances).
    fn volume(&self, instance: PlaybackId) -> f32;

    /// Set the volume only.
    fn set_volume(&mut self, instance: PlaybackId, volume: f32);

    /// Loop the instance when it reaches the end.
    fn set_looped(&mut self, instance: PlaybackId, looped: bool);

    /// Start playback.
    fn play(&mut self, instance: PlaybackId);

    /// Stop and free the instance. The handle is invalid afterwards.
    fn dispose(&mut self, instance: PlaybackId);
}

/// State of one instance in a [`VirtualBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualInstance {
    /// Sound being played.
    pub sound: SoundId,
    /// Volume (0.0-1.0).
    pub volume: f32,
    /// Pitch offset (-1.0-1.0).
    pub pitch: f32,
    /// Pan (-1.0-1.0).
    pub pan: f32,
    /// Loop flag.
    pub looped: bool,
    /// Play state.
    pub state: PlaybackState,
}

impl VirtualInstance {
    fn new(sound: SoundId) -> Self {
        Self {
            sound,
            volume: 1.0,
            pitch: 0.0,
            pan: 0.0,
            looped: false,
            state: PlaybackState::Stopped,
        }
    }
}

/// Playback backend that keeps instance state in memory and outputs nothing.
#[derive(Debug)]
pub struct VirtualBackend {
    instances: AHashMap<PlaybackId, VirtualInstance>,
    known_sounds: Option<AHashSet<SoundId>>,
    handles: PlaybackIdGenerator,
    capacity: usize,
    available: bool,
    created: usize,
    disposed: Vec<PlaybackId>,
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualBackend {
    /// A backend that accepts any sound, up to [`MAX_INSTANCES`] at once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instances: AHashMap::new(),
            known_sounds: None,
            handles: PlaybackIdGenerator::new(),
            capacity: MAX_INSTANCES,
            available: true,
            created: 0,
            disposed: Vec::new(),
        }
    }

    /// Only accept the given sounds.
    #[must_use]
    pub fn with_sounds(mut self, sounds: impl IntoIterator<Item = SoundId>) -> Self {
        self.known_sounds = Some(sounds.into_iter().collect());
        self
    }

    /// Limit simultaneous instances.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Simulate the device appearing or disappearing.
    pub fn set_available(&mut self, available: bool) {
        if self.available != available {
            debug!("Virtual audio device available: {available}");
        }
        self.available = available;
    }

    /// Look up a live instance.
    #[must_use]
    pub fn instance(&self, id: PlaybackId) -> Option<&VirtualInstance> {
        self.instances.get(&id)
    }

    /// Number of live instances.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Total instances ever created.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Instances disposed so far, in order.
    #[must_use]
    pub fn disposed(&self) -> &[PlaybackId] {
        &self.disposed
    }
}

impl PlaybackBackend for VirtualBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn create_instance(&mut self, sound: SoundId) -> AudioResult<PlaybackId> {
        if !self.available {
            return Err(AudioError::NoDevice);
        }
        if let Some(known) = &self.known_sounds {
            if !known.contains(&sound) {
                return Err(AudioError::SoundNotFound(sound));
            }
        }
        if self.instances.len() >= self.capacity {
            return Err(AudioError::InstanceCreationFailed(format!(
                "all {} instances in use",
                self.capacity
            )));
        }

        let id = self.handles.next();
        self.instances.insert(id, VirtualInstance::new(sound));
        self.created += 1;
        Ok(id)
    }

    fn apply_fade_pitch_pan(&mut self, instance: PlaybackId, volume: f32, pitch: f32, pan: f32) {
        if let Some(state) = self.instances.get_mut(&instance) {
            state.volume = volume.clamp(0.0, 1.0);
            state.pitch = pitch.clamp(-1.0, 1.0);
            state.pan = pan.clamp(-1.0, 1.0);
        }
    }

    fn volume(&self, instance: PlaybackId) -> f32 {
        self.instances.get(&instance).map_or(0.0, |s| s.volume)
    }

    fn set_volume(&mut self, instance: PlaybackId, volume: f32) {
        if let Some(state) = self.instances.get_mut(&instance) {
            state.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn set_looped(&mut self, instance: PlaybackId, looped: bool) {
        if let Some(state) = self.instances.get_mut(&instance) {
            state.looped = looped;
        }
    }

    fn play(&mut self, instance: PlaybackId) {
        if let Some(state) = self.instances.get_mut(&instance) {
            state.state = PlaybackState::Playing;
        }
    }

    fn dispose(&mut self, instance: PlaybackId) {
        if self.instances.remove(&instance).is_some() {
            self.disposed.push(instance);
        } else {
            warn!("Dispose of unknown playback instance {instance}");
        }
    }
}
