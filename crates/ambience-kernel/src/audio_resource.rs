//! Audio Resource Management
//!
//! Provides the resource side of ambient playback:
//! - `PlaybackIdGenerator`: Unique handles for playback instances
//! - `SoundClip`: Decoded samples for one sound resource
//! - `SoundBank`: Name and ID lookup for registered clips
//!
//! Clips are kept in memory and shared between instances; every voice that
//! plays a clip reads from the same `Arc` of samples.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use ambience_common::{PlaybackId, SoundId};
use tracing::debug;

/// Default sample rate for generated clips.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Generates unique playback handles.
#[derive(Debug)]
pub struct PlaybackIdGenerator {
    next_id: AtomicU64,
}

impl Default for PlaybackIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackIdGenerator {
    /// Create a new generator. The first handle is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Generate a new unique handle.
    pub fn next(&self) -> PlaybackId {
        PlaybackId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Playback state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Created but not started.
    #[default]
    Stopped,
    /// Started and audible.
    Playing,
}

impl PlaybackState {
    /// Check if currently playing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Decoded samples for one sound resource.
#[derive(Debug, Clone)]
pub struct SoundClip {
    /// Resource handle.
    pub id: SoundId,
    /// Human-readable name.
    pub name: String,
    /// Interleaved f32 samples.
    pub samples: Arc<Vec<f32>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl SoundClip {
    /// Create a clip from interleaved samples.
    #[must_use]
    pub fn new(
        id: SoundId,
        name: impl Into<String>,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            samples: Arc::new(samples),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// A mono sine tone, loopable without a click when `duration` holds a
    /// whole number of periods.
    #[must_use]
    pub fn tone(id: SoundId, name: impl Into<String>, frequency: f32, duration: Duration) -> Self {
        let count = (duration.as_secs_f64() * f64::from(DEFAULT_SAMPLE_RATE)) as usize;
        let step = TAU * frequency / DEFAULT_SAMPLE_RATE as f32;
        let samples = (0..count).map(|i| (i as f32 * step).sin() * 0.5).collect();
        Self::new(id, name, samples, DEFAULT_SAMPLE_RATE, 1)
    }

    /// Length of the clip.
    #[must_use]
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }
}

/// Registry of sound clips by ID and name.
#[derive(Debug, Default)]
pub struct SoundBank {
    clips: AHashMap<SoundId, SoundClip>,
    by_name: AHashMap<String, SoundId>,
    next_id: u32,
}

impl SoundBank {
    /// Create an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sine tone under `name`, returning its ID.
    pub fn add_tone(&mut self, name: &str, frequency: f32, duration: Duration) -> SoundId {
        let id = self.allocate_id();
        self.insert(SoundClip::tone(id, name, frequency, duration));
        id
    }

    /// Reserve a fresh ID for a clip built elsewhere.
    pub fn allocate_id(&mut self) -> SoundId {
        self.next_id += 1;
        SoundId::new(self.next_id)
    }

    /// Insert a clip, replacing any clip with the same ID or name.
    pub fn insert(&mut self, clip: SoundClip) {
        debug!(
            "Registered sound '{}' as {:?} ({:.2}s)",
            clip.name,
            clip.id,
            clip.duration().as_secs_f32()
        );
        self.by_name.insert(clip.name.clone(), clip.id);
        self.clips.insert(clip.id, clip);
    }

    /// Look up a clip.
    #[must_use]
    pub fn get(&self, id: SoundId) -> Option<&SoundClip> {
        self.clips.get(&id)
    }

    /// Look up an ID by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SoundId> {
        self.by_name.get(name).copied()
    }

    /// All registered IDs.
    pub fn ids(&self) -> impl Iterator<Item = SoundId> + '_ {
        self.clips.keys().copied()
    }

    /// Number of registered clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether the bank is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
