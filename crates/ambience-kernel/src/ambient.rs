//! Ambient emitters.
//!
//! An emitter is anything in the world that may produce a looping ambient
//! sound this frame: a waterfall, a crowd, a torch. The scheduler reads
//! emitters through [`AmbientSource`] so that game objects can expose their
//! own fields without copying them into a new struct each frame.

use ambience_common::{Aabb, EmitterId, Position, SoundId};
use serde::{Deserialize, Serialize};

use crate::audio_spatial::PlaybackQuery;

/// What an emitter plays and how loudly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientSound {
    /// Sound resource; `None` when the asset is missing.
    pub sound: Option<SoundId>,
    /// Hearing radius in world units. Negative for global sounds.
    pub radius: i32,
    /// Volume multiplier.
    pub volume: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Pan multiplier.
    pub pan: f32,
}

impl AmbientSound {
    /// A positional sound with unit multipliers.
    #[must_use]
    pub const fn new(sound: SoundId, radius: i32) -> Self {
        Self {
            sound: Some(sound),
            radius,
            volume: 1.0,
            pitch: 1.0,
            pan: 1.0,
        }
    }

    /// A sound heard everywhere regardless of position.
    #[must_use]
    pub const fn global(sound: SoundId) -> Self {
        Self::new(sound, -1)
    }

    /// Set the volume multiplier.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set pitch and pan multipliers.
    #[must_use]
    pub const fn with_pitch_pan(mut self, pitch: f32, pan: f32) -> Self {
        self.pitch = pitch;
        self.pan = pan;
        self
    }
}

/// Read-only view of an emitter, sampled once per frame.
pub trait AmbientSource {
    /// Stable identity across frames.
    fn emitter_id(&self) -> EmitterId;

    /// Spatial volume, for emitters bigger than a point.
    fn bounds(&self) -> Option<Aabb> {
        None
    }

    /// Current position.
    fn position(&self) -> Position;

    /// Current facing.
    fn facing_left(&self) -> bool {
        false
    }

    /// Sound to play, if any.
    fn ambient_sound(&self) -> Option<AmbientSound>;

    /// The resource to play and the spatial query for it, or `None` when
    /// there is nothing to play.
    fn playback_query(&self) -> Option<(SoundId, PlaybackQuery)> {
        let ambient = self.ambient_sound()?;
        let sound = ambient.sound?;
        Some((
            sound,
            PlaybackQuery {
                bounds: self.bounds(),
                position: self.position(),
                facing_left: self.facing_left(),
                radius: ambient.radius,
                volume: ambient.volume,
                pitch: ambient.pitch,
                pan: ambient.pan,
            },
        ))
    }
}

/// Plain-data emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientEmitter {
    /// Stable identity.
    pub id: EmitterId,
    /// Optional spatial volume.
    pub bounds: Option<Aabb>,
    /// Position.
    pub position: Position,
    /// Facing.
    pub facing_left: bool,
    /// Sound descriptor.
    pub sound: Option<AmbientSound>,
}

impl AmbientEmitter {
    /// A point emitter.
    #[must_use]
    pub const fn new(id: EmitterId, position: Position, sound: AmbientSound) -> Self {
        Self {
            id,
            bounds: None,
            position,
            facing_left: false,
            sound: Some(sound),
        }
    }

    /// Give the emitter a bounding volume.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

impl AmbientSource for AmbientEmitter {
    fn emitter_id(&self) -> EmitterId {
        self.id
    }

    fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    fn position(&self) -> Position {
        self.position
    }

    fn facing_left(&self) -> bool {
        self.facing_left
    }

    fn ambient_sound(&self) -> Option<AmbientSound> {
        self.sound
    }
}
