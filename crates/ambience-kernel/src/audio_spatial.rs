//! Spatial Playback Parameters
//!
//! Maps an ambient emitter's world position to the fade, pitch and pan
//! that its voice should play with, or decides that it is inaudible.
//!
//! # Overview
//!
//! The computation runs in a fixed order and bails out as early as it can:
//! - **Global sounds**: a negative radius means the emitter is heard
//!   everywhere at full fade.
//! - **Camera projection**: the position is projected into 2-D audio space,
//!   which yields base pitch and pan and an on-screen fade.
//! - **Off-camera cutoff**: below [`MIN_AUDIBLE_FADE`] the emitter is dropped
//!   before any listener is looked at.
//! - **Listener distance**: the closest local listener must be within the
//!   radius; fade then rolls off linearly with distance.
//!
//! # Example
//!
//! ```
//! use ambience_common::Position;
//! use ambience_kernel::audio_spatial::{
//!     compute_playback, AudioCamera, ListenerWorld, LocalListeners, PlaybackQuery,
//! };
//! use glam::Vec2;
//!
//! struct Centered;
//! impl AudioCamera for Centered {
//!     fn world_to_audio(&self, _position: Position) -> Vec2 {
//!         Vec2::ZERO
//!     }
//! }
//!
//! struct OnePlayer;
//! impl ListenerWorld for OnePlayer {
//!     fn max_listeners(&self) -> usize {
//!         1
//!     }
//!     fn listener_position(&self, _index: usize) -> Option<Position> {
//!         Some(Position::ZERO)
//!     }
//! }
//!
//! let query = PlaybackQuery::point(Position::new(50, 0, 0), 100).with_volume(0.8);
//! let fpp = compute_playback(&query, &Centered, &OnePlayer, LocalListeners::single(0))
//!     .expect("emitter is inside its radius");
//!
//! assert!((fpp.fade - 0.4).abs() < 1e-6);
//! ```

use ambience_common::{Aabb, Position};
use glam::Vec2;

/// Fade below which a positional emitter is treated as off-camera.
pub const MIN_AUDIBLE_FADE: f32 = 0.001;

/// Audio-space distance past the screen edge over which the on-screen fade
/// falls from 1 to 0.
pub const OFFSCREEN_FALLOFF: f32 = 1.0;

/// Projection from world space into 2-D audio space.
///
/// The returned `x` drives pan and `y` drives pitch. Both lie in
/// `[-1, 1]` while the position is on screen.
pub trait AudioCamera {
    /// Project a world position into audio space.
    fn world_to_audio(&self, position: Position) -> Vec2;
}

/// The players that can hear ambient sound.
pub trait ListenerWorld {
    /// Upper bound on listener indices.
    fn max_listeners(&self) -> usize;

    /// Audio position of a listener, if it currently has one.
    fn listener_position(&self, index: usize) -> Option<Position>;

    /// Whether ambient audio should reach these listeners right now
    /// (false while a local menu or pause screen is up).
    fn is_receiving_ambient_audio(&self, local: LocalListeners) -> bool {
        let _ = local;
        true
    }
}

/// Bitmask of the listeners that are interactive on this machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LocalListeners(u32);

impl LocalListeners {
    /// No local listeners.
    pub const NONE: Self = Self(0);

    /// Create from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask containing only `index`.
    #[must_use]
    pub const fn single(index: usize) -> Self {
        if index < 32 {
            Self(1 << index)
        } else {
            Self::NONE
        }
    }

    /// Mask with this listener added.
    #[must_use]
    pub const fn with(self, index: usize) -> Self {
        Self(self.0 | Self::single(index).0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether the mask is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `index` is set.
    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    /// Iterate the set indices below `max`.
    pub fn iter(self, max: usize) -> impl Iterator<Item = usize> {
        (0..max.min(32)).filter(move |&i| self.contains(i))
    }
}

/// Pitch and pan derived from a projected position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchPan {
    /// Pitch offset (-1.0 = octave down, 0.0 = unchanged, 1.0 = octave up).
    pub pitch: f32,
    /// Pan position (-1.0 = full left, 0.0 = center, 1.0 = full right).
    pub pan: f32,
}

impl PitchPan {
    /// Derive from an audio-space position, clamping both axes on screen.
    #[must_use]
    pub fn from_audio_position(audio: Vec2) -> Self {
        Self {
            pitch: audio.y.clamp(-1.0, 1.0),
            pan: audio.x.clamp(-1.0, 1.0),
        }
    }
}

/// Final playback parameters for one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePitchPan {
    /// Volume multiplier (0.0-1.0).
    pub fade: f32,
    /// Pitch offset (-1.0-1.0).
    pub pitch: f32,
    /// Pan position (-1.0-1.0).
    pub pan: f32,
}

impl Default for FadePitchPan {
    fn default() -> Self {
        Self::global(1.0)
    }
}

impl FadePitchPan {
    /// Non-positional parameters at the given fade.
    #[must_use]
    pub const fn global(fade: f32) -> Self {
        Self {
            fade,
            pitch: 0.0,
            pan: 0.0,
        }
    }

    /// Parameters for a projected audio-space position.
    ///
    /// Fade is 1.0 on screen and falls off linearly over
    /// [`OFFSCREEN_FALLOFF`] past the farthest screen edge.
    #[must_use]
    pub fn from_audio_position(audio: Vec2) -> Self {
        let overshoot = (audio.x.abs() - 1.0).max(audio.y.abs() - 1.0).max(0.0);
        let PitchPan { pitch, pan } = PitchPan::from_audio_position(audio);
        Self {
            fade: (1.0 - overshoot / OFFSCREEN_FALLOFF).clamp(0.0, 1.0),
            pitch,
            pan,
        }
    }

    /// Same parameters with fade scaled by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            fade: self.fade * factor,
            ..self
        }
    }
}

/// Everything about an emitter that playback parameters depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackQuery {
    /// Spatial volume of the emitter, if it has one.
    pub bounds: Option<Aabb>,
    /// Emitter position.
    pub position: Position,
    /// Emitter facing.
    pub facing_left: bool,
    /// Hearing radius in world units; negative for global sounds.
    pub radius: i32,
    /// Volume multiplier.
    pub volume: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Pan multiplier.
    pub pan: f32,
}

impl PlaybackQuery {
    /// A point emitter with unit multipliers.
    #[must_use]
    pub const fn point(position: Position, radius: i32) -> Self {
        Self {
            bounds: None,
            position,
            facing_left: false,
            radius,
            volume: 1.0,
            pitch: 1.0,
            pan: 1.0,
        }
    }

    /// Set the bounding volume.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Set the volume multiplier.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the pitch and pan multipliers.
    #[must_use]
    pub const fn with_pitch_pan(mut self, pitch: f32, pan: f32) -> Self {
        self.pitch = pitch;
        self.pan = pan;
        self
    }

    /// Whether this emitter ignores position entirely.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.radius < 0
    }
}

/// Compute playback parameters for an emitter.
///
/// Returns `None` when the emitter is inaudible. Pure: identical inputs
/// always produce identical outputs.
#[must_use]
pub fn compute_playback<C, W>(
    query: &PlaybackQuery,
    camera: &C,
    world: &W,
    local: LocalListeners,
) -> Option<FadePitchPan>
where
    C: AudioCamera + ?Sized,
    W: ListenerWorld + ?Sized,
{
    if query.is_global() {
        return Some(FadePitchPan::global(1.0));
    }

    let base = FadePitchPan::from_audio_position(camera.world_to_audio(query.position));
    let fpp = FadePitchPan {
        fade: base.fade * query.volume,
        pitch: base.pitch * query.pitch,
        pan: base.pan * query.pan,
    };

    // Far off-camera: skip the listener scan
    if fpp.fade < MIN_AUDIBLE_FADE {
        return None;
    }

    if local.is_empty() {
        return None;
    }

    let distance_squared = nearest_listener_distance_squared(query, world, local)?;
    let radius = i64::from(query.radius);
    if distance_squared > radius * radius {
        return None;
    }

    Some(fpp.scaled(listener_fade(distance_squared, query.radius)))
}

/// Linear roll-off: 1.0 at the listener, 0.0 at `radius`.
#[must_use]
pub fn listener_fade(distance_squared: i64, radius: i32) -> f32 {
    if radius <= 0 {
        return 0.0;
    }
    let distance = (distance_squared as f64).sqrt() as f32;
    (1.0 - distance / radius as f32).clamp(0.0, 1.0)
}

/// Smallest squared distance from the emitter to any local listener that
/// currently has a position.
///
/// Emitters with bounds measure from the box surface, point emitters from
/// their position.
#[must_use]
pub fn nearest_listener_distance_squared<W>(
    query: &PlaybackQuery,
    world: &W,
    local: LocalListeners,
) -> Option<i64>
where
    W: ListenerWorld + ?Sized,
{
    local
        .iter(world.max_listeners())
        .filter_map(|i| world.listener_position(i))
        .map(|listener| match query.bounds {
            Some(bounds) => bounds.distance_squared_to(listener),
            None => query.position.distance_squared(listener),
        })
        .min()
}
