//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Frames a voice may go unclaimed before it is released (1 s at 60 Hz).
pub const DEFAULT_EXPIRE_FRAMES: u32 = 60;

/// Frames an orphaned voice takes to fade from full volume to silence.
pub const DEFAULT_FADE_OUT_FRAMES: f32 = 10.0;

/// Lowest duck-fade value. Ducking never fades all the way out.
pub const DEFAULT_DUCK_FLOOR: f32 = 0.4;

/// Seconds for duck-fade to travel the full 0-1 range.
pub const DEFAULT_SLOT_FADE_TIME: f32 = 0.5;

/// Simulation ticks per second.
pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Tunables for [`AmbientScheduler`](crate::scheduler::AmbientScheduler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Frames a voice may go unclaimed before release.
    pub expire_frames: u32,
    /// Frames for an orphaned voice to fade out.
    pub fade_out_frames: f32,
    /// Duck-fade floor (0.0-1.0).
    pub duck_floor: f32,
    /// Seconds for a full duck-fade sweep.
    pub slot_fade_time: f32,
    /// Simulation frame rate in Hz.
    pub frame_rate: f32,
    /// Global sound-effect volume (0.0-1.0).
    pub effect_volume: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expire_frames: DEFAULT_EXPIRE_FRAMES,
            fade_out_frames: DEFAULT_FADE_OUT_FRAMES,
            duck_floor: DEFAULT_DUCK_FLOOR,
            slot_fade_time: DEFAULT_SLOT_FADE_TIME,
            frame_rate: DEFAULT_FRAME_RATE,
            effect_volume: 1.0,
        }
    }
}

impl SchedulerConfig {
    /// Set the expiry threshold.
    #[must_use]
    pub const fn with_expire_frames(mut self, frames: u32) -> Self {
        self.expire_frames = frames;
        self
    }

    /// Set the orphan fade length.
    #[must_use]
    pub const fn with_fade_out_frames(mut self, frames: f32) -> Self {
        self.fade_out_frames = frames;
        self
    }

    /// Set the global effect volume.
    #[must_use]
    pub const fn with_effect_volume(mut self, volume: f32) -> Self {
        self.effect_volume = volume;
        self
    }

    /// Volume removed from an orphaned voice each frame.
    #[must_use]
    pub fn fade_out_step(&self) -> f32 {
        1.0 / self.fade_out_frames.max(1.0)
    }

    /// Duck-fade change per frame.
    #[must_use]
    pub fn duck_step(&self) -> f32 {
        1.0 / (self.slot_fade_time * self.frame_rate).max(1.0)
    }

    /// Clamp values to sensible ranges. Non-finite values fall back to
    /// their defaults.
    pub fn validate(&mut self) {
        finite_or(&mut self.fade_out_frames, DEFAULT_FADE_OUT_FRAMES);
        finite_or(&mut self.duck_floor, DEFAULT_DUCK_FLOOR);
        finite_or(&mut self.slot_fade_time, DEFAULT_SLOT_FADE_TIME);
        finite_or(&mut self.frame_rate, DEFAULT_FRAME_RATE);
        finite_or(&mut self.effect_volume, 1.0);

        self.expire_frames = self.expire_frames.clamp(1, 60 * 60);
        self.fade_out_frames = self.fade_out_frames.clamp(1.0, 600.0);
        self.duck_floor = self.duck_floor.clamp(0.0, 1.0);
        self.slot_fade_time = self.slot_fade_time.clamp(0.0, 10.0);
        self.frame_rate = self.frame_rate.clamp(1.0, 1000.0);
        self.effect_volume = self.effect_volume.clamp(0.0, 1.0);
    }
}

fn finite_or(value: &mut f32, default: f32) {
    if !value.is_finite() {
        *value = default;
    }
}
