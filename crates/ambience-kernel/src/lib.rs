//! # Ambience Kernel
//!
//! Per-frame voice scheduling for looping ambient sounds.
//!
//! This crate provides:
//! - Spatial playback parameters (fade, pitch, pan) for emitters
//! - A playback backend seam with an in-memory implementation
//! - Double-buffered voice generations
//! - The ambient scheduler that matches emitters to voices each frame
//! - Optional real output through rodio (feature `rodio`)
//!
//! ## Architecture
//!
//! The owning simulation submits every audible emitter for a frame, then
//! calls [`AmbientScheduler::update`] once. The scheduler tries to keep
//! each emitter on the voice it had last frame, then hands leftover voices
//! to the nearest emitter playing the same sound, fades out voices nobody
//! claimed, and finally spawns voices for whoever is left.
//!
//! ## Determinism
//!
//! Scheduling decisions depend only on submissions, configuration and
//! backend availability. Side effects on the audio device are never rolled
//! back; [`AmbientScheduler::reset`] is the hook for simulations that
//! rewind.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ambient;
pub mod audio_backend;
#[cfg(feature = "rodio")]
pub mod audio_device;
pub mod audio_resource;
pub mod audio_spatial;
pub mod config;
pub mod generation;
pub mod scheduler;
pub mod voice;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ambient::*;
    pub use crate::audio_backend::*;
    #[cfg(feature = "rodio")]
    pub use crate::audio_device::*;
    pub use crate::audio_resource::*;
    pub use crate::audio_spatial::*;
    pub use crate::config::*;
    pub use crate::generation::*;
    pub use crate::scheduler::*;
    pub use crate::voice::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use ambience_common::{EmitterId, Position, SoundId};

    struct Nobody;

    impl ListenerWorld for Nobody {
        fn max_listeners(&self) -> usize {
            0
        }

        fn listener_position(&self, _index: usize) -> Option<Position> {
            None
        }
    }

    #[test]
    fn test_prelude_exports_scheduler_surface() {
        let mut scheduler = AmbientScheduler::new(SchedulerConfig::default());
        let mut backend = VirtualBackend::new();

        assert!(scheduler.submit_playback(
            EmitterId::new(1),
            SoundId::new(1),
            Position::ZERO,
            FadePitchPan::global(1.0),
        ));

        let stats = scheduler.update(&mut backend, &Nobody, LocalListeners::NONE, false);
        assert_eq!(stats.spawned, 1);
        assert_eq!(scheduler.voice_count(), 1);
    }

    #[test]
    fn test_default_config_matches_constants() {
        let config = SchedulerConfig::default();
        assert_eq!(config.expire_frames, DEFAULT_EXPIRE_FRAMES);
        assert!((config.duck_floor - DEFAULT_DUCK_FLOOR).abs() < f32::EPSILON);
    }
}
