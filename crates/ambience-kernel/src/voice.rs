//! Voices: live playback instances owned by the scheduler.

use ambience_common::{PlaybackId, Position, SoundId};
use tracing::debug;

use crate::audio_backend::PlaybackBackend;

/// Lifecycle of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    /// Playing and reusable for its sound.
    #[default]
    Alive,
    /// Lost its emitter to a sound change or refused continuity. Never
    /// reused; released when the expiry pass next sees it.
    ForcedExpiring,
    /// Instance disposed. Only seen transiently before the voice is dropped.
    Released,
}

/// One live playback instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    sound: SoundId,
    instance: PlaybackId,
    position: Position,
    expiry: u32,
    state: VoiceState,
}

impl Voice {
    /// A freshly spawned voice.
    #[must_use]
    pub const fn new(sound: SoundId, instance: PlaybackId, position: Position) -> Self {
        Self {
            sound,
            instance,
            position,
            expiry: 0,
            state: VoiceState::Alive,
        }
    }

    /// Sound bound at spawn.
    #[must_use]
    pub const fn sound(&self) -> SoundId {
        self.sound
    }

    /// Playback instance handle.
    #[must_use]
    pub const fn instance(&self) -> PlaybackId {
        self.instance
    }

    /// Position of the emitter that last claimed this voice.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Frames since last claimed.
    #[must_use]
    pub const fn expiry(&self) -> u32 {
        self.expiry
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> VoiceState {
        self.state
    }

    /// Whether an emitter playing `sound` may take over this voice.
    #[must_use]
    pub fn is_reusable_for(&self, sound: SoundId) -> bool {
        self.state == VoiceState::Alive && self.sound == sound
    }

    /// Claim for an emitter this frame.
    pub fn claim(&mut self, position: Position) {
        debug_assert_eq!(self.state, VoiceState::Alive, "claimed a non-reusable voice");
        self.position = position;
        self.expiry = 0;
    }

    /// Disqualify from reuse and schedule release.
    pub fn force_expire(&mut self, threshold: u32) {
        if self.state == VoiceState::Alive {
            self.state = VoiceState::ForcedExpiring;
            self.expiry = self.expiry.max(threshold);
        }
    }

    /// Count one more unclaimed frame. Returns the new counter.
    pub fn age(&mut self) -> u32 {
        self.expiry = self.expiry.saturating_add(1);
        self.expiry
    }

    /// Stop and dispose the instance.
    pub fn release<B: PlaybackBackend + ?Sized>(&mut self, backend: &mut B) {
        debug_assert_ne!(self.state, VoiceState::Released, "voice released twice");
        if self.state == VoiceState::Released {
            return;
        }
        debug!(
            "Releasing voice {} ({:?}, unclaimed for {} frames)",
            self.instance, self.state, self.expiry
        );
        backend.dispose(self.instance);
        self.state = VoiceState::Released;
    }
}
