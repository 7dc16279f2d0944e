//! Frame Generations
//!
//! Voice bookkeeping is double-buffered across frames:
//!
//! - **active**: voices carried over from the previous frame, with the
//!   emitter associations that were made for them. Matching reads this.
//! - **standby**: voices that survive into the next frame. Matching,
//!   expiry and spawning write this.
//!
//! [`FrameGenerations::advance_generation`] is the only transition: it
//! requires `active` to be fully drained, swaps the slots, and leaves an
//! empty standby behind. Voices move between slots by value, so a voice
//! can never be in both.

use ahash::AHashMap;
use ambience_common::{EmitterId, PlaybackId};

use crate::voice::Voice;

/// One generation of voices and their emitter associations.
#[derive(Debug, Default)]
pub struct GenerationSlot {
    /// Indexed by association. Claimed voices leave a hole so that the
    /// remaining indices stay valid until the slot is drained.
    voices: Vec<Option<Voice>>,
    associations: AHashMap<EmitterId, usize>,
}

impl GenerationSlot {
    /// Add a voice, optionally associated with the emitter that claimed it.
    pub fn insert(&mut self, voice: Voice, emitter: Option<EmitterId>) {
        let index = self.voices.len();
        self.voices.push(Some(voice));
        if let Some(emitter) = emitter {
            let previous = self.associations.insert(emitter, index);
            debug_assert!(previous.is_none(), "emitter {emitter:?} associated twice");
        }
    }

    /// Index of the voice associated with `emitter`.
    #[must_use]
    pub fn association(&self, emitter: EmitterId) -> Option<usize> {
        self.associations.get(&emitter).copied()
    }

    /// Voice at `index`, unless already taken.
    #[must_use]
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index).and_then(Option::as_ref)
    }

    /// Mutable voice at `index`, unless already taken.
    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index).and_then(Option::as_mut)
    }

    /// Remove the voice at `index`, leaving a hole.
    pub fn take(&mut self, index: usize) -> Option<Voice> {
        self.voices.get_mut(index).and_then(Option::take)
    }

    /// Drop every association. Voices stay.
    pub fn forget_associations(&mut self) {
        self.associations.clear();
    }

    /// Empty the slot, returning the voices nobody took, in slot order.
    pub fn drain_unclaimed(&mut self) -> Vec<Voice> {
        self.associations.clear();
        self.voices.drain(..).flatten().collect()
    }

    /// Live voices in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().flatten()
    }

    /// Emitters with an association, paired with their voice.
    pub fn associated(&self) -> impl Iterator<Item = (EmitterId, &Voice)> {
        self.associations
            .iter()
            .filter_map(|(&emitter, &index)| self.voice(index).map(|v| (emitter, v)))
    }

    /// Number of live voices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.voices.iter().flatten().count()
    }

    /// Whether the slot holds no voices and no associations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty() && self.associations.is_empty()
    }

    fn has_unique_instances(&self) -> bool {
        let mut ids: Vec<PlaybackId> = self.iter().map(Voice::instance).collect();
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        ids.len() == count
    }
}

/// The two generation slots and the transition between them.
#[derive(Debug, Default)]
pub struct FrameGenerations {
    /// Previous frame's voices, being matched against.
    pub active: GenerationSlot,
    /// Next frame's voices, being filled.
    pub standby: GenerationSlot,
}

impl FrameGenerations {
    /// Create empty generations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// End the frame: standby becomes active and a fresh standby is started.
    pub fn advance_generation(&mut self) {
        debug_assert!(self.active.is_empty(), "active generation not drained");
        debug_assert!(
            self.standby.has_unique_instances(),
            "voice carried into the next generation twice"
        );
        std::mem::swap(&mut self.active, &mut self.standby);
        self.standby.voices.clear();
        self.standby.associations.clear();
    }

    /// Every live voice in either slot.
    pub fn all_voices(&self) -> impl Iterator<Item = &Voice> {
        self.active.iter().chain(self.standby.iter())
    }
}
