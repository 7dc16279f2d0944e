//! Ambient Sound Scheduler
//!
//! Assigns a small pool of looping voices to a changing set of ambient
//! emitters, once per simulation frame.
//!
//! # Frame flow
//!
//! ```text
//!  submit() x N ──► pending
//!                      │
//!  update() ───────────┼─► 1. continuity   same emitter, same sound as last frame
//!                      ├─► 2. nearest      closest unclaimed voice with the same sound
//!                      ├─► 3. expiry       age, fade and release voices nobody claimed
//!                      ├─► 4. spawn        new voice for whatever is still pending
//!                      └─► advance_generation()
//! ```
//!
//! Submission and update are strictly phase-separated: submit every
//! emitter for the frame first, then call [`AmbientScheduler::update`]
//! exactly once.
//!
//! # Rollback
//!
//! Scheduling decisions are deterministic given the same submissions and
//! backend state. When the owning simulation rewinds or resyncs, emitter
//! identities may not survive, so [`AmbientScheduler::reset`] forgets every
//! emitter association while leaving voices playing. Those voices are then
//! either picked up again by the nearest-distance pass or fade out as
//! orphans, so a rollback never produces an audible cut.

use ambience_common::{EmitterId, PlaybackId, Position, SoundId};
use tracing::{debug, trace, warn};

use crate::ambient::AmbientSource;
use crate::audio_backend::PlaybackBackend;
use crate::audio_spatial::{compute_playback, AudioCamera, FadePitchPan, ListenerWorld, LocalListeners};
use crate::config::SchedulerConfig;
use crate::generation::FrameGenerations;
use crate::voice::Voice;

/// An audible emitter waiting for a voice this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingEmitter {
    /// Emitter identity.
    pub emitter: EmitterId,
    /// Sound it wants to play.
    pub sound: SoundId,
    /// Position this frame.
    pub position: Position,
    /// Computed playback parameters (before duck-fade).
    pub playback: FadePitchPan,
}

/// What one [`AmbientScheduler::update`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Device was unavailable; nothing happened.
    pub idle: bool,
    /// Emitters that kept last frame's voice.
    pub continued: usize,
    /// Emitters that took over another voice with the same sound.
    pub reassigned: usize,
    /// Voices force-expired because continuity was refused.
    pub forced: usize,
    /// Unclaimed voices still fading out.
    pub orphaned: usize,
    /// Voices released this frame.
    pub released: usize,
    /// New voices started.
    pub spawned: usize,
    /// Emitters that could not get a voice.
    pub dropped: usize,
}

/// Per-frame voice allocator for ambient emitters.
#[derive(Debug)]
pub struct AmbientScheduler {
    config: SchedulerConfig,
    generations: FrameGenerations,
    /// Not ordered: matched entries are swap-removed.
    pending: Vec<PendingEmitter>,
    duck_fade: f32,
    frame: u64,
    resets: u64,
}

impl Default for AmbientScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl AmbientScheduler {
    /// Create a scheduler with no voices.
    #[must_use]
    pub fn new(mut config: SchedulerConfig) -> Self {
        config.validate();
        debug!("Created ambient scheduler: {config:?}");
        Self {
            config,
            generations: FrameGenerations::new(),
            pending: Vec::new(),
            duck_fade: 1.0,
            frame: 0,
            resets: 0,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Offer an emitter for this frame.
    ///
    /// Emitters with nothing to play, or that are inaudible to every local
    /// listener, are dropped here. Returns whether the emitter is pending.
    pub fn submit<S, C, W>(
        &mut self,
        source: &S,
        camera: &C,
        world: &W,
        local: LocalListeners,
    ) -> bool
    where
        S: AmbientSource + ?Sized,
        C: AudioCamera + ?Sized,
        W: ListenerWorld + ?Sized,
    {
        if !world.is_receiving_ambient_audio(local) {
            return false;
        }

        let Some((sound, query)) = source.playback_query() else {
            return false;
        };

        match compute_playback(&query, camera, world, local) {
            Some(playback) => {
                self.submit_playback(source.emitter_id(), sound, query.position, playback)
            },
            None => false,
        }
    }

    /// Queue an emitter whose playback parameters are already known.
    ///
    /// A second submission of the same emitter in one frame is ignored.
    pub fn submit_playback(
        &mut self,
        emitter: EmitterId,
        sound: SoundId,
        position: Position,
        playback: FadePitchPan,
    ) -> bool {
        if self.pending.iter().any(|p| p.emitter == emitter) {
            warn!("Emitter {emitter:?} submitted twice in frame {}", self.frame);
            return false;
        }

        self.pending.push(PendingEmitter {
            emitter,
            sound,
            position,
            playback,
        });
        true
    }

    /// Run the frame: match, age, spawn, and swap generations.
    pub fn update<B, W>(
        &mut self,
        backend: &mut B,
        world: &W,
        local: LocalListeners,
        ducking: bool,
    ) -> FrameStats
    where
        B: PlaybackBackend + ?Sized,
        W: ListenerWorld + ?Sized,
    {
        if !backend.is_available() {
            self.pending.clear();
            return FrameStats {
                idle: true,
                ..FrameStats::default()
            };
        }

        self.frame += 1;
        self.step_duck_fade(ducking);

        let mut stats = FrameStats::default();
        let receiving = world.is_receiving_ambient_audio(local);

        self.match_continuity(backend, receiving, &mut stats);
        let unclaimed = self.match_nearest(backend, &mut stats);
        self.expire_unclaimed(backend, unclaimed, &mut stats);
        self.spawn_pending(backend, &mut stats);

        debug_assert!(self.pending.is_empty());
        self.generations.advance_generation();

        trace!(frame = self.frame, duck_fade = self.duck_fade, ?stats, "Ambient frame");
        stats
    }

    /// Forget every emitter association after the owning simulation state
    /// was replaced (rollback, resync, level reload). Voices keep playing.
    pub fn reset(&mut self) {
        self.generations.active.forget_associations();
        self.pending.clear();
        self.resets += 1;
        debug!(
            "Ambient scheduler reset #{}; {} voices orphaned",
            self.resets,
            self.generations.active.len()
        );
    }

    /// Dispose every voice. The scheduler is empty afterwards.
    pub fn shutdown<B: PlaybackBackend + ?Sized>(&mut self, backend: &mut B) {
        self.pending.clear();
        let mut count = 0;
        for slot in [&mut self.generations.active, &mut self.generations.standby] {
            for mut voice in slot.drain_unclaimed() {
                voice.release(backend);
                count += 1;
            }
        }
        debug!("Ambient scheduler shut down; released {count} voices");
    }

    // ============================================
    // Passes
    // ============================================

    /// Applied volume multiplier for this frame.
    fn output_gain(&self) -> f32 {
        self.duck_fade * self.config.effect_volume
    }

    fn step_duck_fade(&mut self, ducking: bool) {
        let step = self.config.duck_step();
        let delta = if ducking { -step } else { step };
        self.duck_fade = (self.duck_fade + delta).clamp(self.config.duck_floor, 1.0);
    }

    /// First pass: an emitter keeps its voice if it still plays the same
    /// sound. Anything else force-expires the old voice.
    fn match_continuity<B>(&mut self, backend: &mut B, receiving: bool, stats: &mut FrameStats)
    where
        B: PlaybackBackend + ?Sized,
    {
        let gain = self.output_gain();
        let threshold = self.config.expire_frames;
        let FrameGenerations { active, standby } = &mut self.generations;

        let mut i = 0;
        while i < self.pending.len() {
            let pending = self.pending[i];
            let Some(index) = active.association(pending.emitter) else {
                i += 1;
                continue;
            };

            let keep = receiving && active.voice(index).is_some_and(|v| v.is_reusable_for(pending.sound));
            if keep {
                if let Some(mut voice) = active.take(index) {
                    apply_claim(backend, &mut voice, &pending, gain);
                    standby.insert(voice, Some(pending.emitter));
                    self.pending.swap_remove(i);
                    stats.continued += 1;
                    continue;
                }
            } else if let Some(voice) = active.voice_mut(index) {
                voice.force_expire(threshold);
                stats.forced += 1;
            }

            i += 1;
        }
    }

    /// Second pass: hand each remaining emitter the closest unclaimed voice
    /// bound to the same sound. Returns the voices still unclaimed.
    fn match_nearest<B>(&mut self, backend: &mut B, stats: &mut FrameStats) -> Vec<Voice>
    where
        B: PlaybackBackend + ?Sized,
    {
        let gain = self.output_gain();
        let FrameGenerations { active, standby } = &mut self.generations;

        // Not ordered: claimed voices are swap-removed
        let mut unclaimed = active.drain_unclaimed();

        let mut i = 0;
        while i < self.pending.len() {
            let pending = self.pending[i];
            let nearest = unclaimed
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_reusable_for(pending.sound))
                .min_by_key(|(_, v)| v.position().distance_squared(pending.position))
                .map(|(j, _)| j);

            match nearest {
                Some(j) => {
                    let mut voice = unclaimed.swap_remove(j);
                    apply_claim(backend, &mut voice, &pending, gain);
                    standby.insert(voice, Some(pending.emitter));
                    self.pending.swap_remove(i);
                    stats.reassigned += 1;
                },
                None => i += 1,
            }
        }

        unclaimed
    }

    /// Age every unclaimed voice; release the expired, fade the rest.
    fn expire_unclaimed<B>(&mut self, backend: &mut B, unclaimed: Vec<Voice>, stats: &mut FrameStats)
    where
        B: PlaybackBackend + ?Sized,
    {
        let threshold = self.config.expire_frames;
        let step = self.config.fade_out_step();

        for mut voice in unclaimed {
            if voice.age() > threshold {
                voice.release(backend);
                stats.released += 1;
            } else {
                let instance = voice.instance();
                let volume = backend.volume(instance);
                backend.set_volume(instance, (volume - step).max(0.0));
                self.generations.standby.insert(voice, None);
                stats.orphaned += 1;
            }
        }
    }

    /// Last pass: start a new looping voice for every emitter still waiting.
    fn spawn_pending<B>(&mut self, backend: &mut B, stats: &mut FrameStats)
    where
        B: PlaybackBackend + ?Sized,
    {
        let gain = self.output_gain();

        for pending in self.pending.drain(..) {
            let instance = match backend.create_instance(pending.sound) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!("No voice for emitter {:?}: {e}", pending.emitter);
                    stats.dropped += 1;
                    continue;
                },
            };

            let fpp = pending.playback.scaled(gain);
            backend.apply_fade_pitch_pan(instance, fpp.fade, fpp.pitch, fpp.pan);
            backend.set_looped(instance, true);
            backend.play(instance);

            debug!(
                "Spawned voice {instance} for emitter {:?} ({:?})",
                pending.emitter, pending.sound
            );
            self.generations
                .standby
                .insert(Voice::new(pending.sound, instance, pending.position), Some(pending.emitter));
            stats.spawned += 1;
        }
    }

    // ============================================
    // Introspection
    // ============================================

    /// Live voices.
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.generations.active.len()
    }

    /// Emitters waiting for the next update.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Current duck-fade multiplier.
    #[must_use]
    pub const fn duck_fade(&self) -> f32 {
        self.duck_fade
    }

    /// Frames run so far (idle frames excluded).
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Playback instance currently associated with `emitter`.
    #[must_use]
    pub fn voice_for(&self, emitter: EmitterId) -> Option<PlaybackId> {
        let active = &self.generations.active;
        active
            .association(emitter)
            .and_then(|index| active.voice(index))
            .map(Voice::instance)
    }

    /// Every live voice.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.generations.all_voices()
    }
}

/// Point a voice at its new emitter and push the frame's parameters.
fn apply_claim<B>(backend: &mut B, voice: &mut Voice, pending: &PendingEmitter, gain: f32)
where
    B: PlaybackBackend + ?Sized,
{
    let fpp = pending.playback.scaled(gain);
    backend.apply_fade_pitch_pan(voice.instance(), fpp.fade, fpp.pitch, fpp.pan);
    voice.claim(pending.position);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::{AmbientEmitter, AmbientSound};
    use crate::audio_backend::VirtualBackend;
    use crate::config::DEFAULT_EXPIRE_FRAMES;
    use glam::Vec2;

    const WIND: SoundId = SoundId::new(1);
    const RIVER: SoundId = SoundId::new(2);

    struct FixedCamera;

    impl AudioCamera for FixedCamera {
        fn world_to_audio(&self, _position: Position) -> Vec2 {
            Vec2::ZERO
        }
    }

    struct World {
        listener: Option<Position>,
        receiving: bool,
    }

    impl World {
        fn at_origin() -> Self {
            Self {
                listener: Some(Position::ZERO),
                receiving: true,
            }
        }
    }

    impl ListenerWorld for World {
        fn max_listeners(&self) -> usize {
            1
        }

        fn listener_position(&self, _index: usize) -> Option<Position> {
            self.listener
        }

        fn is_receiving_ambient_audio(&self, _local: LocalListeners) -> bool {
            self.receiving
        }
    }

    const LOCAL: LocalListeners = LocalListeners::single(0);

    fn emitter(id: u64, x: i32, sound: SoundId) -> AmbientEmitter {
        AmbientEmitter::new(EmitterId::new(id), Position::new(x, 0, 0), AmbientSound::new(sound, 1_000))
    }

    struct Harness {
        scheduler: AmbientScheduler,
        backend: VirtualBackend,
        world: World,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scheduler: AmbientScheduler::default(),
                backend: VirtualBackend::new(),
                world: World::at_origin(),
            }
        }

        fn frame(&mut self, emitters: &[AmbientEmitter]) -> FrameStats {
            for e in emitters {
                self.scheduler.submit(e, &FixedCamera, &self.world, LOCAL);
            }
            self.scheduler
                .update(&mut self.backend, &self.world, LOCAL, false)
        }

        fn voice(&self, emitter: u64) -> PlaybackId {
            self.scheduler
                .voice_for(EmitterId::new(emitter))
                .expect("emitter has a voice")
        }

        fn volume(&self, id: PlaybackId) -> f32 {
            self.backend.instance(id).map_or(-1.0, |i| i.volume)
        }
    }

    #[test]
    fn test_spawn_starts_looping_voice() {
        let mut h = Harness::new();
        let stats = h.frame(&[emitter(1, 500, WIND)]);

        assert_eq!(stats.spawned, 1);
        let id = h.voice(1);
        let inst = h.backend.instance(id).expect("live instance");
        assert!(inst.looped);
        assert!(inst.state.is_active());
        assert_eq!(inst.sound, WIND);
        assert!((inst.volume - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_continuity_keeps_instance() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);
        let first = h.voice(1);

        for x in [10, 20, 30] {
            let stats = h.frame(&[emitter(1, x, WIND)]);
            assert_eq!(stats.continued, 1);
            assert_eq!(stats.spawned, 0);
            assert_eq!(h.voice(1), first);
        }
        assert_eq!(h.backend.created_count(), 1);
    }

    #[test]
    fn test_continuity_is_by_identity_not_value() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 100, WIND), emitter(2, 100, WIND)]);
        let a = h.voice(1);
        let b = h.voice(2);
        assert_ne!(a, b);

        h.frame(&[emitter(2, 100, WIND), emitter(1, 100, WIND)]);
        assert_eq!(h.voice(1), a);
        assert_eq!(h.voice(2), b);
    }

    #[test]
    fn test_resource_change_forces_new_voice() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);
        h.frame(&[emitter(1, 0, WIND)]);
        let old = h.voice(1);

        let stats = h.frame(&[emitter(1, 0, RIVER)]);
        assert_eq!(stats.forced, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.spawned, 1);

        let new = h.voice(1);
        assert_ne!(new, old);
        assert!(h.backend.instance(old).is_none());
        assert_eq!(h.backend.disposed(), &[old]);
        assert_eq!(h.backend.instance(new).map(|i| i.sound), Some(RIVER));
    }

    #[test]
    fn test_resource_change_never_reuses_old_voice_via_distance() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND), emitter(2, 900, RIVER)]);
        let wind_voice = h.voice(1);

        // Emitter 1 switches to RIVER while a RIVER emitter exists elsewhere;
        // emitter 3 plays WIND right next to the old WIND voice.
        let stats = h.frame(&[emitter(1, 0, RIVER), emitter(2, 900, RIVER), emitter(3, 0, WIND)]);

        assert_eq!(stats.forced, 1);
        assert_ne!(h.voice(3), wind_voice);
        assert!(h.backend.instance(wind_voice).is_none());
    }

    #[test]
    fn test_nearest_voice_is_reused() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 100, WIND), emitter(2, 400, WIND)]);
        let near = h.voice(1);
        let far = h.voice(2);

        // New identity close to where emitter 1 was
        let stats = h.frame(&[emitter(3, 120, WIND)]);
        assert_eq!(stats.reassigned, 1);
        assert_eq!(stats.spawned, 0);
        assert_eq!(h.voice(3), near);
        assert_eq!(stats.orphaned, 1);
        assert!(h.backend.instance(far).is_some());
    }

    #[test]
    fn test_nearest_picks_smaller_distance_regardless_of_order() {
        for (near_x, far_x) in [(10, 50), (50, 10)] {
            let mut h = Harness::new();
            h.frame(&[emitter(1, near_x, WIND), emitter(2, far_x, WIND)]);
            let expected = if near_x == 10 { h.voice(1) } else { h.voice(2) };

            h.scheduler.reset();
            h.frame(&[emitter(3, 0, WIND)]);
            assert_eq!(h.voice(3), expected);
        }
    }

    #[test]
    fn test_nearest_ignores_other_sounds() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, RIVER)]);

        let stats = h.frame(&[emitter(2, 0, WIND)]);
        assert_eq!(stats.reassigned, 0);
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.orphaned, 1);
    }

    #[test]
    fn test_nearest_voice_cannot_be_claimed_twice() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);

        let stats = h.frame(&[emitter(2, 0, WIND), emitter(3, 0, WIND)]);
        assert_eq!(stats.reassigned, 1);
        assert_eq!(stats.spawned, 1);
        assert_ne!(h.voice(2), h.voice(3));
    }

    #[test]
    fn test_expiry_releases_after_threshold() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);
        let id = h.voice(1);
        let threshold = h.scheduler.config().expire_frames;
        assert_eq!(threshold, DEFAULT_EXPIRE_FRAMES);

        for frame in 1..=threshold {
            let stats = h.frame(&[]);
            assert_eq!(stats.released, 0, "released early at unclaimed frame {frame}");
            assert!(h.backend.instance(id).is_some());
        }

        let stats = h.frame(&[]);
        assert_eq!(stats.released, 1);
        assert!(h.backend.instance(id).is_none());
        assert_eq!(h.scheduler.voice_count(), 0);
    }

    #[test]
    fn test_orphan_volume_decreases_until_silent() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);
        let id = h.voice(1);

        let mut last = h.volume(id);
        assert!((last - 1.0).abs() < 1e-6);
        for _ in 0..10 {
            h.frame(&[]);
            let now = h.volume(id);
            assert!(now < last, "{now} !< {last}");
            last = now;
        }
        assert!(last.abs() < 1e-5);

        h.frame(&[]);
        assert!(h.volume(id).abs() < 1e-5);
    }

    #[test]
    fn test_orphan_is_not_reclaimed_by_continuity() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);
        let id = h.voice(1);

        h.frame(&[]);
        assert!(h.scheduler.voice_for(EmitterId::new(1)).is_none());

        // Back again: the orphan is found by distance, not by association
        let stats = h.frame(&[emitter(1, 0, WIND)]);
        assert_eq!(stats.continued, 0);
        assert_eq!(stats.reassigned, 1);
        assert_eq!(h.voice(1), id);
    }

    #[test]
    fn test_device_unavailable_freezes_state() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND), emitter(2, 50, RIVER)]);
        h.frame(&[emitter(1, 0, WIND)]);
        let before: Vec<Voice> = h.scheduler.voices().cloned().collect();
        let duck = h.scheduler.duck_fade();
        let frame = h.scheduler.frame();

        h.backend.set_available(false);
        let stats = h.frame(&[emitter(1, 0, WIND), emitter(3, 0, WIND)]);
        assert!(stats.idle);
        assert_eq!(h.scheduler.pending_count(), 0);
        assert_eq!(h.scheduler.voices().cloned().collect::<Vec<_>>(), before);
        assert!((h.scheduler.duck_fade() - duck).abs() < f32::EPSILON);
        assert_eq!(h.scheduler.frame(), frame);

        h.backend.set_available(true);
        let stats = h.frame(&[emitter(1, 0, WIND)]);
        assert_eq!(stats.continued, 1);
        assert_eq!(stats.spawned, 0);
        let orphan = h
            .scheduler
            .voices()
            .find(|v| v.sound() == RIVER)
            .expect("river orphan still fading");
        assert_eq!(orphan.expiry(), 2);
    }

    #[test]
    fn test_reset_keeps_voices_playing() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND), emitter(2, 300, RIVER)]);
        let wind = h.voice(1);

        h.scheduler.reset();
        assert!(h.scheduler.voice_for(EmitterId::new(1)).is_none());
        assert_eq!(h.scheduler.voice_count(), 2);
        assert_eq!(h.backend.live_count(), 2);

        // Recreated emitter picks its old voice up by distance
        let stats = h.frame(&[emitter(10, 0, WIND)]);
        assert_eq!(stats.continued, 0);
        assert_eq!(stats.reassigned, 1);
        assert_eq!(stats.orphaned, 1);
        assert_eq!(h.voice(10), wind);
        assert!(h.backend.disposed().is_empty());
    }

    #[test]
    fn test_reset_discards_pending() {
        let mut h = Harness::new();
        h.scheduler
            .submit(&emitter(1, 0, WIND), &FixedCamera, &h.world, LOCAL);
        assert_eq!(h.scheduler.pending_count(), 1);

        h.scheduler.reset();
        assert_eq!(h.scheduler.pending_count(), 0);
        let stats = h.scheduler.update(&mut h.backend, &h.world, LOCAL, false);
        assert_eq!(stats.spawned, 0);
    }

    #[test]
    fn test_reception_disabled_blocks_submission() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);

        h.world.receiving = false;
        assert!(!h.scheduler.submit(&emitter(1, 0, WIND), &FixedCamera, &h.world, LOCAL));
        let stats = h.scheduler.update(&mut h.backend, &h.world, LOCAL, false);
        assert_eq!(stats.orphaned, 1);
    }

    #[test]
    fn test_reception_disabled_refuses_continuity() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND)]);
        let old = h.voice(1);

        // Submitted while receiving, then the menu opens before update
        h.scheduler
            .submit(&emitter(1, 0, WIND), &FixedCamera, &h.world, LOCAL);
        h.world.receiving = false;
        let stats = h.scheduler.update(&mut h.backend, &h.world, LOCAL, false);

        assert_eq!(stats.continued, 0);
        assert_eq!(stats.forced, 1);
        assert_eq!(stats.released, 1);
        assert!(h.backend.instance(old).is_none());
    }

    #[test]
    fn test_inaudible_emitters_are_not_pending() {
        let mut h = Harness::new();
        let far = AmbientEmitter::new(
            EmitterId::new(1),
            Position::new(5_000, 0, 0),
            AmbientSound::new(WIND, 100),
        );
        assert!(!h.scheduler.submit(&far, &FixedCamera, &h.world, LOCAL));
        assert!(!h.scheduler.submit(&emitter(2, 0, WIND), &FixedCamera, &h.world, LocalListeners::NONE));
        assert_eq!(h.scheduler.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_submission_ignored() {
        let mut h = Harness::new();
        let e = emitter(1, 0, WIND);
        assert!(h.scheduler.submit(&e, &FixedCamera, &h.world, LOCAL));
        assert!(!h.scheduler.submit(&e, &FixedCamera, &h.world, LOCAL));

        let stats = h.scheduler.update(&mut h.backend, &h.world, LOCAL, false);
        assert_eq!(stats.spawned, 1);
    }

    #[test]
    fn test_spawn_failure_drops_emitter() {
        let mut h = Harness::new();
        h.backend = VirtualBackend::new().with_capacity(1);

        let stats = h.frame(&[emitter(1, 0, WIND), emitter(2, 0, RIVER)]);
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(h.scheduler.voice_count(), 1);
    }

    #[test]
    fn test_duck_fade_ramps_to_floor_and_back() {
        let mut h = Harness::new();
        let config = h.scheduler.config().clone();

        for _ in 0..100 {
            h.scheduler.update(&mut h.backend, &h.world, LOCAL, true);
        }
        assert!((h.scheduler.duck_fade() - config.duck_floor).abs() < 1e-6);

        h.scheduler
            .submit(&emitter(1, 0, WIND), &FixedCamera, &h.world, LOCAL);
        h.scheduler.update(&mut h.backend, &h.world, LOCAL, true);
        let id = h.voice(1);
        assert!((h.volume(id) - config.duck_floor).abs() < 1e-5);

        h.scheduler.update(&mut h.backend, &h.world, LOCAL, false);
        let step = config.duck_step();
        assert!((h.scheduler.duck_fade() - (config.duck_floor + step)).abs() < 1e-5);

        for _ in 0..100 {
            h.scheduler.update(&mut h.backend, &h.world, LOCAL, false);
        }
        assert!((h.scheduler.duck_fade() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_effect_volume_scales_output() {
        let mut h = Harness::new();
        h.scheduler = AmbientScheduler::new(SchedulerConfig::default().with_effect_volume(0.5));
        h.frame(&[emitter(1, 0, WIND)]);
        assert!((h.volume(h.voice(1)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_global_emitter_plays_without_listener_position() {
        let mut h = Harness::new();
        h.world.listener = None;
        let global = AmbientEmitter::new(
            EmitterId::new(1),
            Position::new(99_999, 0, 0),
            AmbientSound::global(WIND),
        );

        h.frame(&[global]);
        assert_eq!(h.scheduler.voice_count(), 1);
    }

    #[test]
    fn test_every_pending_emitter_resolved() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND), emitter(2, 10, WIND), emitter(3, 20, RIVER)]);

        let stats = h.frame(&[
            emitter(1, 0, WIND),
            emitter(4, 10, WIND),
            emitter(3, 20, WIND),
            emitter(5, 30, RIVER),
        ]);
        assert_eq!(stats.continued + stats.reassigned + stats.spawned + stats.dropped, 4);
        assert_eq!(h.scheduler.pending_count(), 0);

        let associated = h.scheduler.generations.active.associated().count();
        assert_eq!(associated, 4);
    }

    #[test]
    fn test_shutdown_disposes_everything() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, 0, WIND), emitter(2, 0, RIVER)]);
        let wind = h.voice(1);
        let river = h.voice(2);
        h.frame(&[emitter(1, 0, WIND)]);

        h.scheduler.shutdown(&mut h.backend);
        assert_eq!(h.backend.live_count(), 0);
        assert_eq!(h.scheduler.voice_count(), 0);

        let mut disposed = h.backend.disposed().to_vec();
        disposed.sort_unstable();
        let mut expected = vec![wind, river];
        expected.sort_unstable();
        assert_eq!(disposed, expected);
    }

    #[test]
    fn test_short_expiry_threshold() {
        let mut h = Harness::new();
        h.scheduler = AmbientScheduler::new(SchedulerConfig::default().with_expire_frames(3));
        h.frame(&[emitter(1, 0, WIND)]);
        let id = h.voice(1);

        for _ in 0..3 {
            assert_eq!(h.frame(&[]).released, 0);
        }
        assert_eq!(h.frame(&[]).released, 1);
        assert!(h.backend.instance(id).is_none());
    }

    #[test]
    fn test_fade_out_length_sets_step() {
        let mut h = Harness::new();
        h.scheduler = AmbientScheduler::new(SchedulerConfig::default().with_fade_out_frames(4.0));
        h.frame(&[emitter(1, 0, WIND)]);
        let id = h.voice(1);

        h.frame(&[]);
        assert!((h.volume(id) - 0.75).abs() < 1e-6);
        for _ in 0..3 {
            h.frame(&[]);
        }
        assert!(h.volume(id).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_tie_keeps_first_in_scan_order() {
        let mut h = Harness::new();
        h.frame(&[emitter(1, -10, WIND), emitter(2, 10, WIND)]);
        let first = h.voice(1);
        let second = h.voice(2);

        h.scheduler.reset();
        let stats = h.frame(&[emitter(3, 0, WIND)]);
        assert_eq!(stats.reassigned, 1);
        assert_eq!(h.voice(3), first);
        assert_ne!(h.voice(3), second);
    }
}
