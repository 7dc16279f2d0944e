//! Demo simulation.
//!
//! A listener drifts through a ring of orbiting emitters. Every so often an
//! emitter switches sound, the mix ducks, the menu opens, or the whole
//! simulation "rolls back" and hands out fresh emitter identities. The
//! scheduler is driven once per frame exactly as a game loop would.

use ambience_common::{Aabb, EmitterId, Position, SoundId};
use ambience_kernel::{
    AmbientEmitter, AmbientScheduler, AmbientSound, AudioCamera, FrameStats, ListenerWorld,
    LocalListeners, PlaybackBackend,
};
use glam::Vec2;
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::timing::FramePacer;

/// The demo has one local player.
const LOCAL: LocalListeners = LocalListeners::single(0);

/// Half-size of the box around emitters that have one.
const EMITTER_HALF_EXTENT: Position = Position::new(40, 40, 0);

/// Camera centred on the listener. One view half-extent maps to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct ListenerCamera {
    /// World position at the centre of the view.
    pub center: Position,
    /// World units from centre to screen edge.
    pub half_extent: f32,
}

impl AudioCamera for ListenerCamera {
    fn world_to_audio(&self, position: Position) -> Vec2 {
        let offset = Vec2::new(
            (position.x - self.center.x) as f32,
            (position.y - self.center.y) as f32,
        );
        offset / self.half_extent
    }
}

/// Single-player listener world with a pause menu.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoWorld {
    /// Listener position, if the player is spawned.
    pub listener: Option<Position>,
    /// Menu open.
    pub paused: bool,
}

impl ListenerWorld for DemoWorld {
    fn max_listeners(&self) -> usize {
        1
    }

    fn listener_position(&self, index: usize) -> Option<Position> {
        if index == 0 {
            self.listener
        } else {
            None
        }
    }

    fn is_receiving_ambient_audio(&self, local: LocalListeners) -> bool {
        !self.paused && !local.is_empty()
    }
}

#[derive(Debug)]
struct Orbiter {
    emitter: AmbientEmitter,
    phase: f32,
    speed: f32,
    boxed: bool,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames simulated.
    pub frames: u32,
    /// Frames skipped because the device was unavailable.
    pub idle_frames: u32,
    /// Emitters kept on their own voice.
    pub continued: usize,
    /// Voices handed to a different emitter.
    pub reassigned: usize,
    /// Voices started.
    pub spawned: usize,
    /// Voices released.
    pub released: usize,
    /// Emitters left without a voice.
    pub dropped: usize,
    /// Most voices alive at once.
    pub peak_voices: usize,
}

impl RunSummary {
    fn record(&mut self, stats: &FrameStats, voices: usize) {
        self.frames += 1;
        if stats.idle {
            self.idle_frames += 1;
        }
        self.continued += stats.continued;
        self.reassigned += stats.reassigned;
        self.spawned += stats.spawned;
        self.released += stats.released;
        self.dropped += stats.dropped;
        self.peak_voices = self.peak_voices.max(voices);
    }
}

/// The demo world and its event schedule.
#[derive(Debug)]
pub struct Simulation {
    config: DemoConfig,
    sounds: Vec<SoundId>,
    rng: fastrand::Rng,
    orbiters: Vec<Orbiter>,
    ambience: AmbientEmitter,
    world: DemoWorld,
    camera: ListenerCamera,
    next_id: u64,
    frame: u32,
    ducking: bool,
}

impl Simulation {
    /// Build the world. The first sound plays everywhere; the rest are
    /// spread over the orbiting emitters.
    #[must_use]
    pub fn new(config: DemoConfig, sounds: Vec<SoundId>) -> Self {
        let rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        let mut sim = Self {
            camera: ListenerCamera {
                center: Position::ZERO,
                half_extent: config.view_half_extent,
            },
            ambience: AmbientEmitter {
                id: EmitterId::new(0),
                bounds: None,
                position: Position::ZERO,
                facing_left: false,
                sound: sounds
                    .first()
                    .map(|&s| AmbientSound::global(s).with_volume(0.3)),
            },
            config,
            sounds,
            rng,
            orbiters: Vec::new(),
            world: DemoWorld {
                listener: Some(Position::ZERO),
                paused: false,
            },
            next_id: 1,
            frame: 0,
            ducking: false,
        };

        for i in 0..sim.config.emitters {
            let sound = sim.pick_sound(None);
            let id = sim.allocate_id();
            let phase = std::f32::consts::TAU * i as f32 / sim.config.emitters as f32;
            let speed = 0.002 + sim.rng.f32() * 0.01;
            sim.orbiters.push(Orbiter {
                emitter: AmbientEmitter {
                    id,
                    bounds: None,
                    position: Position::ZERO,
                    facing_left: false,
                    sound: sound.map(|s| AmbientSound::new(s, sim.config.hearing_radius)),
                },
                phase,
                speed,
                boxed: i % 3 == 2,
            });
        }
        sim.place_emitters();

        info!(
            "Demo world: {} emitters, {} sounds",
            sim.orbiters.len() + 1,
            sim.sounds.len()
        );
        sim
    }

    /// Simulate one frame and drive the scheduler.
    pub fn step<B>(&mut self, scheduler: &mut AmbientScheduler, backend: &mut B) -> FrameStats
    where
        B: PlaybackBackend + ?Sized,
    {
        self.frame += 1;
        self.run_events(scheduler);
        self.place_emitters();

        scheduler.submit(&self.ambience, &self.camera, &self.world, LOCAL);
        for orbiter in &self.orbiters {
            scheduler.submit(&orbiter.emitter, &self.camera, &self.world, LOCAL);
        }

        scheduler.update(backend, &self.world, LOCAL, self.ducking)
    }

    /// Run every configured frame, then shut the scheduler down.
    pub fn run<B>(&mut self, scheduler: &mut AmbientScheduler, backend: &mut B) -> RunSummary
    where
        B: PlaybackBackend + ?Sized,
    {
        let mut summary = RunSummary::default();
        let mut pacer = FramePacer::new(scheduler.config().frame_rate);
        if self.config.realtime {
            debug!("Pacing frames at {:?}", pacer.frame_budget());
        }

        for _ in 0..self.config.frames {
            let stats = self.step(scheduler, backend);
            summary.record(&stats, scheduler.voice_count());

            if self.config.realtime {
                pacer.wait();
            } else {
                pacer.mark();
            }
        }

        debug!("Average frame time: {:.3} ms", pacer.average_frame_time_ms());
        scheduler.shutdown(backend);
        summary
    }

    fn run_events(&mut self, scheduler: &mut AmbientScheduler) {
        let frame = self.frame;
        let every = |interval: u32| interval > 0 && frame % interval == 0;

        if every(self.config.swap_interval) && !self.orbiters.is_empty() {
            let index = self.rng.usize(..self.orbiters.len());
            let current = self.orbiters[index].emitter.sound.and_then(|s| s.sound);
            if let Some(next) = self.pick_sound(current) {
                let emitter = &mut self.orbiters[index].emitter;
                if let Some(ambient) = emitter.sound.as_mut() {
                    ambient.sound = Some(next);
                }
                debug!("Emitter {:?} switched to {next:?}", emitter.id);
            }
        }

        if every(self.config.duck_interval) {
            self.ducking = !self.ducking;
            debug!("Ducking: {}", self.ducking);
        }

        if every(self.config.rollback_interval) {
            for i in 0..self.orbiters.len() {
                let id = self.allocate_id();
                self.orbiters[i].emitter.id = id;
            }
            scheduler.reset();
            info!("Rolled back at frame {frame}; emitters re-identified");
        }

        let paused = self.config.pause_interval > 0
            && frame % self.config.pause_interval < self.config.pause_length;
        if paused != self.world.paused {
            debug!("Menu {}", if paused { "opened" } else { "closed" });
        }
        self.world.paused = paused;
    }

    fn place_emitters(&mut self) {
        let t = self.frame as f32;
        let radius = self.config.orbit_radius as f32;

        let drift = (t * 0.005).sin() * radius * 0.5;
        let listener = Position::new(drift as i32, 0, 0);
        self.world.listener = Some(listener);
        self.camera.center = listener;

        for orbiter in &mut self.orbiters {
            let angle = orbiter.phase + orbiter.speed * t;
            let at = Vec2::from_angle(angle) * radius;
            let position = Position::new(at.x as i32, at.y as i32, 0);

            let emitter = &mut orbiter.emitter;
            emitter.facing_left = position.x < emitter.position.x;
            emitter.position = position;
            if orbiter.boxed {
                emitter.bounds = Some(Aabb::around(position, EMITTER_HALF_EXTENT));
            }
        }
    }

    /// A positional sound other than `except`, if there is one.
    fn pick_sound(&mut self, except: Option<SoundId>) -> Option<SoundId> {
        let candidates: Vec<SoundId> = self
            .sounds
            .iter()
            .skip(1)
            .copied()
            .filter(|&s| Some(s) != except)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[self.rng.usize(..candidates.len())])
    }

    fn allocate_id(&mut self) -> EmitterId {
        let id = EmitterId::new(self.next_id);
        self.next_id += 1;
        id
    }
}
