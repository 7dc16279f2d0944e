//! Frame pacing for real-time runs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Keeps a loop at a fixed frame rate and tracks recent frame times.
#[derive(Debug)]
pub struct FramePacer {
    /// Time budget per frame
    frame_budget: Duration,
    /// Time of last frame start
    last_frame: Instant,
    /// Recent frame times in seconds
    frame_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl FramePacer {
    /// Create a pacer for `frame_rate` frames per second.
    #[must_use]
    pub fn new(frame_rate: f32) -> Self {
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1.0))),
            last_frame: Instant::now(),
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Time budget per frame.
    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Sleep out the rest of the frame budget and start the next frame.
    pub fn wait(&mut self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            let sleep_time = self.frame_budget - elapsed;
            // Spin the last millisecond for accuracy
            if sleep_time > Duration::from_millis(1) {
                std::thread::sleep(sleep_time - Duration::from_millis(1));
            }
            while self.last_frame.elapsed() < self.frame_budget {
                std::hint::spin_loop();
            }
        }
        self.mark();
    }

    /// Start the next frame without waiting.
    pub fn mark(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    /// Average frame time in milliseconds over recent frames.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        (self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32) * 1000.0
    }
}
