//! Animation scheduler: integrates simulated time across display ticks.

use std::time::Duration;

use crate::params::SchedulerConfig;

/// Whether simulated time advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Paused,
}

/// Result of one display tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Wall time since the previous tick, after the stall clamp
    pub wall_delta: Duration,
    /// The raw wall delta exceeded the clamp
    pub stalled: bool,
    /// Simulated seconds added this tick (zero while paused)
    pub sim_delta: f32,
    /// Simulated clock after the tick
    pub sim_time: f32,
}

/// Running/paused state machine owning the simulation clock
#[derive(Debug, Clone)]
pub struct AnimationScheduler {
    config: SchedulerConfig,
    state: RunState,
    last_tick: Option<Duration>,
    sim_time_s: f64,
    speed: f32,
    visible: bool,
}

impl AnimationScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: RunState::Running,
            last_tick: None,
            sim_time_s: 0.0,
            speed: 1.0,
            visible: true,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn pause(&mut self) {
        self.state = RunState::Paused;
    }

    pub fn resume(&mut self) {
        self.state = RunState::Running;
    }

    pub fn toggle(&mut self) {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        };
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Set the user speed multiplier, clamped to the configured range
    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed.clamp(self.config.min_speed, self.config.max_speed);
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Hidden views keep ticking at a throttled rate
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Simulated seconds since the last reset
    pub fn sim_time(&self) -> f32 {
        self.sim_time_s as f32
    }

    pub fn reset_clock(&mut self) {
        self.sim_time_s = 0.0;
    }

    /// Advance to monotonic time `now`.
    ///
    /// The wall delta is clamped to `max_delta`, scaled by the speed
    /// multiplier and the visibility throttle, and added to the clock only
    /// while running. The first tick establishes the reference and adds nothing.
    pub fn tick(&mut self, now: Duration) -> Tick {
        let raw = self
            .last_tick
            .map(|last| now.saturating_sub(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);

        let wall_delta = raw.min(self.config.max_delta);
        let throttle = if self.visible {
            1.0
        } else {
            self.config.hidden_throttle as f64
        };

        let sim_delta = if self.is_running() {
            wall_delta.as_secs_f64() * self.speed as f64 * throttle
        } else {
            0.0
        };
        self.sim_time_s += sim_delta;

        Tick {
            wall_delta,
            stalled: raw > self.config.max_delta,
            sim_delta: sim_delta as f32,
            sim_time: self.sim_time_s as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_running_clock_follows_wall_time() {
        let mut scheduler = AnimationScheduler::new(SchedulerConfig::default());
        scheduler.tick(ms(0));
        for i in 1..=60 {
            scheduler.tick(ms(i * 16));
        }
        assert!((scheduler.sim_time() - 0.96).abs() < 1e-4);
    }

    #[test]
    fn test_stall_is_clamped() {
        let mut scheduler = AnimationScheduler::new(SchedulerConfig::default());
        scheduler.tick(ms(0));
        let tick = scheduler.tick(ms(5_000));
        assert_eq!(tick.wall_delta, ms(100));
        assert!(tick.stalled);
        assert!((tick.sim_delta - 0.1).abs() < 1e-6);

        assert!(!scheduler.tick(ms(5_016)).stalled);
    }

    #[test]
    fn test_paused_clock_holds() {
        let mut scheduler = AnimationScheduler::new(SchedulerConfig::default());
        scheduler.tick(ms(0));
        scheduler.tick(ms(50));
        scheduler.pause();
        let held = scheduler.sim_time();

        let tick = scheduler.tick(ms(80));
        assert_eq!(tick.sim_delta, 0.0);
        assert_eq!(scheduler.sim_time(), held);

        // Resuming does not replay the paused interval
        scheduler.resume();
        scheduler.tick(ms(90));
        assert!((scheduler.sim_time() - held - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_speed_and_visibility_scale_delta() {
        let mut scheduler = AnimationScheduler::new(SchedulerConfig::default());
        scheduler.set_speed(2.0);
        scheduler.tick(ms(0));
        let fast = scheduler.tick(ms(50));
        assert!((fast.sim_delta - 0.1).abs() < 1e-6);

        scheduler.set_visible(false);
        let hidden = scheduler.tick(ms(100));
        assert!((hidden.sim_delta - 0.025).abs() < 1e-6);

        scheduler.set_speed(100.0);
        assert_eq!(scheduler.speed(), 4.0);
    }

    #[test]
    fn test_toggle_and_reset() {
        let mut scheduler = AnimationScheduler::new(SchedulerConfig::default());
        scheduler.toggle();
        assert_eq!(scheduler.state(), RunState::Paused);
        scheduler.toggle();
        assert!(scheduler.is_running());

        scheduler.tick(ms(0));
        scheduler.tick(ms(40));
        scheduler.reset_clock();
        assert_eq!(scheduler.sim_time(), 0.0);
    }
}
