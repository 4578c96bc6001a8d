//! Simulation time, seeded randomness and the per-level timer queue.
//!
//! Every time value in the core is read from [`SimClock`] (milliseconds of
//! simulated time), never from Bevy's wall clock, so a run is reproducible
//! from its seed and its input stream alone.
//!
//! | Resource       | Role                                                    |
//! |----------------|---------------------------------------------------------|
//! | [`SimClock`]   | Monotonic `now`, advanced one fixed tick per step       |
//! | [`SimRng`]     | Independent keyed random streams derived from one seed  |
//! | [`TimerQueue`] | Deferred actions owned by the running level             |

use crate::config::GameConfig;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Monotonic simulation clock in milliseconds.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    /// Time of the tick currently being simulated.
    pub now: f64,
    /// Length of the last step.
    pub dt: f64,
    /// Steps simulated since the clock was created.
    pub ticks: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            now: 0.0,
            dt: crate::constants::TICK_MS,
            ticks: 0,
        }
    }
}

impl SimClock {
    pub fn advance(&mut self, tick_ms: f64) {
        self.dt = tick_ms;
        self.now += tick_ms;
        self.ticks += 1;
    }

    /// Step length in seconds, for integrating px/s quantities.
    #[inline]
    pub fn dt_secs(&self) -> f32 {
        (self.dt / 1000.0) as f32
    }
}

// ── Random streams ────────────────────────────────────────────────────────────

/// Named random streams.  Each one is seeded independently so drawing from
/// one never shifts the sequence of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RngStream {
    /// Collision and bullet damage jitter.
    Damage,
    /// Turret cooldowns seeded at level load.
    Cooldown,
    /// Turret cooldown multiplier applied per shot.
    TurretCooldown,
    /// Turret aim jitter.
    BulletVariance,
    /// Gap between score "clink" sounds.
    Clink,
}

impl RngStream {
    pub fn key(self) -> &'static str {
        match self {
            RngStream::Damage => "damage",
            RngStream::Cooldown => "cooldown",
            RngStream::TurretCooldown => "turret.cooldown",
            RngStream::BulletVariance => "bulletVariance",
            RngStream::Clink => "clink",
        }
    }

    /// Offset mixed into the level seed for this stream.
    fn salt(self) -> u64 {
        self as u64 + 1
    }
}

/// Seeded, keyed random source shared by every system of the core.
#[derive(Resource, Debug, Clone)]
pub struct SimRng {
    seed: u64,
    streams: HashMap<RngStream, StdRng>,
}

impl Default for SimRng {
    fn default() -> Self {
        Self::seeded(0x5EED)
    }
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart every stream from a new seed.
    #[cfg(test)]
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.streams.clear();
    }

    fn stream(&mut self, stream: RngStream) -> &mut StdRng {
        let seed = self.seed;
        self.streams.entry(stream).or_insert_with(|| {
            debug!("Seeding random stream '{}'", stream.key());
            StdRng::seed_from_u64(seed ^ stream.salt())
        })
    }

    /// Uniform draw in `[min, max)`; returns `min` for an empty range.
    pub fn rand_between(&mut self, stream: RngStream, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.stream(stream).gen_range(min..max)
    }

    pub fn rand_between_f32(&mut self, stream: RngStream, min: f32, max: f32) -> f32 {
        self.rand_between(stream, min as f64, max as f64) as f32
    }
}

// ── Timer queue ───────────────────────────────────────────────────────────────

/// Work deferred to a later tick of the same level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredAction {
    /// Reopen plane selection (after the current plane was destroyed).
    ChangePlanes,
    /// Release a turret's wound-up shot along `theta`.
    TurretBullet { turret: Entity, theta: f32 },
    /// Move `delta` levels through the campaign.
    SkipLevel(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledAction {
    pub due: f64,
    pub generation: u64,
    pub action: DeferredAction,
}

/// Deferred actions owned by the running level.
///
/// [`TimerQueue::invalidate`] is called on level teardown; anything stamped
/// with an older generation is discarded instead of fired.
#[derive(Resource, Debug, Clone, Default)]
pub struct TimerQueue {
    generation: u64,
    entries: Vec<ScheduledAction>,
}

impl TimerQueue {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue `action` to fire `delay` ms after `now`.
    pub fn schedule(&mut self, now: f64, delay: f64, action: DeferredAction) {
        self.push(ScheduledAction {
            due: now + delay,
            generation: self.generation,
            action,
        });
    }

    pub fn push(&mut self, scheduled: ScheduledAction) {
        self.entries.push(scheduled);
    }

    pub fn is_pending(&self, action: &DeferredAction) -> bool {
        self.entries.iter().any(|e| &e.action == action)
    }

    /// Remove and return every live action due at `now`, earliest first.
    /// Actions due at the same time keep their scheduling order.
    pub fn drain_due(&mut self, now: f64) -> Vec<DeferredAction> {
        let generation = self.generation;
        let mut due = Vec::new();
        self.entries.retain(|entry| {
            if entry.due > now {
                return true;
            }
            if entry.generation == generation {
                due.push(*entry);
            } else {
                debug!("Dropping stale timer action {:?}", entry.action);
            }
            false
        });
        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        due.into_iter().map(|e| e.action).collect()
    }

    /// Forget every pending action and start a new generation.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }
}

/// A deferred action whose time has come, written during the clock stage.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct TimerFired(pub DeferredAction);

/// Advance the clock by one fixed step and release due timer actions.
pub fn advance_clock_system(
    mut clock: ResMut<SimClock>,
    config: Res<GameConfig>,
    mut timers: ResMut<TimerQueue>,
    mut fired: MessageWriter<TimerFired>,
) {
    clock.advance(config.tick_ms);
    for action in timers.drain_due(clock.now) {
        fired.write(TimerFired(action));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible_and_independent() {
        let mut a = SimRng::seeded(7);
        let mut b = SimRng::seeded(7);

        let a1 = a.rand_between(RngStream::Damage, 1.0, 2.0);
        // Drawing from another stream first must not shift the damage stream.
        b.rand_between(RngStream::Clink, 250.0, 500.0);
        let b1 = b.rand_between(RngStream::Damage, 1.0, 2.0);

        assert_eq!(a1, b1);
        assert!((1.0..2.0).contains(&a1));
    }

    #[test]
    fn streams_of_one_seed_diverge() {
        let mut rng = SimRng::seeded(7);
        let damage: Vec<f64> = (0..4)
            .map(|_| rng.rand_between(RngStream::Damage, 0.0, 1.0))
            .collect();
        let clink: Vec<f64> = (0..4)
            .map(|_| rng.rand_between(RngStream::Clink, 0.0, 1.0))
            .collect();
        assert_ne!(damage, clink);
    }

    #[test]
    fn empty_range_returns_min() {
        let mut rng = SimRng::seeded(1);
        assert_eq!(rng.rand_between(RngStream::Damage, 3.0, 3.0), 3.0);
        assert_eq!(rng.rand_between(RngStream::Damage, 5.0, 1.0), 5.0);
    }

    #[test]
    fn reseed_restarts_sequences() {
        let mut rng = SimRng::seeded(9);
        let first = rng.rand_between(RngStream::Cooldown, 1000.0, 2000.0);
        rng.rand_between(RngStream::Cooldown, 1000.0, 2000.0);
        rng.reseed(9);
        assert_eq!(rng.rand_between(RngStream::Cooldown, 1000.0, 2000.0), first);
    }

    #[test]
    fn timer_fires_once_when_due() {
        let mut timers = TimerQueue::default();
        timers.schedule(1000.0, 2000.0, DeferredAction::ChangePlanes);

        assert!(timers.drain_due(2999.0).is_empty());
        assert_eq!(timers.drain_due(3000.0), vec![DeferredAction::ChangePlanes]);
        assert!(timers.drain_due(4000.0).is_empty());
    }

    #[test]
    fn invalidated_actions_never_fire() {
        let mut timers = TimerQueue::default();
        let stale = ScheduledAction {
            due: 10.0,
            generation: timers.generation(),
            action: DeferredAction::SkipLevel(1),
        };
        timers.schedule(0.0, 10.0, DeferredAction::ChangePlanes);
        timers.invalidate();
        timers.push(stale);

        assert!(timers.drain_due(100.0).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn due_actions_come_out_in_time_order() {
        let mut timers = TimerQueue::default();
        timers.schedule(0.0, 500.0, DeferredAction::SkipLevel(1));
        timers.schedule(0.0, 100.0, DeferredAction::ChangePlanes);
        assert_eq!(
            timers.drain_due(1000.0),
            vec![DeferredAction::ChangePlanes, DeferredAction::SkipLevel(1)]
        );
    }

    #[test]
    fn clock_system_advances_and_fires() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<TimerFired>();
        app.insert_resource(GameConfig::default());
        app.insert_resource(SimClock::default());
        app.insert_resource(TimerQueue::default());
        app.world_mut()
            .resource_mut::<TimerQueue>()
            .schedule(0.0, 10.0, DeferredAction::ChangePlanes);
        app.add_systems(Update, advance_clock_system);

        app.update();

        let clock = app.world().resource::<SimClock>();
        assert_eq!(clock.ticks, 1);
        assert!((clock.now - crate::constants::TICK_MS).abs() < 1e-9);

        let messages = app.world().resource::<Messages<TimerFired>>();
        let mut cursor = messages.get_cursor();
        let fired: Vec<_> = cursor.read(messages).copied().collect();
        assert_eq!(fired, vec![TimerFired(DeferredAction::ChangePlanes)]);
    }
}
