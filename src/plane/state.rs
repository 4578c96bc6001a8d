//! Plane, wreck, turret and bullet components.
//!
//! Every flyable or shootable thing is an entity with a transform and a rapier
//! body; capabilities are separate components so systems dispatch on what an
//! entity *has*:
//! - [`Flight`]: driven by the flight model ([`super::flight`])
//! - [`Weapon`]: gun cooldowns used by [`super::weapons`]
//! - [`Debounce`]: per-partner damage gates used by [`crate::collision`]

use crate::constants::{NEVER, PLANE_MAX_VELOCITY};
use bevy::prelude::*;
use std::collections::HashMap;

// ── Markers ────────────────────────────────────────────────────────────────────

/// A flyable plane.  `sprite` is the layout's texture key, kept so the plane
/// can be archived and respawned in a deeper run.
#[derive(Component, Debug, Clone, Default)]
pub struct Plane {
    pub sprite: String,
}

/// Non-controllable remnant of a destroyed plane.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Wreck {
    /// Set when the wreck drifts into a goal; it then coasts under goal drag.
    pub winning: bool,
}

/// Stationary shooter.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Turret;

/// A fired round.
#[derive(Component, Debug, Clone, Copy)]
pub struct Bullet {
    /// Entity that fired it; never damaged by its own bullets.
    pub shooter: Entity,
    pub gun: usize,
}

/// Absolute expiry time (ms) after which the entity despawns.
#[derive(Component, Debug, Clone, Copy)]
pub struct Lifetime {
    pub expires_at: f64,
}

// ── Flight ─────────────────────────────────────────────────────────────────────

/// Control state and derived quantities of the flight model.
#[derive(Component, Debug, Clone)]
pub struct Flight {
    /// Throttle; exceeds 1 while the afterburner is burning.
    pub thrust: f32,
    /// Turn input in `[-1, 1]`.
    pub roll: f32,
    /// Heading in radians derived from the body angle.
    pub theta: f32,
    /// Smoothed stretch proportional to sustained thrust.
    pub squish: f32,
    /// Decaying extra thrust left by the last afterburn.
    pub afterburner_thrust: f32,
    /// Time (ms) until which the afterburner is cooling down.
    pub afterburner_cooldown: f64,
    /// Per-axis speed cap for this tick.
    pub max_velocity: f32,
    /// Acceleration computed this tick (px/s²).
    pub acceleration: Vec2,
    /// Set once when the position is found to be non-finite.
    pub nan_flagged: bool,
}

impl Default for Flight {
    fn default() -> Self {
        Self {
            thrust: 0.0,
            roll: 0.0,
            theta: 0.0,
            squish: 0.0,
            afterburner_thrust: 0.0,
            afterburner_cooldown: NEVER,
            max_velocity: PLANE_MAX_VELOCITY,
            acceleration: Vec2::ZERO,
            nan_flagged: false,
        }
    }
}

impl Flight {
    /// Whether a new afterburn may start at `now`.
    #[inline]
    pub fn afterburner_ready(&self, now: f64) -> bool {
        self.afterburner_cooldown <= now
    }

    /// Fraction of the afterburner cooldown still remaining at `now`.
    pub fn afterburner_remaining(&self, now: f64, cooldown: f64) -> f32 {
        if cooldown <= 0.0 {
            return 0.0;
        }
        ((self.afterburner_cooldown - now).max(0.0) / cooldown) as f32
    }
}

/// Goal and lifecycle flags of a plane.
#[derive(Component, Debug, Clone, Default)]
pub struct PlaneStatus {
    /// Reached the goal; immune to damage and control input.
    pub winning: bool,
    /// Settled at the goal; no longer simulated.
    pub inert: bool,
    /// Reached the goal without a scratch.
    pub perfect: bool,
    /// Touched a pregoal; pulled down while above the goal line.  Sticky.
    pub suction: bool,
    /// Time at which a winning plane first came to rest.
    pub settled_at: Option<f64>,
    /// Score of this plane as of the last score pass.
    pub score: i64,
}

/// Accumulated damage.  Only ever grows.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Hull {
    pub damage: f32,
}

/// Trailing booster sprite state.
#[derive(Component, Debug, Clone, Default)]
pub struct Booster {
    /// Smoothed extra trailing distance (px).
    pub bonus: f32,
    /// How long thrust has been held (ms).
    pub held_ms: f32,
    pub visible: bool,
    /// Showing the afterburner flame rather than the normal one.
    pub afterburner: bool,
    /// The engine loop sound is playing.
    pub sound_active: bool,
    pub position: Vec2,
}

// ── Weapons ────────────────────────────────────────────────────────────────────

/// Gun selection and per-gun cooldown expiry times (ms).
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Weapon {
    pub current_gun: usize,
    pub cooldowns: Vec<f64>,
}

impl Weapon {
    /// All `gun_count` guns ready to fire.
    pub fn ready(gun_count: usize) -> Self {
        Self::with_cooldowns(vec![NEVER; gun_count.max(1)])
    }

    pub fn with_cooldowns(cooldowns: Vec<f64>) -> Self {
        Self {
            current_gun: 0,
            cooldowns,
        }
    }

    pub fn gun_count(&self) -> usize {
        self.cooldowns.len()
    }

    /// Expiry of the active gun.
    pub fn cooldown(&self) -> f64 {
        self.cooldowns
            .get(self.current_gun)
            .copied()
            .unwrap_or(NEVER)
    }

    /// The active gun may fire at `now` once `now` has reached its expiry.
    pub fn can_fire(&self, now: f64) -> bool {
        self.cooldown() <= now
    }

    pub fn set_cooldown(&mut self, expires_at: f64) {
        if let Some(slot) = self.cooldowns.get_mut(self.current_gun) {
            *slot = expires_at;
        }
    }

    /// Push the active gun's expiry further out (turret suppression).
    pub fn delay(&mut self, amount: f64) {
        if let Some(slot) = self.cooldowns.get_mut(self.current_gun) {
            *slot += amount;
        }
    }

    /// Cycle the active gun by `delta` with wraparound.
    pub fn cycle(&mut self, delta: i32) {
        let count = self.gun_count() as i32;
        if count == 0 {
            return;
        }
        self.current_gun = (self.current_gun as i32 + delta).rem_euclid(count) as usize;
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Self::ready(1)
    }
}

// ── Debounce ───────────────────────────────────────────────────────────────────

/// Collision partner identity for the debounce map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    /// Any wall tile; walls share one slot.
    Wall,
    Partner(Entity),
}

/// Per-partner "next damage allowed after" timestamps.
#[derive(Component, Debug, Clone, Default)]
pub struct Debounce(HashMap<DebounceKey, f64>);

impl Debounce {
    /// A partner with no stored timestamp is always ready; a stored one is
    /// ready only strictly after it.
    pub fn ready(&self, key: DebounceKey, now: f64) -> bool {
        self.0.get(&key).is_none_or(|until| now > *until)
    }

    /// Block `key` until `until`.  Never moves an existing gate backwards.
    pub fn arm(&mut self, key: DebounceKey, until: f64) {
        let slot = self.0.entry(key).or_insert(until);
        *slot = slot.max(until);
    }

    #[cfg(test)]
    pub fn until(&self, key: DebounceKey) -> Option<f64> {
        self.0.get(&key).copied()
    }
}
