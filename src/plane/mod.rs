//! Plane module: flyable entities, the flight model, and guns.
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`state`] | ECS components (`Plane`, `Flight`, `PlaneStatus`, `Hull`, `Weapon`, `Debounce`, `Booster`, `Wreck`, `Turret`, `Bullet`) |
//! | [`flight`] | Per-tick flight pipeline: thrust/roll tradeoff, gravity, booster, afterburner decay, drag, goal suction and settling |
//! | [`weapons`] | Pilot commands (fire, switch gun, afterburner), turret fire with wind-up, bullet lifetimes |
//!
//! All public items are re-exported at this level so the rest of the crate can
//! use flat `crate::plane::*` imports.

pub mod flight;
pub mod state;
pub mod weapons;

// ── Flat re-exports ───────────────────────────────────────────────────────────

pub use flight::{flight_system, freeze_planes_system, wreck_drag_system};
pub use state::{
    Booster, Bullet, Debounce, DebounceKey, Flight, Hull, Lifetime, Plane, PlaneStatus, Turret,
    Weapon, Wreck,
};
pub use weapons::{
    afterburn, bullet_lifetime_system, pilot_command_system, turret_bullet_system, turret_system,
};
