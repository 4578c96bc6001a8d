//! Runtime tuning table loaded from `assets/props.toml`.
//!
//! [`GameConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_game_config`] reads
//! `assets/props.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the constants you care about.
//!
//! ## Prop keys
//!
//! [`GameConfig::prop`] exposes the table by dotted key (`"plane.health"`,
//! `"physics.drag"`, `"gun.0.cooldown"`), which is how level scripts and the
//! debug console address tunables.  Systems read the typed fields directly.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `GameConfig::default()`.

use crate::constants::*;
use crate::error::{SimError, SimResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Tuning for one gun slot.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GunConfig {
    /// Milliseconds between shots.
    pub cooldown: f64,
    /// Bullet speed (px/s).
    pub speed: f32,
    /// Velocity kick opposite the aim (px/s); planes only.
    pub recoil: f32,
}

impl Default for GunConfig {
    fn default() -> Self {
        Self {
            cooldown: GUN_COOLDOWN,
            speed: GUN_SPEED,
            recoil: GUN_RECOIL,
        }
    }
}

/// Runtime-tunable flight, combat and scoring configuration.
///
/// All fields default to the corresponding compile-time constant from
/// `src/constants.rs`.  Override any subset in `assets/props.toml`.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // ── Simulation ────────────────────────────────────────────────────────────
    pub tick_ms: f64,

    // ── Physics ───────────────────────────────────────────────────────────────
    pub drag: f32,
    pub goal_drag: f32,
    pub goal_drag_cap: f32,
    pub time_thrust: f32,
    pub zoom_thrust: f32,

    // ── Plane ─────────────────────────────────────────────────────────────────
    pub plane_health: f32,
    pub plane_health_multiplier: f32,
    pub plane_power: f32,
    pub plane_gravity: f32,
    pub plane_thrust_gravity: f32,
    pub plane_droll: f32,
    pub boost_roll_thrust_factor: f32,
    pub roll_thrust_factor: f32,
    pub thrust_roll_factor: f32,
    pub plane_squish: f32,
    pub plane_max_velocity: f32,
    pub plane_width: f32,
    pub plane_height: f32,
    pub bullet_damage: f32,
    pub collide_damage: f32,
    pub autopilot_max_velocity: f32,
    pub blastoff_max_velocity: f32,

    // ── Afterburner / booster ─────────────────────────────────────────────────
    pub afterburner_cooldown: f64,
    pub afterburner_thrust_boost: f32,
    pub afterburner_thrust_max: f32,
    pub booster_bounce: f32,
    pub booster_distance: f32,
    pub booster_shock_offset: f32,

    // ── Guns ──────────────────────────────────────────────────────────────────
    pub guns: Vec<GunConfig>,
    pub player_spread: f32,
    pub bullet_ttl: f64,

    // ── Turrets ───────────────────────────────────────────────────────────────
    pub turret_range: f32,
    pub turret_variance: f32,
    pub turret_windup: f64,
    pub turret_hit_penalty: f64,

    // ── Collisions ────────────────────────────────────────────────────────────
    pub wall_debounce: f64,
    pub body_debounce: f64,
    pub collision_impulse: f32,

    // ── Goal ──────────────────────────────────────────────────────────────────
    pub goal_depth_multiplier: f32,
    pub goal_depth_exponent: f32,
    pub goal_wait: f64,
    pub suction_acceleration: f32,

    // ── Turns ─────────────────────────────────────────────────────────────────
    pub reselect_delay: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            drag: PHYSICS_DRAG,
            goal_drag: PHYSICS_GOAL_DRAG,
            goal_drag_cap: PHYSICS_GOAL_DRAG_CAP,
            time_thrust: PHYSICS_TIME_THRUST,
            zoom_thrust: PHYSICS_ZOOM_THRUST,
            plane_health: PLANE_HEALTH,
            plane_health_multiplier: PLANE_HEALTH_MULTIPLIER,
            plane_power: PLANE_POWER,
            plane_gravity: PLANE_GRAVITY,
            plane_thrust_gravity: PLANE_THRUST_GRAVITY,
            plane_droll: PLANE_DROLL,
            boost_roll_thrust_factor: PLANE_BOOST_ROLL_THRUST_FACTOR,
            roll_thrust_factor: PLANE_ROLL_THRUST_FACTOR,
            thrust_roll_factor: PLANE_THRUST_ROLL_FACTOR,
            plane_squish: PLANE_SQUISH,
            plane_max_velocity: PLANE_MAX_VELOCITY,
            plane_width: PLANE_WIDTH,
            plane_height: PLANE_HEIGHT,
            bullet_damage: PLANE_BULLET_DAMAGE,
            collide_damage: PLANE_COLLIDE_DAMAGE,
            autopilot_max_velocity: AUTOPILOT_MAX_VELOCITY,
            blastoff_max_velocity: BLASTOFF_MAX_VELOCITY,
            afterburner_cooldown: AFTERBURNER_COOLDOWN,
            afterburner_thrust_boost: AFTERBURNER_THRUST_BOOST,
            afterburner_thrust_max: AFTERBURNER_THRUST_MAX,
            booster_bounce: BOOSTER_BOUNCE,
            booster_distance: BOOSTER_DISTANCE,
            booster_shock_offset: BOOSTER_SHOCK_OFFSET,
            guns: vec![GunConfig::default(); GUN_COUNT],
            player_spread: PLAYER_SPREAD,
            bullet_ttl: BULLET_TTL,
            turret_range: TURRET_RANGE,
            turret_variance: TURRET_VARIANCE,
            turret_windup: TURRET_WINDUP,
            turret_hit_penalty: TURRET_HIT_PENALTY,
            wall_debounce: WALL_DEBOUNCE,
            body_debounce: BODY_DEBOUNCE,
            collision_impulse: COLLISION_IMPULSE,
            goal_depth_multiplier: GOAL_DEPTH_MULTIPLIER,
            goal_depth_exponent: GOAL_DEPTH_EXPONENT,
            goal_wait: GOAL_WAIT,
            suction_acceleration: SUCTION_ACCELERATION,
            reselect_delay: RESELECT_DELAY,
        }
    }
}

impl GameConfig {
    /// Parse a props document; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        toml::from_str::<GameConfig>(text).map_err(|e| SimError::ConfigParse {
            source: "props".to_string(),
            message: e.to_string(),
        })
    }

    /// Tuning for gun `index`, falling back to gun 0 for unknown slots.
    pub fn gun(&self, index: usize) -> GunConfig {
        self.guns
            .get(index)
            .or_else(|| self.guns.first())
            .copied()
            .unwrap_or_default()
    }

    /// Look a tunable up by its dotted prop key.
    pub fn prop(&self, key: &str) -> Option<f64> {
        if let Some(rest) = key.strip_prefix("gun.") {
            let (index, field) = rest.split_once('.')?;
            let gun = self.guns.get(index.parse::<usize>().ok()?)?;
            return match field {
                "cooldown" => Some(gun.cooldown),
                "speed" => Some(gun.speed as f64),
                "recoil" => Some(gun.recoil as f64),
                _ => None,
            };
        }

        let value = match key {
            "physics.drag" => self.drag as f64,
            "physics.goalDrag" => self.goal_drag as f64,
            "physics.timeThrust" => self.time_thrust as f64,
            "physics.zoomThrust" => self.zoom_thrust as f64,
            "plane.health" => self.plane_health as f64,
            "plane.healthMultiplier" => self.plane_health_multiplier as f64,
            "plane.power" => self.plane_power as f64,
            "plane.gravity" => self.plane_gravity as f64,
            "plane.thrustGravity" => self.plane_thrust_gravity as f64,
            "plane.droll" => self.plane_droll as f64,
            "plane.boostRollThrustFactor" => self.boost_roll_thrust_factor as f64,
            "plane.rollThrustFactor" => self.roll_thrust_factor as f64,
            "plane.thrustRollFactor" => self.thrust_roll_factor as f64,
            "plane.squish" => self.plane_squish as f64,
            "plane.maxVelocity" => self.plane_max_velocity as f64,
            "plane.bulletDamage" => self.bullet_damage as f64,
            "plane.collideDamage" => self.collide_damage as f64,
            "afterburner.cooldown" => self.afterburner_cooldown,
            "afterburner.thrustBoost" => self.afterburner_thrust_boost as f64,
            "afterburner.thrustMax" => self.afterburner_thrust_max as f64,
            "booster.bounce" => self.booster_bounce as f64,
            "booster.distance" => self.booster_distance as f64,
            "booster.shockOffset" => self.booster_shock_offset as f64,
            "goal.depthMultiplier" => self.goal_depth_multiplier as f64,
            "goal.depthExponent" => self.goal_depth_exponent as f64,
            "goal.wait" => self.goal_wait,
            _ => return None,
        };
        Some(value)
    }

    /// Like [`Self::prop`] but reports unknown keys as an error.
    pub fn require_prop(&self, key: &str) -> SimResult<f64> {
        self.prop(key).ok_or_else(|| SimError::UnknownProp {
            key: key.to_string(),
        })
    }

    /// Reject values that break the flight model's assumptions.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.drag > 0.0 && self.drag <= 1.0) {
            return Err(SimError::UnsafeConstant {
                name: "physics.drag",
                value: self.drag as f64,
                safe_range: "(0.0, 1.0]",
            });
        }
        if !(self.goal_drag > 0.0 && self.goal_drag <= 1.0) {
            return Err(SimError::UnsafeConstant {
                name: "physics.goalDrag",
                value: self.goal_drag as f64,
                safe_range: "(0.0, 1.0]",
            });
        }
        if self.plane_health <= 0.0 {
            return Err(SimError::UnsafeConstant {
                name: "plane.health",
                value: self.plane_health as f64,
                safe_range: "(0.0, ∞)",
            });
        }
        if self.plane_squish <= 0.0 {
            return Err(SimError::UnsafeConstant {
                name: "plane.squish",
                value: self.plane_squish as f64,
                safe_range: "(0.0, ∞)",
            });
        }
        if self.afterburner_cooldown <= 0.0 {
            return Err(SimError::UnsafeConstant {
                name: "afterburner.cooldown",
                value: self.afterburner_cooldown,
                safe_range: "(0.0, ∞)",
            });
        }
        if self.tick_ms <= 0.0 {
            return Err(SimError::UnsafeConstant {
                name: "tick_ms",
                value: self.tick_ms,
                safe_range: "(0.0, ∞)",
            });
        }
        if self.guns.is_empty() {
            return Err(SimError::UnsafeConstant {
                name: "guns",
                value: 0.0,
                safe_range: "at least one gun",
            });
        }
        Ok(())
    }
}

/// Startup system: attempt to load `assets/props.toml` and overwrite the
/// `GameConfig` resource with any values present in the file.
///
/// Parse and validation failures are logged and leave the compiled defaults in
/// place.  A missing file is not an error.
pub fn load_game_config(mut config: ResMut<GameConfig>) {
    let path = "assets/props.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match GameConfig::from_toml_str(&contents).and_then(|loaded| {
            loaded.validate()?;
            Ok(loaded)
        }) {
            Ok(loaded) => {
                *config = loaded;
                info!("Loaded props from {path}");
            }
            Err(e) => {
                warn!("{e}; using defaults");
            }
        },
        Err(_) => {
            info!("No {path} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config = GameConfig::from_toml_str("plane_health = 150.0\ndrag = 0.8\n").unwrap();
        assert_eq!(config.plane_health, 150.0);
        assert_eq!(config.drag, 0.8);
        assert_eq!(config.goal_drag, PHYSICS_GOAL_DRAG);
        assert_eq!(config.guns.len(), GUN_COUNT);
    }

    #[test]
    fn gun_tables_parse_from_array_of_tables() {
        let text = "[[guns]]\ncooldown = 250.0\n\n[[guns]]\nspeed = 900.0\n";
        let config = GameConfig::from_toml_str(text).unwrap();
        assert_eq!(config.guns.len(), 2);
        assert_eq!(config.gun(0).cooldown, 250.0);
        assert_eq!(config.gun(1).speed, 900.0);
        assert_eq!(config.gun(1).cooldown, GUN_COOLDOWN);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = GameConfig::from_toml_str("plane_health = \"lots\"").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse { .. }));
    }

    #[test]
    fn prop_lookup_by_dotted_key() {
        let config = GameConfig::default();
        assert_eq!(config.prop("plane.health"), Some(PLANE_HEALTH as f64));
        assert_eq!(config.prop("physics.drag"), Some(PHYSICS_DRAG as f64));
        assert_eq!(config.prop("gun.0.cooldown"), Some(GUN_COOLDOWN));
        assert_eq!(config.prop("gun.7.cooldown"), None);
        assert_eq!(config.prop("plane.wings"), None);
        assert!(matches!(
            config.require_prop("plane.wings"),
            Err(SimError::UnknownProp { .. })
        ));
    }

    #[test]
    fn validate_rejects_drag_above_one() {
        let config = GameConfig {
            drag: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimError::UnsafeConstant {
                name: "physics.drag",
                ..
            })
        ));
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn unknown_gun_slot_falls_back_to_first_gun() {
        let config = GameConfig::default();
        assert_eq!(config.gun(5), config.gun(0));
    }
}
