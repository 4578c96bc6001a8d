//! Flight model: controls → acceleration, drag, squish and booster trail.
//!
//! One pass per plane per tick, in this order:
//!
//! | Stage      | Effect                                                      |
//! |------------|-------------------------------------------------------------|
//! | controls   | autopilot / pilot / idle throttle and roll                  |
//! | winner     | winning planes lose all control                             |
//! | thrusters  | afterburner adds decaying extra thrust and raises the cap   |
//! | tradeoff   | roll and thrust attenuate each other                        |
//! | ailerons   | heading from body angle, angular velocity from roll         |
//! | gravity    | thrust vector and gravity (flown plane only)                |
//! | booster    | trailing sprite distance, engine loop sound                 |
//! | relativity | squish; time scale and zoom for the flown plane             |
//! | drag       | coasting drag, or goal drag once winning                    |
//! | suction    | pregoal pull while above the goal line                      |
//! | jelly      | settle detection at the goal                                |
//!
//! The computed acceleration is then integrated into the rapier velocity and
//! clamped per axis before the physics step.
//!
//! The `0.9 / 0.1` blend factors assume the fixed 60 Hz tick and are not
//! scaled by `dt`.

use crate::clock::SimClock;
use crate::config::GameConfig;
use crate::constants::{
    AFTERBURNER_FLOOR, AUTOPILOT_ANGLE, JELLY_THRESHOLD, THRUST_EPSILON,
};
use crate::effects::{Presentation, SoundCue, SoundRequest};
use crate::level::{angle_degrees, HeadingConvention, LevelRoster, LevelSettings};
use crate::plane::state::{Booster, Flight, Plane, PlaneStatus, Wreck};
use crate::turns::Turns;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

// ── Pure helpers ───────────────────────────────────────────────────────────────

/// Exponential approach used by the booster trail and the afterburner.
#[inline]
pub fn smooth(desired: f32, current: f32) -> f32 {
    desired * 0.1 + current * 0.9
}

/// Roll and thrust attenuate each other.  The roll factor is chosen from the
/// thrust before it is scaled.
pub fn tradeoff(thrust: f32, roll: f32, config: &GameConfig) -> (f32, f32) {
    let mut roll = roll;
    if thrust > 1.0 {
        roll *= config.boost_roll_thrust_factor;
    } else if thrust != 0.0 {
        roll *= config.roll_thrust_factor;
    }

    let mut thrust = thrust;
    if roll != 0.0 {
        thrust *= config.thrust_roll_factor;
    }
    (thrust, roll)
}

/// Next afterburner thrust given the remaining cooldown fraction.
pub fn afterburner_thrust(remaining: f32, previous: f32) -> f32 {
    let thrust = smooth(remaining, previous);
    if thrust < AFTERBURNER_FLOOR {
        0.0
    } else {
        thrust
    }
}

/// Per-axis speed cap for this tick.
pub fn max_velocity(afterburner_thrust: f32, settings: &LevelSettings, config: &GameConfig) -> f32 {
    if settings.autopilot {
        if settings.blastoff {
            config.blastoff_max_velocity
        } else {
            config.autopilot_max_velocity
        }
    } else {
        (1.0 + config.afterburner_thrust_max * afterburner_thrust) * config.plane_max_velocity
    }
}

/// Acceleration of the flown plane.
pub fn thrust_acceleration(
    thrust: f32,
    theta: f32,
    heading: HeadingConvention,
    winning: bool,
    autopilot: bool,
    config: &GameConfig,
) -> Vec2 {
    let mut acceleration = Vec2::ZERO;

    if thrust > 0.0 {
        if !winning {
            acceleration.y = config.plane_thrust_gravity;
        }
        let nose = heading.nose(theta);
        acceleration += Vec2::new(nose.cos(), nose.sin()) * thrust * config.plane_power;
    } else if !winning {
        acceleration.y = config.plane_gravity;
    }

    if autopilot {
        acceleration.y = 0.0;
    }
    acceleration
}

/// Smoothed squish factor.
#[inline]
pub fn squish(thrust: f32, previous: f32, config: &GameConfig) -> f32 {
    (thrust / config.plane_squish) * 0.9 + previous * 0.1
}

/// Drag multiplier for something that reached the goal.
pub fn goal_drag(afterburner_thrust: f32, config: &GameConfig) -> f32 {
    (config.goal_drag + afterburner_thrust / 10.0).min(config.goal_drag_cap)
}

/// Apply one tick of drag.
///
/// `thrust` is `None` for bodies without controls (wrecks).  Horizontal drag
/// applies while coasting; vertical drag applies to everything except the
/// flown plane, which is left to gravity.
pub fn apply_drag(
    velocity: Vec2,
    winning: bool,
    thrust: Option<f32>,
    flown: bool,
    afterburner_thrust: f32,
    config: &GameConfig,
) -> Vec2 {
    if winning {
        return velocity * goal_drag(afterburner_thrust, config);
    }

    let mut velocity = velocity;
    if thrust.is_none_or(|t| t.abs() < THRUST_EPSILON) {
        velocity.x *= config.drag;
    }
    if !flown {
        velocity.y *= config.drag;
    }
    velocity
}

/// Desired and smoothed booster trail distance.
pub fn booster_bonus(held_ms: f32, thrust: f32, roll: f32, previous: f32, config: &GameConfig) -> f32 {
    let mut factor = ((held_ms / config.booster_bounce).sin() + 1.0) / 2.0;
    factor += thrust.max(1.0) - 1.0;
    factor *= 1.0 - roll;
    smooth(factor * config.booster_distance, previous)
}

/// Where the booster sits behind the plane.
pub fn booster_position(position: Vec2, tail: f32, size: Vec2, bonus: f32) -> Vec2 {
    position + Vec2::new((size.x + bonus) * tail.cos(), (size.y + bonus) * tail.sin())
}

#[inline]
pub fn clamp_velocity(velocity: Vec2, max: f32) -> Vec2 {
    velocity.clamp(Vec2::splat(-max), Vec2::splat(max))
}

// ── Systems ────────────────────────────────────────────────────────────────────

type FlightItem<'a> = (
    &'a mut Transform,
    &'a mut Velocity,
    &'a mut Flight,
    &'a mut PlaneStatus,
    &'a mut Booster,
);

/// Run the flight model for every plane of the roster, in roster order.
#[allow(clippy::too_many_arguments)]
pub fn flight_system(
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    settings: Res<LevelSettings>,
    roster: Res<LevelRoster>,
    turns: Res<Turns>,
    mut presentation: ResMut<Presentation>,
    mut sounds: MessageWriter<SoundRequest>,
    mut planes: Query<FlightItem, With<Plane>>,
) {
    let now = clock.now;
    let dt = clock.dt_secs();
    let flown_plane = turns.flown(settings.autopilot);

    for &entity in &roster.planes {
        let Ok((mut transform, mut velocity, mut flight, mut status, mut booster)) =
            planes.get_mut(entity)
        else {
            continue;
        };

        if !flight.nan_flagged && !transform.translation.truncate().is_finite() {
            warn!("Plane {:?} position is not finite", entity);
            flight.nan_flagged = true;
        }

        if status.inert {
            flight.thrust = 0.0;
            flight.roll = 0.0;
            flight.acceleration = Vec2::ZERO;
            velocity.angvel = 0.0;
            velocity.linvel = apply_drag(velocity.linvel, true, None, false, 0.0, &config);
            continue;
        }

        let flown = flown_plane == Some(entity);

        // controls
        if settings.autopilot {
            flight.thrust = 1.0;
            transform.rotation = Quat::from_rotation_z(AUTOPILOT_ANGLE.to_radians());
        } else if !flown {
            flight.thrust = 0.0;
            flight.roll = 0.0;
        }

        // winner
        if status.winning {
            flight.thrust = 0.0;
            flight.roll = 0.0;
        }

        // thrusters
        let remaining = flight.afterburner_remaining(now, config.afterburner_cooldown);
        flight.afterburner_thrust = afterburner_thrust(remaining, flight.afterburner_thrust);
        flight.thrust += config.afterburner_thrust_boost * flight.afterburner_thrust;
        flight.max_velocity = max_velocity(flight.afterburner_thrust, &settings, &config);

        // tradeoff
        let (thrust, roll) = tradeoff(flight.thrust, flight.roll, &config);
        flight.thrust = thrust;
        flight.roll = roll;

        // ailerons
        flight.theta = settings.heading.theta(angle_degrees(&transform));
        velocity.angvel = (config.plane_droll * flight.roll).to_radians();

        // gravity
        flight.acceleration = if flown {
            thrust_acceleration(
                flight.thrust,
                flight.theta,
                settings.heading,
                status.winning,
                settings.autopilot,
                &config,
            )
        } else {
            Vec2::ZERO
        };

        // booster
        if flight.thrust <= THRUST_EPSILON {
            booster.visible = false;
            booster.bonus = 0.0;
            booster.held_ms = 0.0;
            if booster.sound_active {
                sounds.write(SoundRequest::new(SoundCue::ThrustLoopStop(entity)));
                booster.sound_active = false;
            }
        } else {
            booster.visible = true;
            booster.held_ms += clock.dt as f32;
            if flight.afterburner_thrust == 0.0 {
                booster.afterburner = false;
            }
            if !booster.sound_active && !settings.autopilot {
                sounds.write(SoundRequest::loud(SoundCue::ThrustLoopStart(entity), 0.4));
                booster.sound_active = true;
            }
        }
        booster.bonus = booster_bonus(
            booster.held_ms,
            flight.thrust,
            flight.roll,
            booster.bonus,
            &config,
        );
        booster.position = booster_position(
            transform.translation.truncate(),
            settings.heading.tail(flight.theta),
            Vec2::new(config.plane_width, config.plane_height),
            booster.bonus,
        );

        // relativity
        flight.squish = squish(flight.thrust, flight.squish, &config);
        if flown && !settings.blastoff {
            presentation.time_scale = 1.0 + flight.afterburner_thrust * config.time_thrust;
            presentation.zoom = 1.0 + flight.afterburner_thrust * config.zoom_thrust;
        }

        // drag
        velocity.linvel = apply_drag(
            velocity.linvel,
            status.winning,
            Some(flight.thrust),
            flown,
            flight.afterburner_thrust,
            &config,
        );

        // suction
        let depth = transform.translation.y - settings.goal_depth - settings.tile_height;
        if status.suction && (!status.winning || depth < 0.0) {
            flight.acceleration.y += config.suction_acceleration;
        }

        // jelly
        if status.winning {
            if status.settled_at.is_none()
                && velocity.linvel.x.abs() < JELLY_THRESHOLD
                && velocity.linvel.y.abs() < JELLY_THRESHOLD
            {
                status.settled_at = Some(now);
                velocity.linvel = Vec2::ZERO;
            }
            if let Some(settled_at) = status.settled_at {
                if now - settled_at > config.goal_wait {
                    status.inert = true;
                    info!("Plane {:?} settled at the goal", entity);
                }
            }
        }

        let integrated = velocity.linvel + flight.acceleration * dt;
        velocity.linvel = clamp_velocity(integrated, flight.max_velocity);
    }
}

/// Wrecks only feel drag.
pub fn wreck_drag_system(
    config: Res<GameConfig>,
    roster: Res<LevelRoster>,
    mut wrecks: Query<(&Wreck, &mut Velocity)>,
) {
    for &entity in &roster.wrecks {
        let Ok((wreck, mut velocity)) = wrecks.get_mut(entity) else {
            continue;
        };
        velocity.linvel = apply_drag(velocity.linvel, wreck.winning, None, false, 0.0, &config);
    }
}

/// While the player picks a plane, every plane holds still.
pub fn freeze_planes_system(mut planes: Query<(&mut Flight, &mut Velocity), With<Plane>>) {
    for (mut flight, mut velocity) in planes.iter_mut() {
        flight.thrust = 0.0;
        flight.roll = 0.0;
        flight.acceleration = Vec2::ZERO;
        velocity.linvel = Vec2::ZERO;
        velocity.angvel = 0.0;
    }
}
