//! Guns, afterburner and turret fire.
//!
//! A gun fires when its cooldown has expired, its owner is not winning, and
//! plane selection is not open.  Planes fire a three-way spread with recoil;
//! turrets wind up for `turret_windup` ms and release one jittered bullet
//! through the timer queue.  Turret cooldowns are stretched by a random factor
//! in `[1, 3)`.

use crate::clock::{DeferredAction, RngStream, SimClock, SimRng, TimerFired, TimerQueue};
use crate::config::GameConfig;
use crate::constants::{TURRET_COOLDOWN_JITTER_MAX, TURRET_COOLDOWN_JITTER_MIN};
use crate::effects::{EffectRequest, SoundCue, SoundRequest};
use crate::input::PilotCommand;
use crate::level::{spawn_bullet, LevelRoster, LevelSettings};
use crate::plane::flight::booster_position;
use crate::plane::state::{Booster, Bullet, Flight, Lifetime, Plane, PlaneStatus, Turret, Weapon};
use crate::turns::{TurnPhase, Turns};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Guard shared by every gun: cooldown expired, owner not winning, no
/// selection in progress.
pub fn can_shoot(weapon: &Weapon, winning: bool, changing_planes: bool, now: f64) -> bool {
    !changing_planes && !winning && weapon.can_fire(now)
}

/// Bearings of the player's spread around `aim`.
pub fn spread_bearings(aim: f32, spread: f32) -> [f32; 3] {
    [aim - spread / 2.0, aim, aim + spread / 2.0]
}

/// Start an afterburn.  Returns where the shockwave goes, or `None` when
/// blocked.  `force` skips every guard (scripted blast-off).
#[allow(clippy::too_many_arguments)]
pub fn afterburn(
    flight: &mut Flight,
    booster: &mut Booster,
    status: &PlaneStatus,
    position: Vec2,
    now: f64,
    force: bool,
    settings: &LevelSettings,
    config: &GameConfig,
) -> Option<Vec2> {
    if !force
        && (settings.no_afterburner || status.winning || !flight.afterburner_ready(now))
    {
        return None;
    }

    flight.afterburner_cooldown = now + config.afterburner_cooldown;
    booster.afterburner = true;
    Some(booster_position(
        position,
        settings.heading.tail(flight.theta),
        Vec2::new(config.plane_width, config.plane_height),
        config.booster_shock_offset,
    ))
}

type ArmedPlane<'a> = (
    &'a Transform,
    &'a mut Velocity,
    &'a mut Flight,
    &'a PlaneStatus,
    &'a mut Weapon,
    &'a mut Booster,
);

/// Apply fire, gun-switch and afterburner commands.
#[allow(clippy::too_many_arguments)]
pub fn pilot_command_system(
    mut commands: Commands,
    mut requests: MessageReader<PilotCommand>,
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    settings: Res<LevelSettings>,
    turns: Res<Turns>,
    mut planes: Query<ArmedPlane, With<Plane>>,
    mut sounds: MessageWriter<SoundRequest>,
    mut effects: MessageWriter<EffectRequest>,
) {
    let now = clock.now;
    let changing_planes = turns.phase == TurnPhase::ChangingPlanes;

    for request in requests.read() {
        match *request {
            PilotCommand::Fire { plane, aim } => {
                if settings.no_shooting {
                    continue;
                }
                let Ok((transform, mut velocity, flight, status, mut weapon, _)) =
                    planes.get_mut(plane)
                else {
                    continue;
                };
                if !can_shoot(&weapon, status.winning, changing_planes, now) {
                    continue;
                }

                let gun = config.gun(weapon.current_gun);
                let aim = aim.unwrap_or_else(|| settings.heading.nose(flight.theta));
                velocity.linvel -= Vec2::new(aim.cos(), aim.sin()) * gun.recoil;
                sounds.write(SoundRequest::loud(SoundCue::Shoot, 3.0));

                let origin = transform.translation.truncate();
                for bearing in spread_bearings(aim, config.player_spread) {
                    spawn_bullet(
                        &mut commands,
                        &config,
                        plane,
                        weapon.current_gun,
                        origin,
                        bearing,
                        now,
                    );
                }
                weapon.set_cooldown(now + gun.cooldown);
            }
            PilotCommand::SwitchGun { plane, delta } => {
                let Ok((transform, _, mut flight, status, mut weapon, mut booster)) =
                    planes.get_mut(plane)
                else {
                    continue;
                };
                if status.winning || !flight.afterburner_ready(now) {
                    continue;
                }
                weapon.cycle(delta);
                let shock = afterburn(
                    &mut flight,
                    &mut booster,
                    status,
                    transform.translation.truncate(),
                    now,
                    true,
                    &settings,
                    &config,
                );
                if let Some(at) = shock {
                    sounds.write(SoundRequest::new(SoundCue::Afterburner));
                    effects.write(EffectRequest::Shockwave { at });
                }
            }
            PilotCommand::Afterburner { plane } => {
                let Ok((transform, _, mut flight, status, _, mut booster)) = planes.get_mut(plane)
                else {
                    continue;
                };
                let shock = afterburn(
                    &mut flight,
                    &mut booster,
                    status,
                    transform.translation.truncate(),
                    now,
                    false,
                    &settings,
                    &config,
                );
                if let Some(at) = shock {
                    sounds.write(SoundRequest::new(SoundCue::Afterburner));
                    effects.write(EffectRequest::Shockwave { at });
                }
            }
        }
    }
}

/// Turrets commit to a shot at the current plane when it is in range.
#[allow(clippy::too_many_arguments)]
pub fn turret_system(
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    roster: Res<LevelRoster>,
    turns: Res<Turns>,
    mut rng: ResMut<SimRng>,
    mut timers: ResMut<TimerQueue>,
    mut turrets: Query<(&Transform, &mut Weapon), (With<Turret>, Without<Plane>)>,
    planes: Query<(&Transform, &PlaneStatus), With<Plane>>,
) {
    let Some(current) = turns.current else {
        return;
    };
    let Ok((target, status)) = planes.get(current) else {
        return;
    };
    if status.winning {
        return;
    }
    let target = target.translation.truncate();
    let now = clock.now;
    let changing_planes = turns.phase == TurnPhase::ChangingPlanes;

    for &turret in &roster.turrets {
        let Ok((transform, mut weapon)) = turrets.get_mut(turret) else {
            continue;
        };
        let offset = target - transform.translation.truncate();
        if offset.length() > config.turret_range {
            continue;
        }
        if !can_shoot(&weapon, false, changing_planes, now) {
            continue;
        }

        let theta = offset.y.atan2(offset.x);
        let cooldown = config.gun(weapon.current_gun).cooldown
            * rng.rand_between(
                RngStream::TurretCooldown,
                TURRET_COOLDOWN_JITTER_MIN,
                TURRET_COOLDOWN_JITTER_MAX,
            );
        let variance = config.turret_variance;
        let jitter =
            rng.rand_between_f32(RngStream::BulletVariance, -variance / 2.0, variance / 2.0);

        timers.schedule(
            now,
            config.turret_windup,
            DeferredAction::TurretBullet {
                turret,
                theta: theta + jitter,
            },
        );
        weapon.set_cooldown(now + cooldown);
    }
}

/// Release wound-up turret shots.
pub fn turret_bullet_system(
    mut commands: Commands,
    mut fired: MessageReader<TimerFired>,
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    turrets: Query<(&Transform, &Weapon), With<Turret>>,
) {
    for TimerFired(action) in fired.read() {
        let DeferredAction::TurretBullet { turret, theta } = *action else {
            continue;
        };
        let Ok((transform, weapon)) = turrets.get(turret) else {
            continue;
        };
        spawn_bullet(
            &mut commands,
            &config,
            turret,
            weapon.current_gun,
            transform.translation.truncate(),
            theta,
            clock.now,
        );
    }
}

/// Despawn bullets whose time is up.
pub fn bullet_lifetime_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    bullets: Query<(Entity, &Lifetime), With<Bullet>>,
) {
    for (entity, lifetime) in bullets.iter() {
        if clock.now >= lifetime.expires_at {
            commands.entity(entity).try_despawn();
        }
    }
}
