//! Overlap resolution: damage, debounce, impulses, goals and mines.
//!
//! Rapier reports touching pairs; [`collect_overlaps_system`] tags each side
//! with its [`EntityKind`] and writes one [`OverlapEvent`] per pair, kinds in
//! ascending order.  [`resolve_overlaps_system`] then applies the game rules:
//!
//! | Pair            | Effect                                                         |
//! |-----------------|----------------------------------------------------------------|
//! | plane ↔ wall    | collision damage, 100 ms debounce; winners immune              |
//! | plane ↔ plane   | damage both, 200 ms debounce, push apart                       |
//! | plane ↔ wreck   | damage the plane, 200 ms debounce, push apart                  |
//! | plane ↔ turret  | damage the plane, 200 ms debounce, push the plane away         |
//! | plane ↔ bullet  | bullet damage unless self-fired; bullet consumed               |
//! | turret ↔ bullet | suppress the turret's gun unless self-fired; bullet consumed   |
//! | plane ↔ goal    | plane wins (perfect if undamaged)                              |
//! | plane ↔ pregoal | plane feels goal suction                                       |
//! | plane ↔ mine    | lethal damage; mine explodes                                   |
//! | mine ↔ bullet   | both destroyed                                                 |
//! | wreck ↔ mine    | both destroyed                                                 |
//! | wreck ↔ goal    | wreck coasts under goal drag                                   |
//! | bullet ↔ goal   | bullet consumed                                                |
//!
//! Collision damage is `collide_damage × rand(1, 2)`; bullet damage is
//! `bullet_damage × rand(1, 2)`.  An entity destroyed earlier in the same tick
//! takes no further part in resolution.

use crate::clock::{DeferredAction, RngStream, SimClock, SimRng, TimerQueue};
use crate::config::GameConfig;
use crate::constants::{DAMAGE_JITTER_MAX, DAMAGE_JITTER_MIN, WRECK_VELOCITY_FACTOR};
use crate::effects::{EffectRequest, SoundCue, SoundRequest};
use crate::level::{angle_degrees, spawn_wreck, EntityKind, LevelRoster, LevelSettings, Mine};
use crate::plane::state::{
    Booster, Bullet, Debounce, DebounceKey, Hull, Plane, PlaneStatus, Turret, Weapon, Wreck,
};
use crate::turns::Turns;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use std::collections::HashSet;

/// Two entities touching this tick.  `kind_a <= kind_b`.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEvent {
    pub kind_a: EntityKind,
    pub a: Entity,
    pub kind_b: EntityKind,
    pub b: Entity,
}

impl OverlapEvent {
    /// Build an event with the pair ordered by kind.
    pub fn new(kind_1: EntityKind, e1: Entity, kind_2: EntityKind, e2: Entity) -> Self {
        if kind_2 < kind_1 {
            Self {
                kind_a: kind_2,
                a: e2,
                kind_b: kind_1,
                b: e1,
            }
        } else {
            Self {
                kind_a: kind_1,
                a: e1,
                kind_b: kind_2,
                b: e2,
            }
        }
    }
}

// ── Detection ─────────────────────────────────────────────────────────────────

/// Turn rapier's contact and intersection pairs into [`OverlapEvent`]s.
pub fn collect_overlaps_system(
    rapier_context: ReadRapierContext,
    kinds: Query<&EntityKind>,
    mut overlaps: MessageWriter<OverlapEvent>,
) {
    let Ok(rapier) = rapier_context.single() else {
        return;
    };

    let mut emit = |e1: Entity, e2: Entity| {
        if let (Ok(k1), Ok(k2)) = (kinds.get(e1), kinds.get(e2)) {
            overlaps.write(OverlapEvent::new(*k1, e1, *k2, e2));
        }
    };

    for contact_pair in rapier
        .simulation
        .contact_pairs(rapier.colliders, rapier.rigidbody_set)
    {
        // Bullets never produce solver contacts; fall back to penetration depth.
        let touching = contact_pair.has_any_active_contact()
            || contact_pair
                .manifolds()
                .any(|manifold| manifold.points().any(|point| point.dist() <= 0.0));
        if !touching {
            continue;
        }
        let Some(e1) = contact_pair.collider1() else {
            continue;
        };
        let Some(e2) = contact_pair.collider2() else {
            continue;
        };
        emit(e1, e2);
    }

    for (e1, e2, intersecting) in rapier.simulation.intersection_pairs(rapier.colliders) {
        if intersecting {
            emit(e1, e2);
        }
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

type PlaneItem<'a> = (
    &'a Transform,
    &'a mut Velocity,
    &'a mut Hull,
    &'a mut PlaneStatus,
    &'a mut Debounce,
    &'a Booster,
);

type PlaneQuery<'w, 's> = Query<'w, 's, PlaneItem<'static>, With<Plane>>;

type WreckQuery<'w, 's> = Query<
    'w,
    's,
    (&'static Transform, &'static mut Velocity, &'static mut Debounce, &'static mut Wreck),
    Without<Plane>,
>;

type TurretQuery<'w, 's> =
    Query<'w, 's, (&'static Transform, &'static mut Weapon), (With<Turret>, Without<Plane>)>;

/// Shared state for resolving one tick's overlaps.
#[derive(SystemParam)]
pub struct CollisionCtx<'w, 's> {
    commands: Commands<'w, 's>,
    clock: Res<'w, SimClock>,
    config: Res<'w, GameConfig>,
    settings: Res<'w, LevelSettings>,
    rng: ResMut<'w, SimRng>,
    roster: ResMut<'w, LevelRoster>,
    turns: ResMut<'w, Turns>,
    timers: ResMut<'w, TimerQueue>,
    sounds: MessageWriter<'w, SoundRequest>,
    effects: MessageWriter<'w, EffectRequest>,
    destroyed: Local<'s, HashSet<Entity>>,
}

impl CollisionCtx<'_, '_> {
    fn gone(&self, entity: Entity) -> bool {
        self.destroyed.contains(&entity)
    }

    fn damage_roll(&mut self, base: f32) -> f32 {
        base * self
            .rng
            .rand_between_f32(RngStream::Damage, DAMAGE_JITTER_MIN, DAMAGE_JITTER_MAX)
    }

    fn despawn(&mut self, entity: Entity) {
        self.destroyed.insert(entity);
        self.commands.entity(entity).try_despawn();
    }

    fn explode(&mut self, at: Vec2) {
        self.effects.write(EffectRequest::Shockwave { at });
        self.effects.write(EffectRequest::Explosion { at });
    }

    /// Add damage to a plane.  Returns `true` if the plane was destroyed.
    fn damage_plane(&mut self, plane: Entity, amount: f32, planes: &mut PlaneQuery) -> bool {
        if self.settings.no_damage || self.gone(plane) {
            return false;
        }
        let Ok((transform, velocity, mut hull, status, _, booster)) = planes.get_mut(plane) else {
            return false;
        };

        if status.winning {
            self.sounds.write(SoundRequest::loud(SoundCue::HitPlane, 3.0));
            return false;
        }

        hull.damage += amount;
        let health = self.config.plane_health;
        if self.turns.is_current(plane) {
            self.effects.write(EffectRequest::Trauma {
                amount: hull.damage / health,
            });
        }
        self.effects
            .write(EffectRequest::DamageFlash { target: plane });

        if hull.damage >= health {
            let position = transform.translation.truncate();
            let angle = angle_degrees(transform);
            let linvel = velocity.linvel;
            let looping = booster.sound_active;
            self.destroy_plane(plane, position, angle, linvel, looping);
            true
        } else {
            self.sounds.write(SoundRequest::loud(SoundCue::HitPlane, 3.0));
            false
        }
    }

    /// Replace a plane with a wreck and hand control on if it was flown.
    fn destroy_plane(
        &mut self,
        plane: Entity,
        position: Vec2,
        angle: f32,
        velocity: Vec2,
        engine_looping: bool,
    ) {
        let was_current = self.turns.is_current(plane);

        self.roster.remove_plane(plane);
        if self.turns.forget(plane) {
            info!("Last candidate destroyed during selection; level complete");
        }

        if engine_looping {
            self.sounds
                .write(SoundRequest::new(SoundCue::ThrustLoopStop(plane)));
        }

        let wreck = spawn_wreck(
            &mut self.commands,
            &self.config,
            position,
            angle,
            velocity * WRECK_VELOCITY_FACTOR,
            false,
        );
        self.roster.wrecks.push(wreck);

        self.explode(position);
        self.sounds.write(SoundRequest::new(SoundCue::Explode));
        self.despawn(plane);

        if was_current {
            self.timers.schedule(
                self.clock.now,
                self.config.reselect_delay,
                DeferredAction::ChangePlanes,
            );
        }

        info!(
            "Plane {:?} destroyed at ({:.0}, {:.0}){}",
            plane,
            position.x,
            position.y,
            if was_current { ", reselecting" } else { "" }
        );
    }
}

fn push_apart(velocity: &mut Velocity, from: Vec2, to: Vec2, amount: f32) {
    let away = (to - from).y.atan2((to - from).x);
    velocity.linvel += Vec2::new(away.cos(), away.sin()) * amount;
}

/// Apply the game rules to every overlap reported this tick.
#[allow(clippy::too_many_arguments)]
pub fn resolve_overlaps_system(
    mut overlaps: MessageReader<OverlapEvent>,
    mut ctx: CollisionCtx,
    mut planes: PlaneQuery,
    mut wrecks: WreckQuery,
    mut turrets: TurretQuery,
    bullets: Query<&Bullet>,
    mines: Query<&Transform, With<Mine>>,
) {
    ctx.destroyed.clear();

    for overlap in overlaps.read() {
        if ctx.gone(overlap.a) || ctx.gone(overlap.b) {
            continue;
        }
        let (a, b) = (overlap.a, overlap.b);

        match (overlap.kind_a, overlap.kind_b) {
            (EntityKind::Plane, EntityKind::Wall) => plane_wall(&mut ctx, a, &mut planes),
            (EntityKind::Plane, EntityKind::Plane) => plane_plane(&mut ctx, a, b, &mut planes),
            (EntityKind::Plane, EntityKind::Wreck) => {
                plane_wreck(&mut ctx, a, b, &mut planes, &mut wrecks)
            }
            (EntityKind::Plane, EntityKind::Turret) => {
                plane_turret(&mut ctx, a, b, &mut planes, &turrets)
            }
            (EntityKind::Plane, EntityKind::Bullet) => {
                let Ok(bullet) = bullets.get(b) else {
                    continue;
                };
                if bullet.shooter == a {
                    continue;
                }
                let damage = ctx.damage_roll(ctx.config.bullet_damage);
                ctx.damage_plane(a, damage, &mut planes);
                ctx.despawn(b);
            }
            (EntityKind::Turret, EntityKind::Bullet) => {
                let Ok(bullet) = bullets.get(b) else {
                    continue;
                };
                if bullet.shooter == a {
                    continue;
                }
                if let Ok((_, mut weapon)) = turrets.get_mut(a) {
                    weapon.delay(ctx.config.turret_hit_penalty);
                }
                ctx.effects.write(EffectRequest::DamageFlash { target: a });
                ctx.sounds.write(SoundRequest::new(SoundCue::HitTurret));
                ctx.despawn(b);
            }
            (EntityKind::Plane, EntityKind::Goal) => plane_goal(&mut ctx, a, &mut planes),
            (EntityKind::Plane, EntityKind::Pregoal) => {
                if let Ok((_, _, _, mut status, _, _)) = planes.get_mut(a) {
                    status.suction = true;
                }
            }
            (EntityKind::Plane, EntityKind::Mine) => {
                let Ok(mine) = mines.get(b) else {
                    continue;
                };
                let at = mine.translation.truncate();
                let lethal = ctx.config.plane_health;
                if !ctx.damage_plane(a, lethal, &mut planes) {
                    ctx.sounds.write(SoundRequest::new(SoundCue::Explode));
                }
                ctx.explode(at);
                ctx.despawn(b);
            }
            (EntityKind::Mine, EntityKind::Bullet) => {
                let Ok(mine) = mines.get(a) else {
                    continue;
                };
                let at = mine.translation.truncate();
                ctx.explode(at);
                ctx.despawn(a);
                ctx.despawn(b);
                ctx.sounds.write(SoundRequest::new(SoundCue::Explode));
            }
            (EntityKind::Wreck, EntityKind::Mine) => {
                let (Ok((wreck, ..)), Ok(mine)) = (wrecks.get(a), mines.get(b)) else {
                    continue;
                };
                let (wreck_at, mine_at) = (wreck.translation.truncate(), mine.translation.truncate());
                ctx.sounds.write(SoundRequest::new(SoundCue::Explode));
                ctx.explode(mine_at);
                ctx.despawn(b);
                ctx.explode(wreck_at);
                ctx.despawn(a);
                ctx.roster.remove_wreck(a);
            }
            (EntityKind::Wreck, EntityKind::Goal) => {
                if let Ok((_, _, _, mut wreck)) = wrecks.get_mut(a) {
                    wreck.winning = true;
                }
            }
            (EntityKind::Bullet, EntityKind::Goal) => ctx.despawn(a),
            _ => {}
        }
    }
}

fn plane_wall(ctx: &mut CollisionCtx, plane: Entity, planes: &mut PlaneQuery) {
    let now = ctx.clock.now;
    let Ok((_, _, _, status, debounce, _)) = planes.get(plane) else {
        return;
    };
    if status.winning {
        return;
    }
    let ready = debounce.ready(DebounceKey::Wall, now);

    let damage = ctx.damage_roll(ctx.config.collide_damage);
    if !ready {
        return;
    }
    ctx.damage_plane(plane, damage, planes);
    if let Ok((_, _, _, _, mut debounce, _)) = planes.get_mut(plane) {
        debounce.arm(DebounceKey::Wall, now + ctx.config.wall_debounce);
    }
}

fn plane_plane(ctx: &mut CollisionCtx, first: Entity, second: Entity, planes: &mut PlaneQuery) {
    let now = ctx.clock.now;
    let (Ok((t1, _, _, _, d1, _)), Ok((t2, _, _, _, d2, _))) = (planes.get(first), planes.get(second))
    else {
        return;
    };
    let (p1, p2) = (t1.translation.truncate(), t2.translation.truncate());
    let ready = d1.ready(DebounceKey::Partner(second), now)
        || d2.ready(DebounceKey::Partner(first), now);

    let damage = ctx.damage_roll(ctx.config.collide_damage);
    if ready {
        ctx.damage_plane(first, damage, planes);
        ctx.damage_plane(second, damage, planes);
        let until = now + ctx.config.body_debounce;
        for (plane, partner) in [(first, second), (second, first)] {
            if let Ok((_, _, _, _, mut debounce, _)) = planes.get_mut(plane) {
                debounce.arm(DebounceKey::Partner(partner), until);
            }
        }
    }

    let impulse = ctx.config.collision_impulse;
    for (plane, from, to) in [(second, p1, p2), (first, p2, p1)] {
        if ctx.gone(plane) {
            continue;
        }
        if let Ok((_, mut velocity, ..)) = planes.get_mut(plane) {
            push_apart(&mut velocity, from, to, impulse);
        }
    }
}

fn plane_wreck(
    ctx: &mut CollisionCtx,
    plane: Entity,
    wreck: Entity,
    planes: &mut PlaneQuery,
    wrecks: &mut WreckQuery,
) {
    let now = ctx.clock.now;
    let (Ok((plane_t, _, _, _, plane_d, _)), Ok((wreck_t, _, wreck_d, _))) =
        (planes.get(plane), wrecks.get(wreck))
    else {
        return;
    };
    let (plane_at, wreck_at) = (plane_t.translation.truncate(), wreck_t.translation.truncate());
    let ready = plane_d.ready(DebounceKey::Partner(wreck), now)
        || wreck_d.ready(DebounceKey::Partner(plane), now);

    let damage = ctx.damage_roll(ctx.config.collide_damage);
    if ready {
        ctx.damage_plane(plane, damage, planes);
        let until = now + ctx.config.body_debounce;
        if let Ok((_, _, _, _, mut debounce, _)) = planes.get_mut(plane) {
            debounce.arm(DebounceKey::Partner(wreck), until);
        }
        if let Ok((_, _, mut debounce, _)) = wrecks.get_mut(wreck) {
            debounce.arm(DebounceKey::Partner(plane), until);
        }
    }

    let impulse = ctx.config.collision_impulse;
    if let Ok((_, mut velocity, ..)) = wrecks.get_mut(wreck) {
        push_apart(&mut velocity, plane_at, wreck_at, impulse);
    }
    if !ctx.gone(plane) {
        if let Ok((_, mut velocity, ..)) = planes.get_mut(plane) {
            push_apart(&mut velocity, wreck_at, plane_at, impulse);
        }
    }
}

fn plane_turret(
    ctx: &mut CollisionCtx,
    plane: Entity,
    turret: Entity,
    planes: &mut PlaneQuery,
    turrets: &TurretQuery,
) {
    let now = ctx.clock.now;
    let (Ok((plane_t, _, _, _, debounce, _)), Ok((turret_t, _))) =
        (planes.get(plane), turrets.get(turret))
    else {
        return;
    };
    let (plane_at, turret_at) = (plane_t.translation.truncate(), turret_t.translation.truncate());
    let ready = debounce.ready(DebounceKey::Partner(turret), now);

    let damage = ctx.damage_roll(ctx.config.collide_damage);
    if ready {
        ctx.damage_plane(plane, damage, planes);
        if let Ok((_, _, _, _, mut debounce, _)) = planes.get_mut(plane) {
            debounce.arm(DebounceKey::Partner(turret), now + ctx.config.body_debounce);
        }
    }

    if !ctx.gone(plane) {
        if let Ok((_, mut velocity, ..)) = planes.get_mut(plane) {
            push_apart(&mut velocity, turret_at, plane_at, ctx.config.collision_impulse);
        }
    }
}

fn plane_goal(ctx: &mut CollisionCtx, plane: Entity, planes: &mut PlaneQuery) {
    let Ok((transform, _, hull, mut status, _, _)) = planes.get_mut(plane) else {
        return;
    };
    if status.winning {
        return;
    }

    if hull.damage == 0.0 {
        status.perfect = true;
        if !ctx.settings.hide_contract {
            ctx.effects.write(EffectRequest::Speak {
                at: transform.translation.truncate(),
                text: "PERFECT!".to_string(),
            });
        }
    }
    status.winning = true;

    if ctx.turns.is_current(plane) {
        ctx.sounds.write(SoundRequest::new(SoundCue::Goal));
    }
    if !ctx.settings.hide_contract {
        ctx.effects.write(EffectRequest::WinLabel { plane });
    }
    info!(
        "Plane {:?} reached the goal{}",
        plane,
        if status.perfect { " (perfect)" } else { "" }
    );
}
