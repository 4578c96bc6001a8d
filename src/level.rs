//! Level geometry, per-level settings and entity spawning.
//!
//! Tile-map parsing happens upstream; the core receives a [`LevelLayout`]
//! (rectangles and spawn points in y-down level pixels) and turns it into
//! entities with rapier bodies.
//!
//! ## Bodies
//!
//! | Kind     | Rapier body                        | Collider         |
//! |----------|------------------------------------|------------------|
//! | Plane    | `Dynamic`                          | cuboid           |
//! | Wreck    | `Dynamic`                          | cuboid           |
//! | Turret   | `Fixed`                            | cuboid           |
//! | Wall     | `Fixed`                            | cuboid           |
//! | Goal     | none (static)                      | cuboid, `Sensor` |
//! | Pregoal  | none (static)                      | cuboid, `Sensor` |
//! | Mine     | none (static)                      | ball, `Sensor`   |
//! | Bullet   | `KinematicVelocityBased`, no solve | ball             |

use crate::clock::{RngStream, SimRng};
use crate::config::GameConfig;
use crate::constants::*;
use crate::error::{SimError, SimResult};
use crate::plane::state::{
    Booster, Bullet, Debounce, Flight, Hull, Lifetime, Plane, PlaneStatus, Turret, Weapon, Wreck,
};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use serde::Deserialize;
use std::f32::consts::{FRAC_PI_2, PI};

// ── Settings ───────────────────────────────────────────────────────────────────

/// How a body angle (degrees) maps onto the heading `theta`.
///
/// Both conventions put the nose at angle 0 pointing up the screen; they
/// differ only in where `theta` sits relative to the nose, so thrust, aim and
/// booster placement all go through [`HeadingConvention::nose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum HeadingConvention {
    /// `theta = angle`
    Direct,
    /// `theta = angle + 180°`
    #[default]
    Flipped,
}

impl HeadingConvention {
    pub fn theta(self, angle_degrees: f32) -> f32 {
        match self {
            HeadingConvention::Direct => angle_degrees.to_radians(),
            HeadingConvention::Flipped => (angle_degrees + 180.0).to_radians(),
        }
    }

    /// Bearing (radians, y-down) the nose points along.
    pub fn nose(self, theta: f32) -> f32 {
        match self {
            HeadingConvention::Direct => theta - FRAC_PI_2,
            HeadingConvention::Flipped => theta + FRAC_PI_2,
        }
    }

    /// Bearing of the tail, where the booster trails.
    pub fn tail(self, theta: f32) -> f32 {
        self.nose(theta) + PI
    }
}

/// Sort order of the plane-selection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum AvailableOrder {
    #[default]
    AscendingX,
    DescendingX,
}

/// Per-level configuration.  Tutorial and scripted levels toggle the named
/// flags instead of patching behaviour at runtime.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    pub id: String,
    pub gun_count: usize,
    pub heading: HeadingConvention,
    pub available_order: AvailableOrder,
    /// y coordinate of the goal line; set from the first goal at spawn.
    pub goal_depth: f32,
    pub tile_height: f32,
    pub no_damage: bool,
    pub no_shooting: bool,
    pub no_afterburner: bool,
    /// Scripted demo flight: every plane flies itself.
    pub autopilot: bool,
    /// Scripted ending in progress.
    pub blastoff: bool,
    /// Hide the score HUD and suppress its sounds.
    pub hide_contract: bool,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            id: String::new(),
            gun_count: GUN_COUNT,
            heading: HeadingConvention::default(),
            available_order: AvailableOrder::default(),
            goal_depth: 0.0,
            tile_height: TILE_HEIGHT,
            no_damage: false,
            no_shooting: false,
            no_afterburner: false,
            autopilot: false,
            blastoff: false,
            hide_contract: false,
        }
    }
}

// ── Layout ─────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle, top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Area {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PlaneSpawn {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub sprite: String,
}

/// Quarter turn applied to a turret tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum QuarterTurn {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TurretSpawn {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub rotate: QuarterTurn,
}

impl TurretSpawn {
    pub fn facing(&self) -> f32 {
        match self.rotate {
            QuarterTurn::None => self.angle,
            QuarterTurn::Right => self.angle - 90.0,
            QuarterTurn::Left => self.angle + 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct MineSpawn {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct WreckSpawn {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub winning: bool,
}

/// Static description of one level as produced by the map loader.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LevelLayout {
    pub name: String,
    pub settings: LevelSettings,
    pub planes: Vec<PlaneSpawn>,
    pub walls: Vec<Area>,
    pub goals: Vec<Area>,
    pub pregoals: Vec<Area>,
    pub turrets: Vec<TurretSpawn>,
    pub mines: Vec<MineSpawn>,
    pub wrecks: Vec<WreckSpawn>,
}

impl LevelLayout {
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        toml::from_str::<LevelLayout>(text).map_err(|e| SimError::ConfigParse {
            source: "level layout".to_string(),
            message: e.to_string(),
        })
    }

    /// A level needs a goal to measure depth against and a plane to fly.
    pub fn validate(&self) -> SimResult<()> {
        if self.goals.is_empty() {
            return Err(SimError::InvalidLayout {
                level: self.name.clone(),
                reason: "no goal",
            });
        }
        if self.planes.is_empty() {
            return Err(SimError::InvalidLayout {
                level: self.name.clone(),
                reason: "no planes",
            });
        }
        Ok(())
    }

    /// Top edge of the first goal.
    pub fn goal_depth(&self) -> Option<f32> {
        self.goals.first().map(|goal| goal.y)
    }
}

// ── Entities ───────────────────────────────────────────────────────────────────

/// Collision category of an entity; the overlap dispatcher switches on pairs
/// of these.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Plane,
    Turret,
    Wreck,
    Mine,
    Bullet,
    Goal,
    Pregoal,
    Wall,
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Wall;

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Goal;

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Pregoal;

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Mine;

/// Ordered collections of the running level.  Iteration order of the flight
/// and turret passes follows these lists, not query order.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LevelRoster {
    pub planes: Vec<Entity>,
    pub wrecks: Vec<Entity>,
    pub turrets: Vec<Entity>,
}

impl LevelRoster {
    /// Drop a plane, keeping the order of the rest.
    pub fn remove_plane(&mut self, plane: Entity) {
        self.planes = self
            .planes
            .iter()
            .copied()
            .filter(|p| *p != plane)
            .collect();
    }

    pub fn remove_wreck(&mut self, wreck: Entity) {
        self.wrecks.retain(|w| *w != wreck);
    }
}

/// A winning plane archived from a shallower run of this level.
#[derive(Debug, Clone, PartialEq)]
pub struct CarriedPlane {
    pub position: Vec2,
    pub angle: f32,
    pub sprite: String,
    pub damage: f32,
    pub perfect: bool,
}

/// A wreck archived from a shallower run of this level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarriedWreck {
    pub position: Vec2,
    pub angle: f32,
    pub winning: bool,
}

/// Result of [`spawn_level`].
#[derive(Debug, Clone)]
pub struct SpawnedLevel {
    pub roster: LevelRoster,
    pub settings: LevelSettings,
    /// Non-winning planes and their positions, for the first selection.
    pub candidates: Vec<(Entity, Vec2)>,
}

fn placed(position: Vec2, angle_degrees: f32) -> Transform {
    Transform::from_translation(position.extend(0.0))
        .with_rotation(Quat::from_rotation_z(angle_degrees.to_radians()))
}

/// Body angle in degrees from a transform.
pub fn angle_degrees(transform: &Transform) -> f32 {
    transform.rotation.to_euler(EulerRot::ZYX).0.to_degrees()
}

/// Spawn a plane with every flight capability.
pub fn spawn_plane(
    commands: &mut Commands,
    config: &GameConfig,
    settings: &LevelSettings,
    spawn: &PlaneSpawn,
) -> Entity {
    let flight = Flight {
        theta: settings.heading.theta(spawn.angle),
        max_velocity: config.plane_max_velocity,
        ..Default::default()
    };
    commands
        .spawn((
            (
                Plane {
                    sprite: spawn.sprite.clone(),
                },
                EntityKind::Plane,
                flight,
                PlaneStatus::default(),
                Hull::default(),
                Weapon::ready(settings.gun_count),
                Debounce::default(),
                Booster::default(),
            ),
            placed(Vec2::new(spawn.x, spawn.y), spawn.angle),
            RigidBody::Dynamic,
            Collider::cuboid(config.plane_width / 2.0, config.plane_height / 2.0),
            Velocity::zero(),
            GravityScale(0.0),
        ))
        .id()
}

/// Spawn a wreck.  Used both for layout wrecks and for destroyed planes.
pub fn spawn_wreck(
    commands: &mut Commands,
    config: &GameConfig,
    position: Vec2,
    angle: f32,
    velocity: Vec2,
    winning: bool,
) -> Entity {
    commands
        .spawn((
            Wreck { winning },
            EntityKind::Wreck,
            Debounce::default(),
            placed(position, angle),
            RigidBody::Dynamic,
            Collider::cuboid(config.plane_width / 2.0, config.plane_height / 2.0),
            Velocity::linear(velocity),
            GravityScale(0.0),
        ))
        .id()
}

/// Spawn a bullet fired by `shooter` from `origin` along `theta`.
pub fn spawn_bullet(
    commands: &mut Commands,
    config: &GameConfig,
    shooter: Entity,
    gun: usize,
    origin: Vec2,
    theta: f32,
    now: f64,
) -> Entity {
    let speed = config.gun(gun).speed;
    let velocity = Vec2::new(theta.cos(), theta.sin()) * speed;
    commands
        .spawn((
            Bullet { shooter, gun },
            EntityKind::Bullet,
            Lifetime {
                expires_at: now + config.bullet_ttl,
            },
            Transform::from_translation(origin.extend(0.0))
                .with_rotation(Quat::from_rotation_z(theta + FRAC_PI_2)),
            RigidBody::KinematicVelocityBased,
            Collider::ball(BULLET_RADIUS),
            Velocity::linear(velocity),
            ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC,
            SolverGroups::new(Group::GROUP_4, Group::NONE),
        ))
        .id()
}

/// Spawn every entity of `layout`, plus planes and wrecks carried over from a
/// shallower run.  Turret guns start on a randomized cooldown; plane guns start
/// ready.
pub fn spawn_level(
    commands: &mut Commands,
    layout: &LevelLayout,
    config: &GameConfig,
    rng: &mut SimRng,
    carried_planes: &[CarriedPlane],
    carried_wrecks: &[CarriedWreck],
) -> SimResult<SpawnedLevel> {
    layout.validate()?;

    let mut settings = layout.settings.clone();
    if settings.id.is_empty() {
        settings.id = layout.name.clone();
    }
    settings.goal_depth = layout.goal_depth().unwrap_or_default();

    let mut roster = LevelRoster::default();
    let mut candidates = Vec::new();

    for spawn in &layout.planes {
        let plane = spawn_plane(commands, config, &settings, spawn);
        roster.planes.push(plane);
        candidates.push((plane, Vec2::new(spawn.x, spawn.y)));
    }

    for carried in carried_planes {
        let spawn = PlaneSpawn {
            x: carried.position.x,
            y: carried.position.y,
            angle: carried.angle,
            sprite: carried.sprite.clone(),
        };
        let plane = spawn_plane(commands, config, &settings, &spawn);
        commands.entity(plane).insert((
            PlaneStatus {
                winning: true,
                inert: true,
                perfect: carried.perfect,
                ..Default::default()
            },
            Hull {
                damage: carried.damage,
            },
        ));
        roster.planes.push(plane);
    }

    for spawn in &layout.turrets {
        let cooldowns = (0..settings.gun_count.max(1))
            .map(|_| {
                rng.rand_between(
                    RngStream::Cooldown,
                    TURRET_INITIAL_COOLDOWN_MIN,
                    TURRET_INITIAL_COOLDOWN_MAX,
                )
            })
            .collect();
        let turret = commands
            .spawn((
                Turret,
                EntityKind::Turret,
                Weapon::with_cooldowns(cooldowns),
                placed(Vec2::new(spawn.x, spawn.y), spawn.facing()),
                RigidBody::Fixed,
                Collider::cuboid(TURRET_HALF_EXTENT, TURRET_HALF_EXTENT),
            ))
            .id();
        roster.turrets.push(turret);
    }

    for spawn in &layout.wrecks {
        let wreck = spawn_wreck(
            commands,
            config,
            Vec2::new(spawn.x, spawn.y),
            spawn.angle,
            Vec2::ZERO,
            spawn.winning,
        );
        roster.wrecks.push(wreck);
    }
    for carried in carried_wrecks {
        let wreck = spawn_wreck(
            commands,
            config,
            carried.position,
            carried.angle,
            Vec2::ZERO,
            carried.winning,
        );
        roster.wrecks.push(wreck);
    }

    for area in &layout.walls {
        let half = area.half_extents();
        commands.spawn((
            Wall,
            EntityKind::Wall,
            Transform::from_translation(area.center().extend(0.0)),
            RigidBody::Fixed,
            Collider::cuboid(half.x, half.y),
        ));
    }

    for area in &layout.goals {
        let half = area.half_extents();
        commands.spawn((
            Goal,
            EntityKind::Goal,
            Transform::from_translation(area.center().extend(0.0)),
            Collider::cuboid(half.x, half.y),
            Sensor,
        ));
    }

    for area in &layout.pregoals {
        let half = area.half_extents();
        commands.spawn((
            Pregoal,
            EntityKind::Pregoal,
            Transform::from_translation(area.center().extend(0.0)),
            Collider::cuboid(half.x, half.y),
            Sensor,
        ));
    }

    for mine in &layout.mines {
        commands.spawn((
            Mine,
            EntityKind::Mine,
            Transform::from_translation(Vec3::new(mine.x, mine.y, 0.0)),
            Collider::ball(MINE_RADIUS),
            Sensor,
        ));
    }

    info!(
        "Spawned level '{}': {} planes, {} turrets, {} wrecks, goal depth {}",
        settings.id,
        roster.planes.len(),
        roster.turrets.len(),
        roster.wrecks.len(),
        settings.goal_depth
    );

    Ok(SpawnedLevel {
        roster,
        settings,
        candidates,
    })
}

/// Despawn every level entity (bullets included).
pub fn despawn_level(commands: &mut Commands, entities: &Query<Entity, With<EntityKind>>) {
    let mut count = 0;
    for entity in entities.iter() {
        commands.entity(entity).try_despawn();
        count += 1;
    }
    info!("Tore down level ({} entities)", count);
}
