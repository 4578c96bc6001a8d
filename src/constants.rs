//! Centralised flight, combat and scoring constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::GameConfig`] mirrors every value and lets
//! `assets/props.toml` override them at startup.
//!
//! ## Units
//!
//! - Times are **milliseconds** of simulated time (the [`crate::clock::SimClock`] unit).
//! - Distances are level pixels; level space is y-down, so depth grows with `y`.
//! - Velocities are px/s, accelerations px/s², angular rates degrees/s.

// ── Simulation ────────────────────────────────────────────────────────────────

/// Length of one fixed simulation step (ms).  60 Hz.
pub const TICK_MS: f64 = 1000.0 / 60.0;

/// Timestamp used for "never fired": far enough in the past that every
/// cooldown comparison passes on the first tick.
pub const NEVER: f64 = -100_000.0;

// ── Physics ───────────────────────────────────────────────────────────────────

/// Per-tick horizontal velocity multiplier for a plane that is not thrusting.
/// Also applied vertically to every plane that is not the current plane.
pub const PHYSICS_DRAG: f32 = 0.9;

/// Per-tick velocity multiplier for winning planes coasting into the goal.
///
/// Closer to 1.0 than [`PHYSICS_DRAG`] so arrivals glide to a stop.
pub const PHYSICS_GOAL_DRAG: f32 = 0.95;

/// Upper bound on the goal drag after the afterburner bonus is added.
pub const PHYSICS_GOAL_DRAG_CAP: f32 = 0.98;

/// Time-scale gain per unit of afterburner thrust on the followed plane.
pub const PHYSICS_TIME_THRUST: f32 = 0.5;

/// Camera zoom gain per unit of afterburner thrust on the followed plane.
pub const PHYSICS_ZOOM_THRUST: f32 = -0.2;

// ── Plane: Flight ─────────────────────────────────────────────────────────────

/// Damage at which a plane is destroyed; also the base of its score.
pub const PLANE_HEALTH: f32 = 100.0;

/// Score points per remaining health point.
pub const PLANE_HEALTH_MULTIPLIER: f32 = 2.0;

/// Thrust acceleration (px/s²) at `thrust == 1`.
pub const PLANE_POWER: f32 = 400.0;

/// Downward acceleration (px/s²) while gliding without thrust.
pub const PLANE_GRAVITY: f32 = 200.0;

/// Downward bias (px/s²) still felt while thrusting.
pub const PLANE_THRUST_GRAVITY: f32 = 50.0;

/// Angular rate (deg/s) at `roll == ±1`.
pub const PLANE_DROLL: f32 = 180.0;

/// Roll authority left while boosted (`thrust > 1`).
pub const PLANE_BOOST_ROLL_THRUST_FACTOR: f32 = 0.5;

/// Roll authority left while thrusting normally.
pub const PLANE_ROLL_THRUST_FACTOR: f32 = 0.75;

/// Thrust authority left while rolling.
pub const PLANE_THRUST_ROLL_FACTOR: f32 = 0.8;

/// Thrust that produces a squish factor of 1.0.
pub const PLANE_SQUISH: f32 = 10.0;

/// Baseline per-axis speed cap (px/s).
pub const PLANE_MAX_VELOCITY: f32 = 300.0;

/// Plane sprite extents (px); used for the collider and the booster offset.
pub const PLANE_WIDTH: f32 = 24.0;
pub const PLANE_HEIGHT: f32 = 24.0;

/// Base damage of a bullet hit, scaled by a random factor in `[1, 2]`.
pub const PLANE_BULLET_DAMAGE: f32 = 10.0;

/// Base damage of a body collision, scaled by a random factor in `[1, 2]`.
pub const PLANE_COLLIDE_DAMAGE: f32 = 5.0;

/// Speed cap while the scripted autopilot is flying.
pub const AUTOPILOT_MAX_VELOCITY: f32 = 200.0;

/// Speed cap once the scripted blast-off has started.
pub const BLASTOFF_MAX_VELOCITY: f32 = 1000.0;

/// Heading (degrees) held by the autopilot.
pub const AUTOPILOT_ANGLE: f32 = 90.0;

/// Thrust below which a plane counts as coasting (drag and booster idle).
pub const THRUST_EPSILON: f32 = 0.01;

// ── Afterburner ───────────────────────────────────────────────────────────────

/// Afterburner cooldown (ms); also the decay window of the extra thrust.
pub const AFTERBURNER_COOLDOWN: f64 = 3000.0;

/// Thrust added per unit of afterburner thrust.
pub const AFTERBURNER_THRUST_BOOST: f32 = 1.0;

/// Extra speed-cap multiple per unit of afterburner thrust.
pub const AFTERBURNER_THRUST_MAX: f32 = 1.0;

/// Afterburner thrust below this snaps to zero.
pub const AFTERBURNER_FLOOR: f32 = 0.01;

// ── Booster ───────────────────────────────────────────────────────────────────

/// Period divisor (ms) of the booster bobbing sine.
pub const BOOSTER_BOUNCE: f32 = 100.0;

/// Maximum extra trailing distance (px) of the booster sprite.
pub const BOOSTER_DISTANCE: f32 = 8.0;

/// Extra trailing distance (px) of the afterburner shockwave.
pub const BOOSTER_SHOCK_OFFSET: f32 = 10.0;

// ── Guns ──────────────────────────────────────────────────────────────────────

/// Number of guns carried by planes and turrets.
pub const GUN_COUNT: usize = 1;

/// Cooldown (ms) of gun 0.
pub const GUN_COOLDOWN: f64 = 500.0;

/// Bullet speed (px/s) of gun 0.
pub const GUN_SPEED: f32 = 400.0;

/// Velocity kick (px/s) opposite the aim when a plane fires gun 0.
pub const GUN_RECOIL: f32 = 50.0;

/// Full angular width (radians) of the player's three-way spread.
pub const PLAYER_SPREAD: f32 = std::f32::consts::PI / 4.0;

/// Time-to-live (ms) of every bullet.
pub const BULLET_TTL: f64 = 10_000.0;

/// Bullet collider radius (px).
pub const BULLET_RADIUS: f32 = 3.0;

// ── Turrets ───────────────────────────────────────────────────────────────────

/// Detection radius (px) inside which a turret fires at the current plane.
pub const TURRET_RANGE: f32 = 400.0;

/// Full angular width (radians) of a turret's random aim jitter.
pub const TURRET_VARIANCE: f32 = std::f32::consts::PI / 8.0;

/// Random multiplier range applied to each turret cooldown.
pub const TURRET_COOLDOWN_JITTER_MIN: f64 = 1.0;
pub const TURRET_COOLDOWN_JITTER_MAX: f64 = 3.0;

/// Initial per-gun cooldown range (ms) seeded at level load.
pub const TURRET_INITIAL_COOLDOWN_MIN: f64 = 1000.0;
pub const TURRET_INITIAL_COOLDOWN_MAX: f64 = 2000.0;

/// Wind-up (ms) between a turret committing to a shot and the bullet leaving.
pub const TURRET_WINDUP: f64 = 500.0;

/// Suppression (ms) added to a turret's active gun per bullet hit.
pub const TURRET_HIT_PENALTY: f64 = 5000.0;

/// Turret collider half-extent (px).
pub const TURRET_HALF_EXTENT: f32 = 12.0;

// ── Collisions ────────────────────────────────────────────────────────────────

/// Debounce window (ms) for plane ↔ wall damage.
pub const WALL_DEBOUNCE: f64 = 100.0;

/// Debounce window (ms) for plane ↔ plane / wreck / turret damage.
pub const BODY_DEBOUNCE: f64 = 200.0;

/// Separation impulse (px/s) applied every overlapping tick.
pub const COLLISION_IMPULSE: f32 = 100.0;

/// Random damage multiplier range for collisions and bullet hits.
pub const DAMAGE_JITTER_MIN: f32 = 1.0;
pub const DAMAGE_JITTER_MAX: f32 = 2.0;

/// Fraction of a destroyed plane's velocity inherited by its wreck.
pub const WRECK_VELOCITY_FACTOR: f32 = 0.5;

/// Mine collider radius (px).
pub const MINE_RADIUS: f32 = 10.0;

// ── Goal ──────────────────────────────────────────────────────────────────────

/// Score points per unit of `depth ^ GOAL_DEPTH_EXPONENT` past the goal line.
pub const GOAL_DEPTH_MULTIPLIER: f32 = 1.0;

/// Exponent applied to the depth reached past the goal line.
pub const GOAL_DEPTH_EXPONENT: f32 = 1.5;

/// Score multiplier for a zero-damage arrival.
pub const PERFECT_MULTIPLIER: f32 = 3.0;

/// Minimum settled dwell (ms) before a winning plane turns inert.
pub const GOAL_WAIT: f64 = 1000.0;

/// Per-axis speed (px/s) under which a winning plane counts as settled.
pub const JELLY_THRESHOLD: f32 = 0.1;

/// Extra downward acceleration (px/s²) inside the goal's gravity well.
pub const SUCTION_ACCELERATION: f32 = 100.0;

/// Tile height (px); the gravity well extends one tile past the goal line.
pub const TILE_HEIGHT: f32 = 32.0;

// ── Turns ─────────────────────────────────────────────────────────────────────

/// Delay (ms) between the current plane exploding and plane selection opening.
pub const RESELECT_DELAY: f64 = 2000.0;

/// Stick deflection needed to register a selection step or confirmation.
pub const SELECT_DEADZONE: f32 = 0.2;

/// Stick deflection beyond which input snaps to the dominant axis.
pub const STICK_SNAP: f32 = 0.9;

// ── Score ─────────────────────────────────────────────────────────────────────

/// Weight of the previous displayed score in the per-tick blend.
pub const SCORE_BLEND: f64 = 0.9;

/// How long (ms) the up/down indicator stays lit after the last change.
pub const SCORE_CHANGE_WINDOW: f64 = 500.0;

/// Random gap range (ms) between "clink" sounds while the score climbs.
pub const CLINK_GAP_MIN: f64 = 250.0;
pub const CLINK_GAP_MAX: f64 = 500.0;

// ── Campaign ──────────────────────────────────────────────────────────────────

/// Level ids in play order.  Ids starting with `tutorial` are skipped once the
/// campaign has wrapped around at least once.
pub const LEVEL_IDS: [&str; 10] = [
    "tutorialStory",
    "tutorialThrust",
    "tutorialSteer",
    "tutorialContract",
    "tutorialAfterburner",
    "walls",
    "obstacles",
    "ambush",
    "tunnel",
    "finale",
];

/// Prefix marking tutorial levels.
pub const TUTORIAL_PREFIX: &str = "tutorial";

/// Suffix of the alternate first level used on deeper runs.
pub const DEEPER_FIRST_LEVEL_SUFFIX: &str = "2";
