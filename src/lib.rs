//! Jet Janitor flight core
//!
//! The fixed-step simulation of a 2D arcade flight game: planes under thrust,
//! roll and gravity, guns and turrets, collision damage with debounce, turn
//! taking between planes, and the depth-and-damage "contract" score.
//!
//! Rendering, audio, input devices and tile-map parsing are collaborators.
//! The core reads [`input::PilotInput`] and [`level::LevelLayout`]s, and writes
//! [`effects::SoundRequest`] / [`effects::EffectRequest`] messages plus the
//! read-only [`hud::SimView`].
//!
//! ## Tick order (`FixedUpdate`)
//!
//! | Set                    | Systems                                                   |
//! |------------------------|-----------------------------------------------------------|
//! | [`SimSet::Clock`]      | advance [`clock::SimClock`], release due timers            |
//! | [`SimSet::Input`]      | pilot controls, or plane selection                         |
//! | [`SimSet::Flight`]     | flight model, wreck drag (or freeze during selection)      |
//! | [`SimSet::Weapons`]    | fire / gun switch / afterburner, turrets, bullet lifetimes |
//! | [`SimSet::Collision`]  | overlap collection and resolution                          |
//! | [`SimSet::Turns`]      | plane hand-off, level completion and loading               |
//! | [`SimSet::Score`]      | contract score and HUD indicator                           |
//!
//! Rapier integrates velocities after `FixedUpdate` when [`PhysicsBridgePlugin`]
//! is installed.

pub mod clock;
pub mod collision;
pub mod config;
pub mod constants;
pub mod effects;
pub mod error;
pub mod hud;
pub mod input;
pub mod level;
pub mod plane;
pub mod progression;
pub mod score;
pub mod turns;

use bevy::app::{First, FixedMain};
use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use clock::{advance_clock_system, SimClock, SimRng, TimerFired, TimerQueue};
use collision::{collect_overlaps_system, resolve_overlaps_system, OverlapEvent};
use config::GameConfig;
use effects::{reset_presentation_system, EffectRequest, Presentation, SoundRequest};
use error::SimResult;
use input::{pilot_input_system, PilotCommand, PilotInput};
use level::{LevelLayout, LevelRoster, LevelSettings};
use plane::{
    bullet_lifetime_system, flight_system, freeze_planes_system, pilot_command_system,
    turret_bullet_system, turret_system, wreck_drag_system,
};
use progression::{
    blast_off_system, load_next_level_system, progression_system, BlastOff, Campaign,
    LevelFinished, LevelLibrary, LevelLoader,
};
use score::{score_system, Scoreboard};
use turns::{
    flight_active, level_running, selecting_plane, selection_input_system, turn_change_system,
    Turns,
};

/// Stages of one simulation tick, chained in this order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    Clock,
    Input,
    Flight,
    Weapons,
    Collision,
    Turns,
    Score,
}

/// The flight core.  Does not add physics; see [`PhysicsBridgePlugin`].
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameConfig>()
            .init_resource::<SimClock>()
            .init_resource::<SimRng>()
            .init_resource::<TimerQueue>()
            .init_resource::<PilotInput>()
            .init_resource::<Presentation>()
            .init_resource::<LevelSettings>()
            .init_resource::<LevelRoster>()
            .init_resource::<Turns>()
            .init_resource::<Scoreboard>()
            .init_resource::<Campaign>()
            .init_resource::<LevelLibrary>()
            .add_message::<TimerFired>()
            .add_message::<PilotCommand>()
            .add_message::<SoundRequest>()
            .add_message::<EffectRequest>()
            .add_message::<OverlapEvent>()
            .add_message::<LevelFinished>()
            .add_message::<BlastOff>()
            .configure_sets(
                FixedUpdate,
                (
                    SimSet::Clock,
                    SimSet::Input,
                    SimSet::Flight,
                    SimSet::Weapons,
                    SimSet::Collision,
                    SimSet::Turns,
                    SimSet::Score,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (reset_presentation_system, advance_clock_system)
                    .chain()
                    .in_set(SimSet::Clock),
            )
            .add_systems(
                FixedUpdate,
                (
                    pilot_input_system.run_if(flight_active),
                    selection_input_system.run_if(selecting_plane),
                )
                    .in_set(SimSet::Input),
            )
            .add_systems(
                FixedUpdate,
                (
                    (flight_system, wreck_drag_system).run_if(flight_active),
                    freeze_planes_system.run_if(selecting_plane),
                )
                    .in_set(SimSet::Flight),
            )
            .add_systems(
                FixedUpdate,
                (
                    pilot_command_system,
                    blast_off_system,
                    turret_system.run_if(flight_active),
                    turret_bullet_system,
                    bullet_lifetime_system,
                )
                    .chain()
                    .in_set(SimSet::Weapons)
                    .run_if(level_running),
            )
            .add_systems(
                FixedUpdate,
                resolve_overlaps_system
                    .in_set(SimSet::Collision)
                    .run_if(level_running),
            )
            .add_systems(
                FixedUpdate,
                (turn_change_system, progression_system, load_next_level_system)
                    .chain()
                    .in_set(SimSet::Turns),
            )
            .add_systems(
                FixedUpdate,
                score_system.in_set(SimSet::Score).run_if(level_running),
            );
    }
}

/// Rapier as the physics collaborator: zero gravity, stepped in the fixed
/// schedule, contacts fed to the collision stage as [`OverlapEvent`]s.
pub struct PhysicsBridgePlugin;

impl Plugin for PhysicsBridgePlugin {
    fn build(&self, app: &mut App) {
        // pixels_per_meter(1.0) keeps level pixels and physics units identical,
        // so px/s velocities go to rapier unscaled.
        app.add_plugins(
            RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0).in_fixed_schedule(),
        )
        .add_systems(Startup, setup_physics_config)
        .add_systems(
            FixedUpdate,
            collect_overlaps_system
                .in_set(SimSet::Collision)
                .before(resolve_overlaps_system),
        );
    }
}

/// Configure Rapier physics: the flight model owns gravity.
pub fn setup_physics_config(mut config: Query<&mut RapierConfiguration>) {
    for mut cfg in config.iter_mut() {
        cfg.gravity = Vec2::ZERO;
    }
}

/// Run exactly one fixed simulation step with `input` held.
///
/// Bypasses the wall-clock accumulator, so a seeded run is reproducible tick
/// for tick. `First` runs afterwards to rotate the message buffers: anything
/// written during a step stays readable until the end of the next one.
pub fn tick(world: &mut World, input: PilotInput) {
    world.insert_resource(input);
    if let Err(err) = world.try_run_schedule(FixedMain) {
        warn!("Fixed step skipped: {}", err);
    }
    if let Err(err) = world.try_run_schedule(First) {
        warn!("Message rotation skipped: {}", err);
    }
}

/// Tear down whatever level is running and spawn `layout` in its place.
pub fn start_level(world: &mut World, layout: &LevelLayout) -> SimResult<()> {
    let mut state: SystemState<LevelLoader> = SystemState::new(world);
    let result = state.get_mut(world).load(layout);
    state.apply(world);
    result
}
