use bevy::ecs::system::SystemState;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use std::env;

use jet_janitor::config::{load_game_config, GameConfig};
use jet_janitor::hud::SimView;
use jet_janitor::input::PilotInput;
use jet_janitor::level::LevelLayout;
use jet_janitor::progression::{Campaign, LevelLibrary};
use jet_janitor::turns::TurnPhase;
use jet_janitor::{start_level, tick, PhysicsBridgePlugin, SimulationPlugin};

/// Layout used when `assets/levels/` holds nothing loadable.
const DEMO_LAYOUT: &str = r#"
name = "walls"

[settings]
gun_count = 2

[[planes]]
x = 120.0
y = 40.0
angle = 180.0
sprite = "player"

[[planes]]
x = 220.0
y = 40.0
angle = 180.0
sprite = "planeB"

[[walls]]
x = 0.0
y = 0.0
width = 16.0
height = 640.0

[[walls]]
x = 384.0
y = 0.0
width = 16.0
height = 640.0

[[turrets]]
x = 300.0
y = 320.0
rotate = "Left"

[[mines]]
x = 160.0
y = 400.0

[[goals]]
x = 16.0
y = 600.0
width = 368.0
height = 40.0
"#;

/// Read every `assets/levels/<id>.toml` the campaign knows about.
fn load_library(campaign: &Campaign) -> LevelLibrary {
    let mut library = LevelLibrary::default();
    for id in &campaign.level_ids {
        let path = format!("assets/levels/{id}.toml");
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        match LevelLayout::from_toml_str(&text) {
            Ok(mut layout) => {
                if layout.name.is_empty() {
                    layout.name = id.clone();
                }
                library.insert(layout);
            }
            Err(e) => warn!("{path}: {e}"),
        }
    }

    if library.layouts.is_empty() {
        match LevelLayout::from_toml_str(DEMO_LAYOUT) {
            Ok(layout) => library.insert(layout),
            Err(e) => error!("Built-in demo layout: {e}"),
        }
    }
    library
}

/// Held controls for scripted frame `frame`: confirm the highlighted plane,
/// then dive with the throttle pulsed, firing now and then.
fn scripted_input(frame: u32, phase: TurnPhase) -> PilotInput {
    match phase {
        TurnPhase::ChangingPlanes => PilotInput {
            up: frame % 20 == 0,
            ..Default::default()
        },
        _ => PilotInput {
            up: frame % 3 != 0,
            right: (frame / 40) % 2 == 0,
            left: (frame / 40) % 2 == 1,
            fire: frame % 45 == 0,
            ..Default::default()
        },
    }
}

fn report(world: &mut World, frame: u32) {
    let mut state: SystemState<SimView> = SystemState::new(world);
    let view = state.get(world);
    let planes = view.planes();
    let flying = planes.iter().filter(|p| !p.inert).count();
    info!(
        "frame {frame}: {:?}, {} planes ({} flying), {}",
        view.phase(),
        planes.len(),
        flying,
        view.score_text().unwrap_or("contract hidden")
    );
}

fn main() {
    // Number of fixed steps to simulate; defaults to one minute of play.
    let frames: u32 = env::var("JET_JANITOR_FRAMES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    let requested_level = env::var("JET_JANITOR_LEVEL").ok();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(AssetPlugin::default())
        .add_plugins(LogPlugin::default())
        .add_plugins(bevy::transform::TransformPlugin)
        .add_message::<bevy::asset::AssetEvent<Mesh>>()
        .init_asset::<Mesh>()
        // Insert GameConfig with compiled defaults; load_game_config will
        // overwrite it from assets/props.toml (if present) in Startup.
        .insert_resource(GameConfig::default())
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        // Steps are driven by `tick`, not the wall clock.
        .insert_resource(TimestepMode::Fixed {
            dt: 1.0 / 60.0,
            substeps: 1,
        })
        .add_plugins(SimulationPlugin)
        .add_plugins(PhysicsBridgePlugin)
        .add_systems(Startup, load_game_config);

    app.finish();
    app.cleanup();
    // Runs Startup.
    app.update();

    let world = app.world_mut();
    let library = load_library(world.resource::<Campaign>());
    let level_id = {
        let campaign = world.resource::<Campaign>();
        requested_level
            .or_else(|| {
                campaign
                    .level_ids
                    .iter()
                    .find(|id| library.get(id).is_some())
                    .cloned()
            })
            .or_else(|| library.layouts.keys().next().cloned())
    };
    let Some(level_id) = level_id else {
        error!("No level layouts available");
        return;
    };
    let Some(layout) = library.get(&level_id).cloned() else {
        error!("Level '{level_id}' not found in assets/levels");
        return;
    };

    {
        let mut campaign = world.resource_mut::<Campaign>();
        if let Some(index) = campaign.level_ids.iter().position(|id| *id == level_id) {
            campaign.level_index = index;
        }
    }
    world.insert_resource(library);

    if let Err(e) = start_level(world, &layout) {
        error!("{e}");
        return;
    }

    for frame in 0..frames {
        let phase = world.resource::<jet_janitor::turns::Turns>().phase;
        tick(world, scripted_input(frame, phase));
        if frame % 60 == 0 {
            report(world, frame);
        }
    }
    report(world, frames);
}
