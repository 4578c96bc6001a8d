//! End-to-end runs of the flight core, one fixed step at a time.
//!
//! Rapier is not installed here: overlaps are written by hand, and positions
//! only move when a test moves them.

use bevy::ecs::message::Messages;
use bevy::prelude::*;
use bevy_rapier2d::prelude::Velocity;

use jet_janitor::clock::{DeferredAction, SimRng, TimerQueue};
use jet_janitor::collision::OverlapEvent;
use jet_janitor::input::PilotInput;
use jet_janitor::level::{EntityKind, LevelLayout, LevelRoster, Mine, Wall};
use jet_janitor::plane::state::{Hull, Plane, PlaneStatus};
use jet_janitor::progression::{Campaign, LevelFinished};
use jet_janitor::score::Scoreboard;
use jet_janitor::turns::{TurnPhase, Turns};
use jet_janitor::{start_level, tick, SimulationPlugin};

const HANGAR: &str = r#"
name = "walls"

[[planes]]
x = 200.0
y = 40.0
sprite = "planeB"

[[planes]]
x = 100.0
y = 40.0
sprite = "player"

[[walls]]
x = 0.0
y = 0.0
width = 16.0
height = 640.0

[[mines]]
x = 160.0
y = 300.0

[[goals]]
x = 16.0
y = 600.0
width = 368.0
height = 40.0
"#;

const SOLO: &str = r#"
name = "tutorialStory"

[[planes]]
x = 100.0
y = 40.0
sprite = "player"

[[goals]]
x = 0.0
y = 600.0
width = 320.0
height = 40.0
"#;

fn sim_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(SimulationPlugin);
    app.insert_resource(SimRng::seeded(11));
    app
}

fn start(app: &mut App, text: &str) {
    let layout = LevelLayout::from_toml_str(text).unwrap();
    start_level(app.world_mut(), &layout).unwrap();
}

fn idle(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app.world_mut(), PilotInput::default());
    }
}

fn confirm(app: &mut App) -> Entity {
    tick(
        app.world_mut(),
        PilotInput {
            up: true,
            ..Default::default()
        },
    );
    app.world()
        .resource::<Turns>()
        .current
        .expect("a plane is being flown")
}

fn plane_at_x(app: &mut App, x: f32) -> Entity {
    let world = app.world_mut();
    let mut planes = world.query_filtered::<(Entity, &Transform), With<Plane>>();
    planes
        .iter(world)
        .find(|(_, transform)| transform.translation.x == x)
        .map(|(entity, _)| entity)
        .unwrap()
}

fn first_with<T: Component>(app: &mut App) -> Entity {
    let world = app.world_mut();
    let mut query = world.query_filtered::<Entity, With<T>>();
    query.iter(world).next().unwrap()
}

fn overlap(app: &mut App, kind_1: EntityKind, e1: Entity, kind_2: EntityKind, e2: Entity) {
    app.world_mut()
        .write_message(OverlapEvent::new(kind_1, e1, kind_2, e2));
}

#[test]
fn level_opens_on_leftmost_plane_and_up_confirms() {
    let mut app = sim_app();
    start(&mut app, HANGAR);
    let left = plane_at_x(&mut app, 100.0);

    let turns = app.world().resource::<Turns>();
    assert_eq!(turns.phase, TurnPhase::ChangingPlanes);
    assert_eq!(turns.selecting, Some(left));
    assert_eq!(turns.current, None);

    // Nothing falls while the player is choosing.
    idle(&mut app, 10);
    assert_eq!(app.world().get::<Velocity>(left).unwrap().linvel, Vec2::ZERO);

    assert_eq!(confirm(&mut app), left);
    assert_eq!(app.world().resource::<Turns>().phase, TurnPhase::Flying);
}

#[test]
fn only_the_flown_plane_falls() {
    let mut app = sim_app();
    start(&mut app, HANGAR);
    let flown = confirm(&mut app);
    let parked = plane_at_x(&mut app, 200.0);

    idle(&mut app, 20);

    // Screen y grows downward.
    assert!(app.world().get::<Velocity>(flown).unwrap().linvel.y > 0.0);
    assert_eq!(
        app.world().get::<Velocity>(parked).unwrap().linvel,
        Vec2::ZERO
    );
}

#[test]
fn scraping_a_wall_costs_contract_money() {
    let mut app = sim_app();
    start(&mut app, HANGAR);
    let flown = confirm(&mut app);
    let wall = first_with::<Wall>(&mut app);

    idle(&mut app, 2);
    assert_eq!(app.world().resource::<Scoreboard>().actual, 400);

    overlap(&mut app, EntityKind::Plane, flown, EntityKind::Wall, wall);
    idle(&mut app, 1);

    let damage = app.world().get::<Hull>(flown).unwrap().damage;
    assert!((5.0..10.0).contains(&damage), "damage {damage}");
    let board = app.world().resource::<Scoreboard>();
    assert_eq!(board.actual, 400 - (2.0 * damage).ceil() as i64);
    assert!(board.text.starts_with("contract: $"));
}

#[test]
fn mine_destroys_the_plane_and_the_turn_moves_on() {
    let mut app = sim_app();
    start(&mut app, HANGAR);
    let flown = confirm(&mut app);
    let other = plane_at_x(&mut app, 200.0);
    let mine = first_with::<Mine>(&mut app);

    overlap(&mut app, EntityKind::Plane, flown, EntityKind::Mine, mine);
    idle(&mut app, 1);

    assert!(app.world().get_entity(flown).is_err());
    assert!(app.world().get_entity(mine).is_err());
    let roster = app.world().resource::<LevelRoster>();
    assert_eq!(roster.planes, vec![other]);
    assert_eq!(roster.wrecks.len(), 1);
    assert!(app
        .world()
        .resource::<TimerQueue>()
        .is_pending(&DeferredAction::ChangePlanes));

    // Selection reopens once the reselect delay has passed.
    idle(&mut app, 130);
    let turns = app.world().resource::<Turns>();
    assert_eq!(turns.phase, TurnPhase::ChangingPlanes);
    assert_eq!(turns.selecting, Some(other));
}

#[test]
fn settled_winner_finishes_the_level() {
    let mut app = sim_app();
    start(&mut app, SOLO);
    let flown = confirm(&mut app);
    let goal = {
        let world = app.world_mut();
        let mut kinds = world.query::<(Entity, &EntityKind)>();
        kinds
            .iter(world)
            .find(|(_, kind)| **kind == EntityKind::Goal)
            .map(|(entity, _)| entity)
            .unwrap()
    };

    overlap(&mut app, EntityKind::Plane, flown, EntityKind::Goal, goal);
    idle(&mut app, 1);
    let status = app.world().get::<PlaneStatus>(flown).unwrap();
    assert!(status.winning && status.perfect);

    for _ in 0..600 {
        if app.world().resource::<Turns>().phase == TurnPhase::Complete {
            break;
        }
        idle(&mut app, 1);
    }
    assert_eq!(app.world().resource::<Turns>().phase, TurnPhase::Complete);
    assert!(app.world().get::<PlaneStatus>(flown).unwrap().inert);

    let campaign = app.world().resource::<Campaign>();
    assert!(campaign.completed);
    assert_eq!(campaign.level_index, 1);
    let archived = &campaign.shallower_planes[&0];
    assert_eq!(archived.len(), 1);
    assert!(archived[0].perfect);

    let messages = app.world().resource::<Messages<LevelFinished>>();
    let finished: Vec<_> = messages.get_cursor().read(messages).cloned().collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].from_index, 0);
    assert_eq!(finished[0].next_id, "tutorialThrust");
}

#[test]
fn message_buffers_stay_bounded_over_a_long_scrape() {
    let mut app = sim_app();
    start(&mut app, HANGAR);
    let flown = confirm(&mut app);
    let wall = first_with::<Wall>(&mut app);

    for _ in 0..500 {
        overlap(&mut app, EntityKind::Plane, flown, EntityKind::Wall, wall);
        idle(&mut app, 1);
        let pending = app.world().resource::<Messages<OverlapEvent>>().len();
        assert!(pending <= 2, "{pending} overlap messages retained");
    }
}
