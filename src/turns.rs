//! Turn-taking: which plane the player flies, and choosing the next one.
//!
//! ## Phases
//!
//! | Phase            | Meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `Flying`         | the current plane is under player control            |
//! | `ChangingPlanes` | selection open; planes frozen (unless autopilot)     |
//! | `Complete`       | no plane left to fly; the level is finished          |
//!
//! Selection opens when the current plane settles at the goal, or
//! `reselect_delay` ms after it is destroyed (via the timer queue).  The list
//! of candidates is every non-winning plane, sorted by x.

use crate::clock::{DeferredAction, TimerFired};
use crate::effects::{SoundCue, SoundRequest};
use crate::input::{select_intent, PilotInput, SelectIntent};
use crate::level::{AvailableOrder, LevelRoster, LevelSettings};
use crate::plane::state::{Plane, PlaneStatus};
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Flying,
    ChangingPlanes,
    Complete,
}

/// What [`Turns::begin_change`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Selection was already open (or the level is over).
    Ignored,
    /// Selection opened on this plane.
    Selecting(Entity),
    /// No candidates left.
    Complete,
}

/// Turn state of the running level.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct Turns {
    pub phase: TurnPhase,
    /// The plane under player control.  At most one.
    pub current: Option<Entity>,
    /// The highlighted candidate while selecting.
    pub selecting: Option<Entity>,
    /// Candidates for selection, in cycling order.
    pub available: Vec<Entity>,
    pub index: usize,
    /// Set after a selection step until the input returns to neutral.
    pub select_debounce: bool,
    /// What the camera should follow.
    pub camera_follow: Option<Entity>,
}

impl Turns {
    /// The plane the flight model treats as flown: the current plane, or the
    /// highlighted one while the autopilot is flying.
    pub fn flown(&self, autopilot: bool) -> Option<Entity> {
        match self.current {
            Some(plane) => Some(plane),
            None if autopilot => self.selecting,
            None => None,
        }
    }

    pub fn is_current(&self, entity: Entity) -> bool {
        self.current == Some(entity)
    }

    /// Open plane selection over `candidates` (non-winning planes).
    pub fn begin_change(
        &mut self,
        mut candidates: Vec<(Entity, Vec2)>,
        order: AvailableOrder,
    ) -> ChangeOutcome {
        if self.phase != TurnPhase::Flying {
            return ChangeOutcome::Ignored;
        }

        match order {
            AvailableOrder::AscendingX => candidates.sort_by(|a, b| a.1.x.total_cmp(&b.1.x)),
            AvailableOrder::DescendingX => candidates.sort_by(|a, b| b.1.x.total_cmp(&a.1.x)),
        }
        self.available = candidates.into_iter().map(|(plane, _)| plane).collect();
        self.current = None;

        let Some(&first) = self.available.first() else {
            self.phase = TurnPhase::Complete;
            self.selecting = None;
            return ChangeOutcome::Complete;
        };

        self.index = 0;
        self.phase = TurnPhase::ChangingPlanes;
        self.selecting = Some(first);
        self.camera_follow = Some(first);
        ChangeOutcome::Selecting(first)
    }

    /// Move the highlight by `delta` with wraparound.
    pub fn step(&mut self, delta: i32) -> Option<Entity> {
        if self.phase != TurnPhase::ChangingPlanes || self.available.is_empty() {
            return None;
        }
        let count = self.available.len() as i32;
        self.index = (self.index as i32 + delta).rem_euclid(count) as usize;
        let plane = self.available[self.index];
        self.selecting = Some(plane);
        self.camera_follow = Some(plane);
        Some(plane)
    }

    /// Fly the highlighted plane.
    pub fn confirm(&mut self) -> Option<Entity> {
        if self.phase != TurnPhase::ChangingPlanes {
            return None;
        }
        let plane = *self.available.get(self.index)?;
        self.phase = TurnPhase::Flying;
        self.selecting = None;
        self.current = Some(plane);
        self.camera_follow = Some(plane);
        Some(plane)
    }

    /// Drop a destroyed plane from every reference.  Returns `true` when that
    /// empties an open selection and finishes the level.
    pub fn forget(&mut self, plane: Entity) -> bool {
        if self.current == Some(plane) {
            self.current = None;
        }
        if self.camera_follow == Some(plane) {
            self.camera_follow = None;
        }

        let Some(position) = self.available.iter().position(|p| *p == plane) else {
            return false;
        };
        self.available = self
            .available
            .iter()
            .copied()
            .filter(|p| *p != plane)
            .collect();
        if position < self.index {
            self.index -= 1;
        }
        if self.index >= self.available.len() {
            self.index = 0;
        }

        if self.phase != TurnPhase::ChangingPlanes {
            return false;
        }
        match self.available.get(self.index) {
            Some(&next) => {
                self.selecting = Some(next);
                self.camera_follow = Some(next);
                false
            }
            None => {
                self.selecting = None;
                self.phase = TurnPhase::Complete;
                true
            }
        }
    }
}

// ── Run conditions ─────────────────────────────────────────────────────────────

/// Flight runs while flying, and through selection when the autopilot flies.
pub fn flight_active(turns: Res<Turns>, settings: Res<LevelSettings>) -> bool {
    match turns.phase {
        TurnPhase::Flying => true,
        TurnPhase::ChangingPlanes => settings.autopilot,
        TurnPhase::Complete => false,
    }
}

/// The player is choosing a plane.
pub fn selecting_plane(turns: Res<Turns>, settings: Res<LevelSettings>) -> bool {
    turns.phase == TurnPhase::ChangingPlanes && !settings.autopilot
}

pub fn level_running(turns: Res<Turns>) -> bool {
    turns.phase != TurnPhase::Complete
}

// ── Systems ────────────────────────────────────────────────────────────────────

/// Non-winning planes of the roster with their positions.
pub fn selection_candidates(
    roster: &LevelRoster,
    planes: &Query<(&Transform, &PlaneStatus), With<Plane>>,
) -> Vec<(Entity, Vec2)> {
    roster
        .planes
        .iter()
        .filter_map(|&plane| {
            let (transform, status) = planes.get(plane).ok()?;
            (!status.winning).then_some((plane, transform.translation.truncate()))
        })
        .collect()
}

/// Handle directional and confirm input during plane selection.
pub fn selection_input_system(
    input: Res<PilotInput>,
    mut turns: ResMut<Turns>,
    mut sounds: MessageWriter<SoundRequest>,
) {
    match select_intent(&input) {
        SelectIntent::Confirm => {
            if let Some(plane) = turns.confirm() {
                sounds.write(SoundRequest::new(SoundCue::Thrust));
                info!("Flying plane {:?}", plane);
            }
        }
        SelectIntent::Neutral => {
            turns.select_debounce = false;
        }
        SelectIntent::Step(delta) => {
            if turns.select_debounce {
                return;
            }
            if turns.available.len() > 1 {
                sounds.write(SoundRequest::new(SoundCue::Select));
            }
            turns.step(delta);
            turns.select_debounce = true;
        }
    }
}

/// Open selection when the current plane settles or a reselect timer fires.
pub fn turn_change_system(
    mut fired: MessageReader<TimerFired>,
    settings: Res<LevelSettings>,
    roster: Res<LevelRoster>,
    mut turns: ResMut<Turns>,
    planes: Query<(&Transform, &PlaneStatus), With<Plane>>,
) {
    let mut requested = fired
        .read()
        .filter(|TimerFired(action)| *action == DeferredAction::ChangePlanes)
        .count()
        > 0;

    if turns.phase == TurnPhase::Flying {
        if let Some(current) = turns.current {
            if planes.get(current).is_ok_and(|(_, status)| status.inert) {
                requested = true;
            }
        }
    }

    if !requested {
        return;
    }

    let candidates = selection_candidates(&roster, &planes);
    match turns.begin_change(candidates, settings.available_order) {
        ChangeOutcome::Selecting(plane) => {
            info!(
                "Choosing next plane: {} available, highlighting {:?}",
                turns.available.len(),
                plane
            );
        }
        ChangeOutcome::Complete => info!("No planes left to fly"),
        ChangeOutcome::Ignored => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(n: usize) -> (World, Vec<Entity>) {
        let mut world = World::new();
        let list = (0..n).map(|_| world.spawn_empty().id()).collect();
        (world, list)
    }

    #[test]
    fn selection_sorts_by_x_and_highlights_first() {
        let (_world, e) = entities(3);
        let mut turns = Turns::default();
        let outcome = turns.begin_change(
            vec![
                (e[0], Vec2::new(300.0, 0.0)),
                (e[1], Vec2::new(100.0, 0.0)),
                (e[2], Vec2::new(200.0, 0.0)),
            ],
            AvailableOrder::AscendingX,
        );
        assert_eq!(outcome, ChangeOutcome::Selecting(e[1]));
        assert_eq!(turns.available, vec![e[1], e[2], e[0]]);
        assert_eq!(turns.phase, TurnPhase::ChangingPlanes);
        assert_eq!(turns.camera_follow, Some(e[1]));

        let mut descending = Turns::default();
        descending.begin_change(
            vec![(e[0], Vec2::new(1.0, 0.0)), (e[1], Vec2::new(2.0, 0.0))],
            AvailableOrder::DescendingX,
        );
        assert_eq!(descending.available, vec![e[1], e[0]]);
    }

    #[test]
    fn empty_candidates_complete_the_level() {
        let mut turns = Turns::default();
        assert_eq!(
            turns.begin_change(Vec::new(), AvailableOrder::AscendingX),
            ChangeOutcome::Complete
        );
        assert_eq!(turns.phase, TurnPhase::Complete);
    }

    #[test]
    fn change_is_ignored_while_already_changing() {
        let (_world, e) = entities(2);
        let mut turns = Turns::default();
        turns.begin_change(vec![(e[0], Vec2::ZERO)], AvailableOrder::AscendingX);
        assert_eq!(
            turns.begin_change(vec![(e[1], Vec2::ZERO)], AvailableOrder::AscendingX),
            ChangeOutcome::Ignored
        );
        assert_eq!(turns.available, vec![e[0]]);
    }

    #[test]
    fn stepping_wraps_and_confirm_sets_current() {
        let (_world, e) = entities(3);
        let mut turns = Turns::default();
        turns.begin_change(
            e.iter().enumerate().map(|(i, p)| (*p, Vec2::new(i as f32, 0.0))).collect(),
            AvailableOrder::AscendingX,
        );
        assert_eq!(turns.step(-1), Some(e[2]));
        assert_eq!(turns.step(1), Some(e[0]));
        assert_eq!(turns.confirm(), Some(e[0]));
        assert_eq!(turns.phase, TurnPhase::Flying);
        assert_eq!(turns.current, Some(e[0]));
        assert_eq!(turns.selecting, None);
    }

    #[test]
    fn forgetting_the_last_candidate_completes() {
        let (_world, e) = entities(2);
        let mut turns = Turns::default();
        turns.begin_change(
            vec![(e[0], Vec2::ZERO), (e[1], Vec2::X)],
            AvailableOrder::AscendingX,
        );
        turns.step(1);
        assert!(!turns.forget(e[1]));
        assert_eq!(turns.selecting, Some(e[0]));
        assert!(turns.forget(e[0]));
        assert_eq!(turns.phase, TurnPhase::Complete);
    }

    fn selection_app() -> (App, Vec<Entity>) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<SoundRequest>();
        app.insert_resource(PilotInput::default());
        let planes: Vec<Entity> = (0..3).map(|_| app.world_mut().spawn_empty().id()).collect();
        let mut turns = Turns::default();
        turns.begin_change(
            planes
                .iter()
                .enumerate()
                .map(|(i, p)| (*p, Vec2::new(i as f32 * 10.0, 0.0)))
                .collect(),
            AvailableOrder::AscendingX,
        );
        app.insert_resource(turns);
        app.add_systems(Update, selection_input_system);
        (app, planes)
    }

    #[test]
    fn held_direction_steps_once_until_released() {
        let (mut app, planes) = selection_app();
        app.insert_resource(PilotInput {
            right: true,
            ..Default::default()
        });

        app.update();
        app.update();
        assert_eq!(app.world().resource::<Turns>().selecting, Some(planes[1]));

        app.insert_resource(PilotInput::default());
        app.update();
        app.insert_resource(PilotInput {
            right: true,
            ..Default::default()
        });
        app.update();
        assert_eq!(app.world().resource::<Turns>().selecting, Some(planes[2]));
    }

    #[test]
    fn up_confirms_selection() {
        let (mut app, planes) = selection_app();
        app.insert_resource(PilotInput {
            up: true,
            ..Default::default()
        });
        app.update();

        let turns = app.world().resource::<Turns>();
        assert_eq!(turns.phase, TurnPhase::Flying);
        assert_eq!(turns.current, Some(planes[0]));
    }

    #[test]
    fn reselect_timer_opens_selection_over_non_winners() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<TimerFired>();
        app.insert_resource(LevelSettings::default());

        let winner = app
            .world_mut()
            .spawn((
                Plane::default(),
                PlaneStatus {
                    winning: true,
                    ..Default::default()
                },
                Transform::from_xyz(5.0, 0.0, 0.0),
            ))
            .id();
        let flier = app
            .world_mut()
            .spawn((
                Plane::default(),
                PlaneStatus::default(),
                Transform::from_xyz(50.0, 0.0, 0.0),
            ))
            .id();
        app.insert_resource(LevelRoster {
            planes: vec![winner, flier],
            ..Default::default()
        });
        app.insert_resource(Turns::default());
        app.add_systems(Update, turn_change_system);

        app.update();
        assert_eq!(app.world().resource::<Turns>().phase, TurnPhase::Flying);

        app.world_mut()
            .write_message(TimerFired(DeferredAction::ChangePlanes));
        app.update();

        let turns = app.world().resource::<Turns>();
        assert_eq!(turns.phase, TurnPhase::ChangingPlanes);
        assert_eq!(turns.available, vec![flier]);
    }
}
