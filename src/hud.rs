//! Read-only view of the simulation for HUD, render and audio collaborators.

use crate::level::{angle_degrees, LevelRoster, LevelSettings};
use crate::plane::state::{Hull, Plane, PlaneStatus, Weapon};
use crate::score::{ScoreChange, Scoreboard};
use crate::turns::{TurnPhase, Turns};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

/// Snapshot of one active plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneView {
    pub entity: Entity,
    pub position: Vec2,
    /// Body angle in degrees.
    pub angle: f32,
    pub damage: f32,
    pub winning: bool,
    pub inert: bool,
    pub perfect: bool,
    pub current: bool,
}

/// Everything a presentation layer may read.  Never mutates.
#[derive(SystemParam)]
pub struct SimView<'w, 's> {
    board: Res<'w, Scoreboard>,
    turns: Res<'w, Turns>,
    roster: Res<'w, LevelRoster>,
    settings: Res<'w, LevelSettings>,
    planes: Query<
        'w,
        's,
        (
            &'static Transform,
            &'static Hull,
            &'static PlaneStatus,
            &'static Weapon,
        ),
        With<Plane>,
    >,
}

impl SimView<'_, '_> {
    /// `contract: $N`, or nothing while the contract is hidden.
    pub fn score_text(&self) -> Option<&str> {
        (!self.settings.hide_contract).then_some(self.board.text.as_str())
    }

    pub fn score_change(&self) -> Option<ScoreChange> {
        self.board.change
    }

    pub fn phase(&self) -> TurnPhase {
        self.turns.phase
    }

    pub fn camera_target(&self) -> Option<Entity> {
        self.turns.camera_follow
    }

    /// The plane highlighted during selection.
    pub fn selecting(&self) -> Option<Entity> {
        self.turns.selecting
    }

    /// Active gun of the current plane.
    pub fn current_gun(&self) -> Option<usize> {
        let current = self.turns.current?;
        self.planes
            .get(current)
            .ok()
            .map(|(_, _, _, weapon)| weapon.current_gun)
    }

    /// Active planes in roster order.
    pub fn planes(&self) -> Vec<PlaneView> {
        self.roster
            .planes
            .iter()
            .filter_map(|&entity| {
                let (transform, hull, status, _) = self.planes.get(entity).ok()?;
                Some(PlaneView {
                    entity,
                    position: transform.translation.truncate(),
                    angle: angle_degrees(transform),
                    damage: hull.damage,
                    winning: status.winning,
                    inert: status.inert,
                    perfect: status.perfect,
                    current: self.turns.is_current(entity),
                })
            })
            .collect()
    }

    /// `$score` label for a plane that reached the goal.
    pub fn win_label(&self, plane: Entity) -> Option<String> {
        if self.settings.hide_contract {
            return None;
        }
        let (_, _, status, _) = self.planes.get(plane).ok()?;
        status.winning.then(|| format!("${}", status.score))
    }
}
