//! The contract: per-plane score, the smoothed HUD value and its indicator.
//!
//! ```text
//! plane  = max(0, health_multiplier · (health − damage))
//!        + depth_multiplier · max(0, y − goal_depth)^depth_exponent   (winning only)
//!        × 3                                                           (perfect only)
//! level  = max(0, Σ trunc(plane))
//! shown' = shown · 0.9 + level · 0.1
//! ```
//!
//! The blend is per tick, not per second.  The up/down indicator stays lit for
//! [`SCORE_CHANGE_WINDOW`] ms after the truncated displayed value last moved.

use crate::clock::{RngStream, SimClock, SimRng};
use crate::config::GameConfig;
use crate::constants::{
    CLINK_GAP_MAX, CLINK_GAP_MIN, NEVER, PERFECT_MULTIPLIER, SCORE_BLEND, SCORE_CHANGE_WINDOW,
};
use crate::effects::{SoundCue, SoundRequest};
use crate::level::{LevelRoster, LevelSettings};
use crate::plane::state::{Hull, Plane, PlaneStatus};
use bevy::prelude::*;

/// Direction of the last displayed score movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreChange {
    Up,
    Down,
}

/// Score of one plane, truncated toward zero.
pub fn plane_score(
    damage: f32,
    status: &PlaneStatus,
    y: f32,
    goal_depth: f32,
    config: &GameConfig,
) -> i64 {
    let mut score = (config.plane_health_multiplier * (config.plane_health - damage)).max(0.0);

    if status.winning {
        let depth = (y - goal_depth).max(0.0).powf(config.goal_depth_exponent);
        score += config.goal_depth_multiplier * depth;
        if status.perfect {
            score *= PERFECT_MULTIPLIER;
        }
    }

    score.trunc() as i64
}

/// HUD contract state of the running level.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Scoreboard {
    /// Displayed (smoothed) value; `None` before the first pass.
    pub shown: Option<f64>,
    /// Level score as of the last pass.
    pub actual: i64,
    pub change: Option<ScoreChange>,
    pub prev_change: Option<ScoreChange>,
    /// When the truncated displayed value last moved.
    pub change_at: f64,
    pub next_clink: Option<f64>,
    /// `contract: $N`
    pub text: String,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self {
            shown: None,
            actual: 0,
            change: None,
            prev_change: None,
            change_at: NEVER,
            next_clink: None,
            text: String::new(),
        }
    }
}

impl Scoreboard {
    /// Blend `score` into the displayed value and update the indicator.
    pub fn blend(&mut self, score: i64, now: f64) -> Option<ScoreChange> {
        let actual = score.max(0);
        let target = actual as f64;
        // Zero counts as unset: an empty board snaps straight to the score.
        let base = self.shown.filter(|shown| *shown != 0.0).unwrap_or(target);
        let new = base * SCORE_BLEND + target * (1.0 - SCORE_BLEND);

        let moved = match self.shown {
            Some(old) => new.trunc() != old.trunc(),
            None => true,
        };
        if moved {
            self.change_at = now;
        }

        let change = if now - self.change_at > SCORE_CHANGE_WINDOW {
            None
        } else {
            match self.shown {
                Some(old) if new < old => {
                    self.prev_change = Some(ScoreChange::Down);
                    Some(ScoreChange::Down)
                }
                Some(old) if new > old => {
                    self.prev_change = Some(ScoreChange::Up);
                    Some(ScoreChange::Up)
                }
                _ => self.prev_change,
            }
        };

        self.shown = Some(new);
        self.actual = actual;
        self.change = change;
        self.text = format!("contract: ${}", new.round() as i64);
        change
    }

    /// Whether a clink may sound at `now`.
    pub fn clink_due(&self, now: f64) -> bool {
        self.next_clink.is_none_or(|next| now > next)
    }
}

/// Score every rostered plane and refresh the HUD contract.
#[allow(clippy::too_many_arguments)]
pub fn score_system(
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    settings: Res<LevelSettings>,
    roster: Res<LevelRoster>,
    mut rng: ResMut<SimRng>,
    mut board: ResMut<Scoreboard>,
    mut planes: Query<(&Transform, &Hull, &mut PlaneStatus), With<Plane>>,
    mut sounds: MessageWriter<SoundRequest>,
) {
    let mut total = 0;
    for &plane in &roster.planes {
        let Ok((transform, hull, mut status)) = planes.get_mut(plane) else {
            continue;
        };
        let score = plane_score(
            hull.damage,
            &status,
            transform.translation.y,
            settings.goal_depth,
            &config,
        );
        status.score = score;
        total += score;
    }

    let now = clock.now;
    let change = board.blend(total, now);

    if settings.hide_contract {
        return;
    }
    if change == Some(ScoreChange::Up) && board.clink_due(now) {
        board.next_clink =
            Some(now + rng.rand_between(RngStream::Clink, CLINK_GAP_MIN, CLINK_GAP_MAX));
        sounds.write(SoundRequest::new(SoundCue::Clink));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(winning: bool, perfect: bool) -> PlaneStatus {
        PlaneStatus {
            winning,
            perfect,
            ..Default::default()
        }
    }

    #[test]
    fn undamaged_flyer_is_worth_full_health() {
        let config = GameConfig::default();
        assert_eq!(plane_score(0.0, &status(false, false), 0.0, 0.0, &config), 200);
        assert_eq!(plane_score(150.0, &status(false, false), 0.0, 0.0, &config), 0);
    }

    #[test]
    fn perfect_winner_triples_health_and_depth() {
        let config = GameConfig::default();
        let depth: f32 = 16.0;
        let expected = (3.0
            * (config.plane_health_multiplier * config.plane_health
                + config.goal_depth_multiplier * depth.powf(config.goal_depth_exponent)))
        .trunc() as i64;
        assert_eq!(
            plane_score(0.0, &status(true, true), 116.0, 100.0, &config),
            expected
        );
        // Above the goal line earns no depth bonus.
        assert_eq!(plane_score(0.0, &status(true, false), 50.0, 100.0, &config), 200);
    }

    #[test]
    fn displayed_score_blends_toward_actual() {
        let mut board = Scoreboard::default();
        board.blend(200, 0.0);
        assert_eq!(board.shown, Some(200.0));

        board.blend(200, 16.0);
        assert_eq!(board.shown, Some(200.0));
        assert_eq!(board.text, "contract: $200");

        let change = board.blend(160, 32.0);
        assert!((board.shown.unwrap() - 196.0).abs() < 1e-9);
        assert_eq!(change, Some(ScoreChange::Down));
    }

    #[test]
    fn indicator_holds_then_clears() {
        let mut board = Scoreboard::default();
        board.blend(100, 0.0);
        board.blend(200, 100.0);
        assert_eq!(board.change, Some(ScoreChange::Up));

        // Score reached; the displayed value keeps creeping up for a while.
        let mut now = 100.0;
        while board.shown.unwrap().trunc() < 199.0 {
            now += 16.0;
            board.blend(200, now);
        }
        for _ in 0..60 {
            now += 16.0;
            board.blend(200, now);
        }
        assert_eq!(board.change, None);
    }

    #[test]
    fn score_system_sums_rostered_planes() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<SoundRequest>();
        app.insert_resource(GameConfig::default());
        app.insert_resource(LevelSettings::default());
        app.insert_resource(SimClock::default());
        app.insert_resource(SimRng::seeded(1));
        app.insert_resource(Scoreboard::default());

        let healthy = app
            .world_mut()
            .spawn((
                Plane::default(),
                Transform::default(),
                Hull::default(),
                PlaneStatus::default(),
            ))
            .id();
        let hurt = app
            .world_mut()
            .spawn((
                Plane::default(),
                Transform::default(),
                Hull { damage: 20.0 },
                PlaneStatus::default(),
            ))
            .id();
        app.insert_resource(LevelRoster {
            planes: vec![healthy, hurt],
            ..Default::default()
        });
        app.add_systems(Update, score_system);
        app.update();

        let board = app.world().resource::<Scoreboard>();
        assert_eq!(board.actual, 360);
        assert_eq!(app.world().get::<PlaneStatus>(hurt).unwrap().score, 160);
    }
}
