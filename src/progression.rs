//! Campaign progression: level order, depth, carry-over, and level loading.
//!
//! A level ends when turn-taking runs out of planes (`TurnPhase::Complete`) or
//! a `SkipLevel` timer fires.  Either way the winners and wrecks of the level
//! are archived under its index, the campaign moves on, and a
//! [`LevelFinished`] message names the next level.  If the next layout is in
//! the [`LevelLibrary`] it is loaded in place; otherwise the host loads it.
//!
//! Wrapping forward past the last level starts a deeper run: depth grows by
//! one, tutorials are skipped, the first level uses its alternate layout, and
//! every revisited level respawns the winners and wrecks archived from the
//! shallower run.

use crate::clock::{DeferredAction, SimClock, SimRng, TimerFired, TimerQueue};
use crate::config::GameConfig;
use crate::constants::{DEEPER_FIRST_LEVEL_SUFFIX, LEVEL_IDS, TUTORIAL_PREFIX};
use crate::effects::{EffectRequest, SoundCue, SoundRequest};
use crate::error::{SimError, SimResult};
use crate::level::{
    angle_degrees, despawn_level, spawn_level, CarriedPlane, CarriedWreck, EntityKind,
    LevelLayout, LevelRoster, LevelSettings,
};
use crate::plane::state::{Booster, Flight, Hull, Plane, PlaneStatus, Wreck};
use crate::plane::weapons::afterburn;
use crate::score::Scoreboard;
use crate::turns::{ChangeOutcome, TurnPhase, Turns};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::HashMap;

// ── Campaign ──────────────────────────────────────────────────────────────────

/// Position in the level list plus everything archived from shallower runs.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Campaign {
    pub level_ids: Vec<String>,
    pub level_index: usize,
    /// How many times the campaign has wrapped around.
    pub depth: u32,
    pub shallower_planes: HashMap<usize, Vec<CarriedPlane>>,
    pub shallower_wrecks: HashMap<usize, Vec<CarriedWreck>>,
    /// The running level has already handed off to the next one.
    pub completed: bool,
}

impl Default for Campaign {
    fn default() -> Self {
        Self::new(LEVEL_IDS.iter().map(|id| id.to_string()).collect())
    }
}

impl Campaign {
    pub fn new(level_ids: Vec<String>) -> Self {
        Self {
            level_ids,
            level_index: 0,
            depth: 0,
            shallower_planes: HashMap::new(),
            shallower_wrecks: HashMap::new(),
            completed: false,
        }
    }

    /// Layout id of the current level.
    pub fn level_id(&self) -> SimResult<String> {
        let id = self
            .level_ids
            .get(self.level_index)
            .ok_or(SimError::UnknownLevel {
                index: self.level_index,
                count: self.level_ids.len(),
            })?;
        if self.level_index == 0 && self.depth > 0 {
            Ok(format!("{id}{DEEPER_FIRST_LEVEL_SUFFIX}"))
        } else {
            Ok(id.clone())
        }
    }

    /// Index and depth reached by moving `delta` levels from the current one.
    pub fn target(&self, delta: i32) -> (usize, u32) {
        let count = self.level_ids.len();
        if count == 0 {
            return (0, self.depth);
        }

        let mut index = (self.level_index as i64 + delta as i64).rem_euclid(count as i64) as usize;
        let mut depth = self.depth;
        if index == 0 && delta > 0 {
            depth += 1;
        }
        if index == 1 && depth > 0 {
            while index < count - 1 && self.level_ids[index].starts_with(TUTORIAL_PREFIX) {
                index += 1;
            }
        }
        (index, depth)
    }

    /// Move `delta` levels.  Returns the index left behind.
    pub fn skip(&mut self, delta: i32) -> usize {
        let from = self.level_index;
        let (index, depth) = self.target(delta);
        self.level_index = index;
        self.depth = depth;
        from
    }

    /// Store the winners and wrecks of the current level for deeper runs.
    pub fn archive(&mut self, planes: Vec<CarriedPlane>, wrecks: Vec<CarriedWreck>) {
        self.shallower_planes.insert(self.level_index, planes);
        self.shallower_wrecks.insert(self.level_index, wrecks);
    }

    /// What a shallower run left at the current index.
    pub fn carried(&self) -> (&[CarriedPlane], &[CarriedWreck]) {
        (
            self.shallower_planes
                .get(&self.level_index)
                .map_or(&[][..], Vec::as_slice),
            self.shallower_wrecks
                .get(&self.level_index)
                .map_or(&[][..], Vec::as_slice),
        )
    }
}

/// Layouts the core may load on its own, keyed by level id.
#[derive(Resource, Debug, Clone, Default)]
pub struct LevelLibrary {
    pub layouts: HashMap<String, LevelLayout>,
}

impl LevelLibrary {
    pub fn insert(&mut self, layout: LevelLayout) {
        self.layouts.insert(layout.name.clone(), layout);
    }

    pub fn get(&self, id: &str) -> Option<&LevelLayout> {
        self.layouts.get(id)
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// The running level handed off to the next one.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct LevelFinished {
    pub from_index: usize,
    pub next_index: usize,
    pub next_id: String,
    pub depth: u32,
}

/// Scripted ending: full afterburn on the current plane, camera let go.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlastOff;

// ── Level loading ─────────────────────────────────────────────────────────────

/// Everything touched when a level is torn down and another spawned.
#[derive(SystemParam)]
pub struct LevelLoader<'w, 's> {
    commands: Commands<'w, 's>,
    config: Res<'w, GameConfig>,
    rng: ResMut<'w, SimRng>,
    campaign: ResMut<'w, Campaign>,
    roster: ResMut<'w, LevelRoster>,
    settings: ResMut<'w, LevelSettings>,
    turns: ResMut<'w, Turns>,
    board: ResMut<'w, Scoreboard>,
    timers: ResMut<'w, TimerQueue>,
    entities: Query<'w, 's, Entity, With<EntityKind>>,
    effects: MessageWriter<'w, EffectRequest>,
}

impl LevelLoader<'_, '_> {
    /// Replace whatever is running with `layout` and open plane selection.
    pub fn load(&mut self, layout: &LevelLayout) -> SimResult<()> {
        layout.validate()?;

        despawn_level(&mut self.commands, &self.entities);
        self.timers.invalidate();

        let (carried_planes, carried_wrecks) = self.campaign.carried();
        let (carried_planes, carried_wrecks) = (carried_planes.to_vec(), carried_wrecks.to_vec());
        let spawned = spawn_level(
            &mut self.commands,
            layout,
            &self.config,
            &mut self.rng,
            &carried_planes,
            &carried_wrecks,
        )?;

        if !spawned.settings.hide_contract {
            let fresh: Vec<Entity> = spawned.candidates.iter().map(|(e, _)| *e).collect();
            for &plane in spawned.roster.planes.iter().filter(|p| !fresh.contains(p)) {
                self.effects.write(EffectRequest::WinLabel { plane });
            }
        }

        *self.roster = spawned.roster;
        *self.settings = spawned.settings;
        *self.turns = Turns::default();
        *self.board = Scoreboard::default();
        self.campaign.completed = false;

        match self
            .turns
            .begin_change(spawned.candidates, self.settings.available_order)
        {
            ChangeOutcome::Selecting(plane) => {
                info!("Level '{}' ready, highlighting {:?}", self.settings.id, plane)
            }
            // Only carried winners: nothing left to fly here.
            ChangeOutcome::Complete => info!("Level '{}' has no planes to fly", self.settings.id),
            ChangeOutcome::Ignored => {}
        }
        Ok(())
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Archive and advance when the level completes or a skip timer fires.
#[allow(clippy::too_many_arguments)]
pub fn progression_system(
    mut fired: MessageReader<TimerFired>,
    mut campaign: ResMut<Campaign>,
    turns: Res<Turns>,
    roster: Res<LevelRoster>,
    planes: Query<(&Plane, &Transform, &Hull, &PlaneStatus)>,
    wrecks: Query<(&Transform, &Wreck)>,
    mut finished: MessageWriter<LevelFinished>,
) {
    let mut delta = None;
    for TimerFired(action) in fired.read() {
        if let DeferredAction::SkipLevel(d) = *action {
            delta.get_or_insert(d);
        }
    }
    if delta.is_none() && turns.phase == TurnPhase::Complete && !campaign.completed {
        delta = Some(1);
    }
    let Some(delta) = delta else {
        return;
    };

    let winners = roster
        .planes
        .iter()
        .filter_map(|&entity| planes.get(entity).ok())
        .filter(|(_, _, _, status)| status.winning)
        .map(|(plane, transform, hull, status)| CarriedPlane {
            position: transform.translation.truncate(),
            angle: angle_degrees(transform),
            sprite: plane.sprite.clone(),
            damage: hull.damage,
            perfect: status.perfect,
        })
        .collect::<Vec<_>>();
    let remains = roster
        .wrecks
        .iter()
        .filter_map(|&entity| wrecks.get(entity).ok())
        .map(|(transform, wreck)| CarriedWreck {
            position: transform.translation.truncate(),
            angle: angle_degrees(transform),
            winning: wreck.winning,
        })
        .collect::<Vec<_>>();

    info!(
        "Level {} finished: {} winners, {} wrecks archived",
        campaign.level_index,
        winners.len(),
        remains.len()
    );
    campaign.archive(winners, remains);
    campaign.completed = true;

    let from_index = campaign.skip(delta);
    let next_id = match campaign.level_id() {
        Ok(id) => id,
        Err(err) => {
            warn!("{}", err);
            return;
        }
    };
    finished.write(LevelFinished {
        from_index,
        next_index: campaign.level_index,
        next_id,
        depth: campaign.depth,
    });
}

/// Load the next level when its layout is in the library.
pub fn load_next_level_system(
    mut finished: MessageReader<LevelFinished>,
    library: Res<LevelLibrary>,
    mut loader: LevelLoader,
) {
    let Some(next) = finished.read().last() else {
        return;
    };
    let Some(layout) = library.get(&next.next_id) else {
        info!(
            "Level '{}' (depth {}) not in library; waiting for host",
            next.next_id, next.depth
        );
        return;
    };
    if let Err(err) = loader.load(layout) {
        warn!("Could not load level '{}': {}", next.next_id, err);
    }
}

/// Start the scripted ending.
#[allow(clippy::too_many_arguments)]
pub fn blast_off_system(
    mut requests: MessageReader<BlastOff>,
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    mut settings: ResMut<LevelSettings>,
    mut turns: ResMut<Turns>,
    mut planes: Query<(&Transform, &mut Flight, &mut Booster, &PlaneStatus), With<Plane>>,
    mut sounds: MessageWriter<SoundRequest>,
    mut effects: MessageWriter<EffectRequest>,
) {
    if requests.read().count() == 0 {
        return;
    }

    settings.blastoff = true;
    if let Some(current) = turns.current {
        if let Ok((transform, mut flight, mut booster, status)) = planes.get_mut(current) {
            let shock = afterburn(
                &mut flight,
                &mut booster,
                status,
                transform.translation.truncate(),
                clock.now,
                true,
                &settings,
                &config,
            );
            if let Some(at) = shock {
                sounds.write(SoundRequest::new(SoundCue::Afterburner));
                effects.write(EffectRequest::Shockwave { at });
            }
        }
    }
    turns.camera_follow = None;
    info!("Blast off");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_wrap_deepens_and_skips_tutorials() {
        let mut campaign = Campaign::default();
        campaign.level_index = 9;

        assert_eq!(campaign.target(1), (0, 1));
        campaign.skip(1);
        assert_eq!(campaign.level_id().unwrap(), "tutorialStory2");

        // From the alternate first level straight past the tutorials.
        assert_eq!(campaign.target(1), (5, 1));
    }

    #[test]
    fn backward_wrap_keeps_depth() {
        let campaign = Campaign::default();
        assert_eq!(campaign.target(-1), (9, 0));
    }

    #[test]
    fn shallow_run_plays_tutorials() {
        let campaign = Campaign::default();
        assert_eq!(campaign.target(1), (1, 0));
    }

    #[test]
    fn unknown_index_is_an_error() {
        let mut campaign = Campaign::new(vec!["a".into()]);
        campaign.level_index = 3;
        assert!(matches!(
            campaign.level_id(),
            Err(SimError::UnknownLevel { index: 3, count: 1 })
        ));
    }

    #[test]
    fn archive_is_per_index() {
        let mut campaign = Campaign::default();
        campaign.level_index = 5;
        campaign.archive(
            vec![CarriedPlane {
                position: Vec2::new(1.0, 2.0),
                angle: 0.0,
                sprite: "player".into(),
                damage: 10.0,
                perfect: false,
            }],
            Vec::new(),
        );
        assert_eq!(campaign.carried().0.len(), 1);

        campaign.level_index = 6;
        assert!(campaign.carried().0.is_empty());
    }

    fn progression_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<TimerFired>();
        app.add_message::<LevelFinished>();
        app.insert_resource(Campaign::default());
        app.insert_resource(LevelRoster::default());
        app.add_systems(Update, progression_system);
        app
    }

    fn finished(app: &App) -> Vec<LevelFinished> {
        let messages = app.world().resource::<Messages<LevelFinished>>();
        let mut cursor = messages.get_cursor();
        cursor.read(messages).cloned().collect()
    }

    #[test]
    fn completion_hands_off_once() {
        let mut app = progression_app();
        app.insert_resource(Turns {
            phase: TurnPhase::Complete,
            ..Default::default()
        });

        app.update();
        app.update();

        let sent = finished(&app);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].next_index, 1);
        assert_eq!(sent[0].next_id, "tutorialThrust");
        assert!(app.world().resource::<Campaign>().completed);
    }

    #[test]
    fn skip_timer_moves_backwards() {
        let mut app = progression_app();
        app.insert_resource(Turns::default());
        app.world_mut().resource_mut::<Campaign>().level_index = 3;
        app.world_mut()
            .write_message(TimerFired(DeferredAction::SkipLevel(-1)));
        app.update();

        let sent = finished(&app);
        assert_eq!(sent.len(), 1);
        assert_eq!((sent[0].from_index, sent[0].next_index), (3, 2));
    }

    #[test]
    fn winners_are_archived_on_completion() {
        let mut app = progression_app();
        app.insert_resource(Turns {
            phase: TurnPhase::Complete,
            ..Default::default()
        });
        let winner = app
            .world_mut()
            .spawn((
                Plane {
                    sprite: "player".into(),
                },
                Transform::from_xyz(10.0, 300.0, 0.0),
                Hull { damage: 12.0 },
                PlaneStatus {
                    winning: true,
                    ..Default::default()
                },
            ))
            .id();
        let loser = app
            .world_mut()
            .spawn((
                Plane::default(),
                Transform::default(),
                Hull::default(),
                PlaneStatus::default(),
            ))
            .id();
        app.insert_resource(LevelRoster {
            planes: vec![winner, loser],
            ..Default::default()
        });

        app.update();

        let campaign = app.world().resource::<Campaign>();
        let archived = &campaign.shallower_planes[&0];
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].position, Vec2::new(10.0, 300.0));
        assert_eq!(archived[0].damage, 12.0);
    }

    #[test]
    fn blast_off_forces_afterburn_and_releases_camera() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<BlastOff>();
        app.add_message::<SoundRequest>();
        app.add_message::<EffectRequest>();
        app.insert_resource(SimClock {
            now: 5_000.0,
            ..Default::default()
        });
        app.insert_resource(GameConfig::default());
        app.insert_resource(LevelSettings {
            no_afterburner: true,
            ..Default::default()
        });
        app.add_systems(Update, blast_off_system);

        let plane = app
            .world_mut()
            .spawn((
                Plane::default(),
                Transform::from_xyz(100.0, 200.0, 0.0),
                Flight::default(),
                Booster::default(),
                PlaneStatus::default(),
            ))
            .id();
        app.insert_resource(Turns {
            phase: TurnPhase::Flying,
            current: Some(plane),
            camera_follow: Some(plane),
            ..Default::default()
        });

        app.world_mut().write_message(BlastOff);
        app.update();

        assert!(app.world().resource::<LevelSettings>().blastoff);
        assert_eq!(app.world().resource::<Turns>().camera_follow, None);

        let cooldown = app.world().resource::<GameConfig>().afterburner_cooldown;
        let flight = app.world().get::<Flight>(plane).unwrap();
        assert_eq!(flight.afterburner_cooldown, 5_000.0 + cooldown);
        assert!(app.world().get::<Booster>(plane).unwrap().afterburner);

        let sounds = app.world().resource::<Messages<SoundRequest>>();
        assert!(sounds
            .get_cursor()
            .read(sounds)
            .any(|s| s.cue == SoundCue::Afterburner));
        let effects = app.world().resource::<Messages<EffectRequest>>();
        assert!(effects
            .get_cursor()
            .read(effects)
            .any(|e| matches!(e, EffectRequest::Shockwave { .. })));
    }

    #[test]
    fn blast_off_without_a_pilot_still_sets_the_flag() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<BlastOff>();
        app.add_message::<SoundRequest>();
        app.add_message::<EffectRequest>();
        app.insert_resource(SimClock::default());
        app.insert_resource(GameConfig::default());
        app.insert_resource(LevelSettings::default());
        app.insert_resource(Turns::default());
        app.add_systems(Update, blast_off_system);

        app.update();
        assert!(!app.world().resource::<LevelSettings>().blastoff);

        app.world_mut().write_message(BlastOff);
        app.update();
        assert!(app.world().resource::<LevelSettings>().blastoff);
        assert!(app.world().resource::<Messages<SoundRequest>>().is_empty());
    }
}
