//! Abstract pilot input and the commands derived from it.
//!
//! Device mapping (keyboard, gamepad) lives outside the core.  The host writes
//! one [`PilotInput`] per tick; sticks are already deadzone-normalised
//! upstream and follow the gamepad convention (negative `y` is up).

use bevy::prelude::*;

use crate::constants::{SELECT_DEADZONE, STICK_SNAP};
use crate::level::LevelSettings;
use crate::plane::state::{Flight, Plane};
use crate::turns::Turns;

/// Held controls for the current tick.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct PilotInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Left stick, `None` when released.
    pub left_stick: Option<Vec2>,
    /// Right stick, `None` when released.
    pub right_stick: Option<Vec2>,
    pub fire: bool,
    pub afterburner: bool,
    /// Gun cycling request (`+1` next, `-1` previous, `0` none).
    pub gun_delta: i32,
}

impl PilotInput {
    /// The active stick, left taking precedence, with axis snapping applied.
    pub fn stick(&self) -> Option<Vec2> {
        self.left_stick.or(self.right_stick).map(snap_stick)
    }
}

/// Snap a near-full deflection onto its dominant axis.
pub fn snap_stick(stick: Vec2) -> Vec2 {
    if stick.x.abs() > STICK_SNAP {
        Vec2::new(stick.x.signum(), 0.0)
    } else if stick.y.abs() > STICK_SNAP {
        Vec2::new(0.0, stick.y.signum())
    } else {
        stick
    }
}

/// Flight controls requested for the current plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightControls {
    pub thrust: f32,
    pub roll: f32,
}

/// Map held input onto throttle and roll.
///
/// Up (or any upward stick) is full thrust; right/left roll fully, and a stick
/// overrides the roll with its horizontal axis.
pub fn flight_controls(input: &PilotInput) -> FlightControls {
    let mut thrust = if input.up { 1.0 } else { 0.0 };
    let mut roll = if input.right {
        1.0
    } else if input.left {
        -1.0
    } else {
        0.0
    };

    if let Some(stick) = input.stick() {
        if stick.y < 0.0 {
            thrust = 1.0;
        }
        roll = stick.x;
    }

    FlightControls { thrust, roll }
}

/// What the player asked for while selecting a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectIntent {
    Confirm,
    Step(i32),
    Neutral,
}

/// Interpret held input during plane selection.
pub fn select_intent(input: &PilotInput) -> SelectIntent {
    if input.up {
        return SelectIntent::Confirm;
    }

    let mut step = if input.right {
        1
    } else if input.left {
        -1
    } else {
        0
    };

    if let Some(stick) = input.stick() {
        if stick.x < -SELECT_DEADZONE {
            step = -1;
        } else if stick.x > SELECT_DEADZONE {
            step = 1;
        }
        if stick.y < -SELECT_DEADZONE {
            return SelectIntent::Confirm;
        }
    }

    if step == 0 {
        SelectIntent::Neutral
    } else {
        SelectIntent::Step(step)
    }
}

/// Discrete requests against a plane: the fire, gun-switch and afterburner
/// entry points.  Scripts and replays may write these directly.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum PilotCommand {
    /// Shoot the plane's current gun; `aim` overrides the nose bearing.
    Fire { plane: Entity, aim: Option<f32> },
    SwitchGun { plane: Entity, delta: i32 },
    Afterburner { plane: Entity },
}

/// Steer the current plane from the held input and turn the discrete
/// buttons into [`PilotCommand`]s.  Skipped while the autopilot flies.
pub fn pilot_input_system(
    input: Res<PilotInput>,
    settings: Res<LevelSettings>,
    turns: Res<Turns>,
    mut planes: Query<&mut Flight, With<Plane>>,
    mut commands: MessageWriter<PilotCommand>,
) {
    if settings.autopilot {
        return;
    }
    let Some(plane) = turns.current else {
        return;
    };
    let Ok(mut flight) = planes.get_mut(plane) else {
        return;
    };

    let controls = flight_controls(&input);
    flight.thrust = controls.thrust;
    flight.roll = controls.roll;

    if input.fire {
        commands.write(PilotCommand::Fire { plane, aim: None });
    }
    if input.afterburner {
        commands.write(PilotCommand::Afterburner { plane });
    }
    if input.gun_delta != 0 {
        commands.write(PilotCommand::SwitchGun {
            plane,
            delta: input.gun_delta,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_full_deflection_snaps_to_axis() {
        assert_eq!(snap_stick(Vec2::new(0.95, 0.4)), Vec2::new(1.0, 0.0));
        assert_eq!(snap_stick(Vec2::new(0.3, -0.92)), Vec2::new(0.0, -1.0));
        assert_eq!(snap_stick(Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn upward_stick_is_full_thrust_and_x_is_roll() {
        let input = PilotInput {
            left_stick: Some(Vec2::new(0.4, -0.3)),
            ..Default::default()
        };
        let controls = flight_controls(&input);
        assert_eq!(controls.thrust, 1.0);
        assert_eq!(controls.roll, 0.4);
    }

    #[test]
    fn keys_map_to_thrust_and_roll() {
        let input = PilotInput {
            up: true,
            left: true,
            ..Default::default()
        };
        assert_eq!(
            flight_controls(&input),
            FlightControls {
                thrust: 1.0,
                roll: -1.0
            }
        );
    }

    #[test]
    fn selection_respects_deadzone() {
        let small = PilotInput {
            right_stick: Some(Vec2::new(0.15, 0.1)),
            ..Default::default()
        };
        assert_eq!(select_intent(&small), SelectIntent::Neutral);

        let left = PilotInput {
            right_stick: Some(Vec2::new(-0.5, 0.0)),
            ..Default::default()
        };
        assert_eq!(select_intent(&left), SelectIntent::Step(-1));

        let confirm = PilotInput {
            left_stick: Some(Vec2::new(0.0, -0.5)),
            ..Default::default()
        };
        assert_eq!(select_intent(&confirm), SelectIntent::Confirm);
    }

    #[test]
    fn held_buttons_drive_the_current_plane() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<PilotCommand>();
        app.insert_resource(LevelSettings::default());
        app.insert_resource(PilotInput {
            up: true,
            right: true,
            fire: true,
            ..Default::default()
        });
        let plane = app
            .world_mut()
            .spawn((Plane::default(), Flight::default()))
            .id();
        let bystander = app
            .world_mut()
            .spawn((Plane::default(), Flight::default()))
            .id();
        app.insert_resource(Turns {
            current: Some(plane),
            ..Default::default()
        });
        app.add_systems(Update, pilot_input_system);
        app.update();

        let flight = app.world().get::<Flight>(plane).unwrap();
        assert_eq!((flight.thrust, flight.roll), (1.0, 1.0));
        assert_eq!(app.world().get::<Flight>(bystander).unwrap().thrust, 0.0);

        let messages = app.world().resource::<Messages<PilotCommand>>();
        let mut cursor = messages.get_cursor();
        let sent: Vec<PilotCommand> = cursor.read(messages).copied().collect();
        assert_eq!(sent, vec![PilotCommand::Fire { plane, aim: None }]);
    }
}
