//! Fire-and-forget requests for the presentation collaborators.
//!
//! The core never plays audio or spawns particles itself; it writes these
//! messages and the host's audio/render layers consume them.

use bevy::prelude::*;

/// Audio cue names understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Afterburner,
    Shoot,
    Explode,
    HitPlane,
    HitTurret,
    Goal,
    Clink,
    Select,
    Thrust,
    /// Start the looping engine sound attached to a plane.
    ThrustLoopStart(Entity),
    /// Stop the looping engine sound attached to a plane.
    ThrustLoopStop(Entity),
}

#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SoundRequest {
    pub cue: SoundCue,
    /// Relative volume; 1.0 is the cue's default level.
    pub volume: f32,
}

impl SoundRequest {
    pub fn new(cue: SoundCue) -> Self {
        Self { cue, volume: 1.0 }
    }

    pub fn loud(cue: SoundCue, volume: f32) -> Self {
        Self { cue, volume }
    }
}

/// Visual effects and floating text.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum EffectRequest {
    Shockwave { at: Vec2 },
    Explosion { at: Vec2 },
    /// Floating text near a position, e.g. `PERFECT!`.
    Speak { at: Vec2, text: String },
    /// Red hit flash on an entity.
    DamageFlash { target: Entity },
    /// Camera shake, `amount` in `[0, 1]` of the plane's health.
    Trauma { amount: f32 },
    /// Attach a floating score label to a plane that reached the goal.
    WinLabel { plane: Entity },
}

/// Time dilation and camera zoom driven by the followed plane's afterburner.
/// Reset to neutral at the start of every tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub time_scale: f32,
    pub zoom: f32,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            zoom: 1.0,
        }
    }
}

pub fn reset_presentation_system(mut presentation: ResMut<Presentation>) {
    *presentation = Presentation::default();
}
