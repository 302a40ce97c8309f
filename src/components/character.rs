use glam::Vec2;
use hecs::Entity;

use crate::physics::JointHandle;

/// State for the player-controlled character, attached to the player entity.
///
/// Intent fields (`run_dir`, `jump_frames`, `aim_target`, `action_queued`)
/// are written by the input collaborator through the world's intent surface
/// and consumed by the character system each tick.
pub struct Character {
    /// Current run intent: -1, 0, or 1.
    pub run_dir: i32,
    /// Last non-zero run direction; drives sprite facing and recovery shoves.
    pub facing: i32,
    /// Ticks remaining during which a jump will fire as soon as it can.
    pub jump_frames: u32,
    /// Pointer position in screen units; the aim angle tracks it.
    pub aim_target: Vec2,
    pub aim_angle: f32,
    /// Aim angle at the time the hold joint was last created.
    pub last_aim_angle: f32,
    /// One-shot action intent (fire / pick up / release, context-dependent).
    pub action_queued: bool,
    /// Currently carried entity, if any. Resolved through the world table;
    /// a vanished target simply drops the hold.
    pub held: Option<Entity>,
    pub hold_joint: Option<JointHandle>,
    /// Exponential moving average of (left, top), used to detect a stuck
    /// character wedged against geometry.
    pub avg_pos: Vec2,
    /// Portal color alternation latch: set when the last shot was blue.
    pub shoot_orange_next: bool,
}

impl Character {
    pub fn new() -> Self {
        Self {
            run_dir: 0,
            facing: 0,
            jump_frames: 0,
            aim_target: Vec2::ZERO,
            aim_angle: 0.0,
            last_aim_angle: 0.0,
            action_queued: false,
            held: None,
            hold_joint: None,
            avg_pos: Vec2::ZERO,
            shoot_orange_next: false,
        }
    }
}

impl Default for Character {
    fn default() -> Self {
        Self::new()
    }
}
