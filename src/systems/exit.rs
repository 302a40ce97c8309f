use hecs::{Entity, World};
use log::info;

use crate::components::{BodyRef, ExitZone, Portalable, Pose};
use crate::physics::PhysicsWorld;

pub const EXIT_ANIMATION_FRAMES: u32 = 25;

/// Capture the character once it overlaps the exit zone, then count the
/// departure animation down. Returns true when the level should reset.
pub fn exit_system(ecs: &mut World, physics: &mut PhysicsWorld, player: Entity) -> bool {
    let Some(player_center) = ecs.get::<&Pose>(player).ok().map(|p| p.center()) else {
        return false;
    };

    let mut reset = false;
    let mut captured = false;
    for (_e, (exit, pose)) in ecs.query_mut::<(&mut ExitZone, &Pose)>() {
        if exit.countdown > 0 {
            exit.countdown += 1;
            if exit.countdown > EXIT_ANIMATION_FRAMES {
                reset = true;
            }
            continue;
        }
        let center = pose.center();
        if (player_center.x - center.x).abs() < pose.width * 0.7
            && (player_center.y - center.y).abs() < pose.height * 0.7
        {
            exit.countdown = 1;
            captured = true;
        }
    }

    if captured {
        info!("character reached the exit");
        if let Ok(mut portable) = ecs.get::<&mut Portalable>(player) {
            portable.exiting = true;
        }
        if let Ok(body) = ecs.get::<&BodyRef>(player) {
            physics.set_enabled(body.0, false);
        }
    }
    reset
}
