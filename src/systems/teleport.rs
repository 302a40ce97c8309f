use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};
use log::debug;

use crate::components::{BodyRef, Portal, Portalable, Pose};
use crate::physics::{PhysicsWorld, SCALE};

/// Frames spent sinking into the source portal before the position flip.
/// The full transit is exactly twice this.
pub const TELEPORT_FRAMES: i32 = 4;

/// Post-teleport immunity, in frames.
pub const TELEPORT_COOLDOWN_FRAMES: u32 = 15;

/// Copy every body-backed entity's simulation pose into its screen pose.
/// Runs right after the physics step so gameplay reads current state.
pub fn pose_sync_system(ecs: &mut World, physics: &PhysicsWorld) {
    for (_e, (pose, body)) in ecs.query_mut::<(&mut Pose, &BodyRef)>() {
        physics.sync_pose(body.0, pose);
    }
}

/// Advance the teleport state machine of every portalable entity.
///
/// Counter progression per tick, starting from the capture value 1:
/// increment up to [`TELEPORT_FRAMES`], then flip sign and perform the
/// position/velocity write, then increment back toward zero. On zero the
/// portal references are cleared, the cooldown starts, and the body is
/// reactivated unless the entity is leaving the level.
pub fn teleport_system(ecs: &mut World, physics: &mut PhysicsWorld) {
    // Snapshot the portal endpoints first; the mutable pass below cannot
    // look other entities up while it holds the query borrow.
    let endpoints: HashMap<Entity, (Vec2, f32, bool)> = ecs
        .query::<(&Portal, &Pose)>()
        .iter()
        .map(|(e, (portal, pose))| (e, (pose.center(), pose.height, portal.on_top)))
        .collect();

    for (entity, (pose, body, portable)) in
        ecs.query_mut::<(&mut Pose, &BodyRef, &mut Portalable)>()
    {
        if portable.being_portaled != 0 {
            if portable.being_portaled >= TELEPORT_FRAMES {
                portable.being_portaled = -portable.being_portaled;
                let from = portable.from_portal.and_then(|e| endpoints.get(&e));
                let goto = portable.goto_portal.and_then(|e| endpoints.get(&e));
                match (from, goto) {
                    (Some(&(_, _, from_top)), Some(&(center, thickness, goto_top))) => {
                        let mut pos = center / SCALE;
                        let offset = (pose.height / 2.0 + thickness) / SCALE;
                        if goto_top {
                            pos.y -= offset;
                        } else {
                            pos.y += offset;
                        }
                        physics.set_position(body.0, pos);
                        physics.sync_pose(body.0, pose);
                        if from_top != goto_top {
                            let vel = physics.velocity(body.0);
                            physics.set_velocity(body.0, Vec2::new(vel.x, -vel.y));
                        }
                        debug!("teleported {:?} to {:?}", entity, pos);
                    }
                    _ => {
                        // An endpoint vanished mid-transit; abort the trip
                        // where the entity already is.
                        portable.being_portaled = 0;
                    }
                }
            } else {
                portable.being_portaled += 1;
            }
            if portable.being_portaled == 0 {
                portable.from_portal = None;
                portable.goto_portal = None;
                portable.cooldown = TELEPORT_COOLDOWN_FRAMES;
                if !portable.exiting {
                    physics.set_enabled(body.0, true);
                }
            }
        }
        if portable.cooldown > 0 {
            portable.cooldown -= 1;
        }
    }
}
