use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use hecs::{Entity, World};
use log::debug;

use crate::components::{BodyRef, JumpPlate, PickUp, Pose};
use crate::physics::{PhysicsBody, PhysicsWorld};

/// Launch speed granted to a body standing on a plate, per unit mass.
pub const PLATE_LAUNCH_SPEED: f32 = 18.0;
/// Upward probe length in simulation units.
const PROBE_LENGTH: f32 = 0.1;

/// Probe above each idle plate and launch the character or any carryable
/// body found there; triggered plates animate a flap and re-arm when it
/// settles back down.
pub fn jump_plate_system(ecs: &mut World, physics: &mut PhysicsWorld, player: Entity) {
    let plates: Vec<(Entity, PhysicsBody, f32, bool, f32, f32)> = ecs
        .query::<(&JumpPlate, &BodyRef)>()
        .iter()
        .map(|(e, (plate, body))| {
            (
                e,
                body.0,
                plate.facing,
                plate.triggered,
                plate.angle,
                plate.last_angle,
            )
        })
        .collect();

    for (entity, body, facing, triggered, angle, last_angle) in plates {
        let old_angle = angle;
        let mut angle = angle;
        let mut triggered = triggered;

        if triggered {
            // Flap: snap up fast, settle back slower.
            if angle == 0.0 || last_angle < angle {
                angle += PI / 9.0;
            } else {
                angle -= PI / 19.0;
            }
        } else if let Some(hit) =
            physics.raycast(physics.position(body), Vec2::new(0.0, -PROBE_LENGTH), Some(body))
        {
            let eligible = hit.entity == player || ecs.get::<&PickUp>(hit.entity).is_ok();
            if eligible {
                if let Some(target) = ecs.get::<&BodyRef>(hit.entity).ok().map(|b| b.0) {
                    let launch = PLATE_LAUNCH_SPEED * physics.mass(target);
                    physics.apply_impulse(target, Vec2::new(facing * launch, -launch));
                    triggered = true;
                    debug!("plate {:?} launched {:?}", entity, hit.entity);
                }
            }
        }

        let mut last_angle = old_angle;
        if angle >= FRAC_PI_2 {
            angle = FRAC_PI_2;
            last_angle = FRAC_PI_2;
        }
        if angle < 0.0 {
            angle = 0.0;
            last_angle = 0.0;
            triggered = false;
        }
        if let Ok(mut plate) = ecs.get::<&mut JumpPlate>(entity) {
            plate.angle = angle;
            plate.last_angle = last_angle;
            plate.triggered = triggered;
        }
    }
}
