use glam::Vec2;
use hecs::{Entity, World};
use log::debug;

use crate::components::{BodyRef, Bullet, Character, Portalable, Pose, Turret};
use crate::physics::{PhysicsWorld, SCALE};
use crate::world::TICK_RATE;

pub const SHOTS_PER_SECOND: u32 = 5;
/// Bullet muzzle velocity in simulation units per second.
pub const BULLET_SPEED: f32 = 25.0;
pub const BULLET_LIFE_FRAMES: u32 = TICK_RATE / 4;
const MAGAZINE: u32 = SHOTS_PER_SECOND * 20;
const RELOAD_FRAMES: u32 = TICK_RATE * 4;
const BULLET_MASS_SCALE: f32 = 2000.0;

/// Let every upright, unheld, non-teleporting turret look for the player
/// along its facing and fire ballistic bullets at it.
pub fn turret_system(ecs: &mut World, physics: &mut PhysicsWorld, player: Entity) {
    let held = ecs
        .get::<&Character>(player)
        .ok()
        .and_then(|ch| ch.held);

    let mut shots: Vec<(f32, f32, f32)> = Vec::new();
    for (entity, (turret, pose, portable, body)) in
        ecs.query_mut::<(&mut Turret, &Pose, &Portalable, &BodyRef)>()
    {
        if portable.in_transit() {
            continue;
        }
        if turret.shots_fired > MAGAZINE {
            turret.shots_fired = 0;
            turret.reloading = RELOAD_FRAMES;
        }
        if turret.reloading > 0 {
            turret.reloading -= 1;
            continue;
        }
        let tilt = pose.angle.abs() % std::f32::consts::TAU;
        let upright = tilt < 0.1 || tilt > std::f32::consts::TAU - 0.1;
        if upright && turret.firing == 0 && Some(entity) != held {
            let eye = Vec2::new(pose.left + pose.width / 2.0, pose.top + pose.height / 3.0);
            let reach = 10.0 * pose.width / SCALE;
            let sighted = physics
                .raycast(eye / SCALE, Vec2::new(turret.facing * reach, 0.0), Some(body.0))
                .map(|hit| hit.entity == player)
                .unwrap_or(false);
            if sighted {
                let muzzle_x = pose.left + if turret.facing > 0.0 { pose.width } else { 0.0 };
                shots.push((muzzle_x, pose.top + pose.height * 0.2, turret.facing));
                turret.shots_fired += 1;
                turret.firing = TICK_RATE / SHOTS_PER_SECOND;
            }
        }
        if turret.firing > 0 {
            turret.firing -= 1;
        }
    }

    for (x, y, facing) in shots {
        spawn_bullet(ecs, physics, x, y, facing);
    }
}

fn spawn_bullet(ecs: &mut World, physics: &mut PhysicsWorld, center_x: f32, center_y: f32, facing: f32) {
    let pose = Pose::new(center_x - 1.0, center_y - 1.0, 2.0, 2.0);
    let entity = ecs.spawn((
        pose,
        Bullet {
            life: BULLET_LIFE_FRAMES,
        },
    ));
    let body = physics.add_rect_body(entity, &pose, None, false);
    // Tiny footprint, ballistic mass; CCD keeps it from tunnelling.
    physics.scale_mass(body, BULLET_MASS_SCALE);
    physics.set_restitution(body, 0.0);
    physics.enable_ccd(body);
    physics.set_velocity(body, Vec2::new(BULLET_SPEED * facing, 0.0));
    let _ = ecs.insert_one(entity, BodyRef(body));
    debug!("bullet fired at ({:.0}, {:.0})", center_x, center_y);
}

/// Age bullets and remove the expired ones together with their bodies.
pub fn bullet_system(ecs: &mut World, physics: &mut PhysicsWorld) {
    let mut dead = Vec::new();
    for (entity, bullet) in ecs.query_mut::<&mut Bullet>() {
        if bullet.life > 0 {
            bullet.life -= 1;
        }
        if bullet.life == 0 {
            dead.push(entity);
        }
    }
    for entity in dead {
        if let Some(body) = ecs.get::<&BodyRef>(entity).ok().map(|b| b.0) {
            physics.remove_body(body);
        }
        let _ = ecs.despawn(entity);
    }
}
