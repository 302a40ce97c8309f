use glam::Vec2;
use hecs::{Entity, World};
use log::debug;

use crate::components::{BodyRef, Character, PickUp, Portalable, Pose};
use crate::physics::{JointHandle, PhysicsBody, PhysicsWorld, DEFAULT_FRICTION, SCALE};
use crate::systems::portal::fire_portal;

pub const RUN_SPEED: f32 = 6.0;
pub const JUMP_SPEED: f32 = 8.0;
/// A jump intent keeps retrying for this many ticks, so a press slightly
/// before landing still fires.
pub const JUMP_INTENT_FRAMES: u32 = 6;

const MAX_HOLD_DISTANCE: f32 = 100.0;
const STUCK_EPSILON: f32 = 0.2;
const REAIM_THRESHOLD: f32 = 0.1;
const GROUND_ACCEL: f32 = 0.3;
const AIR_ACCEL: f32 = 0.05;
const HOLD_FREQUENCY_HZ: f32 = 1.0;
const HOLD_DAMPING_RATIO: f32 = 0.1;
/// Hand anchor and pickup reach, as fractions of the character width.
const HAND_REACH: f32 = 0.8;
const PICKUP_REACH: f32 = 0.9;

/// Drive the player character for one tick: aim, ground sensing, running,
/// jumping, stuck recovery, and the context-sensitive action (release /
/// pick up / fire a portal).
pub fn character_system(ecs: &mut World, physics: &mut PhysicsWorld) {
    let player = {
        let mut query = ecs.query::<&Character>();
        match query.iter().next() {
            Some((entity, _)) => entity,
            None => return,
        }
    };

    // Mid-teleport and exiting characters are frozen; intents stay queued.
    if let Ok(portable) = ecs.get::<&Portalable>(player) {
        if portable.in_transit() || portable.exiting {
            return;
        }
    }
    let pose = match ecs.get::<&Pose>(player) {
        Ok(pose) => *pose,
        Err(_) => return,
    };
    let body = match ecs.get::<&BodyRef>(player) {
        Ok(body) => body.0,
        Err(_) => return,
    };

    let (aim, run_dir, mut jump_frames, avg, mut held, mut hold_joint, mut last_aim, mut action, latch) = {
        let Ok(mut ch) = ecs.get::<&mut Character>(player) else {
            return;
        };
        let to_pointer = ch.aim_target - pose.center();
        ch.aim_angle = to_pointer.y.atan2(to_pointer.x);
        (
            ch.aim_angle,
            ch.run_dir,
            ch.jump_frames,
            ch.avg_pos,
            ch.held,
            ch.hold_joint,
            ch.last_aim_angle,
            ch.action_queued,
            ch.shoot_orange_next,
        )
    };

    let vel = physics.velocity(body);
    let mass = physics.mass(body);
    let underfoot = something_underfoot(physics, body, pose.width);

    let mut jump_consumed = false;
    let mut force_release = false;

    if let Some(found) = underfoot {
        if jump_frames > 0 && vel.y.abs() < JUMP_SPEED * 0.2 {
            physics.apply_impulse(body, Vec2::new(0.0, -JUMP_SPEED * mass));
            let is_pickup = ecs.get::<&PickUp>(found).is_ok();
            if is_pickup {
                // Push off the support so light objects sink under the jump.
                if let Ok(found_body) = ecs.get::<&BodyRef>(found) {
                    let down = physics.mass(found_body.0) * JUMP_SPEED * 0.5;
                    physics.apply_impulse(found_body.0, Vec2::new(0.0, down));
                }
                jump_consumed = true;
                if held == Some(found) {
                    force_release = true;
                }
            }
        } else if run_dir != 0 {
            let new_vx = throttle(vel.x, RUN_SPEED * run_dir as f32, GROUND_ACCEL);
            physics.set_velocity(body, Vec2::new(new_vx, vel.y));
        }
    } else if (pose.left - avg.x).abs() < STUCK_EPSILON && (pose.top - avg.y).abs() < STUCK_EPSILON {
        // Wedged against geometry with no support underfoot.
        if jump_frames > 0 || run_dir != 0 {
            let ix = if run_dir != 0 {
                RUN_SPEED * GROUND_ACCEL * run_dir as f32 * mass
            } else {
                0.0
            };
            let iy = if jump_frames > 0 {
                jump_consumed = true;
                -GROUND_ACCEL * JUMP_SPEED * mass
            } else {
                0.0
            };
            physics.apply_impulse(body, Vec2::new(ix, iy));
        } else {
            // Idle and stuck: a small downward shove settles the body.
            physics.apply_impulse(body, Vec2::new(0.0, 0.2 * JUMP_SPEED * mass));
        }
    } else if run_dir != 0 {
        let new_vx = throttle(vel.x, RUN_SPEED * run_dir as f32, AIR_ACCEL);
        physics.set_velocity(body, Vec2::new(new_vx, vel.y));
    }

    let new_avg = avg * 0.9 + Vec2::new(pose.left, pose.top) * 0.1;
    if jump_consumed {
        jump_frames = 0;
    }
    if jump_frames > 0 {
        jump_frames -= 1;
    }

    if force_release {
        release_held(ecs, physics, &mut held, &mut hold_joint);
        action = false;
    }

    let mut latch_update = None;
    if action {
        if held.is_some() {
            release_held(ecs, physics, &mut held, &mut hold_joint);
        } else if let Some(target) = find_pickup(ecs, physics, body, aim, pose.width) {
            hold_joint = attach_held(ecs, physics, body, target, &pose, aim);
            held = hold_joint.is_some().then_some(target);
            last_aim = aim;
            debug!("picked up {:?}", target);
        } else {
            latch_update = Some(fire_portal(ecs, pose.center(), pose.width / 2.0, aim, latch));
        }
        action = false;
    } else if let Some(carried) = held {
        if !ecs.contains(carried) {
            // The carried entity was removed from the world this frame.
            held = None;
            if let Some(joint) = hold_joint.take() {
                physics.destroy_joint(joint);
            }
        } else {
            let carried_pose = ecs.get::<&Pose>(carried).map(|p| *p).ok();
            match carried_pose {
                Some(p) if pose.distance_to(&p) > MAX_HOLD_DISTANCE => {
                    release_held(ecs, physics, &mut held, &mut hold_joint);
                }
                Some(_) if (aim - last_aim).abs() > REAIM_THRESHOLD => {
                    // Cheap reattach at the new hand anchor.
                    if let Some(joint) = hold_joint.take() {
                        physics.destroy_joint(joint);
                    }
                    hold_joint = attach_held(ecs, physics, body, carried, &pose, aim);
                    last_aim = aim;
                }
                _ => {}
            }
        }
    }

    if let Ok(mut ch) = ecs.get::<&mut Character>(player) {
        ch.jump_frames = jump_frames;
        ch.avg_pos = new_avg;
        ch.held = held;
        ch.hold_joint = hold_joint;
        ch.last_aim_angle = last_aim;
        ch.action_queued = action;
        if let Some(latch) = latch_update {
            ch.shoot_orange_next = latch;
        }
    }
}

/// Two short diagonal probes below the feet; the first body found is the
/// support. `None` is the normal airborne outcome.
fn something_underfoot(physics: &PhysicsWorld, body: PhysicsBody, width: f32) -> Option<Entity> {
    let ray_len = 0.6 * width / SCALE;
    let origin = physics.position(body);
    for side in [-0.3_f32, 0.3] {
        let probe = Vec2::new(ray_len * side, ray_len);
        if let Some(hit) = physics.raycast(origin, probe, Some(body)) {
            return Some(hit.entity);
        }
    }
    None
}

/// Drive `vx` toward `max` by a fraction of it, never overshooting and
/// never braking a body already faster than the target.
fn throttle(vx: f32, max: f32, accel: f32) -> f32 {
    let mut new_vx = vx + max * accel;
    if new_vx.abs() > max.abs() {
        if vx.abs() > max.abs() {
            if new_vx.abs() > vx.abs() {
                new_vx = vx;
            }
        } else {
            new_vx = max;
        }
    }
    new_vx
}

fn find_pickup(
    ecs: &World,
    physics: &PhysicsWorld,
    body: PhysicsBody,
    aim: f32,
    width: f32,
) -> Option<Entity> {
    let probe = Vec2::from_angle(aim) * (PICKUP_REACH * width / SCALE);
    let hit = physics.raycast(physics.position(body), probe, Some(body))?;
    ecs.get::<&PickUp>(hit.entity).ok()?;
    Some(hit.entity)
}

fn attach_held(
    ecs: &World,
    physics: &mut PhysicsWorld,
    player_body: PhysicsBody,
    target: Entity,
    pose: &Pose,
    aim: f32,
) -> Option<JointHandle> {
    let target_body = ecs.get::<&BodyRef>(target).ok()?.0;
    let target_width = ecs.get::<&Pose>(target).ok()?.width;
    let anchor =
        physics.position(player_body) + Vec2::from_angle(aim) * (HAND_REACH * pose.width / SCALE);
    let rest_length = 0.2 * target_width / SCALE;
    physics.set_friction(target_body, 0.0);
    Some(physics.create_hold_joint(
        player_body,
        target_body,
        anchor,
        rest_length,
        HOLD_FREQUENCY_HZ,
        HOLD_DAMPING_RATIO,
    ))
}

fn release_held(
    ecs: &World,
    physics: &mut PhysicsWorld,
    held: &mut Option<Entity>,
    joint: &mut Option<JointHandle>,
) {
    if let Some(joint) = joint.take() {
        physics.destroy_joint(joint);
    }
    if let Some(carried) = held.take() {
        if let Ok(body) = ecs.get::<&BodyRef>(carried) {
            physics.set_friction(body.0, DEFAULT_FRICTION);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Portal;

    struct Rig {
        ecs: World,
        physics: PhysicsWorld,
        player: Entity,
    }

    fn rig() -> Rig {
        let mut ecs = World::new();
        let mut physics = PhysicsWorld::new();
        let pose = Pose::new(75.0, 75.0, 50.0, 50.0);
        let player = ecs.spawn((pose, Portalable::new(), Character::new()));
        let body = physics.add_circle_body(player, &pose, None, false);
        physics.set_restitution(body, 0.0);
        physics.scale_mass(body, 3.0);
        ecs.insert_one(player, BodyRef(body)).unwrap();
        Rig {
            ecs,
            physics,
            player,
        }
    }

    fn spawn_crate(rig: &mut Rig, left: f32, top: f32) -> Entity {
        let pose = Pose::new(left, top, 30.0, 30.0);
        let e = rig.ecs.spawn((pose, Portalable::new(), PickUp));
        let body = rig.physics.add_rect_body(e, &pose, Some(0.0), false);
        rig.ecs.insert_one(e, BodyRef(body)).unwrap();
        e
    }

    fn spawn_floor(rig: &mut Rig, top: f32) -> Entity {
        let pose = Pose::new(0.0, top, 600.0, 3.0);
        let e = rig.ecs.spawn((pose,));
        let body = rig.physics.add_rect_body(e, &pose, None, true);
        rig.ecs.insert_one(e, BodyRef(body)).unwrap();
        e
    }

    fn character(rig: &mut Rig) -> hecs::RefMut<'_, Character> {
        rig.ecs.get::<&mut Character>(rig.player).unwrap()
    }

    fn player_body(rig: &Rig) -> PhysicsBody {
        rig.ecs.get::<&BodyRef>(rig.player).unwrap().0
    }

    #[test]
    fn grounded_jump_applies_upward_impulse() {
        let mut rig = rig();
        spawn_floor(&mut rig, 126.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.jump_frames = JUMP_INTENT_FRAMES;
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let vel = rig.physics.velocity(player_body(&rig));
        assert!(vel.y < -JUMP_SPEED * 0.9, "expected jump, vy = {}", vel.y);
    }

    #[test]
    fn airborne_jump_intent_does_nothing_and_decays() {
        let mut rig = rig();
        rig.physics.refresh_queries();
        // Break the stuck detector so the airborne branch is exercised.
        {
            let mut ch = character(&mut rig);
            ch.jump_frames = 2;
            ch.avg_pos = Vec2::new(-100.0, -100.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        assert_eq!(rig.physics.velocity(player_body(&rig)), Vec2::ZERO);
        assert_eq!(character(&mut rig).jump_frames, 1);
    }

    #[test]
    fn ground_running_accelerates_toward_run_speed() {
        let mut rig = rig();
        spawn_floor(&mut rig, 126.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.run_dir = 1;
            ch.facing = 1;
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let vel = rig.physics.velocity(player_body(&rig));
        assert!((vel.x - RUN_SPEED * GROUND_ACCEL).abs() < 1e-3);
        // Repeated ticks converge on the run speed without overshoot.
        for _ in 0..20 {
            character_system(&mut rig.ecs, &mut rig.physics);
        }
        let vel = rig.physics.velocity(player_body(&rig));
        assert!((vel.x - RUN_SPEED).abs() < 1e-3);
    }

    #[test]
    fn stuck_character_gets_a_downward_nudge() {
        let mut rig = rig();
        rig.physics.refresh_queries();
        {
            let pose = *rig.ecs.get::<&Pose>(rig.player).unwrap();
            let mut ch = character(&mut rig);
            ch.avg_pos = Vec2::new(pose.left, pose.top);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let vel = rig.physics.velocity(player_body(&rig));
        assert!(vel.y > 0.0, "expected a settle nudge, vy = {}", vel.y);
    }

    #[test]
    fn action_picks_up_a_reachable_object() {
        let mut rig = rig();
        let item = spawn_crate(&mut rig, 115.0, 85.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.aim_target = Vec2::new(300.0, 100.0);
            ch.action_queued = true;
            ch.avg_pos = Vec2::new(-100.0, -100.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let ch = rig.ecs.get::<&Character>(rig.player).unwrap();
        assert_eq!(ch.held, Some(item));
        assert!(ch.hold_joint.is_some());
        assert!(!ch.action_queued);
        drop(ch);
        assert_eq!(rig.physics.joint_count(), 1);
        let item_body = rig.ecs.get::<&BodyRef>(item).unwrap().0;
        assert_eq!(rig.physics.friction(item_body), 0.0);
    }

    #[test]
    fn release_destroys_the_joint_and_restores_friction() {
        let mut rig = rig();
        let item = spawn_crate(&mut rig, 115.0, 85.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.aim_target = Vec2::new(300.0, 100.0);
            ch.action_queued = true;
            ch.avg_pos = Vec2::new(-100.0, -100.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        {
            let mut ch = character(&mut rig);
            ch.action_queued = true;
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let ch = rig.ecs.get::<&Character>(rig.player).unwrap();
        assert_eq!(ch.held, None);
        assert!(ch.hold_joint.is_none());
        drop(ch);
        assert_eq!(rig.physics.joint_count(), 0);
        let item_body = rig.ecs.get::<&BodyRef>(item).unwrap().0;
        assert_eq!(rig.physics.friction(item_body), DEFAULT_FRICTION);
    }

    #[test]
    fn action_with_nothing_in_reach_fires_a_portal() {
        let mut rig = rig();
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.aim_target = Vec2::new(300.0, 100.0);
            ch.action_queued = true;
            ch.avg_pos = Vec2::new(-100.0, -100.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        assert_eq!(rig.ecs.query::<&Portal>().iter().count(), 1);
        let ch = rig.ecs.get::<&Character>(rig.player).unwrap();
        assert!(ch.shoot_orange_next, "blue shot flips the latch");
        assert!(ch.held.is_none());
    }

    #[test]
    fn carrying_beyond_reach_drops_the_object() {
        let mut rig = rig();
        let item = spawn_crate(&mut rig, 115.0, 85.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.aim_target = Vec2::new(300.0, 100.0);
            ch.action_queued = true;
            ch.avg_pos = Vec2::new(-100.0, -100.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        assert_eq!(rig.ecs.get::<&Character>(rig.player).unwrap().held, Some(item));
        // Drag the crate far away and resync its pose.
        let item_body = rig.ecs.get::<&BodyRef>(item).unwrap().0;
        rig.physics.set_position(item_body, Vec2::new(20.0, 20.0));
        {
            let mut pose = rig.ecs.get::<&mut Pose>(item).unwrap();
            pose.left = 20.0 * SCALE;
            pose.top = 20.0 * SCALE;
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        assert_eq!(rig.ecs.get::<&Character>(rig.player).unwrap().held, None);
        assert_eq!(rig.physics.joint_count(), 0);
        assert_eq!(rig.physics.friction(item_body), DEFAULT_FRICTION);
    }

    #[test]
    fn reaiming_recreates_the_joint_at_the_new_anchor() {
        let mut rig = rig();
        let item = spawn_crate(&mut rig, 115.0, 85.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.aim_target = Vec2::new(300.0, 100.0);
            ch.action_queued = true;
            ch.avg_pos = Vec2::new(-100.0, -100.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let first_aim = rig.ecs.get::<&Character>(rig.player).unwrap().last_aim_angle;
        {
            let mut ch = character(&mut rig);
            // Well past the 0.1 rad threshold.
            ch.aim_target = Vec2::new(300.0, 180.0);
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let ch = rig.ecs.get::<&Character>(rig.player).unwrap();
        assert_eq!(ch.held, Some(item));
        assert!((ch.last_aim_angle - first_aim).abs() > REAIM_THRESHOLD);
        drop(ch);
        assert_eq!(rig.physics.joint_count(), 1);
    }

    #[test]
    fn jumping_off_a_carryable_support_pushes_it_down() {
        let mut rig = rig();
        // Crate directly below the player's feet.
        let item = spawn_crate(&mut rig, 85.0, 126.0);
        rig.physics.refresh_queries();
        {
            let mut ch = character(&mut rig);
            ch.jump_frames = JUMP_INTENT_FRAMES;
        }
        character_system(&mut rig.ecs, &mut rig.physics);
        let vel = rig.physics.velocity(player_body(&rig));
        assert!(vel.y < 0.0, "player must jump");
        let item_body = rig.ecs.get::<&BodyRef>(item).unwrap().0;
        let item_vel = rig.physics.velocity(item_body);
        assert!(item_vel.y > 0.0, "support must be pushed down");
        assert_eq!(character(&mut rig).jump_frames, 0);
    }
}
