use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};
use log::{debug, info};

use crate::components::{BodyRef, Portal, PortalColor, Portalable, Pose, Surface};
use crate::physics::{PhysicsWorld, SCALE};

pub const PORTAL_WIDTH: f32 = 40.0;
pub const PORTAL_HEIGHT: f32 = 10.0;
/// Screen units a flying portal covers per frame.
pub const PORTAL_SPEED: f32 = 30.0;

/// Spawn a portal from `origin` (the shooter's center), offset to a muzzle
/// point `muzzle_offset` along `aim`. Color alternates: blue by default,
/// orange when a blue portal already exists and either the alternation
/// latch demands orange or no orange is placed. Any portal of the chosen
/// color is removed first, so at most one lives per color.
///
/// Returns the new latch value (true when this shot was blue).
pub fn fire_portal(
    ecs: &mut World,
    origin: Vec2,
    muzzle_offset: f32,
    aim: f32,
    shoot_orange_next: bool,
) -> bool {
    let mut has_blue = false;
    let mut has_orange = false;
    for (_e, portal) in ecs.query::<&Portal>().iter() {
        match portal.color {
            PortalColor::Blue => has_blue = true,
            PortalColor::Orange => has_orange = true,
        }
    }
    let color = if has_blue && (shoot_orange_next || !has_orange) {
        PortalColor::Orange
    } else {
        PortalColor::Blue
    };

    let stale: Vec<Entity> = ecs
        .query::<&Portal>()
        .iter()
        .filter(|(_, p)| p.color == color)
        .map(|(e, _)| e)
        .collect();
    for e in stale {
        let _ = ecs.despawn(e);
    }

    let center = origin + Vec2::from_angle(aim) * muzzle_offset;
    ecs.spawn((
        Portal::new(color, aim),
        Pose::new(
            center.x - PORTAL_WIDTH / 2.0,
            center.y - PORTAL_HEIGHT / 2.0,
            PORTAL_WIDTH,
            PORTAL_HEIGHT,
        ),
    ));
    info!("fired {:?} portal at angle {:.2}", color, aim);
    color == PortalColor::Blue
}

struct FlightState {
    entity: Entity,
    pose: Pose,
    speed: f32,
    angle: f32,
    attached: bool,
    on_top: bool,
    discarded: bool,
}

/// Advance unattached portals along their flight line, probing ahead by
/// 1.2× the per-frame travel. A recognized surface stops the portal flush
/// on its near face; anything else (or an edge/overlap conflict at the
/// landing spot) discards it.
pub fn portal_flight_system(ecs: &mut World, physics: &PhysicsWorld) {
    let surfaces: HashMap<Entity, Pose> = ecs
        .query::<(&Surface, &Pose)>()
        .iter()
        .map(|(e, (_, pose))| (e, *pose))
        .collect();

    let mut flights: Vec<FlightState> = ecs
        .query::<(&Portal, &Pose)>()
        .iter()
        .map(|(e, (portal, pose))| FlightState {
            entity: e,
            pose: *pose,
            speed: portal.speed,
            angle: portal.flight_angle,
            attached: portal.attached,
            on_top: portal.on_top,
            discarded: false,
        })
        .collect();

    // Sequential pass: each portal sees the ones before it already moved,
    // which keeps the landing-overlap check order-consistent.
    for i in 0..flights.len() {
        if flights[i].speed == 0.0 {
            continue;
        }
        let center = flights[i].pose.center();
        let probe = Vec2::from_angle(flights[i].angle) * (1.2 * flights[i].speed / SCALE);
        let hit = physics.raycast(center / SCALE, probe, None);
        match hit.and_then(|h| surfaces.get(&h.entity).copied()) {
            Some(surface) => {
                let mut new_y = surface.top;
                let mut on_top = true;
                if center.y > surface.top {
                    new_y += surface.height;
                    on_top = false;
                }
                let diff_y = new_y - center.y;
                let angle = flights[i].angle;
                let mut diff_x = flights[i].speed * angle.cos();
                if angle.sin() != 0.0 {
                    diff_x = diff_y * angle.cos() / angle.sin();
                }
                let landing = Vec2::new(center.x + diff_x, new_y);

                let near_edge = landing.x > surface.left + surface.width - PORTAL_WIDTH / 3.0
                    || landing.x < surface.left + PORTAL_WIDTH / 3.0;
                let overlapping = flights.iter().enumerate().any(|(j, other)| {
                    j != i
                        && !other.discarded
                        && (landing.x - other.pose.center().x).abs() < PORTAL_WIDTH
                        && on_top == other.on_top
                        && (landing.y - other.pose.center().y).abs() < 0.5
                });

                let state = &mut flights[i];
                state.pose.left = landing.x - state.pose.width / 2.0;
                state.pose.top = landing.y - state.pose.height / 2.0;
                state.speed = 0.0;
                state.angle = 0.0;
                state.on_top = on_top;
                if near_edge || overlapping {
                    state.discarded = true;
                    debug!("portal {:?} discarded at landing", state.entity);
                } else {
                    state.attached = true;
                }
            }
            None if hit.is_some() => {
                flights[i].discarded = true;
            }
            None => {
                let step = Vec2::from_angle(flights[i].angle) * flights[i].speed;
                flights[i].pose.left += step.x;
                flights[i].pose.top += step.y;
            }
        }
    }

    for flight in flights {
        if flight.discarded {
            let _ = ecs.despawn(flight.entity);
            continue;
        }
        if let Ok((portal, pose)) = ecs.query_one_mut::<(&mut Portal, &mut Pose)>(flight.entity) {
            *pose = flight.pose;
            portal.speed = flight.speed;
            portal.flight_angle = flight.angle;
            portal.attached = flight.attached;
            portal.on_top = flight.on_top;
        }
    }

    for (_e, portal) in ecs.query_mut::<&mut Portal>() {
        portal.age += 1;
    }
}

struct Mouth {
    entity: Entity,
    color: PortalColor,
    center: Vec2,
    on_top: bool,
    width: f32,
    height: f32,
}

/// Let every attached portal with an attached opposite-colored partner
/// capture eligible entities crossing its mouth.
pub fn portal_scan_system(ecs: &mut World, physics: &mut PhysicsWorld) {
    let mouths: Vec<Mouth> = ecs
        .query::<(&Portal, &Pose)>()
        .iter()
        .filter(|(_, (portal, _))| portal.attached)
        .map(|(e, (portal, pose))| Mouth {
            entity: e,
            color: portal.color,
            center: pose.center(),
            on_top: portal.on_top,
            width: pose.width,
            height: pose.height,
        })
        .collect();

    for mouth in &mouths {
        let Some(partner) = mouths.iter().find(|m| m.color != mouth.color) else {
            continue;
        };
        for (entity, (pose, portable, body)) in
            ecs.query_mut::<(&Pose, &mut Portalable, &BodyRef)>()
        {
            if portable.in_transit() || portable.cooldown > 0 || portable.exiting {
                continue;
            }
            let center_x = pose.left + pose.width / 2.0;
            if (center_x - mouth.center.x).abs() >= mouth.width * 0.6 {
                continue;
            }
            let mut relevant_y = pose.top;
            if mouth.on_top {
                relevant_y += pose.height;
            }
            if (relevant_y - mouth.center.y).abs() < mouth.height * 2.0 {
                physics.set_enabled(body.0, false);
                portable.being_portaled = 1;
                portable.from_portal = Some(mouth.entity);
                portable.goto_portal = Some(partner.entity);
                debug!("portal {:?} captured {:?}", mouth.entity, entity);
            }
        }
    }
}
