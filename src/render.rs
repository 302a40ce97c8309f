//! Flat-shape canvas renderer. Reads entity poses and teleport counters;
//! contains no game logic and nothing reads back from it.

use sdl2::pixels::Color;
use sdl2::rect::{Point, Rect};
use sdl2::render::WindowCanvas;

use crate::components::{
    Bullet, Character, Crate, ExitZone, JumpPlate, Portal, PortalColor, Portalable, Pose, Surface,
    Turret, Wall,
};
use crate::systems::teleport::TELEPORT_FRAMES;
use crate::world::GameWorld;

const BACKGROUND: Color = Color::RGB(250, 250, 250);
const WALL_COLOR: Color = Color::RGB(153, 153, 153);
const SURFACE_COLOR: Color = Color::RGB(51, 51, 51);
const BLUE_PORTAL: Color = Color::RGB(122, 152, 255);
const ORANGE_PORTAL: Color = Color::RGB(255, 185, 15);
const INK: Color = Color::RGB(20, 20, 20);

fn rect(pose: &Pose) -> Rect {
    Rect::new(
        pose.left as i32,
        pose.top as i32,
        pose.width.max(1.0) as u32,
        pose.height.max(1.0) as u32,
    )
}

/// Outline of the pose's box rotated around its center.
fn draw_rotated_box(canvas: &mut WindowCanvas, pose: &Pose) {
    let center = pose.center();
    let (sin, cos) = pose.angle.sin_cos();
    let half_w = pose.width / 2.0;
    let half_h = pose.height / 2.0;
    let corners: Vec<Point> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
        .iter()
        .map(|(sx, sy)| {
            let x = sx * half_w;
            let y = sy * half_h;
            Point::new(
                (center.x + x * cos - y * sin) as i32,
                (center.y + x * sin + y * cos) as i32,
            )
        })
        .collect();
    for i in 0..4 {
        let _ = canvas.draw_line(corners[i], corners[(i + 1) % 4]);
    }
}

pub fn draw(canvas: &mut WindowCanvas, game: &GameWorld) {
    canvas.set_draw_color(BACKGROUND);
    canvas.clear();

    canvas.set_draw_color(WALL_COLOR);
    for (_e, (pose, _)) in game.ecs.query::<(&Pose, &Wall)>().iter() {
        let _ = canvas.fill_rect(rect(pose));
    }

    canvas.set_draw_color(SURFACE_COLOR);
    for (_e, (pose, _)) in game.ecs.query::<(&Pose, &Surface)>().iter() {
        let _ = canvas.fill_rect(rect(pose));
    }

    for (_e, (pose, plate)) in game.ecs.query::<(&Pose, &JumpPlate)>().iter() {
        canvas.set_draw_color(if plate.triggered { INK } else { SURFACE_COLOR });
        let top = pose.top + pose.height - 5.0;
        let _ = canvas.fill_rect(Rect::new(
            pose.left as i32,
            top as i32,
            pose.width as u32,
            5,
        ));
    }

    canvas.set_draw_color(INK);
    for (_e, (pose, _)) in game.ecs.query::<(&Pose, &Crate)>().iter() {
        draw_rotated_box(canvas, pose);
    }

    for (_e, (pose, turret)) in game.ecs.query::<(&Pose, &Turret)>().iter() {
        canvas.set_draw_color(INK);
        draw_rotated_box(canvas, pose);
        // Barrel on the facing side.
        let center = pose.center();
        let tip = center.x + turret.facing * pose.width * 0.8;
        let _ = canvas.draw_line(
            Point::new(center.x as i32, (pose.top + pose.height * 0.2) as i32),
            Point::new(tip as i32, (pose.top + pose.height * 0.2) as i32),
        );
    }

    canvas.set_draw_color(INK);
    for (_e, (pose, _)) in game.ecs.query::<(&Pose, &Bullet)>().iter() {
        let _ = canvas.fill_rect(rect(pose));
    }

    for (_e, (pose, exit)) in game.ecs.query::<(&Pose, &ExitZone)>().iter() {
        canvas.set_draw_color(if exit.countdown > 0 {
            ORANGE_PORTAL
        } else {
            Color::RGB(255, 215, 0)
        });
        let _ = canvas.fill_rect(rect(pose));
        canvas.set_draw_color(Color::RGB(68, 68, 68));
        let _ = canvas.draw_rect(rect(pose));
    }

    for (_e, (pose, portal)) in game.ecs.query::<(&Pose, &Portal)>().iter() {
        canvas.set_draw_color(match portal.color {
            PortalColor::Blue => BLUE_PORTAL,
            PortalColor::Orange => ORANGE_PORTAL,
        });
        // Unattached portals grow in over their first frames.
        let grow = 0.5 + 0.5 * (portal.age.min(16) as f32 / 16.0);
        let scale = if portal.attached { 1.0 } else { grow * 0.5 + 0.5 };
        let w = pose.width * scale;
        let h = pose.height * scale;
        let center = pose.center();
        let _ = canvas.fill_rect(Rect::new(
            (center.x - w / 2.0) as i32,
            (center.y - h / 2.0) as i32,
            w.max(1.0) as u32,
            h.max(1.0) as u32,
        ));
    }

    for (_e, (pose, portable, _)) in game
        .ecs
        .query::<(&Pose, &Portalable, &Character)>()
        .iter()
    {
        draw_character(canvas, pose, portable);
    }
}

fn draw_character(canvas: &mut WindowCanvas, pose: &Pose, portable: &Portalable) {
    let center = pose.center();
    if portable.in_transit() {
        // Shrinking flicker instead of the full figure while in a portal.
        let phase = portable.being_portaled.unsigned_abs() as f32 / TELEPORT_FRAMES as f32;
        let radius = (pose.width / 2.0) * (1.0 - phase * 0.8);
        canvas.set_draw_color(BLUE_PORTAL);
        let _ = canvas.fill_rect(Rect::new(
            (center.x - radius / 2.0) as i32,
            (center.y - radius / 2.0) as i32,
            radius.max(1.0) as u32,
            radius.max(1.0) as u32,
        ));
        return;
    }
    canvas.set_draw_color(INK);
    // Head.
    let head = pose.height * 0.2;
    let _ = canvas.draw_rect(Rect::new(
        (center.x - head / 2.0) as i32,
        (pose.top + pose.height * 0.15) as i32,
        head as u32,
        head as u32,
    ));
    // Torso.
    let _ = canvas.draw_line(
        Point::new(center.x as i32, (pose.top + pose.height * 0.35) as i32),
        Point::new(center.x as i32, (pose.top + pose.height * 0.75) as i32),
    );
    // Legs.
    let hip = pose.top + pose.height * 0.75;
    let _ = canvas.draw_line(
        Point::new(center.x as i32, hip as i32),
        Point::new(
            (center.x - pose.width / 8.0) as i32,
            (pose.top + pose.height) as i32,
        ),
    );
    let _ = canvas.draw_line(
        Point::new(center.x as i32, hip as i32),
        Point::new(
            (center.x + pose.width / 8.0) as i32,
            (pose.top + pose.height) as i32,
        ),
    );
}
