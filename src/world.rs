use glam::Vec2;
use hecs::{Entity, World};
use log::info;

use crate::components::{
    BodyRef, Character, Crate, ExitZone, JumpPlate, PickUp, Portalable, Pose, Surface, Turret, Wall,
};
use crate::level::{self, CANVAS_HEIGHT, CANVAS_WIDTH, WALL_THICKNESS};
use crate::physics::PhysicsWorld;
use crate::systems::character::JUMP_INTENT_FRAMES;
use crate::systems::{
    bullet_system, character_system, exit_system, jump_plate_system, portal_flight_system,
    portal_scan_system, pose_sync_system, teleport_system, turret_system,
};

/// Fixed gameplay tick rate.
pub const TICK_RATE: u32 = 30;
/// The physics step runs twice per tick at half dt; constrained targets may
/// drop to one coarser step without touching gameplay code.
const PHYSICS_SUBSTEPS: u32 = 2;
const SOLVER_ITERATIONS: usize = 10;

const CHARACTER_SIZE: f32 = 50.0;
const BOX_SIZE: f32 = 30.0;
const TURRET_WIDTH: f32 = 15.0;
const TURRET_HEIGHT: f32 = 30.0;
const PLATE_WIDTH: f32 = 15.0;
const EXIT_WIDTH: f32 = 25.0;
const EXIT_HEIGHT: f32 = 40.0;
const CHARACTER_MASS_SCALE: f32 = 3.0;

/// The explicit game context: entity table, physics world, and level state.
/// Systems receive the pieces they need; nothing is global.
pub struct GameWorld {
    pub ecs: World,
    pub physics: PhysicsWorld,
    pub level: usize,
    pub player: Entity,
    pub paused: bool,
    reset_queued: bool,
}

impl GameWorld {
    pub fn new(level_index: usize) -> Self {
        let (ecs, physics, player) = build_level(level_index);
        info!("loaded level {}", level_index);
        Self {
            ecs,
            physics,
            level: level_index,
            player,
            paused: false,
            reset_queued: false,
        }
    }

    /// Discard every entity, body, and joint and rebuild the world from the
    /// level definition. Loading the same index twice yields an equivalent
    /// starting state; there is no partial reset.
    pub fn load_level(&mut self, index: usize) {
        let (ecs, physics, player) = build_level(index);
        self.ecs = ecs;
        self.physics = physics;
        self.player = player;
        self.level = index;
        self.reset_queued = false;
        info!("loaded level {}", index);
    }

    /// One fixed-rate tick: physics first, then gameplay in a stable order,
    /// so every system reads the freshly integrated state.
    pub fn update(&mut self) {
        if self.reset_queued {
            let next = level::next_level(self.level);
            self.load_level(next);
        }
        if self.paused {
            return;
        }

        let dt = 1.0 / (TICK_RATE * PHYSICS_SUBSTEPS) as f32;
        for _ in 0..PHYSICS_SUBSTEPS {
            self.physics.step(dt, SOLVER_ITERATIONS);
        }
        pose_sync_system(&mut self.ecs, &self.physics);

        character_system(&mut self.ecs, &mut self.physics);
        if exit_system(&mut self.ecs, &mut self.physics, self.player) {
            self.reset_queued = true;
        }
        turret_system(&mut self.ecs, &mut self.physics, self.player);
        jump_plate_system(&mut self.ecs, &mut self.physics, self.player);
        teleport_system(&mut self.ecs, &mut self.physics);
        portal_flight_system(&mut self.ecs, &self.physics);
        portal_scan_system(&mut self.ecs, &mut self.physics);
        bullet_system(&mut self.ecs, &mut self.physics);
    }

    // -- intent surface (fed by the input collaborator) ---------------------

    pub fn set_run(&mut self, direction: Option<i32>) {
        if let Ok(mut ch) = self.ecs.get::<&mut Character>(self.player) {
            match direction {
                Some(d) if d != 0 => {
                    ch.run_dir = d.signum();
                    ch.facing = d.signum();
                }
                _ => ch.run_dir = 0,
            }
        }
    }

    pub fn trigger_jump(&mut self) {
        if let Ok(mut ch) = self.ecs.get::<&mut Character>(self.player) {
            ch.jump_frames = JUMP_INTENT_FRAMES;
        }
    }

    pub fn set_aim_target(&mut self, target: Vec2) {
        if let Ok(mut ch) = self.ecs.get::<&mut Character>(self.player) {
            ch.aim_target = target;
        }
    }

    pub fn trigger_action(&mut self) {
        if let Ok(mut ch) = self.ecs.get::<&mut Character>(self.player) {
            ch.action_queued = true;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
}

fn build_level(index: usize) -> (World, PhysicsWorld, Entity) {
    let def = level::level(index);
    let mut ecs = World::new();
    let mut physics = PhysicsWorld::new();

    // Boundary walls. Not portal surfaces: a portal fired into one fizzles.
    let walls = [
        Pose::new(0.0, 0.0, CANVAS_WIDTH, WALL_THICKNESS),
        Pose::new(0.0, CANVAS_HEIGHT - WALL_THICKNESS, CANVAS_WIDTH, WALL_THICKNESS),
        Pose::new(0.0, 0.0, WALL_THICKNESS, CANVAS_HEIGHT),
        Pose::new(CANVAS_WIDTH - WALL_THICKNESS, 0.0, WALL_THICKNESS, CANVAS_HEIGHT),
    ];
    for pose in walls {
        let entity = ecs.spawn((pose, Wall));
        let body = physics.add_rect_body(entity, &pose, None, true);
        ecs.insert_one(entity, BodyRef(body)).unwrap();
    }

    for rect in &def.platforms {
        let pose = Pose::new(rect.left, rect.top, rect.width, rect.height);
        let entity = ecs.spawn((pose, Surface));
        let body = physics.add_rect_body(entity, &pose, None, true);
        ecs.insert_one(entity, BodyRef(body)).unwrap();
    }

    for plate in &def.plates {
        let pose = Pose::new(plate.left, plate.bottom - 1.0, PLATE_WIDTH, 1.0);
        let entity = ecs.spawn((pose, JumpPlate::new(plate.facing)));
        let body = physics.add_rect_body(entity, &pose, None, true);
        ecs.insert_one(entity, BodyRef(body)).unwrap();
    }

    for crate_def in &def.boxes {
        let pose =
            Pose::new(crate_def.left, crate_def.top, BOX_SIZE, BOX_SIZE).with_angle(crate_def.angle);
        let entity = ecs.spawn((pose, Portalable::new(), PickUp, Crate));
        let body = physics.add_rect_body(entity, &pose, Some(crate_def.angle), false);
        ecs.insert_one(entity, BodyRef(body)).unwrap();
    }

    for turret_def in &def.turrets {
        let pose = Pose::new(turret_def.left, turret_def.top, TURRET_WIDTH, TURRET_HEIGHT);
        let entity = ecs.spawn((pose, Portalable::new(), PickUp, Turret::new(turret_def.facing)));
        let body = physics.add_turret_body(entity, &pose);
        ecs.insert_one(entity, BodyRef(body)).unwrap();
    }

    if let Some(exit) = def.exit {
        ecs.spawn((
            Pose::new(exit.x, exit.y, EXIT_WIDTH, EXIT_HEIGHT),
            ExitZone::new(),
        ));
    }

    let pose = Pose::new(def.spawn.x, def.spawn.y, CHARACTER_SIZE, CHARACTER_SIZE);
    let player = ecs.spawn((pose, Portalable::new(), Character::new()));
    let body = physics.add_circle_body(player, &pose, None, false);
    physics.set_restitution(body, 0.0);
    physics.scale_mass(body, CHARACTER_MASS_SCALE);
    ecs.insert_one(player, BodyRef(body)).unwrap();

    // Rays must see the fresh bodies before the first step runs.
    physics.refresh_queries();
    (ecs, physics, player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Portal, PortalColor};
    use crate::physics::SCALE;
    use crate::systems::portal::{PORTAL_HEIGHT, PORTAL_WIDTH};

    fn census(game: &mut GameWorld) -> (usize, usize, usize, usize, usize) {
        (
            game.ecs.query::<&Surface>().iter().count(),
            game.ecs.query::<&Crate>().iter().count(),
            game.ecs.query::<&Turret>().iter().count(),
            game.ecs.query::<&JumpPlate>().iter().count(),
            game.physics.body_count(),
        )
    }

    #[test]
    fn reloading_a_level_is_idempotent() {
        let mut game = GameWorld::new(10);
        let fresh = census(&mut game);
        for _ in 0..30 {
            game.update();
        }
        game.load_level(10);
        assert_eq!(census(&mut game), fresh);
        game.load_level(10);
        assert_eq!(census(&mut game), fresh);
        let spawn = level::level(10).spawn;
        let pose = game.ecs.get::<&Pose>(game.player).unwrap();
        assert!((pose.left - spawn.x).abs() < 1e-3);
        assert!((pose.top - spawn.y).abs() < 1e-3);
        assert_eq!(game.physics.joint_count(), 0);
    }

    #[test]
    fn pause_freezes_the_simulation() {
        let mut game = GameWorld::new(1);
        game.toggle_pause();
        let before = *game.ecs.get::<&Pose>(game.player).unwrap();
        for _ in 0..5 {
            game.update();
        }
        let after = *game.ecs.get::<&Pose>(game.player).unwrap();
        assert_eq!(before.left, after.left);
        assert_eq!(before.top, after.top);
        game.toggle_pause();
        game.update();
        let moved = *game.ecs.get::<&Pose>(game.player).unwrap();
        assert!(moved.top > after.top, "gravity resumes after unpausing");
    }

    #[test]
    fn portals_fired_into_walls_fizzle() {
        let mut game = GameWorld::new(1);
        game.set_aim_target(Vec2::new(50.0, 600.0));
        game.trigger_action();
        for _ in 0..20 {
            game.update();
        }
        assert_eq!(game.ecs.query::<&Portal>().iter().count(), 0);
    }

    fn plant_portal(game: &mut GameWorld, color: PortalColor, center: Vec2, on_top: bool) -> Entity {
        let mut portal = Portal::new(color, 0.0);
        portal.attached = true;
        portal.speed = 0.0;
        portal.on_top = on_top;
        game.ecs.spawn((
            portal,
            Pose::new(
                center.x - PORTAL_WIDTH / 2.0,
                center.y - PORTAL_HEIGHT / 2.0,
                PORTAL_WIDTH,
                PORTAL_HEIGHT,
            ),
        ))
    }

    #[test]
    fn character_falls_through_a_portal_pair_and_emerges() {
        // Level 3 is the portal tutorial: platforms at y=320 and y=80.
        let mut game = GameWorld::new(3);
        plant_portal(&mut game, PortalColor::Blue, Vec2::new(180.0, 320.0), true);
        plant_portal(&mut game, PortalColor::Orange, Vec2::new(490.0, 80.0), true);
        // Drop the character straight above the blue mouth.
        let body = game.ecs.get::<&BodyRef>(game.player).unwrap().0;
        game.physics.set_position(body, Vec2::new(180.0, 270.0) / SCALE);
        game.physics.set_velocity(body, Vec2::ZERO);

        let mut entered = false;
        let mut done = false;
        for _ in 0..300 {
            game.update();
            let portable = game.ecs.get::<&Portalable>(game.player).unwrap();
            if portable.in_transit() {
                entered = true;
            } else if entered {
                done = true;
                break;
            }
        }
        assert!(entered, "the falling character should be captured");
        assert!(done, "the transit should complete");
        let pose = *game.ecs.get::<&Pose>(game.player).unwrap();
        assert!(
            (pose.center().x - 490.0).abs() < 30.0,
            "should emerge at the orange portal, x = {}",
            pose.center().x
        );
        assert!(pose.center().y < 150.0, "should be in the upper region");
        let portable = game.ecs.get::<&Portalable>(game.player).unwrap();
        assert!(portable.cooldown > 0, "cooldown starts on completion");
    }

    #[test]
    fn run_intent_moves_the_character_on_the_ground() {
        let mut game = GameWorld::new(1);
        // Let the character settle on the floor first.
        for _ in 0..60 {
            game.update();
        }
        let before = game.ecs.get::<&Pose>(game.player).unwrap().left;
        game.set_run(Some(1));
        for _ in 0..30 {
            game.update();
        }
        let after = game.ecs.get::<&Pose>(game.player).unwrap().left;
        assert!(after > before + 10.0, "ran right: {} -> {}", before, after);
        game.set_run(None);
    }
}
