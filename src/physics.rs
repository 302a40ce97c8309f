use glam::Vec2;
use hecs::Entity;
use rapier2d::prelude::*;
use std::num::NonZeroUsize;

use crate::components::Pose;

/// Screen units per simulation unit. Every body is created from screen-space
/// dimensions divided by this factor, and every pose is synchronized back by
/// multiplying with it.
pub const SCALE: f32 = 30.0;

/// Downward gravity in simulation units (screen Y grows downward).
const GRAVITY_Y: f32 = 20.0;

pub const DEFAULT_FRICTION: f32 = 0.6;
const DEFAULT_DENSITY: f32 = 3.0;
const DEFAULT_RESTITUTION: f32 = 0.3;
const BODY_DAMPING: f32 = 0.01;

// ---------------------------------------------------------------------------
// Conversion helpers (private) — glam ↔ nalgebra
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Handle pair referencing a body and its primary collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// Handle to a joint in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointHandle(ImpulseJointHandle);

/// Nearest intersection returned by [`PhysicsWorld::raycast`].
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Game entity that owns the intersected body.
    pub entity: Entity,
    /// Hit point in simulation units.
    pub point: Vec2,
    /// Fraction of the probe vector at which the hit occurred (0..=1).
    pub toi: f32,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns every Rapier resource set. Entities hold [`PhysicsBody`] handles but
/// never the bodies themselves; all creation and destruction goes through
/// this struct. Raycast hits are resolved back to the owning entity through
/// the body user data.
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: nalgebra::Vector2::new(0.0, GRAVITY_Y),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Advance the simulation by one sub-step. Callers run this once or twice
    /// per frame; fewer iterations trade accuracy for throughput.
    pub fn step(&mut self, dt: f32, solver_iterations: usize) {
        self.integration_parameters.dt = dt;
        if let Some(n) = NonZeroUsize::new(solver_iterations) {
            self.integration_parameters.num_solver_iterations = n;
        }
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Rebuild the query acceleration structure without stepping. Needed when
    /// rays must see bodies created or repositioned since the last step.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    // -- body creation ------------------------------------------------------

    fn body_builder(center: Vec2, angle: Option<f32>, is_static: bool) -> RigidBodyBuilder {
        let builder = if is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let builder = builder
            .translation(vec2_to_na(center))
            .linear_damping(BODY_DAMPING)
            .angular_damping(BODY_DAMPING);
        match angle {
            // No orientation means the body never rotates.
            None => builder.locked_axes(LockedAxes::ROTATION_LOCKED),
            Some(a) => builder.rotation(a),
        }
    }

    fn default_collider(builder: ColliderBuilder) -> ColliderBuilder {
        builder
            .density(DEFAULT_DENSITY)
            .friction(DEFAULT_FRICTION)
            .restitution(DEFAULT_RESTITUTION)
    }

    fn insert(
        &mut self,
        owner: Entity,
        rb: RigidBodyBuilder,
        collider: ColliderBuilder,
    ) -> PhysicsBody {
        let rb = rb.user_data(owner.to_bits().get() as u128).build();
        let body_handle = self.bodies.insert(rb);
        let collider_handle = self.colliders.insert_with_parent(
            collider.build(),
            body_handle,
            &mut self.bodies,
        );
        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Create a rectangular body from a screen-space pose. `angle: None`
    /// locks rotation.
    pub fn add_rect_body(
        &mut self,
        owner: Entity,
        pose: &Pose,
        angle: Option<f32>,
        is_static: bool,
    ) -> PhysicsBody {
        let half = Vec2::new(pose.width, pose.height) / SCALE / 2.0;
        let center = pose.center() / SCALE;
        self.insert(
            owner,
            Self::body_builder(center, angle, is_static),
            Self::default_collider(ColliderBuilder::cuboid(half.x, half.y)),
        )
    }

    /// Create a circular body sized to the pose's larger half-extent.
    pub fn add_circle_body(
        &mut self,
        owner: Entity,
        pose: &Pose,
        angle: Option<f32>,
        can_sleep: bool,
    ) -> PhysicsBody {
        let half = Vec2::new(pose.width, pose.height) / SCALE / 2.0;
        let center = pose.center() / SCALE;
        self.insert(
            owner,
            Self::body_builder(center, angle, false).can_sleep(can_sleep),
            Self::default_collider(ColliderBuilder::ball(half.x.max(half.y))),
        )
    }

    /// Turret bodies carry two fixtures: a cuboid base (lower half) and a
    /// ball head, so they balance upright yet tip over when pushed.
    pub fn add_turret_body(&mut self, owner: Entity, pose: &Pose) -> PhysicsBody {
        let half = Vec2::new(pose.width, pose.height) / SCALE / 2.0;
        let center = pose.center() / SCALE;
        let rb = Self::body_builder(center, Some(pose.angle), false)
            .user_data(owner.to_bits().get() as u128)
            .build();
        let body_handle = self.bodies.insert(rb);
        let base = Self::default_collider(ColliderBuilder::cuboid(half.x, half.y / 2.0))
            .translation(nalgebra::Vector2::new(0.0, half.y / 2.0));
        let head = Self::default_collider(ColliderBuilder::ball(half.x.min(half.y / 2.0)))
            .translation(nalgebra::Vector2::new(0.0, -half.y / 2.0));
        let collider_handle =
            self.colliders
                .insert_with_parent(base.build(), body_handle, &mut self.bodies);
        self.colliders
            .insert_with_parent(head.build(), body_handle, &mut self.bodies);
        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Remove a body and everything attached to it.
    pub fn remove_body(&mut self, body: PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    // -- queries ------------------------------------------------------------

    /// Cast a ray described by an origin and a probe vector (both simulation
    /// units) and return the nearest hit, if any. A miss is a normal outcome.
    pub fn raycast(
        &self,
        origin: Vec2,
        probe: Vec2,
        exclude: Option<PhysicsBody>,
    ) -> Option<RayHit> {
        let ray = Ray::new(
            nalgebra::Point2::new(origin.x, origin.y),
            vec2_to_na(probe),
        );
        let mut filter = QueryFilter::default();
        if let Some(body) = exclude {
            filter = filter.exclude_rigid_body(body.body_handle);
        }
        let (mut handle, mut toi) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            filter,
        )?;
        if toi == 0.0 {
            // A zero-toi result means the ray starts inside that collider;
            // shapes containing the origin do not count as hits.
            let mut retry = QueryFilter::default().exclude_collider(handle);
            if let Some(body) = exclude {
                retry = retry.exclude_rigid_body(body.body_handle);
            }
            let (next_handle, next_toi) = self.query_pipeline.cast_ray(
                &self.bodies,
                &self.colliders,
                &ray,
                1.0,
                true,
                retry,
            )?;
            handle = next_handle;
            toi = next_toi;
        }
        let entity = self.owner_of(handle)?;
        let point = ray.point_at(toi);
        Some(RayHit {
            entity,
            point: Vec2::new(point.x, point.y),
            toi,
        })
    }

    fn owner_of(&self, collider_handle: ColliderHandle) -> Option<Entity> {
        let collider = self.colliders.get(collider_handle)?;
        let body = self.bodies.get(collider.parent()?)?;
        Entity::from_bits(body.user_data as u64)
    }

    // -- joints -------------------------------------------------------------

    /// Create a damped spring joint between `a` and `b`, anchored at
    /// `world_anchor` on `a` and at `b`'s center. `frequency_hz` and
    /// `damping_ratio` are converted to stiffness/damping against `b`'s mass.
    pub fn create_hold_joint(
        &mut self,
        a: PhysicsBody,
        b: PhysicsBody,
        world_anchor: Vec2,
        rest_length: f32,
        frequency_hz: f32,
        damping_ratio: f32,
    ) -> JointHandle {
        let local_anchor = self
            .bodies
            .get(a.body_handle)
            .map(|rb| {
                rb.position()
                    .inverse_transform_point(&nalgebra::Point2::new(world_anchor.x, world_anchor.y))
            })
            .unwrap_or_else(|| nalgebra::Point2::new(0.0, 0.0));
        let mass = self.bodies.get(b.body_handle).map(|rb| rb.mass()).unwrap_or(1.0);
        let omega = std::f32::consts::TAU * frequency_hz;
        let stiffness = mass * omega * omega;
        let damping = 2.0 * mass * damping_ratio * omega;
        let joint = SpringJointBuilder::new(rest_length, stiffness, damping)
            .local_anchor1(local_anchor)
            .local_anchor2(nalgebra::Point2::new(0.0, 0.0))
            .build();
        JointHandle(
            self.impulse_joints
                .insert(a.body_handle, b.body_handle, joint, true),
        )
    }

    pub fn destroy_joint(&mut self, handle: JointHandle) {
        self.impulse_joints.remove(handle.0, true);
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // -- per-body accessors and mutators ------------------------------------

    /// Position of the body center in simulation units.
    pub fn position(&self, body: PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.translation()))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_position(&mut self, body: PhysicsBody, pos: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_translation(vec2_to_na(pos), true);
        }
    }

    pub fn velocity(&self, body: PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_velocity(&mut self, body: PhysicsBody, vel: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(vec2_to_na(vel), true);
        }
    }

    pub fn apply_impulse(&mut self, body: PhysicsBody, impulse: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.apply_impulse(vec2_to_na(impulse), true);
        }
    }

    pub fn mass(&self, body: PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.mass())
            .unwrap_or(0.0)
    }

    /// Multiply a body's mass, keeping its collider footprint. Used for the
    /// ballistic bullets and the extra-heavy character.
    pub fn scale_mass(&mut self, body: PhysicsBody, factor: f32) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            let mass = rb.mass();
            rb.set_additional_mass(mass * (factor - 1.0), true);
        }
    }

    pub fn set_friction(&mut self, body: PhysicsBody, friction: f32) {
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.set_friction(friction);
        }
    }

    pub fn friction(&self, body: PhysicsBody) -> f32 {
        self.colliders
            .get(body.collider_handle)
            .map(|c| c.friction())
            .unwrap_or(DEFAULT_FRICTION)
    }

    pub fn set_restitution(&mut self, body: PhysicsBody, restitution: f32) {
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.set_restitution(restitution);
        }
    }

    pub fn enable_ccd(&mut self, body: PhysicsBody) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.enable_ccd(true);
        }
    }

    /// Disabled bodies keep their pose but stop colliding and integrating.
    /// Teleports and level exits suspend bodies this way.
    pub fn set_enabled(&mut self, body: PhysicsBody, enabled: bool) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_enabled(enabled);
        }
    }

    pub fn is_enabled(&self, body: PhysicsBody) -> bool {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.is_enabled())
            .unwrap_or(false)
    }

    /// Copy the body pose back into the screen-space pose.
    pub fn sync_pose(&self, body: PhysicsBody, pose: &mut Pose) {
        if let Some(rb) = self.bodies.get(body.body_handle) {
            let p = rb.translation();
            pose.left = p.x * SCALE - pose.width / 2.0;
            pose.top = p.y * SCALE - pose.height / 2.0;
            pose.angle = rb.rotation().angle();
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_entities(n: usize) -> (hecs::World, Vec<Entity>) {
        let mut world = hecs::World::new();
        let entities = (0..n).map(|_| world.spawn(())).collect();
        (world, entities)
    }

    #[test]
    fn create_and_remove_body() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let body = physics.add_rect_body(e[0], &Pose::new(0.0, 0.0, 30.0, 30.0), Some(0.0), false);
        assert_eq!(physics.body_count(), 1);
        physics.remove_body(body);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn gravity_pulls_dynamic_bodies_down() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let body = physics.add_circle_body(e[0], &Pose::new(100.0, 100.0, 50.0, 50.0), None, true);
        let before = physics.position(body);
        for _ in 0..10 {
            physics.step(1.0 / 60.0, 10);
        }
        let after = physics.position(body);
        assert!(after.y > before.y, "body should fall: {} -> {}", before.y, after.y);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let body = physics.add_rect_body(e[0], &Pose::new(0.0, 300.0, 200.0, 3.0), None, true);
        for _ in 0..10 {
            physics.step(1.0 / 60.0, 10);
        }
        let pos = physics.position(body);
        assert!((pos.y - (300.0 + 1.5) / SCALE).abs() < 1e-3);
    }

    #[test]
    fn impulse_changes_velocity() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let body = physics.add_rect_body(e[0], &Pose::new(0.0, 0.0, 30.0, 30.0), Some(0.0), false);
        assert_eq!(physics.velocity(body), Vec2::ZERO);
        physics.apply_impulse(body, Vec2::new(physics.mass(body) * 5.0, 0.0));
        let vel = physics.velocity(body);
        assert!((vel.x - 5.0).abs() < 1e-3, "unexpected vx: {}", vel.x);
    }

    #[test]
    fn raycast_resolves_owning_entity() {
        let (_w, e) = dummy_entities(2);
        let mut physics = PhysicsWorld::new();
        // Platform below the probe origin, plus a decoy further down.
        let _near = physics.add_rect_body(e[0], &Pose::new(0.0, 60.0, 300.0, 6.0), None, true);
        let _far = physics.add_rect_body(e[1], &Pose::new(0.0, 120.0, 300.0, 6.0), None, true);
        physics.refresh_queries();
        let hit = physics
            .raycast(Vec2::new(3.0, 0.0), Vec2::new(0.0, 10.0), None)
            .expect("ray should hit the near platform");
        assert_eq!(hit.entity, e[0]);
        assert!(hit.toi > 0.0 && hit.toi < 1.0);
    }

    #[test]
    fn raycast_miss_is_none() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let _ = physics.add_rect_body(e[0], &Pose::new(500.0, 500.0, 30.0, 30.0), None, true);
        physics.refresh_queries();
        assert!(physics.raycast(Vec2::ZERO, Vec2::new(0.0, 1.0), None).is_none());
    }

    #[test]
    fn raycast_can_exclude_a_body() {
        let (_w, e) = dummy_entities(2);
        let mut physics = PhysicsWorld::new();
        let probe_owner =
            physics.add_circle_body(e[0], &Pose::new(75.0, 75.0, 50.0, 50.0), None, true);
        let _floor = physics.add_rect_body(e[1], &Pose::new(0.0, 160.0, 300.0, 6.0), None, true);
        physics.refresh_queries();
        let origin = physics.position(probe_owner);
        let hit = physics
            .raycast(origin, Vec2::new(0.0, 3.0), Some(probe_owner))
            .expect("ray should pass through its own body and hit the floor");
        assert_eq!(hit.entity, e[1]);
    }

    #[test]
    fn hold_joint_pulls_bodies_together() {
        let (_w, e) = dummy_entities(2);
        let mut physics = PhysicsWorld::new();
        let a = physics.add_circle_body(e[0], &Pose::new(0.0, 0.0, 50.0, 50.0), None, true);
        let b = physics.add_rect_body(e[1], &Pose::new(120.0, 0.0, 30.0, 30.0), Some(0.0), false);
        let gap_before = (physics.position(b).x - physics.position(a).x).abs();
        let _joint = physics.create_hold_joint(a, b, physics.position(a), 0.2, 1.0, 0.1);
        for _ in 0..60 {
            physics.step(1.0 / 60.0, 10);
        }
        let gap_after = (physics.position(b).x - physics.position(a).x).abs();
        assert!(
            gap_after < gap_before,
            "spring should shorten the gap: {} -> {}",
            gap_before,
            gap_after
        );
    }

    #[test]
    fn destroy_joint_removes_exactly_one() {
        let (_w, e) = dummy_entities(2);
        let mut physics = PhysicsWorld::new();
        let a = physics.add_rect_body(e[0], &Pose::new(0.0, 0.0, 30.0, 30.0), Some(0.0), false);
        let b = physics.add_rect_body(e[1], &Pose::new(60.0, 0.0, 30.0, 30.0), Some(0.0), false);
        let joint = physics.create_hold_joint(a, b, Vec2::ZERO, 0.2, 1.0, 0.1);
        assert_eq!(physics.joint_count(), 1);
        physics.destroy_joint(joint);
        assert_eq!(physics.joint_count(), 0);
    }

    #[test]
    fn mass_scaling_multiplies_mass() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let body = physics.add_rect_body(e[0], &Pose::new(0.0, 0.0, 30.0, 30.0), Some(0.0), false);
        let base = physics.mass(body);
        physics.scale_mass(body, 3.0);
        assert!((physics.mass(body) - base * 3.0).abs() < base * 0.01);
    }

    #[test]
    fn disabled_bodies_ignore_gravity_until_reenabled() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let body = physics.add_circle_body(e[0], &Pose::new(0.0, 0.0, 50.0, 50.0), None, true);
        physics.set_enabled(body, false);
        let before = physics.position(body);
        for _ in 0..10 {
            physics.step(1.0 / 60.0, 10);
        }
        assert_eq!(physics.position(body), before);
        physics.set_enabled(body, true);
        for _ in 0..10 {
            physics.step(1.0 / 60.0, 10);
        }
        assert!(physics.position(body).y > before.y);
    }

    #[test]
    fn pose_sync_round_trips_screen_coordinates() {
        let (_w, e) = dummy_entities(1);
        let mut physics = PhysicsWorld::new();
        let mut pose = Pose::new(90.0, 120.0, 30.0, 30.0);
        let body = physics.add_rect_body(e[0], &pose, None, true);
        // Perturb, then resynchronize from the body.
        pose.left = 0.0;
        pose.top = 0.0;
        physics.sync_pose(body, &mut pose);
        assert!((pose.left - 90.0).abs() < 1e-3);
        assert!((pose.top - 120.0).abs() < 1e-3);
    }
}
