mod character;

pub use character::Character;

use glam::Vec2;
use hecs::Entity;

use crate::physics::PhysicsBody;

/// Screen-space pose: top-left corner of an axis-aligned box plus an
/// orientation angle in radians. For body-backed entities this is derived
/// from the simulation pose after every step; an entity without a body
/// never moves on its own.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl Pose {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
            angle: 0.0,
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Center-to-center distance in screen units.
    pub fn distance_to(&self, other: &Pose) -> f32 {
        self.center().distance(other.center())
    }
}

/// Non-owning handle to the entity's body inside the physics world.
#[derive(Clone, Copy)]
pub struct BodyRef(pub PhysicsBody);

/// Marker: static geometry a portal may lodge on. Boundary walls
/// deliberately lack this, so portals fired at them are discarded.
pub struct Surface;

/// Marker: canvas boundary wall.
pub struct Wall;

/// Marker: the character can pick this entity up and carry it.
pub struct PickUp;

/// Marker: a plain carryable crate.
pub struct Crate;

/// Teleportation capability and state. `being_portaled` is a signed frame
/// counter: 0 when idle, counting 1..N while the entity sinks into the
/// source portal, then -N..0 while it emerges from the destination.
pub struct Portalable {
    pub being_portaled: i32,
    /// Frames of immunity left after a completed teleport.
    pub cooldown: u32,
    /// Set when the entity is leaving the level; suppresses reactivation.
    pub exiting: bool,
    pub from_portal: Option<Entity>,
    pub goto_portal: Option<Entity>,
}

impl Portalable {
    pub fn new() -> Self {
        Self {
            being_portaled: 0,
            cooldown: 0,
            exiting: false,
            from_portal: None,
            goto_portal: None,
        }
    }

    pub fn in_transit(&self) -> bool {
        self.being_portaled != 0
    }
}

impl Default for Portalable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalColor {
    Blue,
    Orange,
}

impl PortalColor {
    pub fn opposite(self) -> Self {
        match self {
            Self::Blue => Self::Orange,
            Self::Orange => Self::Blue,
        }
    }
}

/// A teleport endpoint. Travels as a projectile while `speed` is non-zero,
/// then either lodges on a surface (`attached`) or is discarded. Only an
/// attached portal with an attached opposite-colored partner teleports.
pub struct Portal {
    pub color: PortalColor,
    /// Flight direction while unattached; reset to level on attachment.
    pub flight_angle: f32,
    /// Screen units travelled per frame; zero once lodged.
    pub speed: f32,
    pub attached: bool,
    /// Which face of the surface the portal occupies.
    pub on_top: bool,
    /// Frames since creation; drives the spawn animation.
    pub age: u32,
}

impl Portal {
    pub fn new(color: PortalColor, flight_angle: f32) -> Self {
        Self {
            color,
            flight_angle,
            speed: crate::systems::portal::PORTAL_SPEED,
            attached: false,
            on_top: false,
            age: 0,
        }
    }
}

/// Level exit. Has no physics body; captures the character by overlap and
/// counts an exit animation before the world resets.
pub struct ExitZone {
    /// 0 while idle; 1..=N once triggered.
    pub countdown: u32,
}

impl ExitZone {
    pub fn new() -> Self {
        Self { countdown: 0 }
    }
}

impl Default for ExitZone {
    fn default() -> Self {
        Self::new()
    }
}

/// Spring plate that launches bodies passing above it. The flap angle is
/// cosmetic; the body itself stays static.
pub struct JumpPlate {
    pub facing: f32,
    pub triggered: bool,
    pub angle: f32,
    pub last_angle: f32,
}

impl JumpPlate {
    pub fn new(facing: f32) -> Self {
        Self {
            facing,
            triggered: false,
            angle: 0.0,
            last_angle: 0.0,
        }
    }
}

/// Bullet-spitting hazard. Portable and carryable; holds fire while held,
/// mid-teleport, or tipped over.
pub struct Turret {
    pub facing: f32,
    /// Frames until the next shot is allowed.
    pub firing: u32,
    pub shots_fired: u32,
    /// Frames left of the reload pause after a full magazine.
    pub reloading: u32,
}

impl Turret {
    pub fn new(facing: f32) -> Self {
        Self {
            facing,
            firing: 0,
            shots_fired: 0,
            reloading: 0,
        }
    }
}

/// Short-lived turret projectile.
pub struct Bullet {
    /// Remaining lifetime in frames; the bullet is destroyed at zero.
    pub life: u32,
}
