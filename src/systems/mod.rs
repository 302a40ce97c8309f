pub mod character;
pub mod exit;
pub mod jump_plate;
pub mod portal;
pub mod teleport;
pub mod turret;

pub use character::character_system;
pub use exit::exit_system;
pub use jump_plate::jump_plate_system;
pub use portal::{portal_flight_system, portal_scan_system};
pub use teleport::{pose_sync_system, teleport_system};
pub use turret::{bullet_system, turret_system};
