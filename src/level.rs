//! Plain-data level definitions. The world instantiates entities and
//! physics bodies from these; nothing here touches the simulation.

use glam::Vec2;
use std::f32::consts::PI;

pub const CANVAS_WIDTH: f32 = 600.0;
pub const CANVAS_HEIGHT: f32 = 400.0;
pub const WALL_THICKNESS: f32 = 2.0;

pub const FIRST_LEVEL: usize = 1;
pub const LAST_LEVEL: usize = 10;
/// Finishing the campaign loops back here rather than to the tutorials.
pub const LOOP_START: usize = 6;

#[derive(Debug, Clone, Copy)]
pub struct RectDef {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct BoxDef {
    pub left: f32,
    pub top: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct TurretDef {
    pub left: f32,
    pub top: f32,
    pub facing: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PlateDef {
    pub left: f32,
    /// Plates are anchored by their bottom edge.
    pub bottom: f32,
    pub facing: f32,
}

pub struct LevelDef {
    pub spawn: Vec2,
    pub exit: Option<Vec2>,
    pub platforms: Vec<RectDef>,
    pub plates: Vec<PlateDef>,
    pub boxes: Vec<BoxDef>,
    pub turrets: Vec<TurretDef>,
}

impl LevelDef {
    fn base() -> Self {
        Self {
            spawn: Vec2::new(50.0, 100.0),
            exit: Some(Vec2::new(530.0, 290.0)),
            platforms: Vec::new(),
            plates: Vec::new(),
            boxes: Vec::new(),
            turrets: Vec::new(),
        }
    }
}

pub fn next_level(current: usize) -> usize {
    if current >= LAST_LEVEL {
        LOOP_START
    } else {
        current + 1
    }
}

fn platform(left: f32, top: f32, width: f32) -> RectDef {
    RectDef {
        left,
        top,
        width,
        height: 3.0,
    }
}

/// Deterministic small tilt so spawned box stacks look scattered.
fn tilt(i: usize) -> f32 {
    PI / 10.0 * ((i * 37 % 97) as f32 / 97.0)
}

pub fn level(index: usize) -> LevelDef {
    let mut def = LevelDef::base();
    match index {
        1 => {}
        2 => {
            def.plates.push(PlateDef {
                left: 280.0,
                bottom: 400.0,
                facing: 1.0,
            });
            def.exit = Some(Vec2::new(450.0, 140.0));
        }
        3 => {
            def.platforms.push(platform(80.0, 320.0, 200.0));
            def.platforms.push(platform(400.0, 80.0, 180.0));
            def.exit = Some(Vec2::new(530.0, 130.0));
        }
        4 => {
            for i in 8..=10 {
                def.boxes.push(BoxDef {
                    left: 100.0 + 35.0 * i as f32,
                    top: 50.0,
                    angle: tilt(i),
                });
            }
            def.exit = Some(Vec2::new(530.0, 240.0));
        }
        5 => {
            def.boxes.push(BoxDef {
                left: 300.0,
                top: 150.0,
                angle: 0.0,
            });
            def.turrets.push(TurretDef {
                left: 480.0,
                top: 360.0,
                facing: -1.0,
            });
        }
        6 => {
            for j in 1..=5usize {
                for i in j..=10 {
                    def.boxes.push(BoxDef {
                        left: 100.0 + 35.0 * i as f32,
                        top: 35.0 * j as f32,
                        angle: tilt(i + 11 * j),
                    });
                }
            }
            def.exit = Some(Vec2::new(530.0, 240.0));
        }
        7 | 8 | 9 => {
            def.exit = Some(Vec2::new(290.0, 20.0));
            def.spawn = Vec2::new(150.0, 100.0);
            for i in 0..=3 {
                def.boxes.push(BoxDef {
                    left: 300.0,
                    top: 100.0 + 35.0 * i as f32,
                    angle: 0.0,
                });
            }
            // Two jump towers facing each other across the canvas.
            for i in 0..=1usize {
                let facing = 1.0 - 2.0 * i as f32;
                for j in 0..=4usize {
                    if j != 4 {
                        def.platforms.push(platform(
                            520.0 * i as f32,
                            60.0 + 85.0 * j as f32,
                            80.0,
                        ));
                    }
                    if (index == 8 && j == 4) || index == 9 {
                        def.turrets.push(TurretDef {
                            left: 15.0 + 555.0 * i as f32,
                            top: 29.0 + 85.0 * j as f32,
                            facing,
                        });
                    }
                    def.plates.push(PlateDef {
                        left: 65.0 + 455.0 * i as f32,
                        bottom: 59.0 + 85.0 * j as f32,
                        facing,
                    });
                }
            }
        }
        _ => {
            def.spawn = Vec2::new(300.0, 200.0);
            def.exit = Some(Vec2::new(450.0, 30.0));
            def.platforms.push(platform(80.0, 250.0, 200.0));
            def.platforms.push(platform(300.0, 320.0, 150.0));
            def.plates.push(PlateDef {
                left: 400.0,
                bottom: 320.0,
                facing: -1.0,
            });
            def.plates.push(PlateDef {
                left: 100.0,
                bottom: 250.0,
                facing: 1.0,
            });
            def.plates.push(PlateDef {
                left: 150.0,
                bottom: 400.0,
                facing: 1.0,
            });
            for i in 6..=10 {
                def.boxes.push(BoxDef {
                    left: 100.0 + 35.0 * i as f32,
                    top: 50.0,
                    angle: tilt(i),
                });
            }
            def.turrets.push(TurretDef {
                left: 250.0,
                top: 220.0,
                facing: -1.0,
            });
        }
    }
    def
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_loops_back_to_the_box_pile() {
        assert_eq!(next_level(FIRST_LEVEL), 2);
        assert_eq!(next_level(LAST_LEVEL), LOOP_START);
        assert_eq!(next_level(LAST_LEVEL + 5), LOOP_START);
    }

    #[test]
    fn portal_tutorial_has_two_surfaces() {
        let def = level(3);
        assert_eq!(def.platforms.len(), 2);
        assert!(def.exit.is_some());
    }

    #[test]
    fn every_level_spawns_inside_the_canvas() {
        for index in FIRST_LEVEL..=LAST_LEVEL {
            let def = level(index);
            assert!(def.spawn.x > 0.0 && def.spawn.x < CANVAS_WIDTH, "level {}", index);
            assert!(def.spawn.y > 0.0 && def.spawn.y < CANVAS_HEIGHT, "level {}", index);
            for rect in &def.platforms {
                assert!(rect.left >= 0.0 && rect.left + rect.width <= CANVAS_WIDTH);
            }
        }
    }

    #[test]
    fn bullet_levels_place_turrets_on_the_towers() {
        assert_eq!(level(7).turrets.len(), 0);
        assert_eq!(level(8).turrets.len(), 2);
        assert_eq!(level(9).turrets.len(), 10);
    }
}
