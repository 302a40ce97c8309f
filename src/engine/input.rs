use sdl2::event::Event;
use sdl2::keyboard::Scancode;
use sdl2::mouse::MouseButton;
use sdl2::EventPump;
use std::collections::HashSet;

/// Raw per-frame input snapshot. The main loop translates this into the
/// game's intent surface; no game logic lives here.
pub struct InputState {
    keys: HashSet<Scancode>,
    pressed: Vec<Scancode>,
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub mouse_clicked: bool,
    pub quit: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
            pressed: Vec::new(),
            mouse_x: 0.0,
            mouse_y: 0.0,
            mouse_clicked: false,
            quit: false,
        }
    }

    pub fn update(&mut self, event_pump: &mut EventPump) {
        self.pressed.clear();
        self.mouse_clicked = false;

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => self.quit = true,
                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => {
                    self.keys.insert(sc);
                    self.pressed.push(sc);
                }
                Event::KeyUp {
                    scancode: Some(sc), ..
                } => {
                    self.keys.remove(&sc);
                }
                Event::MouseMotion { x, y, .. } => {
                    self.mouse_x = x as f32;
                    self.mouse_y = y as f32;
                }
                Event::MouseButtonDown {
                    mouse_btn: MouseButton::Left,
                    x,
                    y,
                    ..
                } => {
                    self.mouse_x = x as f32;
                    self.mouse_y = y as f32;
                    self.mouse_clicked = true;
                }
                _ => {}
            }
        }
    }

    pub fn is_key_held(&self, sc: Scancode) -> bool {
        self.keys.contains(&sc)
    }

    pub fn key_pressed(&self, sc: Scancode) -> bool {
        self.pressed.contains(&sc)
    }
}
