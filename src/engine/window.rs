use sdl2::render::WindowCanvas;
use sdl2::Sdl;

pub struct GameWindow {
    pub canvas: WindowCanvas,
    width: u32,
    height: u32,
}

impl GameWindow {
    pub fn new(sdl: &Sdl, title: &str, width: u32, height: u32) -> Self {
        let video = sdl.video().expect("Failed to init SDL2 video");

        let window = video
            .window(title, width, height)
            .position_centered()
            .build()
            .expect("Failed to create window");

        let canvas = window
            .into_canvas()
            .build()
            .expect("Failed to create canvas");

        Self {
            canvas,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
