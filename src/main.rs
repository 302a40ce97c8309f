mod components;
mod engine;
mod level;
mod physics;
mod render;
mod systems;
mod world;

use clap::Parser;
use engine::input::InputState;
use engine::time::FrameTimer;
use engine::window::GameWindow;
use glam::Vec2;
use sdl2::keyboard::Scancode;
use world::{GameWorld, TICK_RATE};

const WINDOW_WIDTH: u32 = 900;
const WINDOW_HEIGHT: u32 = 600;

#[derive(Parser)]
#[command(name = "stickport", about = "Portal puzzle platformer")]
struct Args {
    /// Level index to start from
    #[arg(long, default_value_t = level::FIRST_LEVEL)]
    level: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let sdl = sdl2::init().expect("Failed to init SDL2");
    let mut window = GameWindow::new(&sdl, "Stickport", WINDOW_WIDTH, WINDOW_HEIGHT);
    let view_scale = WINDOW_WIDTH as f32 / level::CANVAS_WIDTH;
    let _ = window.canvas.set_scale(view_scale, view_scale);

    let mut game = GameWorld::new(args.level);
    let mut event_pump = sdl.event_pump().expect("Failed to get event pump");
    let mut input = InputState::new();
    let mut timer = FrameTimer::new();

    let tick = 1.0 / TICK_RATE as f32;
    let mut accumulator: f32 = 0.0;

    loop {
        timer.tick();
        input.update(&mut event_pump);
        if input.quit {
            break;
        }

        if input.key_pressed(Scancode::Escape) {
            game.toggle_pause();
        }

        // Translate the raw snapshot into the game's intent surface.
        let dir = if input.is_key_held(Scancode::A) || input.is_key_held(Scancode::Left) {
            Some(-1)
        } else if input.is_key_held(Scancode::D) || input.is_key_held(Scancode::Right) {
            Some(1)
        } else {
            None
        };
        game.set_run(dir);
        if input.is_key_held(Scancode::W) || input.is_key_held(Scancode::Up) {
            game.trigger_jump();
        }
        game.set_aim_target(Vec2::new(input.mouse_x, input.mouse_y) / view_scale);
        if input.mouse_clicked {
            game.trigger_action();
        }

        accumulator += timer.dt;
        while accumulator >= tick {
            game.update();
            accumulator -= tick;
        }

        render::draw(&mut window.canvas, &game);
        window.canvas.present();
        timer.pace(tick);
    }
}
