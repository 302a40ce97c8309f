use std::time::{Duration, Instant};

/// Frame clock for the fixed-rate loop: measures the previous frame's
/// duration and sleeps away whatever is left of the tick budget.
pub struct FrameTimer {
    last: Instant,
    pub dt: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            dt: 0.0,
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
    }

    /// Sleep out the remainder of a `tick_seconds` budget measured from the
    /// last `tick()`. Returns immediately when the frame already overran.
    pub fn pace(&self, tick_seconds: f32) {
        let elapsed = self.last.elapsed().as_secs_f32();
        if elapsed < tick_seconds {
            std::thread::sleep(Duration::from_secs_f32(tick_seconds - elapsed));
        }
    }
}
