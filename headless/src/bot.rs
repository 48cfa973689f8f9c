use game_core::{BallState, Config};

/// Stand-in for a human: chases the ball at a capped speed
pub struct Bot {
    y: f32,
    speed: f32,
}

impl Bot {
    pub fn new(config: &Config, speed: f32) -> Self {
        Self {
            y: config.arena_height / 2.0,
            speed,
        }
    }

    /// Move toward the ball and return the new pointer position
    pub fn follow(&mut self, ball: Option<BallState>, dt: f32) -> f32 {
        if let Some(ball) = ball {
            let max = self.speed * dt;
            self.y += (ball.pos.y - self.y).clamp(-max, max);
        }
        self.y
    }
}
