use crate::components::Side;
use crate::params::Params;

/// Game configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub arena_width: f32,
    pub arena_height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    pub paddle_inset: f32,
    pub paddle_margin: f32,
    pub paddle_key_step: f32,
    pub ball_radius: f32,
    pub ball_serve_speed_x: f32,
    pub ball_serve_vy_min: f32,
    pub ball_serve_vy_max: f32,
    pub ball_speed_max: f32,
    pub ball_accel_factor: f32,
    pub wall_damping: f32,
    pub deflect_factor: f32,
    pub deflect_cap: f32,
    pub pushout_margin: f32,
    pub pushout_speed_factor: f32,
    pub collision_cooldown_ms: u64,
    pub ai_base_speed: f32,
    pub ai_speed_boost: f32,
    pub ai_max_speed: f32,
    pub win_score: u8,
    pub score_debounce_ms: u64,
    pub max_dt: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arena_width: Params::ARENA_WIDTH,
            arena_height: Params::ARENA_HEIGHT,
            paddle_width: Params::PADDLE_WIDTH,
            paddle_height: Params::PADDLE_HEIGHT,
            paddle_inset: Params::PADDLE_INSET,
            paddle_margin: Params::PADDLE_MARGIN,
            paddle_key_step: Params::PADDLE_KEY_STEP,
            ball_radius: Params::BALL_RADIUS,
            ball_serve_speed_x: Params::BALL_SERVE_SPEED_X,
            ball_serve_vy_min: Params::BALL_SERVE_VY_MIN,
            ball_serve_vy_max: Params::BALL_SERVE_VY_MAX,
            ball_speed_max: Params::BALL_SPEED_MAX,
            ball_accel_factor: Params::BALL_ACCEL_FACTOR,
            wall_damping: Params::WALL_DAMPING,
            deflect_factor: Params::DEFLECT_FACTOR,
            deflect_cap: Params::DEFLECT_CAP,
            pushout_margin: Params::PUSHOUT_MARGIN,
            pushout_speed_factor: Params::PUSHOUT_SPEED_FACTOR,
            collision_cooldown_ms: Params::COLLISION_COOLDOWN_MS,
            ai_base_speed: Params::AI_BASE_SPEED,
            ai_speed_boost: Params::AI_SPEED_BOOST,
            ai_max_speed: Params::AI_MAX_SPEED,
            win_score: Params::WIN_SCORE,
            score_debounce_ms: Params::SCORE_DEBOUNCE_MS,
            max_dt: Params::MAX_DT,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get X position for paddle based on side
    pub fn paddle_x(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.paddle_inset,
            Side::Right => self.arena_width - self.paddle_inset,
        }
    }

    pub fn paddle_min_y(&self) -> f32 {
        self.paddle_height / 2.0 + self.paddle_margin
    }

    pub fn paddle_max_y(&self) -> f32 {
        self.arena_height - self.paddle_height / 2.0 - self.paddle_margin
    }

    /// Clamp paddle Y to arena bounds
    pub fn clamp_paddle_y(&self, y: f32) -> f32 {
        y.clamp(self.paddle_min_y(), self.paddle_max_y())
    }

    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.arena_width / 2.0, self.arena_height / 2.0)
    }
}
