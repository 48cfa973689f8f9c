/// Game tuning parameters for Pong
#[derive(Debug, Clone, Copy)]
pub struct Params;

impl Params {
    // Arena
    pub const ARENA_WIDTH: f32 = 800.0;
    pub const ARENA_HEIGHT: f32 = 600.0;

    // Paddle
    pub const PADDLE_WIDTH: f32 = 16.0;
    pub const PADDLE_HEIGHT: f32 = 100.0;
    pub const PADDLE_INSET: f32 = 30.0; // distance from the side wall to the paddle center
    pub const PADDLE_MARGIN: f32 = 10.0; // gap kept between paddle and top/bottom wall
    pub const PADDLE_KEY_STEP: f32 = 20.0;

    // Ball
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_SERVE_SPEED_X: f32 = 420.0;
    pub const BALL_SERVE_VY_MIN: f32 = 70.0;
    pub const BALL_SERVE_VY_MAX: f32 = 140.0;
    pub const BALL_SPEED_MAX: f32 = 850.0;
    pub const BALL_ACCEL_FACTOR: f32 = 1.07; // Multiply speed on paddle hit
    pub const WALL_DAMPING: f32 = 0.98;

    // Paddle hit response
    pub const DEFLECT_FACTOR: f32 = 0.45;
    pub const DEFLECT_CAP: f32 = 0.55;
    pub const PUSHOUT_MARGIN: f32 = 5.0;
    pub const PUSHOUT_SPEED_FACTOR: f32 = 0.03;
    pub const COLLISION_COOLDOWN_MS: u64 = 80;

    // AI
    pub const AI_BASE_SPEED: f32 = 320.0;
    pub const AI_SPEED_BOOST: f32 = 0.22; // fraction of |ball.vx| added to AI speed
    pub const AI_MAX_SPEED: f32 = 500.0;

    // Score
    pub const WIN_SCORE: u8 = 10;
    pub const SCORE_DEBOUNCE_MS: u64 = 300;

    // Physics
    pub const MAX_DT: f32 = 0.033; // Clamp to prevent large jumps
}
