use glam::Vec2;
use rand::Rng;

use crate::config::Config;
use crate::physics::{bounce_velocity, Aabb};
use crate::resources::GameRng;

/// Which half of the field a paddle guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Horizontal direction pointing toward this side's wall
    pub fn toward(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// Whether a horizontal velocity carries the ball toward this side
    pub fn is_approached_by(self, vx: f32) -> bool {
        vx * self.toward() > 0.0
    }

    /// Whether `x` lies in this side's half of an arena `width` wide
    pub fn owns_x(self, x: f32, width: f32) -> bool {
        (x - width / 2.0) * self.toward() > 0.0
    }
}

/// Straight line from the ball's previous position to its current one, for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: Vec2,
    pub to: Vec2,
}

/// Plain position/velocity pair exchanged with the network layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallState {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl BallState {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            vel: Vec2::new(vx, vy),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }
}

/// Ball component - the pong ball
#[derive(Debug, Clone, Copy)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub trail: Option<TrailSegment>,
}

impl Ball {
    pub fn new(pos: Vec2, vel: Vec2) -> Self {
        Self {
            pos,
            vel,
            trail: None,
        }
    }

    /// Serve from the center.
    ///
    /// `direction` is the sign of the horizontal velocity; `None` picks one at random. The
    /// vertical speed is drawn from the configured band with a random sign.
    pub fn reset(&mut self, direction: Option<f32>, config: &Config, rng: &mut GameRng) {
        self.pos = config.center();

        let dir = direction
            .map(f32::signum)
            .unwrap_or_else(|| if rng.0.gen_bool(0.5) { 1.0 } else { -1.0 });
        let vy = rng
            .0
            .gen_range(config.ball_serve_vy_min..config.ball_serve_vy_max);
        let vy_sign = if rng.0.gen_bool(0.5) { 1.0 } else { -1.0 };

        self.vel = Vec2::new(dir * config.ball_serve_speed_x, vy * vy_sign);
        self.trail = None;
    }

    /// Integrate one step. Returns true when the ball bounced off the top or bottom wall.
    pub fn update(&mut self, dt: f32, config: &Config) -> bool {
        let old = self.pos;
        self.pos += self.vel * dt;

        let radius = config.ball_radius;
        let mut hit_wall = false;
        if self.pos.y - radius < 0.0 {
            self.pos.y = radius;
            self.vel.y = self.vel.y.abs() * config.wall_damping;
            hit_wall = true;
        } else if self.pos.y + radius > config.arena_height {
            self.pos.y = config.arena_height - radius;
            self.vel.y = -self.vel.y.abs() * config.wall_damping;
            hit_wall = true;
        }

        self.trail = Some(TrailSegment {
            from: old,
            to: self.pos,
        });
        hit_wall
    }

    /// Side credited with the point once the ball has fully left the field.
    ///
    /// Leaving past the left wall scores for `Right` and vice versa.
    pub fn out_of_bounds(&self, config: &Config) -> Option<Side> {
        if self.pos.x + config.ball_radius < 0.0 {
            Some(Side::Right)
        } else if self.pos.x - config.ball_radius > config.arena_width {
            Some(Side::Left)
        } else {
            None
        }
    }

    pub fn state(&self) -> BallState {
        BallState {
            pos: self.pos,
            vel: self.vel,
        }
    }

    pub fn set_state(&mut self, state: BallState) {
        self.pos = state.pos;
        self.vel = state.vel;
    }
}

/// How a paddle decides where to go each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// Follows targets pushed by local input or the network
    Direct,
    Ai,
}

/// Paddle component - represents a player's paddle
#[derive(Debug, Clone, Copy)]
pub struct Paddle {
    pub side: Side,
    pub x: f32,
    pub y: f32, // Y position (clamped to arena)
    pub last_hit_ms: Option<u64>,
}

impl Paddle {
    pub fn new(side: Side, config: &Config) -> Self {
        Self {
            side,
            x: config.paddle_x(side),
            y: config.arena_height / 2.0,
            last_hit_ms: None,
        }
    }

    pub fn set_y(&mut self, y: f32, config: &Config) {
        self.y = config.clamp_paddle_y(y);
    }

    pub fn bounds(&self, config: &Config) -> Aabb {
        Aabb::from_center_size(
            Vec2::new(self.x, self.y),
            Vec2::new(config.paddle_width, config.paddle_height),
        )
    }

    /// Computer opponent: follow the ball while it is in our half, otherwise drift back to
    /// the midline. Speed scales with the ball's horizontal speed up to a cap.
    pub fn update_ai(&mut self, ball: &Ball, dt: f32, config: &Config) {
        let speed = (config.ai_base_speed + ball.vel.x.abs() * config.ai_speed_boost)
            .min(config.ai_max_speed);

        let target = if self.side.owns_x(ball.pos.x, config.arena_width) {
            ball.pos.y
        } else {
            config.arena_height / 2.0
        };

        let diff = target - self.y;
        let max_move = speed * dt;
        if diff.abs() <= max_move {
            self.set_y(target, config);
        } else {
            self.set_y(self.y + diff.signum() * max_move, config);
        }
    }

    /// Bounce the ball off this paddle if it touches it while travelling toward it.
    ///
    /// Ignored for `collision_cooldown_ms` after a hit so a single contact is never counted
    /// twice. Returns whether a bounce happened.
    pub fn check_ball_collision(&mut self, ball: &mut Ball, now_ms: u64, config: &Config) -> bool {
        if let Some(last) = self.last_hit_ms {
            if now_ms.saturating_sub(last) < config.collision_cooldown_ms {
                return false;
            }
        }

        if !self.side.is_approached_by(ball.vel.x) {
            return false;
        }

        if !self.bounds(config).intersects_circle(ball.pos, config.ball_radius) {
            return false;
        }

        self.last_hit_ms = Some(now_ms);

        let bounce = bounce_velocity(ball.pos.y, self.y, ball.vel.x, config);
        let away = self.side.opponent().toward();
        ball.vel = Vec2::new(bounce.speed_x * away, bounce.vy);

        // Push the ball clear of the paddle face so the next tick cannot re-collide
        let pushout = (config.ball_radius + config.paddle_width / 2.0 + config.pushout_margin)
            .max(ball.vel.x.abs() * config.pushout_speed_factor);
        let edge = config.ball_radius + config.pushout_margin;
        ball.pos.x = (self.x + pushout * away).clamp(edge, config.arena_width - edge);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Config, GameRng) {
        (Config::new(), GameRng::new(7))
    }

    #[test]
    fn test_reset_centers_and_serves_in_band() {
        let (config, mut rng) = setup();
        let mut ball = Ball::new(Vec2::new(10.0, 10.0), Vec2::ZERO);
        ball.trail = Some(TrailSegment {
            from: Vec2::ZERO,
            to: Vec2::ONE,
        });

        for _ in 0..50 {
            ball.reset(None, &config, &mut rng);
            assert_eq!(ball.pos, config.center(), "Ball should serve from center");
            assert_eq!(ball.vel.x.abs(), config.ball_serve_speed_x);
            assert!(ball.vel.y.abs() >= config.ball_serve_vy_min);
            assert!(ball.vel.y.abs() < config.ball_serve_vy_max);
            assert!(ball.trail.is_none(), "Reset should clear the trail");
        }
    }

    #[test]
    fn test_reset_honors_direction() {
        let (config, mut rng) = setup();
        let mut ball = Ball::new(Vec2::ZERO, Vec2::ZERO);
        ball.reset(Some(1.0), &config, &mut rng);
        assert!(ball.vel.x > 0.0);
        ball.reset(Some(-1.0), &config, &mut rng);
        assert!(ball.vel.x < 0.0);
    }

    #[test]
    fn test_update_bounces_off_top_with_damping() {
        let config = Config::new();
        let mut ball = Ball::new(Vec2::new(400.0, 10.0), Vec2::new(100.0, -200.0));
        let hit = ball.update(0.033, &config);
        assert!(hit, "Ball should hit the top wall");
        assert_eq!(ball.pos.y, config.ball_radius);
        assert!((ball.vel.y - 200.0 * config.wall_damping).abs() < 1e-3);
        assert_eq!(ball.vel.x, 100.0, "X velocity should be unchanged");
    }

    #[test]
    fn test_update_bounces_off_bottom_with_damping() {
        let config = Config::new();
        let mut ball = Ball::new(Vec2::new(400.0, 590.0), Vec2::new(-100.0, 300.0));
        assert!(ball.update(0.033, &config));
        assert_eq!(ball.pos.y, config.arena_height - config.ball_radius);
        assert!((ball.vel.y + 300.0 * config.wall_damping).abs() < 1e-3);
    }

    #[test]
    fn test_update_keeps_ball_inside_vertically() {
        let (config, mut rng) = setup();
        use rand::Rng as _;
        for _ in 0..500 {
            let y = rng
                .0
                .gen_range(config.ball_radius..config.arena_height - config.ball_radius);
            let vy = rng.0.gen_range(-2000.0..2000.0);
            let mut ball = Ball::new(Vec2::new(400.0, y), Vec2::new(300.0, vy));
            let before = ball.vel.y;
            let hit = ball.update(config.max_dt, &config);
            assert!(ball.pos.y >= config.ball_radius);
            assert!(ball.pos.y <= config.arena_height - config.ball_radius);
            if hit {
                assert!(before.signum() != ball.vel.y.signum(), "Bounce flips vy");
                assert!((ball.vel.y.abs() - before.abs() * config.wall_damping).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn test_update_records_trail() {
        let config = Config::new();
        let mut ball = Ball::new(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        ball.update(0.01, &config);
        let trail = ball.trail.expect("trail after update");
        assert_eq!(trail.from, Vec2::new(400.0, 300.0));
        assert_eq!(trail.to, ball.pos);
    }

    #[test]
    fn test_out_of_bounds() {
        let config = Config::new();
        let mut ball = Ball::new(Vec2::new(-8.5, 300.0), Vec2::ZERO);
        assert_eq!(ball.out_of_bounds(&config), Some(Side::Right));
        ball.pos.x = -7.5;
        assert_eq!(ball.out_of_bounds(&config), None);
        ball.pos.x = 808.5;
        assert_eq!(ball.out_of_bounds(&config), Some(Side::Left));
        ball.pos.x = 807.5;
        assert_eq!(ball.out_of_bounds(&config), None);
        ball.pos.x = 400.0;
        assert_eq!(ball.out_of_bounds(&config), None);
    }

    #[test]
    fn test_paddle_set_y_clamps() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Left, &config);
        paddle.set_y(-50.0, &config);
        assert_eq!(paddle.y, config.paddle_min_y());
        paddle.set_y(5000.0, &config);
        assert_eq!(paddle.y, config.paddle_max_y());
    }

    #[test]
    fn test_ai_tracks_ball_in_its_half() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        let ball = Ball::new(Vec2::new(600.0, 310.0), Vec2::new(420.0, 0.0));
        paddle.update_ai(&ball, 0.033, &config);
        assert_eq!(paddle.y, 310.0, "Small gap should snap to target");

        let ball = Ball::new(Vec2::new(600.0, 100.0), Vec2::new(420.0, 0.0));
        paddle.update_ai(&ball, 0.01, &config);
        let speed = (config.ai_base_speed + 420.0 * config.ai_speed_boost).min(config.ai_max_speed);
        assert!((paddle.y - (310.0 - speed * 0.01)).abs() < 1e-3);
    }

    #[test]
    fn test_ai_recenters_when_ball_is_in_far_half() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        paddle.set_y(100.0, &config);
        // Heading our way but still past the midline
        let ball = Ball::new(Vec2::new(200.0, 100.0), Vec2::new(420.0, 0.0));
        paddle.update_ai(&ball, 0.033, &config);
        assert!(paddle.y > 100.0, "AI should move back toward the midline");
    }

    #[test]
    fn test_ai_keeps_tracking_a_receding_ball_in_its_half() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        paddle.set_y(100.0, &config);
        let ball = Ball::new(Vec2::new(700.0, 90.0), Vec2::new(-420.0, 0.0));
        paddle.update_ai(&ball, 0.033, &config);
        assert_eq!(paddle.y, 90.0, "Still chasing upward");
    }

    #[test]
    fn test_side_halves() {
        assert!(Side::Right.owns_x(401.0, 800.0));
        assert!(!Side::Right.owns_x(400.0, 800.0), "Midline belongs to neither side");
        assert!(Side::Left.owns_x(10.0, 800.0));
        assert!(!Side::Left.owns_x(600.0, 800.0));
    }

    #[test]
    fn test_ai_speed_is_capped() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        let ball = Ball::new(Vec2::new(600.0, 60.0), Vec2::new(5000.0, 0.0));
        paddle.update_ai(&ball, 0.01, &config);
        assert!((paddle.y - (300.0 - config.ai_max_speed * 0.01)).abs() < 1e-3);
    }

    #[test]
    fn test_collision_at_exact_radius() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Left, &config);
        let face = paddle.x + config.paddle_width / 2.0;
        let mut ball = Ball::new(
            Vec2::new(face + config.ball_radius, paddle.y),
            Vec2::new(-420.0, 0.0),
        );
        assert!(paddle.check_ball_collision(&mut ball, 1_000, &config));
        assert!(ball.vel.x > 0.0, "Ball should leave to the right");

        let mut paddle = Paddle::new(Side::Left, &config);
        let mut ball = Ball::new(
            Vec2::new(face + config.ball_radius + 0.01, paddle.y),
            Vec2::new(-420.0, 0.0),
        );
        assert!(!paddle.check_ball_collision(&mut ball, 1_000, &config));
        assert_eq!(ball.vel.x, -420.0);
    }

    #[test]
    fn test_no_collision_when_moving_away() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        let mut ball = Ball::new(Vec2::new(paddle.x, paddle.y), Vec2::new(-420.0, 0.0));
        assert!(!paddle.check_ball_collision(&mut ball, 1_000, &config));
        assert!(paddle.last_hit_ms.is_none());
    }

    #[test]
    fn test_collision_cooldown() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        let mut ball = Ball::new(Vec2::new(paddle.x - 10.0, paddle.y), Vec2::new(420.0, 0.0));
        assert!(paddle.check_ball_collision(&mut ball, 1_000, &config));

        // Put the ball back on the paddle, heading in again
        ball.pos = Vec2::new(paddle.x - 10.0, paddle.y);
        ball.vel = Vec2::new(420.0, 0.0);
        assert!(!paddle.check_ball_collision(&mut ball, 1_050, &config));
        assert!(paddle.check_ball_collision(&mut ball, 1_080, &config));
    }

    #[test]
    fn test_collision_pushes_ball_clear() {
        let config = Config::new();
        let mut paddle = Paddle::new(Side::Right, &config);
        let mut ball = Ball::new(Vec2::new(paddle.x - 5.0, paddle.y + 20.0), Vec2::new(600.0, 0.0));
        assert!(paddle.check_ball_collision(&mut ball, 0, &config));

        let speed = (600.0 * config.ball_accel_factor).min(config.ball_speed_max);
        assert!((ball.vel.x + speed).abs() < 1e-3, "Ball should head left");
        assert!(ball.vel.y > 0.0, "Low hit deflects downward");
        assert!(!paddle.bounds(&config).intersects_circle(ball.pos, config.ball_radius));
        assert!(ball.pos.x >= config.ball_radius + config.pushout_margin);
    }
}
