//! Stateless collision and bounce helpers shared by the ball and paddle components.

use glam::Vec2;

use crate::config::Config;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Point of the box nearest to `point`
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Check if circle intersects AABB
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = self.closest_point(center);
        (center - closest).length_squared() <= radius * radius
    }
}

/// Horizontal speed and vertical velocity of a ball leaving a paddle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounce {
    /// Unsigned; the caller points it away from the paddle.
    pub speed_x: f32,
    pub vy: f32,
}

/// Compute the post-hit velocity.
///
/// The horizontal speed grows by `ball_accel_factor` up to `ball_speed_max`. The vertical
/// component follows where the ball met the paddle: center hits stay flat, edge hits deflect
/// up to `deflect_cap` of the new speed.
pub fn bounce_velocity(ball_y: f32, paddle_y: f32, incoming_vx: f32, config: &Config) -> Bounce {
    let speed_x = (incoming_vx.abs() * config.ball_accel_factor).min(config.ball_speed_max);
    let relative_offset = (ball_y - paddle_y) / (config.paddle_height / 2.0);
    let cap = speed_x * config.deflect_cap;
    let vy = (relative_offset * speed_x * config.deflect_factor).clamp(-cap, cap);
    Bounce { speed_x, vy }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paddle_box() -> Aabb {
        Aabb::from_center_size(Vec2::new(30.0, 300.0), Vec2::new(16.0, 100.0))
    }

    #[test]
    fn test_circle_touching_edge_intersects() {
        let paddle = paddle_box();
        // Right face of the paddle is at x = 38
        assert!(paddle.intersects_circle(Vec2::new(46.0, 300.0), 8.0));
        assert!(!paddle.intersects_circle(Vec2::new(46.01, 300.0), 8.0));
    }

    #[test]
    fn test_circle_near_corner_uses_closest_point() {
        let paddle = paddle_box();
        // Corner at (38, 250); ball diagonal from it at distance sqrt(50) < 8
        assert!(paddle.intersects_circle(Vec2::new(43.0, 245.0), 8.0));
        // Same x but far above the corner
        assert!(!paddle.intersects_circle(Vec2::new(43.0, 240.0), 8.0));
    }

    #[test]
    fn test_bounce_center_hit_is_flat() {
        let bounce = bounce_velocity(300.0, 300.0, -420.0, &Config::new());
        assert!((bounce.speed_x - 449.4).abs() < 0.01);
        assert_eq!(bounce.vy, 0.0);
    }

    #[test]
    fn test_bounce_edge_hit_is_capped() {
        let config = Config {
            ball_accel_factor: 1.0,
            ..Config::new()
        };
        // Offset of 2 half-heights would give 0.9 * speed, capped at 0.55 * speed
        let bounce = bounce_velocity(400.0, 300.0, 400.0, &config);
        assert!((bounce.vy - 220.0).abs() < 0.01, "got {}", bounce.vy);
        let bounce = bounce_velocity(200.0, 300.0, 400.0, &config);
        assert!((bounce.vy + 220.0).abs() < 0.01, "got {}", bounce.vy);
    }

    #[test]
    fn test_bounce_speed_monotonic_and_capped() {
        let config = Config::new();
        let mut previous = 0.0;
        for step in 0..200 {
            let incoming = step as f32 * 10.0;
            let bounce = bounce_velocity(300.0, 300.0, incoming, &config);
            assert!(
                bounce.speed_x >= previous,
                "speed should not decrease as incoming speed grows"
            );
            assert!(bounce.speed_x <= 850.0, "speed should respect the cap");
            previous = bounce.speed_x;
        }
        assert_eq!(previous, 850.0);
    }
}
