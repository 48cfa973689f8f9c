use hecs::World;

use crate::components::{Ball, Paddle};
use crate::config::Config;
use crate::resources::{Events, Time};

/// Check ball collisions with paddles. At most one paddle can return the ball per step.
pub fn check_collisions(world: &mut World, time: &Time, config: &Config, events: &mut Events) {
    // Copy the ball out so paddles can be borrowed mutably
    let (ball_entity, mut ball) = match world.query::<&Ball>().iter().next() {
        Some((entity, ball)) => (entity, *ball),
        None => return,
    };

    let mut hit = false;
    for (_entity, paddle) in world.query_mut::<&mut Paddle>() {
        if paddle.check_ball_collision(&mut ball, time.now_ms, config) {
            hit = true;
            break;
        }
    }

    if hit {
        events.ball_hit_paddle = true;
        if let Ok(mut stored) = world.get::<&mut Ball>(ball_entity) {
            stored.pos = ball.pos;
            stored.vel = ball.vel;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_ball, create_paddle, Controller, Side};
    use glam::Vec2;

    fn setup_world() -> (World, Config, Events) {
        (World::new(), Config::new(), Events::new())
    }

    #[test]
    fn test_ball_collides_with_left_paddle() {
        let (mut world, config, mut events) = setup_world();
        create_paddle(&mut world, Side::Left, Controller::Direct, &config);
        let paddle_x = config.paddle_x(Side::Left);
        let ball = create_ball(
            &mut world,
            Vec2::new(paddle_x + 10.0, 300.0),
            Vec2::new(-420.0, 0.0),
        );

        check_collisions(&mut world, &Time::new(0.016, 1_000), &config, &mut events);

        let ball = world.get::<&Ball>(ball).unwrap();
        assert!(ball.vel.x > 0.0, "Ball should bounce right after hitting left paddle");
        assert!(ball.pos.x > paddle_x, "Ball should be pushed out of paddle");
        assert!(events.ball_hit_paddle, "Should trigger ball_hit_paddle event");
    }

    #[test]
    fn test_ball_collides_with_right_paddle() {
        let (mut world, config, mut events) = setup_world();
        create_paddle(&mut world, Side::Right, Controller::Ai, &config);
        let paddle_x = config.paddle_x(Side::Right);
        let ball = create_ball(
            &mut world,
            Vec2::new(paddle_x - 10.0, 320.0),
            Vec2::new(420.0, 0.0),
        );

        check_collisions(&mut world, &Time::new(0.016, 1_000), &config, &mut events);

        let ball = world.get::<&Ball>(ball).unwrap();
        assert!(ball.vel.x < 0.0, "Ball should bounce left after hitting right paddle");
        assert!(ball.vel.y > 0.0, "Hit below center deflects downward");
        assert!(ball.pos.x < paddle_x, "Ball should be pushed out of paddle");
    }

    #[test]
    fn test_ball_misses_paddle() {
        let (mut world, config, mut events) = setup_world();
        create_paddle(&mut world, Side::Left, Controller::Direct, &config);
        let ball = create_ball(&mut world, Vec2::new(30.0, 500.0), Vec2::new(-420.0, 0.0));

        check_collisions(&mut world, &Time::new(0.016, 1_000), &config, &mut events);

        assert_eq!(world.get::<&Ball>(ball).unwrap().vel.x, -420.0);
        assert!(!events.ball_hit_paddle);
    }

    #[test]
    fn test_no_ball_is_noop() {
        let (mut world, config, mut events) = setup_world();
        create_paddle(&mut world, Side::Left, Controller::Direct, &config);
        check_collisions(&mut world, &Time::new(0.016, 0), &config, &mut events);
        assert!(!events.ball_hit_paddle);
    }
}
