use hecs::World;

use crate::components::{Ball, Controller, Paddle};
use crate::config::Config;
use crate::resources::{Events, Time};

/// Let AI controlled paddles chase the ball
pub fn drive_ai(world: &mut World, time: &Time, config: &Config) {
    let ball = match world.query::<&Ball>().iter().next() {
        Some((_e, ball)) => *ball,
        None => return,
    };

    for (_entity, (paddle, controller)) in world.query_mut::<(&mut Paddle, &Controller)>() {
        if *controller == Controller::Ai {
            paddle.update_ai(&ball, time.dt, config);
        }
    }
}

/// Move ball based on velocity, bouncing off the top and bottom walls
pub fn move_ball(world: &mut World, time: &Time, config: &Config, events: &mut Events) {
    for (_entity, ball) in world.query_mut::<&mut Ball>() {
        if ball.update(time.dt, config) {
            events.ball_hit_wall = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_ball, create_paddle, Side};
    use glam::Vec2;

    #[test]
    fn test_move_ball_integrates_velocity() {
        let mut world = World::new();
        let config = Config::new();
        let mut events = Events::new();
        let ball = create_ball(&mut world, Vec2::new(400.0, 300.0), Vec2::new(100.0, -50.0));

        move_ball(&mut world, &Time::new(0.02, 0), &config, &mut events);

        let ball = world.get::<&Ball>(ball).unwrap();
        assert!((ball.pos.x - 402.0).abs() < 1e-4);
        assert!((ball.pos.y - 299.0).abs() < 1e-4);
        assert!(!events.ball_hit_wall);
    }

    #[test]
    fn test_move_ball_flags_wall_hit() {
        let mut world = World::new();
        let config = Config::new();
        let mut events = Events::new();
        create_ball(&mut world, Vec2::new(400.0, 9.0), Vec2::new(0.0, -100.0));

        move_ball(&mut world, &Time::new(0.02, 0), &config, &mut events);

        assert!(events.ball_hit_wall, "Should trigger ball_hit_wall event");
    }

    #[test]
    fn test_drive_ai_moves_only_ai_paddles() {
        let mut world = World::new();
        let config = Config::new();
        create_ball(&mut world, Vec2::new(600.0, 100.0), Vec2::new(420.0, 0.0));
        let left = create_paddle(&mut world, Side::Left, Controller::Direct, &config);
        let right = create_paddle(&mut world, Side::Right, Controller::Ai, &config);

        drive_ai(&mut world, &Time::new(0.02, 0), &config);

        assert_eq!(world.get::<&Paddle>(left).unwrap().y, 300.0);
        assert!(world.get::<&Paddle>(right).unwrap().y < 300.0, "AI should chase upward");
    }
}
