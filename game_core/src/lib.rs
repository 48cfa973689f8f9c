pub mod components;
pub mod config;
pub mod params;
pub mod physics;
pub mod resources;
pub mod systems;

pub use components::*;
pub use config::*;
pub use params::*;
pub use resources::*;

use hecs::World;
use systems::*;

/// Advance the simulation by one frame.
///
/// Order: queued paddle targets, AI paddles, ball movement with wall bounces, paddle hits.
/// Scoring is left to [`check_scoring`] so each peer can decide whether it is authoritative.
pub fn step(
    world: &mut World,
    time: &mut Time,
    config: &Config,
    inputs: &mut InputQueue,
    events: &mut Events,
) {
    // Clamp dt to prevent large jumps
    time.dt = time.dt.clamp(0.0, config.max_dt);

    events.clear();

    ingest_targets(world, inputs, config);
    drive_ai(world, time, config);
    move_ball(world, time, config, events);
    check_collisions(world, time, config, events);
}

/// Helper to create a paddle entity at mid height
pub fn create_paddle(
    world: &mut World,
    side: Side,
    controller: Controller,
    config: &Config,
) -> hecs::Entity {
    world.spawn((Paddle::new(side, config), controller))
}

/// Helper to create the ball entity
pub fn create_ball(world: &mut World, pos: glam::Vec2, vel: glam::Vec2) -> hecs::Entity {
    world.spawn((Ball::new(pos, vel),))
}
