use hecs::World;

use crate::components::{Controller, Paddle};
use crate::config::Config;
use crate::resources::InputQueue;

/// Apply queued paddle targets to directly controlled paddles.
///
/// Targets for AI paddles are dropped. When a side has several targets queued, the last wins.
pub fn ingest_targets(world: &mut World, inputs: &mut InputQueue, config: &Config) {
    for (side, y) in inputs.drain() {
        for (_entity, (paddle, controller)) in world.query_mut::<(&mut Paddle, &Controller)>() {
            if paddle.side == side && *controller == Controller::Direct {
                paddle.set_y(y, config);
            }
        }
    }
}
