use hecs::World;

use crate::components::{Ball, Side};
use crate::config::Config;
use crate::resources::{Events, GameRng, Score, ScoreDebounce, Time};

/// Check if the ball left the arena.
///
/// A goal credits the scorer and serves the next ball toward the scorer's own side. Goals
/// closer together than `score_debounce_ms` are ignored, which also leaves the ball where it
/// is until the window expires.
pub fn check_scoring(
    world: &mut World,
    time: &Time,
    config: &Config,
    score: &mut Score,
    debounce: &mut ScoreDebounce,
    events: &mut Events,
    rng: &mut GameRng,
) -> Option<Side> {
    for (_entity, ball) in world.query_mut::<&mut Ball>() {
        let Some(scorer) = ball.out_of_bounds(config) else {
            continue;
        };

        if !debounce.try_accept(time.now_ms, config.score_debounce_ms) {
            return None;
        }

        score.increment(scorer);
        events.record_goal(scorer);
        ball.reset(Some(scorer.toward()), config, rng);
        return Some(scorer);
    }
    None
}
