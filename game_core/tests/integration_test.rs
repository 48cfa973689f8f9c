use game_core::systems::check_scoring;
use game_core::*;
use glam::Vec2;
use hecs::World;

struct Match {
    world: World,
    time: Time,
    config: Config,
    score: Score,
    debounce: ScoreDebounce,
    events: Events,
    inputs: InputQueue,
    rng: GameRng,
    ball: hecs::Entity,
}

impl Match {
    fn new(left: Controller, right: Controller, seed: u64) -> Self {
        let config = Config::new();
        let mut world = World::new();
        let mut rng = GameRng::new(seed);
        create_paddle(&mut world, Side::Left, left, &config);
        create_paddle(&mut world, Side::Right, right, &config);
        let mut ball = Ball::new(config.center(), Vec2::ZERO);
        ball.reset(None, &config, &mut rng);
        let ball = world.spawn((ball,));
        Self {
            world,
            time: Time::default(),
            config,
            score: Score::new(),
            debounce: ScoreDebounce::new(),
            events: Events::new(),
            inputs: InputQueue::new(),
            rng,
            ball,
        }
    }

    fn tick(&mut self, dt: f32) -> Option<Side> {
        self.time.dt = dt;
        self.time.now_ms += (dt * 1000.0) as u64;
        step(
            &mut self.world,
            &mut self.time,
            &self.config,
            &mut self.inputs,
            &mut self.events,
        );
        check_scoring(
            &mut self.world,
            &self.time,
            &self.config,
            &mut self.score,
            &mut self.debounce,
            &mut self.events,
            &mut self.rng,
        )
    }

    fn ball(&self) -> Ball {
        *self.world.get::<&Ball>(self.ball).unwrap()
    }
}

#[test]
fn test_ai_match_reaches_a_winner() {
    let mut game = Match::new(Controller::Direct, Controller::Ai, 42);

    // The left paddle never moves, so points keep coming
    let mut winner = None;
    for _ in 0..60 * 60 * 10 {
        if game.tick(1.0 / 60.0).is_some() {
            winner = game.score.has_winner(game.config.win_score);
            if winner.is_some() {
                break;
            }
        }
    }

    let winner = winner.expect("match should finish");
    assert_eq!(game.score.get(winner), game.config.win_score);
    assert!(game.score.get(winner.opponent()) < game.config.win_score);
}

#[test]
fn test_ball_stays_in_vertical_bounds() {
    let mut game = Match::new(Controller::Ai, Controller::Ai, 7);
    for _ in 0..5_000 {
        game.tick(1.0 / 60.0);
        let ball = game.ball();
        assert!(ball.pos.y >= game.config.ball_radius);
        assert!(ball.pos.y <= game.config.arena_height - game.config.ball_radius);
        assert!(ball.vel.x.abs() <= game.config.ball_speed_max);
    }
}

#[test]
fn test_large_dt_is_clamped() {
    let mut game = Match::new(Controller::Direct, Controller::Direct, 1);
    let before = game.ball();
    game.tick(1.0);
    let after = game.ball();
    assert_eq!(game.time.dt, game.config.max_dt);
    assert!((after.pos.x - before.pos.x).abs() <= before.vel.x.abs() * game.config.max_dt + 1e-3);
}

#[test]
fn test_targets_drive_direct_paddles() {
    let mut game = Match::new(Controller::Direct, Controller::Direct, 3);
    game.inputs.push_target(Side::Left, 100.0);
    game.inputs.push_target(Side::Right, 450.0);
    game.tick(0.016);

    let mut ys: Vec<(Side, f32)> = game
        .world
        .query::<&Paddle>()
        .iter()
        .map(|(_e, p)| (p.side, p.y))
        .collect();
    ys.sort_by_key(|(side, _)| *side == Side::Right);
    assert_eq!(ys, vec![(Side::Left, 100.0), (Side::Right, 450.0)]);
}

#[test]
fn test_same_seed_is_deterministic() {
    let mut a = Match::new(Controller::Ai, Controller::Ai, 99);
    let mut b = Match::new(Controller::Ai, Controller::Ai, 99);
    for _ in 0..2_000 {
        a.tick(1.0 / 60.0);
        b.tick(1.0 / 60.0);
    }
    assert_eq!(a.ball().pos, b.ball().pos);
    assert_eq!(a.score, b.score);
}
