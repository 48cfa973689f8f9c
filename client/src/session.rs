//! Session coordinator
//!
//! Owns the world, the match state and the network link for one player. The driver calls
//! [`Session::poll`] and [`Session::tick`] once per frame and drains UI events afterwards.

use game_core::systems::check_scoring;
use game_core::{
    create_ball, create_paddle, step, Ball, BallState, Config, Controller, Events, GameRng,
    InputQueue, Paddle, Score, ScoreDebounce, Side, Time,
};
use glam::Vec2;
use hecs::{Entity, World};
use log::{debug, info, warn};
use proto::{Role, RoomCode, Winner};
use room_store::{Beacon, SharedStore};

use crate::clock::Clock;
use crate::error::SessionError;
use crate::fsm::{FsmState, GameAction, GameFsm};
use crate::network::{NetConfig, NetEvent, NetworkSync};
use crate::reconcile::reconcile;
use crate::state::{MatchState, Mode, Seat};
use crate::ui::{ConnectionStatus, FrameView, Screen, UiEvent};

fn winner_of(side: Side) -> Winner {
    match side {
        Side::Left => Winner::Left,
        Side::Right => Winner::Right,
    }
}

pub struct Session<S: SharedStore, C: Clock> {
    clock: C,
    config: Config,
    fsm: GameFsm,
    state: MatchState,
    world: World,
    ball: Entity,
    time: Time,
    events: Events,
    inputs: InputQueue,
    rng: GameRng,
    debounce: ScoreDebounce,
    input_y: f32,
    stopped: bool,
    result: Option<String>,
    connection: ConnectionStatus,
    network: NetworkSync<S>,
    ui: Vec<UiEvent>,
}

impl<S: SharedStore, C: Clock> Session<S, C> {
    pub fn new(store: S, clock: C, config: Config, net: NetConfig, seed: u64) -> Self {
        let mut rng = GameRng::new(seed);
        let mut world = World::new();
        let ball = Self::populate(&mut world, Controller::Ai, &config, &mut rng);
        let network = NetworkSync::new(store, net, config.clone(), seed.wrapping_add(1));

        Self {
            clock,
            input_y: config.arena_height / 2.0,
            config,
            fsm: GameFsm::new(),
            state: MatchState::new(),
            world,
            ball,
            time: Time::default(),
            events: Events::new(),
            inputs: InputQueue::new(),
            rng,
            debounce: ScoreDebounce::new(),
            stopped: true,
            result: None,
            connection: ConnectionStatus::Hidden,
            network,
            ui: Vec::new(),
        }
    }

    /// Spawn both paddles and a freshly served ball; returns the ball entity
    fn populate(world: &mut World, right: Controller, config: &Config, rng: &mut GameRng) -> Entity {
        world.clear();
        create_paddle(world, Side::Left, Controller::Direct, config);
        create_paddle(world, Side::Right, right, config);

        let mut ball = Ball::new(config.center(), Vec2::ZERO);
        ball.reset(None, config, rng);
        create_ball(world, ball.pos, ball.vel)
    }

    // Queries

    pub fn fsm_state(&self) -> FsmState {
        self.fsm.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn score(&self) -> Score {
        self.state.score
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn role(&self) -> Option<Role> {
        self.state.role()
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.state.room_code()
    }

    /// Text of the game over screen, once a match ended
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn network(&self) -> &NetworkSync<S> {
        &self.network
    }

    pub fn ball_state(&self) -> Option<BallState> {
        self.world
            .get::<&Ball>(self.ball)
            .ok()
            .map(|ball| ball.state())
    }

    pub fn paddle_y(&self, side: Side) -> f32 {
        self.world
            .query::<&Paddle>()
            .iter()
            .find(|(_, paddle)| paddle.side == side)
            .map_or(self.config.arena_height / 2.0, |(_, paddle)| paddle.y)
    }

    pub fn frame(&self) -> FrameView {
        let ball = self.world.get::<&Ball>(self.ball).ok().map(|ball| *ball);
        FrameView {
            ball: ball.map_or(self.config.center(), |b| b.pos),
            trail: ball.and_then(|b| b.trail),
            left_y: self.paddle_y(Side::Left),
            right_y: self.paddle_y(Side::Right),
            score: self.state.score,
            playing: self.state.playing,
        }
    }

    pub fn drain_ui_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.ui)
    }

    fn require(&self, action: GameAction) -> Result<(), SessionError> {
        if self.fsm.can_transition(action) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                state: self.fsm.state(),
                action,
            })
        }
    }

    // Screen flow

    pub fn boot(&mut self) -> Result<(), SessionError> {
        self.require(GameAction::Boot)?;
        self.fsm.transition(GameAction::Boot);
        self.ui.push(UiEvent::Show(Screen::Menu));
        Ok(())
    }

    pub fn start_ai(&mut self) -> Result<(), SessionError> {
        self.require(GameAction::StartAi)?;
        self.fsm.transition(GameAction::StartAi);
        self.begin_match(None);
        info!("AI match started");
        Ok(())
    }

    pub fn open_lobby(&mut self) -> Result<(), SessionError> {
        self.require(GameAction::OpenLobby)?;
        self.fsm.transition(GameAction::OpenLobby);
        self.ui.extend([
            UiEvent::Hide(Screen::Menu),
            UiEvent::Show(Screen::Lobby),
            UiEvent::Show(Screen::LobbyMain),
            UiEvent::Hide(Screen::LobbyWait),
            UiEvent::JoinFeedback(String::new()),
            UiEvent::ControlsEnabled(true),
        ]);
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), SessionError> {
        self.require(GameAction::Back)?;
        self.fsm.transition(GameAction::Back);
        self.ui
            .extend([UiEvent::Hide(Screen::Lobby), UiEvent::Show(Screen::Menu)]);
        Ok(())
    }

    /// Open a room and wait in it for a guest
    pub async fn host(&mut self) -> Result<RoomCode, SessionError> {
        self.require(GameAction::Host)?;
        self.ui.push(UiEvent::ControlsEnabled(false));

        match self.network.create_room(self.clock.now_ms()).await {
            Ok(code) => {
                self.fsm.transition(GameAction::Host);
                self.state.seat = Some(Seat::new(code.clone(), Role::Host));
                self.ui.extend([
                    UiEvent::RoomCode(code.clone()),
                    UiEvent::Hide(Screen::LobbyMain),
                    UiEvent::Show(Screen::LobbyWait),
                ]);
                Ok(code)
            }
            Err(e) => {
                self.ui.extend([
                    UiEvent::Error(e.to_string()),
                    UiEvent::ControlsEnabled(true),
                ]);
                Err(e)
            }
        }
    }

    /// Join a room by the code the player typed
    pub async fn join(&mut self, input: &str) -> Result<(), SessionError> {
        self.require(GameAction::Join)?;
        let code = match RoomCode::parse(input) {
            Ok(code) => code,
            Err(e) => {
                debug!("Rejected join input: {e}");
                let err = SessionError::InvalidCode;
                self.ui.push(UiEvent::JoinFeedback(err.to_string()));
                return Err(err);
            }
        };

        self.fsm.transition(GameAction::Join);
        self.ui.extend([
            UiEvent::JoinFeedback("Connecting...".to_string()),
            UiEvent::ControlsEnabled(false),
        ]);

        let now_ms = self.clock.now_ms();
        let limit = self.network.config().join_timeout;
        let joined = tokio::time::timeout(limit, self.network.join_room(code.clone(), now_ms)).await;
        let result = match joined {
            Ok(result) => result,
            Err(_) => {
                warn!("Joining room {code} timed out");
                self.network.abandon_join(&code);
                Err(SessionError::JoinTimedOut)
            }
        };

        match result {
            Ok(()) => {
                self.fsm.transition(GameAction::Connected);
                self.ui.push(UiEvent::JoinFeedback(String::new()));
                self.begin_match(Some(Seat::new(code, Role::Guest)));
                Ok(())
            }
            Err(e) => {
                self.fsm.transition(GameAction::ConnectionFailed);
                self.ui.extend([
                    UiEvent::JoinFeedback(e.to_string()),
                    UiEvent::ControlsEnabled(true),
                ]);
                Err(e)
            }
        }
    }

    /// Give up waiting for a guest
    pub async fn cancel_hosting(&mut self) -> Result<(), SessionError> {
        self.require(GameAction::Cancel)?;
        self.teardown().await;
        self.fsm.transition(GameAction::Cancel);
        self.ui.extend([
            UiEvent::Hide(Screen::LobbyWait),
            UiEvent::Show(Screen::LobbyMain),
            UiEvent::ControlsEnabled(true),
        ]);
        Ok(())
    }

    /// Leave whatever is running and go back to the menu
    pub async fn exit(&mut self) {
        self.teardown().await;
        if !self.fsm.transition(GameAction::Exit).success() {
            self.fsm.reset();
        }
        self.ui.extend([
            UiEvent::Hide(Screen::Hud),
            UiEvent::Hide(Screen::Over),
            UiEvent::Hide(Screen::Lobby),
        ]);
        self.fsm.transition(GameAction::Boot);
        self.ui.push(UiEvent::Show(Screen::Menu));
    }

    async fn teardown(&mut self) {
        self.network.cleanup().await;
        self.inputs.clear();
        self.state.reset();
        self.stopped = true;
        self.set_connection(ConnectionStatus::Hidden);
    }

    /// Best-effort cleanup when the process is going away without running `exit`
    pub fn on_unload(&self, beacon: &impl Beacon) -> bool {
        self.network.beacon_cleanup(beacon)
    }

    // Input

    pub fn set_input_y(&mut self, y: f32) {
        self.input_y = self.config.clamp_paddle_y(y);
    }

    /// Keyboard step; positive moves down
    pub fn nudge_input(&mut self, direction: f32) {
        let y = self.input_y + direction.signum() * self.config.paddle_key_step;
        self.set_input_y(y);
    }

    // Frame loop

    fn begin_match(&mut self, seat: Option<Seat>) {
        match seat {
            Some(seat) => self.state.start_online(seat),
            None => self.state.start_ai(),
        }
        let right = match self.state.mode {
            Mode::Ai => Controller::Ai,
            _ => Controller::Direct,
        };
        self.ball = Self::populate(&mut self.world, right, &self.config, &mut self.rng);
        self.inputs.clear();
        self.debounce.reset();
        self.input_y = self.config.arena_height / 2.0;
        self.stopped = false;
        self.result = None;

        self.ui.extend([
            UiEvent::Hide(Screen::Menu),
            UiEvent::Hide(Screen::Lobby),
            UiEvent::Show(Screen::Hud),
            UiEvent::score(self.state.score),
        ]);
        let status = match self.state.mode {
            Mode::Online => ConnectionStatus::Connected,
            _ => ConnectionStatus::Hidden,
        };
        self.set_connection(status);
    }

    /// Advance one frame. Does nothing unless a match is running.
    pub fn tick(&mut self, dt: f32) {
        if !self.state.playing || self.stopped {
            return;
        }
        let now_ms = self.clock.now_ms();
        self.time = Time::new(dt, now_ms);

        self.inputs
            .push_target(self.state.local_side(), self.input_y);
        step(
            &mut self.world,
            &mut self.time,
            &self.config,
            &mut self.inputs,
            &mut self.events,
        );

        if self.state.is_authoritative() {
            let scorer = check_scoring(
                &mut self.world,
                &self.time,
                &self.config,
                &mut self.state.score,
                &mut self.debounce,
                &mut self.events,
                &mut self.rng,
            );
            if let Some(scorer) = scorer {
                self.on_goal(scorer, now_ms);
            }
        }

        if self.state.playing && self.state.mode == Mode::Online {
            if let Some(ball) = self.ball_state() {
                let left_y = self.paddle_y(Side::Left);
                let right_y = self.paddle_y(Side::Right);
                self.network
                    .publish(&ball, left_y, right_y, self.state.score, now_ms);
            }
        }
    }

    fn on_goal(&mut self, scorer: Side, now_ms: u64) {
        let score = self.state.score;
        info!("{scorer:?} scores, {}-{}", score.left, score.right);
        self.ui.push(UiEvent::score(score));

        let online = self.state.mode == Mode::Online;
        if score.has_winner(self.config.win_score).is_some() {
            let winner = winner_of(score.leader());
            if online {
                self.network.broadcast_game_over(winner, score);
                self.network.schedule_cleanup(now_ms);
            }
            self.stop_game(GameAction::GameOver, winner.banner());
        } else if online {
            if let Some(ball) = self.ball_state() {
                self.network.broadcast_ball_reset(&ball);
            }
        }
    }

    /// End the match and show `result`. Only the first call has any effect.
    fn stop_game(&mut self, action: GameAction, result: &str) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.state.playing = false;
        self.fsm.transition(action);
        if let Ok(mut ball) = self.world.get::<&mut Ball>(self.ball) {
            ball.trail = None;
        }

        info!("Game over: {result}");
        self.result = Some(result.to_string());
        self.set_connection(ConnectionStatus::Hidden);
        self.ui.extend([
            UiEvent::Hide(Screen::Hud),
            UiEvent::Show(Screen::Over),
            UiEvent::Result(result.to_string()),
        ]);
    }

    /// Apply whatever the room delivered since the last frame
    pub fn poll(&mut self) {
        let now_ms = self.clock.now_ms();
        if self.fsm.state() == FsmState::HostingWait {
            self.network.keep_alive(now_ms);
        }

        for event in self.network.poll(self.state.playing, now_ms) {
            self.apply(event);
        }

        if self.state.playing && self.fsm.is_multiplayer() {
            let status = if self.network.is_connected(now_ms) {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Reconnecting
            };
            self.set_connection(status);
        }
    }

    fn apply(&mut self, event: NetEvent) {
        match event {
            NetEvent::GuestJoined => self.on_guest_joined(),
            NetEvent::OpponentPaddle(y) => {
                if self.state.playing {
                    let side = self.state.local_side().opponent();
                    for (_entity, paddle) in self.world.query_mut::<&mut Paddle>() {
                        if paddle.side == side {
                            paddle.set_y(y, &self.config);
                        }
                    }
                }
            }
            NetEvent::BallReset(state) => {
                if let Ok(mut ball) = self.world.get::<&mut Ball>(self.ball) {
                    ball.set_state(state);
                    ball.trail = None;
                }
            }
            NetEvent::BallSync(remote) => {
                if let Ok(mut ball) = self.world.get::<&mut Ball>(self.ball) {
                    let blended = reconcile(ball.state(), remote);
                    ball.set_state(blended);
                }
            }
            NetEvent::Score(score) => {
                self.state.score = score;
                self.ui.push(UiEvent::score(score));
            }
            NetEvent::GameOver(winner) => self.stop_game(GameAction::GameOver, winner.banner()),
            NetEvent::Error(e) => self.on_network_error(e),
        }
    }

    fn on_guest_joined(&mut self) {
        if !self.fsm.transition(GameAction::GuestJoined).success() {
            warn!("Guest joined while in {:?}", self.fsm.state());
            return;
        }
        let Some(seat) = self.network.seat().cloned() else {
            return;
        };
        self.begin_match(Some(seat));
        if let Some(ball) = self.ball_state() {
            self.network.broadcast_ball_reset(&ball);
        }
    }

    fn on_network_error(&mut self, error: SessionError) {
        warn!("Network error: {error}");
        let message = error.to_string();
        match self.fsm.state() {
            FsmState::OnlinePlaying if error.is_network() => {
                self.stop_game(GameAction::NetworkError, &message);
                self.ui.push(UiEvent::Error(message));
            }
            FsmState::HostingWait => {
                self.fsm.transition(GameAction::NetworkError);
                self.state.reset();
                self.ui.extend([
                    UiEvent::Error(message),
                    UiEvent::Hide(Screen::LobbyWait),
                    UiEvent::Show(Screen::LobbyMain),
                    UiEvent::ControlsEnabled(true),
                ]);
            }
            state => debug!("Ignoring network error in {state:?}"),
        }
        self.network.cleanup_detached();
    }

    fn set_connection(&mut self, status: ConnectionStatus) {
        if self.connection != status {
            self.connection = status;
            self.ui.push(UiEvent::Connection(status));
        }
    }
}
