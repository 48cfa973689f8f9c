//! Room lifecycle and state exchange over the shared store
//!
//! One `NetworkSync` per peer. It creates or joins a room, turns record snapshots into
//! [`NetEvent`]s for the session, publishes this peer's half of the state and tears the
//! room down again. Snapshots are drained with [`NetworkSync::poll`] between ticks so the
//! session never sees a callback in the middle of a step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use game_core::{BallState, Config, Score};
use log::{debug, error, info, warn};
use proto::{
    beacon_url, BallReset, BallWire, Change, Role, RoomCode, RoomPatch, RoomRecord, RoomStatus,
    ScoreWire, Winner, BEACON_PAYLOAD,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use room_store::{Beacon, DisconnectAction, RoomEvent, SharedStore, Subscription};

use crate::error::SessionError;
use crate::publisher::Publisher;
use crate::state::Seat;

/// Network timing
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Base URL unload beacons are addressed to
    pub store_url: String,
    pub publish_interval: Duration,
    pub liveness_threshold_ms: u64,
    /// Delay between a broadcast game over and the host deleting the room
    pub cleanup_delay_ms: u64,
    pub code_attempts: u32,
    pub join_timeout: Duration,
    /// Host heartbeat cadence while waiting for a guest
    pub lease_refresh_ms: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            store_url: "http://127.0.0.1:9000".to_string(),
            publish_interval: Duration::from_millis(16),
            liveness_threshold_ms: 2000,
            cleanup_delay_ms: 1500,
            code_attempts: 10,
            join_timeout: Duration::from_secs(10),
            lease_refresh_ms: 1000,
        }
    }
}

/// What the remote side changed, already validated and clamped
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    GuestJoined,
    OpponentPaddle(f32),
    /// Forced ball state after a serve
    BallReset(BallState),
    /// Periodic host ball report, to be reconciled
    BallSync(BallState),
    Score(Score),
    GameOver(Winner),
    Error(SessionError),
}

/// Remote values seen last, so repeats of the same write are not treated as news
#[derive(Debug, Default)]
struct Seen {
    guest_y: Option<f32>,
    guest_beat: Option<u64>,
    ball: Option<BallWire>,
    host_beat: Option<u64>,
    reset_seq: Option<u32>,
    score: Option<ScoreWire>,
}

/// Remote half of a cleanup, runnable after the local state is already released
struct RemoteCleanup<S> {
    store: S,
    seat: Seat,
    in_progress: Arc<AtomicBool>,
}

impl<S: SharedStore> RemoteCleanup<S> {
    async fn run(self) {
        let key = self.seat.code.key();
        let result = match self.seat.role {
            Role::Host => self.store.remove(&key).await,
            Role::Guest => self.store.update(&key, RoomPatch::clear_guest()).await,
        };
        match result {
            Ok(()) => info!("Left room {} as {:?}", self.seat.code, self.seat.role),
            Err(e) => warn!("Cleanup of room {} failed: {e}", self.seat.code),
        }
        if let Err(e) = self.store.cancel_on_disconnect(&key).await {
            debug!("Could not cancel disconnect actions on {key}: {e}");
        }
        self.in_progress.store(false, Ordering::SeqCst);
    }
}

pub struct NetworkSync<S: SharedStore> {
    store: S,
    config: NetConfig,
    game: Config,
    rng: StdRng,
    seat: Option<Seat>,
    subscription: Option<Subscription>,
    cleaning: Arc<AtomicBool>,
    publisher: Option<Publisher>,
    cleanup_due_ms: Option<u64>,
    guest_joined: bool,
    reset_seq: u32,
    last_publish_ms: Option<u64>,
    last_lease_ms: u64,
    last_position_ms: u64,
    last_heartbeat_ms: u64,
    seen: Seen,
}

impl<S: SharedStore> NetworkSync<S> {
    pub fn new(store: S, config: NetConfig, game: Config, seed: u64) -> Self {
        Self {
            store,
            config,
            game,
            rng: StdRng::seed_from_u64(seed),
            seat: None,
            subscription: None,
            cleaning: Arc::new(AtomicBool::new(false)),
            publisher: None,
            cleanup_due_ms: None,
            guest_joined: false,
            reset_seq: 0,
            last_publish_ms: None,
            last_lease_ms: 0,
            last_position_ms: 0,
            last_heartbeat_ms: 0,
            seen: Seen::default(),
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn seat(&self) -> Option<&Seat> {
        self.seat.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.seat.as_ref().map(|seat| seat.role)
    }

    /// Holding a live feed and not tearing down
    pub fn is_active(&self) -> bool {
        self.subscription.is_some() && !self.cleaning.load(Ordering::SeqCst)
    }

    /// Open a fresh room as host
    pub async fn create_room(&mut self, now_ms: u64) -> Result<RoomCode, SessionError> {
        let mut chosen = None;
        for attempt in 1..=self.config.code_attempts {
            let code = RoomCode::generate(&mut self.rng);
            match self.store.get(&code.key()).await {
                Ok(None) => {
                    chosen = Some(code);
                    break;
                }
                Ok(Some(_)) => debug!("Room code {code} taken (attempt {attempt})"),
                Err(e) => {
                    warn!("Could not check room code {code}: {e}");
                    chosen = Some(code);
                    break;
                }
            }
        }
        let Some(code) = chosen else {
            error!(
                "No free room code after {} attempts",
                self.config.code_attempts
            );
            return Err(SessionError::RoomCreationFailed);
        };

        let key = code.key();
        if let Err(e) = self.store.set(&key, RoomRecord::waiting(now_ms)).await {
            error!("Failed to create room {code}: {e}");
            return Err(SessionError::RoomCreationFailed);
        }
        if let Err(e) = self
            .store
            .on_disconnect(&key, DisconnectAction::RemoveRoom)
            .await
        {
            warn!("Could not register disconnect cleanup for room {code}: {e}");
        }
        let subscription = match self.store.subscribe(&key) {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Failed to watch room {code}: {e}");
                if let Err(e) = self.store.remove(&key).await {
                    debug!("Could not remove unwatched room {code}: {e}");
                }
                return Err(SessionError::RoomCreationFailed);
            }
        };

        self.activate(Seat::new(code.clone(), Role::Host), subscription, now_ms);
        info!("Room {code} created");
        Ok(code)
    }

    /// Take the guest seat of an existing room
    pub async fn join_room(&mut self, code: RoomCode, now_ms: u64) -> Result<(), SessionError> {
        let key = code.key();
        let record = match self.store.get(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!("Room {code} not found");
                return Err(SessionError::RoomNotFound);
            }
            Err(e) => {
                warn!("Failed to read room {code}: {e}");
                return Err(SessionError::ConnectionLost);
            }
        };
        if record.has_guest() || record.is_playing() {
            return Err(SessionError::RoomFull);
        }
        if record.is_game_over() {
            return Err(SessionError::GameAlreadyEnded);
        }

        if let Err(e) = self.store.update(&key, RoomPatch::join_guest()).await {
            warn!("Failed to join room {code}: {e}");
            return Err(SessionError::ConnectionLost);
        }
        if let Err(e) = self
            .store
            .on_disconnect(&key, DisconnectAction::ClearGuest)
            .await
        {
            warn!("Could not register disconnect cleanup for room {code}: {e}");
        }
        let subscription = match self.store.subscribe(&key) {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!("Failed to watch room {code}: {e}");
                self.abandon_join(&code);
                return Err(SessionError::ConnectionLost);
            }
        };

        self.activate(Seat::new(code.clone(), Role::Guest), subscription, now_ms);
        info!("Joined room {code}");
        Ok(())
    }

    /// Undo whatever part of a join may have landed, without waiting
    pub fn abandon_join(&self, code: &RoomCode) {
        let store = self.store.clone();
        let key = code.key();
        tokio::spawn(async move {
            if let Err(e) = store.update(&key, RoomPatch::clear_guest()).await {
                debug!("Could not clear guest seat on {key}: {e}");
            }
            if let Err(e) = store.cancel_on_disconnect(&key).await {
                debug!("Could not cancel disconnect actions on {key}: {e}");
            }
        });
    }

    fn activate(&mut self, seat: Seat, subscription: Subscription, now_ms: u64) {
        if self.seat.is_some() {
            self.cleanup_detached();
        }
        self.cleaning = Arc::new(AtomicBool::new(false));
        self.publisher = Some(Publisher::spawn(
            self.store.clone(),
            seat.code.key(),
            self.config.publish_interval,
        ));
        self.seat = Some(seat);
        self.subscription = Some(subscription);
        self.cleanup_due_ms = None;
        self.guest_joined = false;
        self.reset_seq = 0;
        self.last_publish_ms = None;
        self.last_lease_ms = now_ms;
        self.last_position_ms = now_ms;
        self.last_heartbeat_ms = now_ms;
        self.seen = Seen::default();
    }

    /// Drain pending snapshots into events. Also runs a deferred cleanup once it is due.
    pub fn poll(&mut self, playing: bool, now_ms: u64) -> Vec<NetEvent> {
        let mut out = Vec::new();
        if self.cleanup_due_ms.is_some_and(|due| now_ms >= due) {
            info!("Deferred room cleanup due");
            self.cleanup_detached();
        }
        let Some(role) = self.role() else {
            return out;
        };

        while self.is_active() {
            let Some(event) = self.subscription.as_mut().and_then(Subscription::try_next) else {
                break;
            };
            match event {
                RoomEvent::Snapshot(record) => match role {
                    Role::Host => self.on_host_snapshot(record, playing, now_ms, &mut out),
                    Role::Guest => self.on_guest_snapshot(record, playing, now_ms, &mut out),
                },
                RoomEvent::Failed(e) => {
                    warn!("Room feed failed: {e}");
                    out.push(NetEvent::Error(SessionError::ConnectionLost));
                    self.cleanup_detached();
                }
            }
        }
        out
    }

    fn on_host_snapshot(
        &mut self,
        record: Option<RoomRecord>,
        playing: bool,
        now_ms: u64,
        out: &mut Vec<NetEvent>,
    ) {
        let Some(record) = record else {
            warn!("Room disappeared under the host");
            out.push(NetEvent::Error(SessionError::ConnectionLost));
            self.cleanup_detached();
            return;
        };

        if !self.guest_joined {
            if record.has_guest() && record.status == Some(RoomStatus::Waiting) {
                self.guest_joined = true;
                // Liveness counts from the join, not from when the room opened
                self.last_position_ms = now_ms;
                self.last_heartbeat_ms = now_ms;
                info!("Guest joined");
                self.spawn_write(RoomPatch::status(RoomStatus::Playing));
                out.push(NetEvent::GuestJoined);
            }
            return;
        }
        if !playing {
            return;
        }

        if record.is_game_over() {
            if let Some(winner) = record.winner {
                out.push(NetEvent::GameOver(winner));
                self.schedule_cleanup(now_ms);
            }
            return;
        }
        if !record.has_guest() {
            warn!("Guest left mid-game");
            out.push(NetEvent::Error(SessionError::OpponentLeft));
            self.cleanup_detached();
            return;
        }

        if let Some(gy) = record.valid_guest_y() {
            out.push(NetEvent::OpponentPaddle(self.game.clamp_paddle_y(gy)));
            if self.seen.guest_y != Some(gy) {
                self.seen.guest_y = Some(gy);
                self.last_position_ms = now_ms;
            }
        }
        if let Some(beat) = record.guest_last_update {
            if self.seen.guest_beat != Some(beat) {
                self.seen.guest_beat = Some(beat);
                self.last_heartbeat_ms = now_ms;
            }
        }
    }

    fn on_guest_snapshot(
        &mut self,
        record: Option<RoomRecord>,
        playing: bool,
        now_ms: u64,
        out: &mut Vec<NetEvent>,
    ) {
        if !playing {
            return;
        }
        let Some(record) = record else {
            warn!("Room closed by the host");
            out.push(NetEvent::Error(SessionError::OpponentLeft));
            self.cleanup_detached();
            return;
        };

        if let Some(score) = record.score {
            if self.seen.score != Some(score) {
                self.seen.score = Some(score);
                out.push(NetEvent::Score(Score {
                    left: score.left,
                    right: score.right,
                }));
            }
        }
        if record.is_game_over() {
            if let Some(winner) = record.winner {
                out.push(NetEvent::GameOver(winner));
            }
            return;
        }

        let mut reset_applied = false;
        if let Some(reset) = record.valid_ball_reset() {
            if self.seen.reset_seq != Some(reset.seq) {
                self.seen.reset_seq = Some(reset.seq);
                reset_applied = true;
                out.push(NetEvent::BallReset(BallState::new(
                    reset.bx, reset.by, reset.bvx, reset.bvy,
                )));
            }
        }
        if let Some(hy) = record.valid_host_y() {
            out.push(NetEvent::OpponentPaddle(self.game.clamp_paddle_y(hy)));
        }
        if let Some(ball) = record.ball() {
            if self.seen.ball != Some(ball) {
                self.seen.ball = Some(ball);
                self.last_position_ms = now_ms;
                // The sync riding along with a new reset predates it
                if !reset_applied {
                    out.push(NetEvent::BallSync(BallState::new(
                        ball.x, ball.y, ball.vx, ball.vy,
                    )));
                }
            }
        }
        if let Some(beat) = record.host_heartbeat {
            if self.seen.host_beat != Some(beat) {
                self.seen.host_beat = Some(beat);
                self.last_heartbeat_ms = now_ms;
            }
        }
    }

    /// Queue this peer's half of the state, at most once per publish interval
    pub fn publish(
        &mut self,
        ball: &BallState,
        left_y: f32,
        right_y: f32,
        score: Score,
        now_ms: u64,
    ) {
        if !self.is_active() {
            return;
        }
        let interval_ms = self.config.publish_interval.as_millis() as u64;
        if self
            .last_publish_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < interval_ms)
        {
            return;
        }
        let (Some(role), Some(publisher)) = (self.role(), self.publisher.as_ref()) else {
            return;
        };

        let patch = match role {
            Role::Host => RoomPatch::host_sync(
                BallWire {
                    x: ball.pos.x.round(),
                    y: ball.pos.y.round(),
                    vx: ball.vel.x.round(),
                    vy: ball.vel.y.round(),
                },
                left_y.round(),
                ScoreWire {
                    left: score.left,
                    right: score.right,
                },
                now_ms,
            ),
            Role::Guest => RoomPatch::guest_sync(right_y.round(), now_ms),
        };
        publisher.offer(patch);
        self.last_publish_ms = Some(now_ms);
    }

    /// Host heartbeat while the room waits for a guest, so the lease does not lapse
    pub fn keep_alive(&mut self, now_ms: u64) {
        if self.role() != Some(Role::Host) || self.guest_joined || !self.is_active() {
            return;
        }
        if now_ms.saturating_sub(self.last_lease_ms) < self.config.lease_refresh_ms {
            return;
        }
        if let Some(publisher) = &self.publisher {
            publisher.offer(RoomPatch::host_heartbeat(now_ms));
            self.last_lease_ms = now_ms;
        }
    }

    /// Host: force the guest's ball to a fresh serve
    pub fn broadcast_ball_reset(&mut self, ball: &BallState) {
        if self.role() != Some(Role::Host) || !self.is_active() {
            return;
        }
        self.reset_seq += 1;
        self.spawn_write(RoomPatch::ball_reset(BallReset {
            bx: ball.pos.x,
            by: ball.pos.y,
            bvx: ball.vel.x,
            bvy: ball.vel.y,
            seq: self.reset_seq,
        }));
    }

    /// Host: publish the result together with the final score
    pub fn broadcast_game_over(&mut self, winner: Winner, score: Score) {
        if self.role() != Some(Role::Host) || !self.is_active() {
            return;
        }
        info!(
            "Broadcasting game over at {}-{}, {winner:?} wins",
            score.left, score.right
        );
        let mut patch = RoomPatch::game_over(winner);
        patch.score = Change::Set(ScoreWire {
            left: score.left,
            right: score.right,
        });
        self.spawn_write(patch);
    }

    fn spawn_write(&self, patch: RoomPatch) {
        let Some(seat) = &self.seat else {
            return;
        };
        let store = self.store.clone();
        let key = seat.code.key();
        tokio::spawn(async move {
            if let Err(e) = store.update(&key, patch).await {
                warn!("Write to {key} failed: {e}");
            }
        });
    }

    /// Either liveness signal arrived within the threshold
    pub fn is_connected(&self, now_ms: u64) -> bool {
        let threshold = self.config.liveness_threshold_ms;
        now_ms.saturating_sub(self.last_position_ms) < threshold
            || now_ms.saturating_sub(self.last_heartbeat_ms) < threshold
    }

    /// Arrange for [`poll`](Self::poll) to clean up once the cleanup delay has passed
    pub fn schedule_cleanup(&mut self, now_ms: u64) {
        if self.cleanup_due_ms.is_none() && self.seat.is_some() {
            self.cleanup_due_ms = Some(now_ms + self.config.cleanup_delay_ms);
            debug!("Room cleanup scheduled in {} ms", self.config.cleanup_delay_ms);
        }
    }

    /// Leave the room and wait for the store to confirm. Safe to call repeatedly.
    pub async fn cleanup(&mut self) {
        if let Some(job) = self.begin_cleanup() {
            job.run().await;
        }
    }

    /// Leave the room without waiting
    pub fn cleanup_detached(&mut self) {
        if let Some(job) = self.begin_cleanup() {
            tokio::spawn(job.run());
        }
    }

    fn begin_cleanup(&mut self) -> Option<RemoteCleanup<S>> {
        if self.cleaning.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.cleanup_due_ms = None;
        self.publisher = None;
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
        }

        match self.seat.take() {
            Some(seat) => Some(RemoteCleanup {
                store: self.store.clone(),
                seat,
                in_progress: Arc::clone(&self.cleaning),
            }),
            None => {
                self.cleaning.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    /// Last-chance cleanup when the process goes away. Returns whether a beacon was queued.
    pub fn beacon_cleanup(&self, beacon: &impl Beacon) -> bool {
        let Some(seat) = &self.seat else {
            return false;
        };
        let url = beacon_url(&self.config.store_url, seat.role, &seat.code);
        debug!("Sending unload beacon to {url}");
        beacon.send(&url, BEACON_PAYLOAD)
    }
}
