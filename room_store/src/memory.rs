use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use proto::{parse_beacon_url, Change, Role, RoomPatch, RoomRecord, BEACON_PAYLOAD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{Beacon, DisconnectAction, RoomEvent, SharedStore, StoreError, Subscription};

/// Rooms (or guest seats) idle for longer than this are expired by housekeeping
pub const LEASE_TTL: Duration = Duration::from_secs(10);
/// How often the housekeeper looks for expired leases
pub const HOUSEKEEPING_EVERY: Duration = Duration::from_secs(5);

/// Simulated link between a client and the store
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetProfile {
    /// One-way delay applied to every request and every notification
    pub latency: Duration,
    /// Extra random delay in `[0, jitter)`
    pub jitter: Duration,
    /// Probability that a best-effort update is lost
    pub loss: f64,
}

impl NetProfile {
    pub fn new(latency: Duration, jitter: Duration, loss: f64) -> Self {
        Self {
            latency,
            jitter,
            loss: loss.clamp(0.0, 1.0),
        }
    }
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: u64,
    pub sets: u64,
    pub updates: u64,
    pub dropped: u64,
    pub removes: u64,
    pub notifications: u64,
    pub disconnects: u64,
    pub beacons: u64,
    pub expired: u64,
}

struct Room {
    record: RoomRecord,
    touched: Instant,
    guest_touched: Option<Instant>,
}

struct Subscriber {
    id: u64,
    client: u64,
    key: String,
    tx: mpsc::UnboundedSender<(Instant, RoomEvent)>,
    last_at: Instant,
}

struct Hook {
    client: u64,
    key: String,
    action: DisconnectAction,
}

struct Inner {
    rooms: HashMap<String, Room>,
    subscribers: Vec<Subscriber>,
    hooks: Vec<Hook>,
    disconnected: HashSet<u64>,
    next_id: u64,
    available: bool,
    profile: NetProfile,
    rng: StdRng,
    stats: StoreStats,
}

fn one_way(profile: &NetProfile, rng: &mut StdRng) -> Duration {
    if profile.jitter.is_zero() {
        profile.latency
    } else {
        profile.latency + profile.jitter.mul_f64(rng.gen::<f64>())
    }
}

impl Inner {
    fn check(&self, client: u64) -> Result<(), StoreError> {
        if self.disconnected.contains(&client) {
            return Err(StoreError::Disconnected);
        }
        if !self.available {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn delay(&mut self) -> Duration {
        one_way(&self.profile, &mut self.rng)
    }

    /// Queue `event` for every subscriber of `key`, keeping each feed in order
    fn emit(&mut self, key: &str, event: RoomEvent) -> usize {
        let Inner {
            subscribers,
            profile,
            rng,
            stats,
            ..
        } = self;
        let now = Instant::now();
        let mut sent = 0;
        for sub in subscribers.iter_mut().filter(|s| s.key == key) {
            let at = (now + one_way(profile, rng)).max(sub.last_at);
            sub.last_at = at;
            if sub.tx.send((at, event.clone())).is_ok() {
                stats.notifications += 1;
                sent += 1;
            }
        }
        sent
    }

    fn notify(&mut self, key: &str) {
        let snapshot = self.rooms.get(key).map(|room| room.record.clone());
        self.emit(key, RoomEvent::Snapshot(snapshot));
    }

    fn put(&mut self, key: &str, record: RoomRecord) {
        let now = Instant::now();
        let guest_touched = record.has_guest().then_some(now);
        self.rooms.insert(
            key.to_string(),
            Room {
                record,
                touched: now,
                guest_touched,
            },
        );
        self.notify(key);
    }

    /// Last-write-wins merge. Writing to a missing key creates it, so a sync write that
    /// lands after the room was removed leaves a partial record until its lease expires.
    fn merge(&mut self, key: &str, patch: &RoomPatch) {
        let now = Instant::now();
        let room = self.rooms.entry(key.to_string()).or_insert_with(|| Room {
            record: RoomRecord::default(),
            touched: now,
            guest_touched: None,
        });
        patch.apply(&mut room.record);
        room.touched = now;
        if patch.guest_present == Change::Set(true) || patch.guest_y != Change::Keep {
            room.guest_touched = Some(now);
        }
        if room.record == RoomRecord::default() {
            self.rooms.remove(key);
        }
        self.notify(key);
    }

    fn delete(&mut self, key: &str) -> bool {
        let existed = self.rooms.remove(key).is_some();
        if existed {
            self.notify(key);
        }
        existed
    }

    fn run_action(&mut self, key: &str, action: DisconnectAction) {
        match action {
            DisconnectAction::RemoveRoom => {
                self.delete(key);
            }
            DisconnectAction::ClearGuest => {
                if self.rooms.contains_key(key) {
                    self.merge(key, &RoomPatch::clear_guest());
                }
            }
        }
    }
}

/// In-process shared store with a simulated network in front of it.
///
/// Each participant talks to it through its own [`MemoryClient`] so that an abrupt
/// disconnect only fires that participant's cleanup.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(NetProfile::default())
    }
}

impl MemoryStore {
    pub fn new(profile: NetProfile) -> Self {
        Self::with_seed(profile, 0x5eed)
    }

    pub fn with_seed(profile: NetProfile, seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                rooms: HashMap::new(),
                subscribers: Vec::new(),
                hooks: Vec::new(),
                disconnected: HashSet::new(),
                next_id: 1,
                available: true,
                profile,
                rng: StdRng::seed_from_u64(seed),
                stats: StoreStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn latency(&self) {
        let delay = self.lock().delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Open a new client session
    pub fn connect(&self) -> MemoryClient {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        debug!("Client {id} connected");
        MemoryClient {
            store: self.clone(),
            id,
        }
    }

    /// Drop a client abruptly: close its feeds and run its disconnect actions.
    ///
    /// Returns how many actions ran; a second call for the same client does nothing.
    pub fn disconnect(&self, client: u64) -> usize {
        let mut inner = self.lock();
        if !inner.disconnected.insert(client) {
            return 0;
        }
        inner.stats.disconnects += 1;
        inner.subscribers.retain(|s| s.client != client);

        let (mine, rest): (Vec<Hook>, Vec<Hook>) = std::mem::take(&mut inner.hooks)
            .into_iter()
            .partition(|hook| hook.client == client);
        inner.hooks = rest;

        for hook in &mine {
            info!(
                "Client {client} dropped, running {:?} on {}",
                hook.action, hook.key
            );
            inner.run_action(&hook.key, hook.action);
        }
        mine.len()
    }

    pub fn set_profile(&self, profile: NetProfile) {
        self.lock().profile = profile;
    }

    /// Take the backend offline; every client call fails with `Unavailable` until restored
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Current record, bypassing the simulated network
    pub fn peek(&self, key: &str) -> Option<RoomRecord> {
        self.lock().rooms.get(key).map(|room| room.record.clone())
    }

    /// Write a record directly, bypassing the simulated network
    pub fn insert(&self, key: &str, record: RoomRecord) {
        self.lock().put(key, record);
    }

    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|s| s.key == key)
            .count()
    }

    pub fn stats(&self) -> StoreStats {
        self.lock().stats
    }

    /// Push a failure to every feed on `key`
    pub fn fail_subscribers(&self, key: &str, reason: &str) -> usize {
        self.lock().emit(
            key,
            RoomEvent::Failed(StoreError::SubscriptionFailed(reason.to_string())),
        )
    }

    /// Expire leases not refreshed within `ttl`.
    ///
    /// A room nobody wrote to is removed; a guest seat whose owner stopped publishing is
    /// cleared. Returns the number of leases expired.
    pub fn sweep_stale(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();

        let stale_rooms: Vec<String> = inner
            .rooms
            .iter()
            .filter(|(_, room)| now.duration_since(room.touched) > ttl)
            .map(|(key, _)| key.clone())
            .collect();
        let stale_guests: Vec<String> = inner
            .rooms
            .iter()
            .filter(|(key, room)| {
                !stale_rooms.contains(*key)
                    && room.record.has_guest()
                    && room
                        .guest_touched
                        .map_or(true, |t| now.duration_since(t) > ttl)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale_rooms {
            info!("Lease expired, removing {key}");
            inner.delete(key);
        }
        for key in &stale_guests {
            info!("Guest lease expired on {key}");
            inner.merge(key, &RoomPatch::clear_guest());
        }

        let expired = stale_rooms.len() + stale_guests.len();
        inner.stats.expired += expired as u64;
        expired
    }

    /// Run [`MemoryStore::sweep_stale`] every `every` until the handle is aborted
    pub fn spawn_housekeeper(&self, every: Duration, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let expired = store.sweep_stale(ttl);
                if expired > 0 {
                    debug!("Housekeeping expired {expired} lease(s)");
                }
            }
        })
    }

    /// Beacon endpoint serving the REST paths under `base`
    pub fn beacon(&self, base: &str) -> MemoryBeacon {
        MemoryBeacon {
            store: self.clone(),
            base: base.to_string(),
        }
    }
}

/// One participant's connection to a [`MemoryStore`]
#[derive(Clone)]
pub struct MemoryClient {
    store: MemoryStore,
    id: u64,
}

impl MemoryClient {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Simulate the connection dropping without any cleanup
    pub fn disconnect(&self) -> usize {
        self.store.disconnect(self.id)
    }
}

impl SharedStore for MemoryClient {
    async fn get(&self, key: &str) -> Result<Option<RoomRecord>, StoreError> {
        self.store.latency().await;
        let mut inner = self.store.lock();
        inner.check(self.id)?;
        inner.stats.gets += 1;
        Ok(inner.rooms.get(key).map(|room| room.record.clone()))
    }

    async fn set(&self, key: &str, record: RoomRecord) -> Result<(), StoreError> {
        self.store.latency().await;
        let mut inner = self.store.lock();
        inner.check(self.id)?;
        inner.stats.sets += 1;
        inner.put(key, record);
        Ok(())
    }

    async fn update(&self, key: &str, patch: RoomPatch) -> Result<(), StoreError> {
        self.store.latency().await;
        let mut inner = self.store.lock();
        inner.check(self.id)?;
        inner.stats.updates += 1;
        inner.merge(key, &patch);
        Ok(())
    }

    async fn update_best_effort(&self, key: &str, patch: RoomPatch) -> Result<(), StoreError> {
        let lost = {
            let mut inner = self.store.lock();
            let loss = inner.profile.loss;
            let lost = loss > 0.0 && inner.rng.gen_bool(loss.min(1.0));
            if lost {
                inner.stats.dropped += 1;
            }
            lost
        };
        if lost {
            debug!("Dropped update to {key}");
            return Ok(());
        }
        self.update(key, patch).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.latency().await;
        let mut inner = self.store.lock();
        inner.check(self.id)?;
        inner.stats.removes += 1;
        inner.delete(key);
        Ok(())
    }

    async fn on_disconnect(&self, key: &str, action: DisconnectAction) -> Result<(), StoreError> {
        self.store.latency().await;
        let mut inner = self.store.lock();
        inner.check(self.id)?;
        inner.hooks.push(Hook {
            client: self.id,
            key: key.to_string(),
            action,
        });
        Ok(())
    }

    async fn cancel_on_disconnect(&self, key: &str) -> Result<(), StoreError> {
        self.store.latency().await;
        let mut inner = self.store.lock();
        inner.check(self.id)?;
        let client = self.id;
        inner
            .hooks
            .retain(|hook| !(hook.client == client && hook.key == key));
        Ok(())
    }

    fn subscribe(&self, key: &str) -> Result<Subscription, StoreError> {
        let mut inner = self.store.lock();
        inner.check(self.id)?;

        let id = inner.next_id;
        inner.next_id += 1;

        // Forwarder releases each event at its delivery instant
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<(Instant, RoomEvent)>();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some((at, event)) = raw_rx.recv().await {
                tokio::time::sleep_until(at).await;
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        let at = Instant::now() + inner.delay();
        let snapshot = inner.rooms.get(key).map(|room| room.record.clone());
        if raw_tx.send((at, RoomEvent::Snapshot(snapshot))).is_ok() {
            inner.stats.notifications += 1;
        }
        inner.subscribers.push(Subscriber {
            id,
            client: self.id,
            key: key.to_string(),
            tx: raw_tx,
            last_at: at,
        });
        debug!("Client {} subscribed to {key}", self.id);
        Ok(Subscription::new(id, key, rx))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let mut inner = self.store.lock();
        inner.subscribers.retain(|s| s.id != subscription.id());
        debug!("Client {} unsubscribed from {}", self.id, subscription.key());
    }
}

/// Receives unload beacons for a [`MemoryStore`]
#[derive(Clone)]
pub struct MemoryBeacon {
    store: MemoryStore,
    base: String,
}

impl Beacon for MemoryBeacon {
    fn send(&self, url: &str, payload: &str) -> bool {
        if payload.trim() != BEACON_PAYLOAD {
            warn!("Ignoring beacon to {url} with unexpected payload");
            return false;
        }
        let Some((code, role)) = parse_beacon_url(&self.base, url) else {
            warn!("Ignoring beacon to unknown target {url}");
            return false;
        };

        let mut inner = self.store.lock();
        if !inner.available {
            return false;
        }
        inner.stats.beacons += 1;
        let key = code.key();
        match role {
            Role::Host => inner.run_action(&key, DisconnectAction::RemoveRoom),
            Role::Guest => inner.run_action(&key, DisconnectAction::ClearGuest),
        }
        info!("Beacon from {role:?} applied to {key}");
        true
    }
}
