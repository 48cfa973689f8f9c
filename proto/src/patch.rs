use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::{BallReset, BallWire, RoomRecord, RoomStatus, ScoreWire, Winner};

/// What a patch does to one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for Change<T> {
    fn default() -> Self {
        Change::Keep
    }
}

impl<T: Clone> Change<T> {
    fn apply_to(&self, field: &mut Option<T>) {
        match self {
            Change::Keep => {}
            Change::Set(value) => *field = Some(value.clone()),
            Change::Clear => *field = None,
        }
    }

    fn is_keep(&self) -> bool {
        matches!(self, Change::Keep)
    }
}

impl<T: Serialize> Change<T> {
    fn write_json(&self, key: &str, out: &mut Map<String, Value>) -> Result<(), serde_json::Error> {
        match self {
            Change::Keep => {}
            Change::Set(value) => {
                out.insert(key.to_string(), serde_json::to_value(value)?);
            }
            Change::Clear => {
                out.insert(key.to_string(), Value::Null);
            }
        }
        Ok(())
    }
}

/// Partial update of a [`RoomRecord`].
///
/// Untouched fields keep whatever the other peer last wrote, which is what lets host and
/// guest share one record under last-write-wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPatch {
    pub host_present: Change<bool>,
    pub guest_present: Change<bool>,
    pub status: Change<RoomStatus>,
    pub bx: Change<f32>,
    pub by: Change<f32>,
    pub bvx: Change<f32>,
    pub bvy: Change<f32>,
    pub host_y: Change<f32>,
    pub score: Change<ScoreWire>,
    pub host_heartbeat: Change<u64>,
    pub guest_y: Change<f32>,
    pub guest_last_update: Change<u64>,
    pub ball_reset: Change<BallReset>,
    pub game_over: Change<bool>,
    pub winner: Change<Winner>,
}

impl RoomPatch {
    /// Combined host write: ball, host paddle, score and heartbeat
    pub fn host_sync(ball: BallWire, host_y: f32, score: ScoreWire, now_ms: u64) -> Self {
        Self {
            bx: Change::Set(ball.x),
            by: Change::Set(ball.y),
            bvx: Change::Set(ball.vx),
            bvy: Change::Set(ball.vy),
            host_y: Change::Set(host_y),
            score: Change::Set(score),
            host_heartbeat: Change::Set(now_ms),
            ..Self::default()
        }
    }

    pub fn guest_sync(guest_y: f32, now_ms: u64) -> Self {
        Self {
            guest_y: Change::Set(guest_y),
            guest_last_update: Change::Set(now_ms),
            ..Self::default()
        }
    }

    /// Host lease refresh while nobody has joined yet
    pub fn host_heartbeat(now_ms: u64) -> Self {
        Self {
            host_heartbeat: Change::Set(now_ms),
            ..Self::default()
        }
    }

    pub fn join_guest() -> Self {
        Self {
            guest_present: Change::Set(true),
            ..Self::default()
        }
    }

    pub fn clear_guest() -> Self {
        Self {
            guest_present: Change::Clear,
            ..Self::default()
        }
    }

    pub fn status(status: RoomStatus) -> Self {
        Self {
            status: Change::Set(status),
            ..Self::default()
        }
    }

    pub fn ball_reset(reset: BallReset) -> Self {
        Self {
            ball_reset: Change::Set(reset),
            ..Self::default()
        }
    }

    pub fn game_over(winner: Winner) -> Self {
        Self {
            game_over: Change::Set(true),
            winner: Change::Set(winner),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the patch to a record in place
    pub fn apply(&self, record: &mut RoomRecord) {
        self.host_present.apply_to(&mut record.host_present);
        self.guest_present.apply_to(&mut record.guest_present);
        self.status.apply_to(&mut record.status);
        self.bx.apply_to(&mut record.bx);
        self.by.apply_to(&mut record.by);
        self.bvx.apply_to(&mut record.bvx);
        self.bvy.apply_to(&mut record.bvy);
        self.host_y.apply_to(&mut record.host_y);
        self.score.apply_to(&mut record.score);
        self.host_heartbeat.apply_to(&mut record.host_heartbeat);
        self.guest_y.apply_to(&mut record.guest_y);
        self.guest_last_update.apply_to(&mut record.guest_last_update);
        self.ball_reset.apply_to(&mut record.ball_reset);
        self.game_over.apply_to(&mut record.game_over);
        self.winner.apply_to(&mut record.winner);
    }

    /// Render as a JSON update map. Cleared fields map to `null`.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        let mut out = Map::new();
        self.host_present.write_json("h", &mut out)?;
        self.guest_present.write_json("g", &mut out)?;
        self.status.write_json("status", &mut out)?;
        self.bx.write_json("bx", &mut out)?;
        self.by.write_json("by", &mut out)?;
        self.bvx.write_json("bvx", &mut out)?;
        self.bvy.write_json("bvy", &mut out)?;
        self.host_y.write_json("hy", &mut out)?;
        self.score.write_json("sc", &mut out)?;
        self.host_heartbeat.write_json("hostHeartbeat", &mut out)?;
        self.guest_y.write_json("gy", &mut out)?;
        self.guest_last_update.write_json("gLastUpdate", &mut out)?;
        self.ball_reset.write_json("ballReset", &mut out)?;
        self.game_over.write_json("gameOver", &mut out)?;
        self.winner.write_json("winner", &mut out)?;
        Ok(Value::Object(out))
    }

    /// Number of fields this patch touches
    pub fn len(&self) -> usize {
        [
            self.host_present.is_keep(),
            self.guest_present.is_keep(),
            self.status.is_keep(),
            self.bx.is_keep(),
            self.by.is_keep(),
            self.bvx.is_keep(),
            self.bvy.is_keep(),
            self.host_y.is_keep(),
            self.score.is_keep(),
            self.host_heartbeat.is_keep(),
            self.guest_y.is_keep(),
            self.guest_last_update.is_keep(),
            self.ball_reset.is_keep(),
            self.game_over.is_keep(),
            self.winner.is_keep(),
        ]
        .iter()
        .filter(|keep| !**keep)
        .count()
    }
}
