use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Which participant a peer plays as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns the record and the authoritative ball and score; plays the left paddle
    Host,
    /// Plays the right paddle
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Left,
    Right,
}

impl Winner {
    /// Result line shown on the game over screen
    pub fn banner(self) -> &'static str {
        match self {
            Winner::Left => "PLAYER 1 WINS!",
            Winner::Right => "PLAYER 2 WINS!",
        }
    }
}

/// Score pair as published by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWire {
    #[serde(rename = "L")]
    pub left: u8,
    #[serde(rename = "R")]
    pub right: u8,
}

/// Forced ball state the host broadcasts after a serve.
///
/// `seq` increases with every broadcast so a guest applies each reset once even though the
/// field stays in the record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallReset {
    pub bx: f32,
    pub by: f32,
    pub bvx: f32,
    pub bvy: f32,
    pub seq: u32,
}

impl BallReset {
    pub fn is_valid(&self) -> bool {
        [self.bx, self.by, self.bvx, self.bvy]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Ball position and velocity fields of a host sync
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallWire {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Room record stored under `rooms/<code>`.
///
/// All fields are optional; an absent field means nobody has written it yet or it was cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomRecord {
    #[serde(rename = "h", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub host_present: Option<bool>,
    #[serde(rename = "g", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub guest_present: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    #[serde(
        rename = "created",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<u64>,

    // Host sync
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bx: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub by: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bvx: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bvy: Option<f32>,
    #[serde(rename = "hy", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub host_y: Option<f32>,
    #[serde(rename = "sc", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreWire>,
    #[serde(
        rename = "hostHeartbeat",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_heartbeat: Option<u64>,

    // Guest sync
    #[serde(rename = "gy", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub guest_y: Option<f32>,
    #[serde(
        rename = "gLastUpdate",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub guest_last_update: Option<u64>,

    // Events
    #[serde(
        rename = "ballReset",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub ball_reset: Option<BallReset>,
    #[serde(
        rename = "gameOver",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub game_over: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
}

/// Field reader that turns a value of the wrong shape into an absent field
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

impl RoomRecord {
    /// Initial record written by a host that just opened a room
    pub fn waiting(created_at: u64) -> Self {
        Self {
            host_present: Some(true),
            status: Some(RoomStatus::Waiting),
            created_at: Some(created_at),
            ..Self::default()
        }
    }

    pub fn has_guest(&self) -> bool {
        self.guest_present == Some(true)
    }

    pub fn is_playing(&self) -> bool {
        self.status == Some(RoomStatus::Playing)
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over == Some(true)
    }

    /// A joiner can take the guest seat
    pub fn is_open(&self) -> bool {
        !self.has_guest() && !self.is_playing()
    }

    /// Ball fields, only when all four are present and finite
    pub fn ball(&self) -> Option<BallWire> {
        let ball = BallWire {
            x: self.bx?,
            y: self.by?,
            vx: self.bvx?,
            vy: self.bvy?,
        };
        [ball.x, ball.y, ball.vx, ball.vy]
            .iter()
            .all(|v| v.is_finite())
            .then_some(ball)
    }

    pub fn valid_host_y(&self) -> Option<f32> {
        self.host_y.filter(|y| y.is_finite())
    }

    pub fn valid_guest_y(&self) -> Option<f32> {
        self.guest_y.filter(|y| y.is_finite())
    }

    pub fn valid_ball_reset(&self) -> Option<BallReset> {
        self.ball_reset.filter(BallReset::is_valid)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
