//! Presentation boundary
//!
//! The session never draws or touches widgets. It queues [`UiEvent`]s for whatever presenter
//! is attached and hands out a read-only [`FrameView`] for rendering.

use game_core::{Score, TrailSegment};
use glam::Vec2;
use proto::RoomCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Lobby,
    /// Host / join buttons inside the lobby
    LobbyMain,
    /// Room code display while the host waits
    LobbyWait,
    Hud,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Hidden,
    Connected,
    Reconnecting,
}

impl ConnectionStatus {
    /// Status indicator text; only online play shows one
    pub fn label(self) -> Option<&'static str> {
        match self {
            ConnectionStatus::Hidden => None,
            ConnectionStatus::Connected => Some("CONNECTED"),
            ConnectionStatus::Reconnecting => Some("RECONNECTING..."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Show(Screen),
    Hide(Screen),
    Score { left: u8, right: u8 },
    Connection(ConnectionStatus),
    /// Transient error message
    Error(String),
    JoinFeedback(String),
    RoomCode(RoomCode),
    Result(String),
    ControlsEnabled(bool),
}

impl UiEvent {
    pub fn score(score: Score) -> Self {
        UiEvent::Score {
            left: score.left,
            right: score.right,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub ball: Vec2,
    pub trail: Option<TrailSegment>,
    pub left_y: f32,
    pub right_y: f32,
    pub score: Score,
    pub playing: bool,
}
