use crate::fsm::{FsmState, GameAction};

/// Everything that can go wrong in a session. `Display` is the text shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to create room")]
    RoomCreationFailed,
    #[error("Enter valid 4-digit code")]
    InvalidCode,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Game already ended")]
    GameAlreadyEnded,
    #[error("Connection lost")]
    ConnectionLost,
    #[error("Opponent left")]
    OpponentLeft,
    #[error("Connection timeout")]
    JoinTimedOut,
    #[error("{action:?} is not allowed in {state:?}")]
    InvalidTransition { state: FsmState, action: GameAction },
}

impl SessionError {
    /// Errors that end a running match rather than just a lobby attempt
    pub fn is_network(&self) -> bool {
        matches!(self, SessionError::ConnectionLost | SessionError::OpponentLeft)
    }
}
