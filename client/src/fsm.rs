//! Game State Machine
//!
//! Screen-level flow shared by AI and online play.

/// Game states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmState {
    Idle,
    Menu,
    AiPlaying,
    Lobby,
    HostingWait,
    GuestConnecting,
    OnlinePlaying,
    GameOver,
}

/// Actions that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    Boot,
    StartAi,
    OpenLobby,
    Back,
    Host,
    Join,
    Cancel,
    GuestJoined,
    Connected,
    ConnectionFailed,
    GameOver,
    NetworkError,
    Exit,
}

/// Result of a state transition
#[derive(Debug, Clone)]
pub struct TransitionResult {
    success: bool,
    from_state: FsmState,
    to_state: FsmState,
    action: GameAction,
}

impl TransitionResult {
    pub fn success(&self) -> bool {
        self.success
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn from_state(&self) -> FsmState {
        self.from_state
    }

    pub fn to_state(&self) -> FsmState {
        self.to_state
    }

    pub fn action(&self) -> GameAction {
        self.action
    }
}

/// Game Finite State Machine
#[derive(Debug)]
pub struct GameFsm {
    state: FsmState,
}

impl GameFsm {
    pub fn new() -> Self {
        Self {
            state: FsmState::Idle,
        }
    }

    /// Get current state
    pub fn state(&self) -> FsmState {
        self.state
    }

    /// Check if a transition is valid
    pub fn can_transition(&self, action: GameAction) -> bool {
        self.get_next_state(action).is_some()
    }

    /// Attempt a transition
    pub fn transition(&mut self, action: GameAction) -> TransitionResult {
        let from_state = self.state;

        if let Some(next_state) = self.get_next_state(action) {
            self.state = next_state;
            log::debug!("FSM {from_state:?} --{action:?}--> {next_state:?}");
            TransitionResult {
                success: true,
                from_state,
                to_state: next_state,
                action,
            }
        } else {
            TransitionResult {
                success: false,
                from_state,
                to_state: from_state,
                action,
            }
        }
    }

    /// Get next state for a given action (if valid)
    fn get_next_state(&self, action: GameAction) -> Option<FsmState> {
        match (self.state, action) {
            // From Idle
            (FsmState::Idle, GameAction::Boot) => Some(FsmState::Menu),

            // From Menu
            (FsmState::Menu, GameAction::StartAi) => Some(FsmState::AiPlaying),
            (FsmState::Menu, GameAction::OpenLobby) => Some(FsmState::Lobby),

            // From Lobby
            (FsmState::Lobby, GameAction::Back) => Some(FsmState::Menu),
            (FsmState::Lobby, GameAction::Host) => Some(FsmState::HostingWait),
            (FsmState::Lobby, GameAction::Join) => Some(FsmState::GuestConnecting),

            // From HostingWait
            (FsmState::HostingWait, GameAction::GuestJoined) => Some(FsmState::OnlinePlaying),
            (FsmState::HostingWait, GameAction::Cancel) => Some(FsmState::Lobby),
            (FsmState::HostingWait, GameAction::NetworkError) => Some(FsmState::Lobby),

            // From GuestConnecting
            (FsmState::GuestConnecting, GameAction::Connected) => Some(FsmState::OnlinePlaying),
            (FsmState::GuestConnecting, GameAction::ConnectionFailed) => Some(FsmState::Lobby),

            // From AiPlaying
            (FsmState::AiPlaying, GameAction::GameOver) => Some(FsmState::GameOver),
            (FsmState::AiPlaying, GameAction::Exit) => Some(FsmState::Idle),

            // From OnlinePlaying
            (FsmState::OnlinePlaying, GameAction::GameOver) => Some(FsmState::GameOver),
            (FsmState::OnlinePlaying, GameAction::NetworkError) => Some(FsmState::GameOver),
            (FsmState::OnlinePlaying, GameAction::Exit) => Some(FsmState::Idle),

            // From GameOver
            (FsmState::GameOver, GameAction::Exit) => Some(FsmState::Idle),

            // Invalid transition
            _ => None,
        }
    }

    /// Reset to Idle state
    pub fn reset(&mut self) {
        self.state = FsmState::Idle;
    }

    /// Check if currently in a playing state
    pub fn is_playing(&self) -> bool {
        matches!(self.state, FsmState::AiPlaying | FsmState::OnlinePlaying)
    }

    /// Check if in a multiplayer state
    pub fn is_multiplayer(&self) -> bool {
        matches!(
            self.state,
            FsmState::HostingWait | FsmState::GuestConnecting | FsmState::OnlinePlaying
        )
    }

    /// Check if in game over state
    pub fn is_game_over(&self) -> bool {
        self.state == FsmState::GameOver
    }
}

impl Default for GameFsm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_fsm(actions: &[GameAction]) -> GameFsm {
        let mut fsm = GameFsm::new();
        for action in actions {
            assert!(fsm.transition(*action).success(), "{action:?} should apply");
        }
        fsm
    }

    #[test]
    fn test_initial_state() {
        let fsm = GameFsm::new();
        assert_eq!(fsm.state(), FsmState::Idle);
    }

    #[test]
    fn test_valid_transition() {
        let mut fsm = GameFsm::new();
        let result = fsm.transition(GameAction::Boot);
        assert!(result.success());
        assert_eq!(result.from_state(), FsmState::Idle);
        assert_eq!(result.to_state(), FsmState::Menu);
        assert_eq!(fsm.state(), FsmState::Menu);
    }

    #[test]
    fn test_invalid_transition() {
        let mut fsm = GameFsm::new();
        let result = fsm.transition(GameAction::GameOver);
        assert!(!result.success());
        assert_eq!(result.action(), GameAction::GameOver);
        assert_eq!(fsm.state(), FsmState::Idle);
    }

    #[test]
    fn test_ai_game_flow() {
        let mut fsm = setup_fsm(&[GameAction::Boot, GameAction::StartAi]);
        assert!(fsm.is_playing());
        assert!(!fsm.is_multiplayer());

        fsm.transition(GameAction::GameOver);
        assert!(fsm.is_game_over());
        assert!(!fsm.transition(GameAction::GameOver).success(), "Game over happens once");

        fsm.transition(GameAction::Exit);
        assert_eq!(fsm.state(), FsmState::Idle);
    }

    #[test]
    fn test_host_flow() {
        let mut fsm = setup_fsm(&[GameAction::Boot, GameAction::OpenLobby, GameAction::Host]);
        assert_eq!(fsm.state(), FsmState::HostingWait);
        assert!(fsm.is_multiplayer());

        fsm.transition(GameAction::GuestJoined);
        assert_eq!(fsm.state(), FsmState::OnlinePlaying);
        fsm.transition(GameAction::NetworkError);
        assert_eq!(fsm.state(), FsmState::GameOver);
    }

    #[test]
    fn test_guest_flow() {
        let mut fsm = setup_fsm(&[GameAction::Boot, GameAction::OpenLobby, GameAction::Join]);
        assert_eq!(fsm.state(), FsmState::GuestConnecting);

        fsm.transition(GameAction::ConnectionFailed);
        assert_eq!(fsm.state(), FsmState::Lobby, "Failed join returns to the lobby");

        fsm.transition(GameAction::Join);
        fsm.transition(GameAction::Connected);
        assert!(fsm.is_playing());
    }

    #[test]
    fn test_cancel_hosting() {
        let mut fsm = setup_fsm(&[GameAction::Boot, GameAction::OpenLobby, GameAction::Host]);
        assert!(!fsm.can_transition(GameAction::Exit));
        fsm.transition(GameAction::Cancel);
        assert_eq!(fsm.state(), FsmState::Lobby);
        fsm.transition(GameAction::Back);
        assert_eq!(fsm.state(), FsmState::Menu);
    }

    #[test]
    fn test_menu_rejects_online_actions() {
        let fsm = setup_fsm(&[GameAction::Boot]);
        assert!(!fsm.can_transition(GameAction::Host));
        assert!(!fsm.can_transition(GameAction::Join));
        assert!(!fsm.can_transition(GameAction::GuestJoined));
    }

    #[test]
    fn test_reset() {
        let mut fsm = setup_fsm(&[GameAction::Boot, GameAction::StartAi]);
        fsm.reset();
        assert_eq!(fsm.state(), FsmState::Idle);
    }
}
