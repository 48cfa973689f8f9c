//! Match state owned by the session

use game_core::{Score, Side};
use proto::{Role, RoomCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    None,
    Ai,
    Online,
}

/// Role and room code, which only ever exist together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub code: RoomCode,
    pub role: Role,
}

impl Seat {
    pub fn new(code: RoomCode, role: Role) -> Self {
        Self { code, role }
    }

    /// Paddle this peer steers: the host plays left, the guest right
    pub fn local_side(&self) -> Side {
        match self.role {
            Role::Host => Side::Left,
            Role::Guest => Side::Right,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchState {
    pub mode: Mode,
    pub seat: Option<Seat>,
    pub score: Score,
    pub playing: bool,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_ai(&mut self) {
        self.mode = Mode::Ai;
        self.seat = None;
        self.score = Score::new();
        self.playing = true;
    }

    pub fn start_online(&mut self, seat: Seat) {
        self.mode = Mode::Online;
        self.seat = Some(seat);
        self.score = Score::new();
        self.playing = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn role(&self) -> Option<Role> {
        self.seat.as_ref().map(|seat| seat.role)
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.seat.as_ref().map(|seat| &seat.code)
    }

    /// Whether this peer decides goals: always in AI mode, only the host online
    pub fn is_authoritative(&self) -> bool {
        match self.mode {
            Mode::Ai => true,
            Mode::Online => self.role() == Some(Role::Host),
            Mode::None => false,
        }
    }

    /// Paddle driven by local input
    pub fn local_side(&self) -> Side {
        self.seat.as_ref().map_or(Side::Left, Seat::local_side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_seat(role: Role) -> Seat {
        Seat::new(RoomCode::parse("2468").unwrap(), role)
    }

    #[test]
    fn test_role_and_code_travel_together() {
        let mut state = MatchState::new();
        assert_eq!(state.role(), None);
        assert_eq!(state.room_code(), None);

        state.start_online(setup_seat(Role::Guest));
        assert_eq!(state.role(), Some(Role::Guest));
        assert_eq!(state.room_code().map(RoomCode::as_str), Some("2468"));

        state.reset();
        assert_eq!(state.role(), None);
        assert_eq!(state.room_code(), None);
        assert!(!state.playing);
    }

    #[test]
    fn test_authority() {
        let mut state = MatchState::new();
        assert!(!state.is_authoritative());

        state.start_ai();
        assert!(state.is_authoritative());
        assert_eq!(state.local_side(), Side::Left);

        state.start_online(setup_seat(Role::Host));
        assert!(state.is_authoritative());
        assert_eq!(state.local_side(), Side::Left);

        state.start_online(setup_seat(Role::Guest));
        assert!(!state.is_authoritative(), "Guest never decides goals");
        assert_eq!(state.local_side(), Side::Right);
    }

    #[test]
    fn test_start_resets_score() {
        let mut state = MatchState::new();
        state.start_ai();
        state.score.increment(Side::Left);
        state.start_ai();
        assert_eq!(state.score, Score::new());
    }
}
