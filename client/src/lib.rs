//! Player-side session for two-player pong over a shared store
//!
//! The host owns the ball and the score; the guest simulates locally and reconciles toward
//! what the host publishes. Both talk only through a [`room_store::SharedStore`].

pub mod clock;
pub mod error;
pub mod fsm;
pub mod network;
pub mod publisher;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod ui;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::SessionError;
pub use fsm::{FsmState, GameAction, GameFsm, TransitionResult};
pub use network::{NetConfig, NetEvent, NetworkSync};
pub use session::Session;
pub use state::{MatchState, Mode, Seat};
pub use ui::{ConnectionStatus, FrameView, Screen, UiEvent};
