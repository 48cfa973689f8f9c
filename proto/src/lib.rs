//! Shared room record for Pong
//!
//! Everything two peers exchange lives in one JSON record under `rooms/<code>`. Each peer
//! writes partial updates ([`RoomPatch`]) and reads the whole record back on every change.

mod beacon;
mod code;
mod patch;
mod record;

pub use beacon::*;
pub use code::*;
pub use patch::*;
pub use record::*;
