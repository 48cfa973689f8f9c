//! Guest-side ball reconciliation
//!
//! The guest keeps simulating its own ball and blends toward the host's reports by how far
//! apart the two are, so jitter never shows up as teleporting.

use game_core::BallState;
use glam::Vec2;

/// Below this Manhattan distance the local position is kept
pub const ACCEPT_BELOW: f32 = 30.0;
/// Below this distance the ball moves 20% of the way
pub const NUDGE_BELOW: f32 = 80.0;
/// Below this distance the ball moves halfway; at or above it snaps
pub const BLEND_BELOW: f32 = 150.0;

pub fn manhattan(a: Vec2, b: Vec2) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Fraction of the gap to close for a given divergence
pub fn correction_factor(distance: f32) -> f32 {
    if distance < ACCEPT_BELOW {
        0.0
    } else if distance < NUDGE_BELOW {
        0.2
    } else if distance < BLEND_BELOW {
        0.5
    } else {
        1.0
    }
}

/// Blend the local ball toward the host's. Velocity always comes from the host.
pub fn reconcile(local: BallState, remote: BallState) -> BallState {
    let factor = correction_factor(manhattan(local.pos, remote.pos));
    let pos = if factor >= 1.0 {
        remote.pos
    } else {
        local.pos + (remote.pos - local.pos) * factor
    };
    BallState {
        pos,
        vel: remote.vel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_pair(dx: f32, dy: f32) -> (BallState, BallState) {
        let local = BallState::new(400.0, 300.0, 420.0, 90.0);
        let remote = BallState::new(400.0 + dx, 300.0 + dy, -430.0, -80.0);
        (local, remote)
    }

    #[test]
    fn test_small_divergence_keeps_position() {
        let (local, remote) = setup_pair(10.0, 19.0);
        let result = reconcile(local, remote);
        assert_eq!(result.pos, local.pos, "d=29 keeps local position");
        assert_eq!(result.vel, remote.vel, "Velocity always taken from host");
    }

    #[test]
    fn test_nudge_band() {
        let (local, remote) = setup_pair(30.0, 0.0);
        let result = reconcile(local, remote);
        assert!((result.pos.x - 406.0).abs() < 1e-4, "d=30 moves 20%");

        let (local, remote) = setup_pair(-40.0, 39.0);
        let result = reconcile(local, remote);
        assert!((result.pos - Vec2::new(392.0, 307.8)).length() < 1e-4);
    }

    #[test]
    fn test_half_band() {
        let (local, remote) = setup_pair(80.0, 0.0);
        let result = reconcile(local, remote);
        assert!((result.pos.x - 440.0).abs() < 1e-4, "d=80 moves halfway");

        let (local, remote) = setup_pair(0.0, -149.0);
        let result = reconcile(local, remote);
        assert!((result.pos.y - 225.5).abs() < 1e-4);
    }

    #[test]
    fn test_large_divergence_snaps() {
        let (local, remote) = setup_pair(100.0, 50.0);
        let result = reconcile(local, remote);
        assert_eq!(result.pos, remote.pos, "d=150 snaps exactly");
        assert_eq!(result.vel, remote.vel);
    }

    #[test]
    fn test_correction_factor_edges() {
        assert_eq!(correction_factor(0.0), 0.0);
        assert_eq!(correction_factor(29.99), 0.0);
        assert_eq!(correction_factor(30.0), 0.2);
        assert_eq!(correction_factor(79.99), 0.2);
        assert_eq!(correction_factor(80.0), 0.5);
        assert_eq!(correction_factor(149.99), 0.5);
        assert_eq!(correction_factor(150.0), 1.0);
    }
}
