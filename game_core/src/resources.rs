use crate::components::Side;

/// Time resource for tracking simulation time
#[derive(Debug, Clone, Copy, Default)]
pub struct Time {
    pub dt: f32,     // Delta time for this step, seconds
    pub now_ms: u64, // Wall clock of this step, milliseconds
}

impl Time {
    pub fn new(dt: f32, now_ms: u64) -> Self {
        Self { dt, now_ms }
    }
}

/// Game score tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub left: u8,
    pub right: u8,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, side: Side) {
        match side {
            Side::Left => self.left = self.left.saturating_add(1),
            Side::Right => self.right = self.right.saturating_add(1),
        }
    }

    pub fn get(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn has_winner(&self, win_score: u8) -> Option<Side> {
        if self.left >= win_score {
            Some(Side::Left)
        } else if self.right >= win_score {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Side ahead on points; ties go to the right
    pub fn leader(&self) -> Side {
        if self.left > self.right {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Random number generator
pub struct GameRng(pub rand::rngs::StdRng);

impl GameRng {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::from_entropy())
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

/// Events that occurred during this frame
#[derive(Debug, Clone, Default)]
pub struct Events {
    pub left_scored: bool,
    pub right_scored: bool,
    pub ball_hit_paddle: bool,
    pub ball_hit_wall: bool,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.left_scored = false;
        self.right_scored = false;
        self.ball_hit_paddle = false;
        self.ball_hit_wall = false;
    }

    pub fn record_goal(&mut self, scorer: Side) {
        match scorer {
            Side::Left => self.left_scored = true,
            Side::Right => self.right_scored = true,
        }
    }
}

/// Paddle targets waiting to be applied on the next step
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    pub targets: Vec<(Side, f32)>, // (side, desired paddle center y)
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    pub fn push_target(&mut self, side: Side, y: f32) {
        self.targets.push((side, y));
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, (Side, f32)> {
        self.targets.drain(..)
    }
}

/// Minimum spacing between two counted goals
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreDebounce {
    pub last_goal_ms: Option<u64>,
}

impl ScoreDebounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records the goal if enough time has passed since the last one
    pub fn try_accept(&mut self, now_ms: u64, window_ms: u64) -> bool {
        if let Some(last) = self.last_goal_ms {
            if now_ms.saturating_sub(last) < window_ms {
                return false;
            }
        }
        self.last_goal_ms = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_goal_ms = None;
    }
}
