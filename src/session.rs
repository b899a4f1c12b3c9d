use serde::{Deserialize, Serialize};

/// One played round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Milliseconds since the unix epoch
    pub start_time: i64,
    pub guess_duration_ms: u64,
    pub score: u32,
}

impl RoundRecord {
    pub fn new(start_time: i64, guess_duration_ms: u64, score: u32) -> Self {
        Self {
            start_time,
            guess_duration_ms,
            score,
        }
    }

    pub fn end_time(&self) -> i64 {
        self.start_time
            .saturating_add(i64::try_from(self.guess_duration_ms).unwrap_or(i64::MAX))
    }
}

impl From<(i64, u64)> for RoundRecord {
    fn from(v: (i64, u64)) -> Self {
        RoundRecord::new(v.0, v.1, 0)
    }
}

/// One player's attempt at a challenge, rounds in play order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSession {
    pub player_name: String,
    pub rounds: Vec<RoundRecord>,
}

impl PlayerSession {
    pub fn new(player_name: impl Into<String>, rounds: Vec<RoundRecord>) -> Self {
        Self {
            player_name: player_name.into(),
            rounds,
        }
    }
}
