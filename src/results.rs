//! Mapping of the highscores payload into [`PlayerSession`]s.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::{PlayerSession, RoundRecord};
use crate::timing::InvalidSessionPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Highscores {
    #[serde(default)]
    pub items: Vec<HighscoreItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighscoreItem {
    pub game: Game,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub player: Player,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub guesses: Vec<Guess>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// RFC 3339 string in the live API, occasionally a raw millisecond number
    pub start_time: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    /// Seconds spent guessing
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub round_score_in_points: Option<u32>,
}

pub fn parse_highscores(text: &str) -> Result<Highscores> {
    let parsed: Highscores = serde_json::from_str(text)?;
    debug!(items = parsed.items.len(), "parsed highscores payload");
    Ok(parsed)
}

impl Highscores {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One session per item, in payload order
    pub fn into_sessions(self) -> Result<Vec<PlayerSession>> {
        self.into_sessions_with(InvalidSessionPolicy::Fail)
    }

    /// Like [`Highscores::into_sessions`], but items that cannot be mapped
    /// are dropped with a warning under [`InvalidSessionPolicy::Skip`]
    pub fn into_sessions_with(self, policy: InvalidSessionPolicy) -> Result<Vec<PlayerSession>> {
        let mut sessions = Vec::with_capacity(self.items.len());
        for item in self.items {
            match item.into_session() {
                Ok(session) => sessions.push(session),
                Err(err) if policy == InvalidSessionPolicy::Skip => {
                    warn!(%err, "skipping result item");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(sessions)
    }
}

impl HighscoreItem {
    pub fn into_session(self) -> Result<PlayerSession> {
        let Game { player, rounds } = self.game;

        let records = rounds
            .iter()
            .enumerate()
            .map(|(i, round)| -> Result<RoundRecord> {
                let start_time = round
                    .start_time
                    .as_ref()
                    .and_then(timestamp_ms)
                    .ok_or_else(|| {
                        Error::invalid_input(
                            &player.nick,
                            format!("round {} has no usable startTime", i + 1),
                        )
                    })?;
                let guess = player.guesses.get(i);

                Ok(RoundRecord {
                    start_time,
                    guess_duration_ms: guess.and_then(|g| g.time).map_or(0, secs_to_ms),
                    score: guess.and_then(|g| g.round_score_in_points).unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PlayerSession::new(player.nick, records))
    }
}

/// Coerce a JSON timestamp to epoch milliseconds
pub fn timestamp_ms(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        _ => None,
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}
