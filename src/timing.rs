//! Round-timing statistics over a snapshot of challenge results.
//!
//! Everything here is a pure transform: sessions go in, sorted summaries come
//! out. Fetching and rendering live in [`crate::source`] and [`crate::report`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::PlayerSession;
use crate::util::{clamped_gap, max_or_zero, median};

/// Per-round breakdown inside a [`SessionSummary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDetail {
    pub round_number: usize,
    pub points: u32,
    pub start_time: i64,
    pub guess_duration_ms: u64,
    /// Gap since the previous round ended; `None` for the first round
    pub gap_before_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub player_name: String,
    pub first_round_start: i64,
    pub last_round_start: i64,
    pub last_round_end: i64,
    pub total_elapsed_ms: i64,
    pub rounds_played: usize,
    pub inter_round_gaps: Vec<u64>,
    pub median_gap_ms: f64,
    pub max_gap_ms: u64,
    pub last_round_guess_duration_ms: u64,
    pub total_points: u64,
    pub rounds: Vec<RoundDetail>,
}

/// What to do with a session that cannot be summarized
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvalidSessionPolicy {
    /// Abort the whole batch
    #[default]
    Fail,
    /// Log and drop the session, summarize the rest
    Skip,
}

impl SessionSummary {
    pub fn from_session(session: &PlayerSession) -> Result<Self> {
        let (first, last) = match (session.rounds.first(), session.rounds.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(Error::invalid_input(
                    &session.player_name,
                    "session has no rounds",
                ))
            }
        };

        let inter_round_gaps: Vec<u64> = session
            .rounds
            .windows(2)
            .map(|w| clamped_gap(w[0].start_time, w[1].start_time, w[0].guess_duration_ms))
            .collect();

        let rounds = session
            .rounds
            .iter()
            .enumerate()
            .map(|(i, r)| RoundDetail {
                round_number: i + 1,
                points: r.score,
                start_time: r.start_time,
                guess_duration_ms: r.guess_duration_ms,
                gap_before_ms: i.checked_sub(1).map(|prev| inter_round_gaps[prev]),
            })
            .collect();

        let last_round_end = last.end_time();

        Ok(Self {
            player_name: session.player_name.clone(),
            first_round_start: first.start_time,
            last_round_start: last.start_time,
            last_round_end,
            total_elapsed_ms: last_round_end.saturating_sub(first.start_time),
            rounds_played: session.rounds.len(),
            median_gap_ms: median(&inter_round_gaps),
            max_gap_ms: max_or_zero(&inter_round_gaps),
            last_round_guess_duration_ms: last.guess_duration_ms,
            total_points: session.rounds.iter().map(|r| u64::from(r.score)).sum(),
            inter_round_gaps,
            rounds,
        })
    }
}

/// Summarize every session, failing on the first invalid one
pub fn summarize(sessions: &[PlayerSession]) -> Result<Vec<SessionSummary>> {
    summarize_with(sessions, InvalidSessionPolicy::Fail)
}

/// Summarize every session and sort by first round start.
/// Sessions with equal starts keep their input order.
pub fn summarize_with(
    sessions: &[PlayerSession],
    policy: InvalidSessionPolicy,
) -> Result<Vec<SessionSummary>> {
    let mut summaries = Vec::with_capacity(sessions.len());

    for session in sessions {
        match SessionSummary::from_session(session) {
            Ok(summary) => summaries.push(summary),
            Err(err) if policy == InvalidSessionPolicy::Skip => {
                warn!(player = %session.player_name, %err, "skipping session");
            }
            Err(err) => return Err(err),
        }
    }

    summaries.sort_by_key(|s| s.first_round_start);
    debug!(
        sessions = sessions.len(),
        summarized = summaries.len(),
        "summarized challenge results"
    );

    Ok(summaries)
}
