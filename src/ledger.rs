//! Score ledger
//!
//! One [`GameReport`] is handed to the ledger per game-over transition. The
//! core never waits on it. [`SessionLedger`] keeps the best runs of the
//! current session; on-chain submission lives outside this crate.

use serde::{Deserialize, Serialize};

use crate::game::BirdStats;

/// Maximum number of runs kept per session
pub const MAX_SESSION_RUNS: usize = 10;

/// Final numbers of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReport {
    pub score: u64,
    pub eth_collected: u32,
    /// Floored distance proxy
    pub distance: u32,
    /// Simulated milliseconds
    pub game_time_ms: f64,
    pub difficulty: f32,
    pub bird_stats: BirdStats,
}

/// One-shot consumer of game-over reports
pub trait ScoreLedger {
    fn submit(&mut self, report: &GameReport);
}

/// In-memory leaderboard for the current session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionLedger {
    pub entries: Vec<GameReport>,
    pub games_played: u32,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_SESSION_RUNS {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a report (sorted descending by score). Returns the rank achieved.
    pub fn record(&mut self, report: GameReport) -> Option<usize> {
        self.games_played += 1;
        let rank = self.potential_rank(report.score)?;
        self.entries.insert(rank - 1, report);
        self.entries.truncate(MAX_SESSION_RUNS);
        Some(rank)
    }

    pub fn best(&self) -> Option<&GameReport> {
        self.entries.first()
    }

    /// Total ETH collected across ranked runs
    pub fn total_eth(&self) -> u32 {
        self.entries.iter().map(|e| e.eth_collected).sum()
    }
}

impl ScoreLedger for SessionLedger {
    fn submit(&mut self, report: &GameReport) {
        match self.record(report.clone()) {
            Some(rank) => log::info!("Run ranked #{} this session (score {})", rank, report.score),
            None => log::debug!("Run with score {} did not rank", report.score),
        }
    }
}
