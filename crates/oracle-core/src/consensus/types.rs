use serde::Serialize;
use std::fmt;

use super::quorum::QuorumDecision;
use crate::{errors::OracleError, state::CommitSummary};

/// Phases of one round.
///
/// `Idle -> LeaderRunning -> Validating -> {Committed | Rejected}`, with
/// `Failed` reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    LeaderRunning,
    Validating,
    Committed,
    Rejected,
    Failed,
}

impl RoundPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LeaderRunning => "leader_running",
            Self::Validating => "validating",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected | Self::Failed)
    }

    /// Terminal phase a round ends in when it returns `error`.
    #[must_use]
    pub fn for_error(error: &OracleError) -> Self {
        match error {
            OracleError::Rejected { .. } => Self::Rejected,
            _ => Self::Failed,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::LeaderRunning | Self::Failed) |
                (Self::LeaderRunning, Self::Validating | Self::Failed) |
                (Self::Validating, Self::Committed | Self::Rejected | Self::Failed)
        )
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report of a committed round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: u64,
    pub flavor: &'static str,
    pub phase: RoundPhase,
    pub decision: QuorumDecision,
    pub commit: CommitSummary,
    pub duration_ms: u64,
}
