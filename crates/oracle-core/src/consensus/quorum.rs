//! Vote tallying.
//!
//! Stateless: takes the votes collected from validator evaluations and
//! decides whether the leader's result is accepted.

use serde::Serialize;

use super::config::ConsensusConfig;

/// Outcome of counting validator votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuorumDecision {
    pub accepted: usize,
    pub total: usize,
    pub required: usize,
}

impl QuorumDecision {
    #[must_use]
    pub fn reached(&self) -> bool {
        self.total > 0 && self.accepted >= self.required
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.total - self.accepted
    }
}

/// Counts accepting votes against the configured threshold.
///
/// An empty vote list never reaches quorum.
#[must_use]
pub fn tally(votes: &[bool], config: &ConsensusConfig) -> QuorumDecision {
    let accepted = votes.iter().filter(|vote| **vote).count();
    QuorumDecision { accepted, total: votes.len(), required: config.required_accepts(votes.len()) }
}
