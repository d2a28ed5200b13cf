//! Consensus configuration types and defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a consensus round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Number of validator evaluations per round (default: 5)
    #[serde(default = "default_validators")]
    pub validators: usize,

    /// Fraction of validators that must accept (default: 1.0, unanimous).
    ///
    /// The required count is `ceil(threshold * validators)`, never below one.
    #[serde(default = "default_quorum_threshold")]
    pub quorum_threshold: f64,

    /// Upper bound on the leader procedure in seconds (default: 120)
    ///
    /// Must cover one call timeout per source the widest round may try.
    #[serde(default = "default_leader_timeout_seconds")]
    pub leader_timeout_seconds: u64,
}

fn default_validators() -> usize {
    5
}

fn default_quorum_threshold() -> f64 {
    1.0
}

fn default_leader_timeout_seconds() -> u64 {
    120
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            validators: default_validators(),
            quorum_threshold: default_quorum_threshold(),
            leader_timeout_seconds: default_leader_timeout_seconds(),
        }
    }
}

impl ConsensusConfig {
    #[must_use]
    pub fn leader_timeout(&self) -> Duration {
        Duration::from_secs(self.leader_timeout_seconds)
    }

    /// Accepting votes needed out of `total` evaluations.
    #[must_use]
    pub fn required_accepts(&self, total: usize) -> usize {
        required_for(total, self.quorum_threshold)
    }

    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.validators == 0 {
            return Err("consensus.validators must be at least 1".into());
        }
        if !(self.quorum_threshold > 0.0 && self.quorum_threshold <= 1.0) {
            return Err(format!(
                "consensus.quorum_threshold must be in (0, 1], got {}",
                self.quorum_threshold
            ));
        }
        if self.leader_timeout_seconds == 0 {
            return Err("consensus.leader_timeout_seconds must be positive".into());
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn required_for(total: usize, threshold: f64) -> usize {
    if total == 0 {
        return 1;
    }
    // 0.28 * 25 evaluates to 7.000000000000001; the epsilon keeps that at 7.
    let raw = (threshold * total as f64 - 1e-9).ceil();
    (raw.max(1.0) as usize).min(total)
}
