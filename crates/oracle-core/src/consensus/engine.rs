//! Round orchestration.
//!
//! [`ConsensusRunner`] drives one round through its phases: run the leader
//! once, evaluate the serialized result on every validator in parallel,
//! tally, and commit on quorum.

use parking_lot::RwLock;
use rayon::prelude::*;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{debug, info, warn};

use super::{
    config::ConsensusConfig,
    leader::{ConfigSnapshot, LeaderContext, LeaderExecutor, LeaderProcedure},
    quorum::{self, QuorumDecision},
    types::{RoundPhase, RoundReport},
    validator::ValidatorPredicate,
};
use crate::{
    errors::OracleError,
    metrics,
    source::Transport,
    state::{CommitSummary, PersistentState, StateCommitter},
};

pub struct ConsensusRunner {
    config: Arc<RwLock<ConsensusConfig>>,
    committer: StateCommitter,
    rounds: AtomicU64,
}

impl ConsensusRunner {
    #[must_use]
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            committer: StateCommitter,
            rounds: AtomicU64::new(0),
        }
    }

    /// Returns a copy of the current configuration.
    #[must_use]
    pub fn get_config(&self) -> ConsensusConfig {
        self.config.read().clone()
    }

    pub fn update_config(&self, config: ConsensusConfig) {
        *self.config.write() = config;
        info!("consensus configuration updated");
    }

    /// Number of rounds started by this runner.
    #[must_use]
    pub fn rounds_started(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    /// Runs one round to completion.
    ///
    /// The procedure runs exactly once. `validators` are evaluated in
    /// parallel over the same payload; a validator that panics votes to
    /// reject. State is written only after quorum and only if every field
    /// converts; rotation bookkeeping recorded by the leader survives any
    /// outcome.
    ///
    /// # Errors
    ///
    /// - Any leader error (the round ends `Failed`)
    /// - [`OracleError::Rejected`] when quorum is not reached
    /// - [`OracleError::Commit`] when a field fails to convert
    pub async fn run_round(
        &self,
        procedure: &dyn LeaderProcedure,
        validators: &[Arc<dyn ValidatorPredicate>],
        transport: &dyn Transport,
        state: &mut PersistentState,
    ) -> Result<RoundReport, OracleError> {
        let config = self.get_config();
        let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
        let flavor = procedure.flavor();
        let started = Instant::now();
        let mut tracker = PhaseTracker::new(round);

        let outcome = self
            .drive(&mut tracker, &config, procedure, validators, transport, state)
            .await;

        let duration = started.elapsed();
        match &outcome {
            Ok(_) => tracker.advance(RoundPhase::Committed),
            Err(error) => tracker.advance(RoundPhase::for_error(error)),
        }
        metrics::record_round(tracker.phase.as_str(), flavor, duration);

        let (decision, commit) = outcome.inspect_err(|error| {
            warn!(round, flavor, phase = %tracker.phase, error = %error, "round did not commit");
        })?;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = duration.as_millis() as u64;
        info!(round, flavor, price = commit.price, duration_ms, "round committed");
        Ok(RoundReport { round, flavor, phase: tracker.phase, decision, commit, duration_ms })
    }

    async fn drive(
        &self,
        tracker: &mut PhaseTracker,
        config: &ConsensusConfig,
        procedure: &dyn LeaderProcedure,
        validators: &[Arc<dyn ValidatorPredicate>],
        transport: &dyn Transport,
        state: &mut PersistentState,
    ) -> Result<(QuorumDecision, CommitSummary), OracleError> {
        if validators.is_empty() {
            return Err(OracleError::Configuration("no validators configured".into()));
        }

        tracker.advance(RoundPhase::LeaderRunning);
        let snapshot = ConfigSnapshot { proxy_url: state.proxy_url.clone() };
        let ctx = LeaderContext::new(transport, &mut state.rotation, &snapshot);
        let proposal = LeaderExecutor::new(config.leader_timeout()).run(procedure, ctx).await?;

        tracker.advance(RoundPhase::Validating);
        let votes = evaluate(validators, &proposal.payload);
        let decision = quorum::tally(&votes, config);
        metrics::record_votes(decision.accepted, decision.rejected());
        debug!(
            round = tracker.round,
            accepted = decision.accepted,
            total = decision.total,
            required = decision.required,
            "votes tallied"
        );

        if !decision.reached() {
            return Err(OracleError::Rejected {
                accepted: decision.accepted,
                total: decision.total,
                required: decision.required,
            });
        }

        let summary = self.committer.commit_payload(state, &proposal.payload)?;
        Ok((decision, summary))
    }
}

/// Evaluates every validator over the same bytes.
fn evaluate(validators: &[Arc<dyn ValidatorPredicate>], payload: &[u8]) -> Vec<bool> {
    validators
        .par_iter()
        .enumerate()
        .map(|(index, validator)| {
            catch_unwind(AssertUnwindSafe(|| validator.accept(payload))).unwrap_or_else(|_| {
                warn!(validator = index, "validator panicked, counting as reject");
                false
            })
        })
        .collect()
}

struct PhaseTracker {
    round: u64,
    phase: RoundPhase,
}

impl PhaseTracker {
    fn new(round: u64) -> Self {
        Self { round, phase: RoundPhase::Idle }
    }

    fn advance(&mut self, next: RoundPhase) {
        debug_assert!(self.phase.can_advance_to(next), "{} -> {next}", self.phase);
        debug!(round = self.round, from = %self.phase, to = %next, "round phase");
        self.phase = next;
    }
}
