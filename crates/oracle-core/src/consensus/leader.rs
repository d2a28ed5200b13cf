//! Leader-side execution.
//!
//! Exactly one node runs the leader procedure per round. It owns the only
//! [`Transport`] in the system and the only mutable handle to rotation
//! bookkeeping; everything else it may read comes through [`ConfigSnapshot`].

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    errors::OracleError,
    source::{FetchParams, RotationOutcome, RotationPolicy, RotationState, SourceSet, Transport},
    types::{Reading, RoundResult},
};

/// Whether a failed fetch aborts the round or degrades to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Failure aborts the leader procedure.
    Critical,
    /// Failure is logged and the caller substitutes its default.
    BestEffort,
}

/// Read-only configuration visible to the leader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub proxy_url: String,
}

/// Capabilities handed to a leader procedure for one round.
pub struct LeaderContext<'a> {
    transport: &'a dyn Transport,
    rotation: &'a mut RotationState,
    snapshot: &'a ConfigSnapshot,
}

impl<'a> LeaderContext<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        rotation: &'a mut RotationState,
        snapshot: &'a ConfigSnapshot,
    ) -> Self {
        Self { transport, rotation, snapshot }
    }

    #[must_use]
    pub fn snapshot(&self) -> &ConfigSnapshot {
        self.snapshot
    }

    /// Fetches from `set` under `policy`.
    ///
    /// Returns `Ok(None)` only for a [`FetchPolicy::BestEffort`] failure.
    ///
    /// # Errors
    ///
    /// Any set failure under [`FetchPolicy::Critical`]. A misconfigured set
    /// fails under either policy.
    pub async fn fetch(
        &self,
        policy: FetchPolicy,
        set: &SourceSet,
        params: &FetchParams,
    ) -> Result<Option<Reading>, OracleError> {
        match (set.fetch(self.transport, params).await, policy) {
            (Ok(reading), _) => Ok(Some(reading)),
            (Err(error @ OracleError::Configuration(_)), _) => Err(error),
            (Err(error), FetchPolicy::BestEffort) => {
                warn!(set = set.name(), error = %error, "best-effort fetch failed, using default");
                Ok(None)
            }
            (Err(error), FetchPolicy::Critical) => Err(error),
        }
    }

    /// Critical fetch: the reading or the error that aborts the round.
    pub async fn critical(&self, set: &SourceSet, params: &FetchParams) -> Result<Reading, OracleError> {
        set.fetch(self.transport, params).await
    }

    /// Best-effort fetch: `None` when every source failed.
    ///
    /// # Errors
    ///
    /// [`OracleError::Configuration`] for a set that cannot be fetched at all.
    pub async fn best_effort(
        &self,
        set: &SourceSet,
        params: &FetchParams,
    ) -> Result<Option<Reading>, OracleError> {
        self.fetch(FetchPolicy::BestEffort, set, params).await
    }

    /// Rotating fetch; the policy records the winning credential.
    pub async fn rotating(
        &mut self,
        policy: &RotationPolicy,
        params: &FetchParams,
    ) -> Result<RotationOutcome, OracleError> {
        policy.fetch_with_rotation(self.rotation, self.transport, params).await
    }
}

/// Produces a round result from external sources.
#[async_trait]
pub trait LeaderProcedure: Send + Sync {
    /// Short label for logs and metrics.
    fn flavor(&self) -> &'static str;

    async fn propose(&self, ctx: &mut LeaderContext<'_>) -> Result<RoundResult, OracleError>;
}

/// Leader result plus the canonical bytes distributed to validators.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderProposal {
    pub result: RoundResult,
    pub payload: Vec<u8>,
}

/// Runs a leader procedure once under a timeout.
#[derive(Debug, Clone)]
pub struct LeaderExecutor {
    timeout: Duration,
}

impl LeaderExecutor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// # Errors
    ///
    /// The procedure's own error, or [`OracleError::Leader`] on timeout or
    /// serialization failure.
    pub async fn run(
        &self,
        procedure: &dyn LeaderProcedure,
        mut ctx: LeaderContext<'_>,
    ) -> Result<LeaderProposal, OracleError> {
        let result = tokio::time::timeout(self.timeout, procedure.propose(&mut ctx))
            .await
            .map_err(|_| {
                OracleError::Leader(format!(
                    "{} leader timed out after {}s",
                    procedure.flavor(),
                    self.timeout.as_secs()
                ))
            })??;

        let payload = serde_json::to_vec(&result)
            .map_err(|e| OracleError::Leader(format!("failed to serialize result: {e}")))?;
        debug!(flavor = procedure.flavor(), bytes = payload.len(), "leader proposal ready");

        Ok(LeaderProposal { result, payload })
    }
}
