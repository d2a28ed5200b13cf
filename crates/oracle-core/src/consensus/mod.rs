//! # Round Overview
//!
//! A round turns nondeterministic web data into a value every node can agree
//! on without re-fetching it.
//!
//! ## Steps
//!
//! 1. **Leader**: one node runs a [`LeaderProcedure`] exactly once, fetching
//!    through source sets and credential rotation
//! 2. **Distribution**: the structured result is serialized with serde_json
//! 3. **Validation**: each [`ValidatorPredicate`] judges the bytes alone,
//!    with no I/O; a panicking validator votes to reject
//! 4. **Quorum**: accepting votes are tallied against `quorum_threshold`
//! 5. **Commit**: [`StateCommitter`](crate::state::StateCommitter) stages every
//!    field and writes them together
//!
//! ## Failure Modes
//!
//! - **Leader failure**: no validation, no state write; round ends `Failed`
//! - **No quorum**: no state write; round ends `Rejected`
//! - **Conversion failure at commit**: no field written; round ends `Failed`
//!
//! Rotation bookkeeping recorded by the leader is kept in every case.
//!
//! # Module Organization
//!
//! - [`config`]: `ConsensusConfig` and quorum arithmetic
//! - [`leader`]: leader capabilities, fetch policies and the executor
//! - [`validator`]: validator predicates and their bounds
//! - [`quorum`]: vote tallying
//! - [`types`]: round phases and reports
//! - [`engine`]: `ConsensusRunner`, the round driver

pub mod config;
pub mod engine;
pub mod leader;
pub mod quorum;
pub mod types;
pub mod validator;

#[cfg(test)]
mod tests;

pub use config::ConsensusConfig;
pub use engine::ConsensusRunner;
pub use leader::{
    ConfigSnapshot, FetchPolicy, LeaderContext, LeaderExecutor, LeaderProcedure, LeaderProposal,
};
pub use quorum::QuorumDecision;
pub use types::{RoundPhase, RoundReport};
pub use validator::{CompositeValidator, PriceValidator, ValidationBounds, ValidatorPredicate};
