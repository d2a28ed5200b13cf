//! # Oracle Core
//!
//! Execution engine for oracle contracts that consume nondeterministic web
//! data under a leader-propose / validators-verify consensus model.
//!
//! ## Architecture Overview
//!
//! ```text
//!   contract write entry point
//!            |
//!            v
//!   +------------------+   fetch    +-----------------------------+
//!   | LeaderProcedure  |----------->| SourceSet / RotationPolicy  |---> Transport (HTTP)
//!   +------------------+            +-----------------------------+
//!            | RoundResult (serde_json bytes)
//!            v
//!   +------------------+
//!   | ValidatorPredicate x N  (parallel, pure)
//!   +------------------+
//!            | votes
//!            v
//!   quorum::tally --> StateCommitter --> PersistentState
//! ```
//!
//! ## Module Organization
//!
//! - [`source`]: endpoint templates, extraction, ordered fallback, credential rotation, HTTP
//! - [`consensus`]: leader execution, validators, quorum and the round driver
//! - [`state`]: persistent state, the atomic committer and state stores
//! - [`contract`]: the write entry points and views
//! - [`config`]: layered configuration
//! - [`metrics`]: Prometheus counters and histograms
//! - [`errors`]: error taxonomy

pub mod config;
pub mod consensus;
pub mod contract;
pub mod errors;
pub mod metrics;
pub mod source;
pub mod state;
pub mod types;

pub use contract::{normalize_symbol, CompositeRequest, OracleContract, PriceFlavor};
pub use errors::{CommitError, OracleError, SourceError, StoreError};
