//! Tests for the consensus module.
//!
//! - `engine_tests`: `ConsensusRunner` round orchestration and the leader executor
//! - Unit tests for quorum, config and validators are in their respective modules
