//! Consensus domain
//!
//! Weighted voting, tie synthesis and dialectical critique for WSDE team
//! decisions. The functions here are pure; gathering votes from agents and
//! persisting decisions happens in the application layer.

pub mod decision;
pub mod dialectic;
pub mod tally;
pub mod vote;

pub use decision::{ConsensusFailure, Decision, DecisionOutcome, SynthesisProposal};
pub use dialectic::{Critique, DialecticalCritique, Proposal};
pub use tally::Tally;
pub use vote::{Vote, VotingMethod};
