//! # cgmdse Agent
//!
//! Design-space exploration for a continuous glucose monitor, driven by an LLM:
//! 1. Seed: ask for `seed_count` complete candidate configurations
//! 2. Evaluate: score each candidate on accuracy, power, cost and reliability
//! 3. Refine: improve the `top_k` best candidates, then evaluate again,
//!    `max_iterations` times
//! 4. Select: pick one final candidate with a rationale
//!
//! The LLM does the reasoning; this crate builds prompts, reads replies
//! leniently, and keeps the run state.

mod agent;
pub mod brief;
pub mod candidate;
pub mod parse;
pub mod prompt;
pub mod report;
pub mod state;

pub use agent::{AgentConfig, DesignAgent};
pub use brief::{Constraints, DesignBrief, Fields, Requirements};
pub use candidate::{Axis, Candidate, Evaluation, Score, Selection};
pub use state::{RefinementRound, RunState};
