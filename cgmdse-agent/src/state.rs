//! The record threaded through every stage of a run

use crate::brief::{Constraints, DesignBrief, Requirements};
use crate::candidate::{evaluation_for, Candidate, Evaluation, Selection};
use cgmdse_llm::UsageTracker;
use serde::{Deserialize, Serialize};

/// What one refinement round took in and gave back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementRound {
    /// 1-based round number
    pub iteration: usize,
    /// Ids of the candidates carried into the round
    pub carried: Vec<String>,
    /// How many refined candidates came back
    pub returned: usize,
}

/// Run state. Owned by the agent for the length of one run; nothing is
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub requirements: Requirements,
    pub constraints: Constraints,
    /// Current candidates (seeds at first, refined ones later)
    pub candidates: Vec<Candidate>,
    /// The seeds, kept for the report
    pub initial_candidates: Vec<Candidate>,
    /// Latest evaluation of `candidates`
    pub evaluations: Vec<Evaluation>,
    /// Refinement rounds completed
    pub iteration: usize,
    pub max_iterations: usize,
    pub rounds: Vec<RefinementRound>,
    pub selection: Option<Selection>,
    /// One line per stage, in order
    pub history: Vec<String>,
    pub usage: UsageTracker,
}

impl RunState {
    pub fn new(brief: DesignBrief, max_iterations: usize) -> Self {
        Self {
            requirements: brief.requirements,
            constraints: brief.constraints,
            candidates: Vec::new(),
            initial_candidates: Vec::new(),
            evaluations: Vec::new(),
            iteration: 0,
            max_iterations,
            rounds: Vec::new(),
            selection: None,
            history: Vec::new(),
            usage: UsageTracker::new(),
        }
    }

    /// The brief this run was started from.
    pub fn brief(&self) -> DesignBrief {
        DesignBrief::new(self.requirements.clone(), self.constraints.clone())
    }

    pub fn should_refine(&self) -> bool {
        self.iteration < self.max_iterations
    }

    pub fn evaluation_for(&self, candidate: &Candidate) -> Option<&Evaluation> {
        evaluation_for(&self.evaluations, candidate)
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.history.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_state() {
        let state = RunState::new(DesignBrief::glucose_monitor(), 2);
        assert_eq!(state.iteration, 0);
        assert!(state.should_refine());
        assert!(state.candidates.is_empty());
        assert_eq!(state.brief(), DesignBrief::glucose_monitor());
    }

    #[test]
    fn test_refinement_stops_at_max() {
        let mut state = RunState::new(DesignBrief::glucose_monitor(), 1);
        state.iteration = 1;
        assert!(!state.should_refine());

        let state = RunState::new(DesignBrief::glucose_monitor(), 0);
        assert!(!state.should_refine());
    }

    #[test]
    fn test_serializes_for_output() {
        let mut state = RunState::new(DesignBrief::glucose_monitor(), 2);
        state.candidates.push(Candidate::new(json!({ "id": 1 })));
        state.note("Generated 1 initial candidates");

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["candidates"][0]["id"], json!(1));
        assert_eq!(value["requirements"]["battery_life"], json!(">=24h"));
        assert_eq!(value["history"][0], json!("Generated 1 initial candidates"));
    }
}
