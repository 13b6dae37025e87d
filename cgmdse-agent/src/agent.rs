//! Agent implementation - drives the seed → evaluate → refine → select run

use crate::brief::DesignBrief;
use crate::candidate::{flatten_reasoning, normalize_id, top_candidates, Candidate, Evaluation, Selection};
use crate::parse::{extract_list, extract_object};
use crate::prompt;
use crate::state::{RefinementRound, RunState};
use cgmdse_error::{Error, Result};
use cgmdse_llm::{ChatMessage, CompletionRequest, LlmProvider};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Candidates requested from the seed stage
    pub seed_count: usize,
    /// Candidates carried into each refinement round
    pub top_k: usize,
    /// Refinement rounds
    pub max_iterations: usize,
    /// Model override; the provider's default when `None`
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            seed_count: 5,
            top_k: 3,
            max_iterations: 2,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.seed_count == 0 {
            return Err(Error::config_invalid("seed_count", "seed_count must be at least 1"));
        }
        if self.top_k == 0 {
            return Err(Error::config_invalid("top_k", "top_k must be at least 1"));
        }
        if self.top_k > self.seed_count {
            return Err(Error::config_invalid(
                "top_k",
                format!(
                    "top_k ({}) cannot exceed seed_count ({})",
                    self.top_k, self.seed_count
                ),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::config_invalid(
                    "temperature",
                    format!("temperature {} is outside 0.0..=2.0", t),
                ));
            }
        }
        Ok(())
    }
}

/// The agent orchestrator - one LLM call per stage, in a fixed order
pub struct DesignAgent<P> {
    provider: P,
    config: AgentConfig,
}

impl<P: LlmProvider> DesignAgent<P> {
    pub fn new(provider: P, config: AgentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the whole pipeline once and return the final state.
    pub async fn run(&self, brief: DesignBrief) -> Result<RunState> {
        brief.validate()?;

        let mut state = RunState::new(brief, self.config.max_iterations);
        info!(
            provider = self.provider.name(),
            model = self.model(),
            seeds = self.config.seed_count,
            top_k = self.config.top_k,
            rounds = self.config.max_iterations,
            "starting design exploration"
        );

        self.seed(&mut state).await?;
        self.evaluate(&mut state).await?;
        while state.should_refine() {
            self.refine(&mut state).await?;
            self.evaluate(&mut state).await?;
        }
        self.select(&mut state).await?;

        info!(
            calls = state.usage.total_calls,
            tokens = state.usage.total_tokens(),
            "design exploration complete"
        );
        Ok(state)
    }

    /// Generate exactly `seed_count` initial candidates.
    pub async fn seed(&self, state: &mut RunState) -> Result<()> {
        let count = self.config.seed_count;
        let user = prompt::seed_prompt(&state.brief(), count);
        let reply = self
            .ask(state, prompt::SEED_SYSTEM, user)
            .await
            .map_err(|e| e.with_operation("agent::seed"))?;

        let items = extract_list(&reply, "candidates").ok_or_else(|| {
            Error::parse_failed("seed reply contained no candidate list")
                .with_operation("agent::seed")
                .with_context("reply", preview(&reply))
        })?;

        if items.len() < count {
            return Err(Error::inference_failed(format!(
                "expected {} seed candidates, got {}",
                count,
                items.len()
            ))
            .permanent()
            .with_operation("agent::seed"));
        }
        if items.len() > count {
            warn!(returned = items.len(), kept = count, "dropping extra seed candidates");
        }

        let candidates: Vec<Candidate> = items
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(i, item)| {
                let mut candidate = Candidate::new(item);
                candidate.ensure_id(i + 1);
                candidate
            })
            .collect();

        for c in &candidates {
            let id = c.id().unwrap_or_else(|| "?".into());
            debug!(
                id = %id,
                mcu = %c.display("microcontroller"),
                sensor = %c.display("sensor_type"),
                "seed candidate"
            );
        }

        state.note(format!("Generated {} initial candidates", candidates.len()));
        state.initial_candidates = candidates.clone();
        state.candidates = candidates;
        Ok(())
    }

    /// Score every current candidate. An unreadable reply leaves the run
    /// without scores rather than failing it.
    pub async fn evaluate(&self, state: &mut RunState) -> Result<()> {
        if state.candidates.is_empty() {
            state.evaluations.clear();
            state.note("No candidates to evaluate");
            return Ok(());
        }

        let label = if state.iteration == 0 {
            "initial".to_string()
        } else {
            format!("round {}", state.iteration)
        };
        info!(candidates = state.candidates.len(), stage = %label, "evaluating");

        let user = prompt::evaluation_prompt(&state.brief(), &state.candidates);
        let reply = self
            .ask(state, prompt::EVALUATE_SYSTEM, user)
            .await
            .map_err(|e| e.with_operation("agent::evaluate"))?;

        let evaluations: Vec<Evaluation> = match extract_list(&reply, "evaluations") {
            Some(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<Evaluation>(item) {
                    Ok(e) => Some(e),
                    Err(err) => {
                        warn!(error = %err, "skipping malformed evaluation");
                        None
                    }
                })
                .collect(),
            None => {
                warn!(reply = %preview(&reply), "evaluation reply contained no list");
                Vec::new()
            }
        };

        let scores: Vec<String> = evaluations
            .iter()
            .map(|e| {
                let id = e.candidate_key().unwrap_or_else(|| "?".into());
                let overall = e
                    .overall_score
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "N/A".into());
                format!("#{}={}", id, overall)
            })
            .collect();
        info!(scores = %scores.join(" "), "scores");

        state.note(format!("Evaluated {} candidates ({})", evaluations.len(), label));
        state.evaluations = evaluations;
        Ok(())
    }

    /// One refinement round over the `top_k` best candidates.
    pub async fn refine(&self, state: &mut RunState) -> Result<()> {
        let top = top_candidates(&state.candidates, &state.evaluations, self.config.top_k);
        let feedback: Vec<Evaluation> = top
            .iter()
            .filter_map(|c| state.evaluation_for(c).cloned())
            .collect();
        let carried: Vec<String> = top
            .iter()
            .map(|c| c.id().unwrap_or_else(|| "?".into()))
            .collect();
        let iteration = state.iteration + 1;

        info!(iteration, selected = %carried.join(", "), "refining top candidates");

        let user = prompt::refinement_prompt(&state.brief(), &top, &feedback);
        let reply = self
            .ask(state, prompt::REFINE_SYSTEM, user)
            .await
            .map_err(|e| e.with_operation("agent::refine"))?;

        let refined = match extract_list(&reply, "candidates") {
            Some(items) if !items.is_empty() => {
                if items.len() > top.len() {
                    warn!(returned = items.len(), kept = top.len(), "dropping extra refined candidates");
                }
                items
                    .into_iter()
                    .take(top.len())
                    .zip(&top)
                    .map(|(item, original)| {
                        let mut candidate = Candidate::new(item);
                        if let Some(id) = original.field("id") {
                            candidate.ensure_id(id.clone());
                        }
                        candidate
                    })
                    .collect()
            }
            _ => {
                warn!(iteration, "refinement reply unreadable, keeping current top candidates");
                top
            }
        };

        state.rounds.push(RefinementRound {
            iteration,
            carried,
            returned: refined.len(),
        });
        state.note(format!(
            "Refined to {} candidates (iteration {})",
            refined.len(),
            iteration
        ));
        state.candidates = refined;
        state.iteration = iteration;
        Ok(())
    }

    /// Pick the final candidate and its rationale.
    pub async fn select(&self, state: &mut RunState) -> Result<()> {
        if state.candidates.is_empty() {
            return Err(Error::inference_failed("no candidates left to select from")
                .permanent()
                .with_operation("agent::select"));
        }

        let user = prompt::selection_prompt(&state.brief(), &state.candidates, &state.evaluations);
        let reply = self
            .ask(state, prompt::SELECT_SYSTEM, user)
            .await
            .map_err(|e| e.with_operation("agent::select"))?;

        let selection = match extract_object(&reply) {
            Some(mut obj) => {
                let reasoning = flatten_reasoning(obj.get("selection_reasoning").unwrap_or(&Value::Null));
                let top_pick = obj
                    .remove("top_pick")
                    .and_then(|pick| resolve_pick(pick, &state.candidates))
                    .unwrap_or_else(|| {
                        warn!("selection named no usable top_pick, using best-scored candidate");
                        best_candidate(state)
                    });
                Selection { top_pick, reasoning }
            }
            None => {
                warn!(reply = %preview(&reply), "selection reply unreadable");
                Selection {
                    top_pick: best_candidate(state),
                    reasoning: "Unable to parse selection".into(),
                }
            }
        };

        let pick_id = selection.top_pick.id().unwrap_or_else(|| "?".into());
        info!(
            top_pick = %pick_id,
            mcu = %selection.top_pick.display("microcontroller"),
            "final selection"
        );
        state.note("Final selection complete");
        state.selection = Some(selection);
        Ok(())
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// One system + user exchange; usage is recorded on the state.
    async fn ask(&self, state: &mut RunState, system: &str, user: String) -> Result<String> {
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ]);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        if let Some(t) = self.config.temperature {
            request = request.with_temperature(t);
        }
        if let Some(max) = self.config.max_tokens {
            request = request.with_max_tokens(max);
        }

        let response = self.provider.complete(request).await?;
        let model = if response.model.is_empty() {
            self.model().to_string()
        } else {
            response.model.clone()
        };
        state.usage.track(&model, &response.usage);

        let text = response.into_text()?;
        debug!(chars = text.len(), "reply received");
        Ok(text)
    }
}

/// The selector may answer with the whole candidate object or just its id.
fn resolve_pick(pick: Value, candidates: &[Candidate]) -> Option<Candidate> {
    match pick {
        Value::Null => None,
        Value::Object(_) => Some(Candidate::new(pick)),
        other => {
            let id = normalize_id(&other)?;
            candidates.iter().find(|c| c.id().as_deref() == Some(id.as_str())).cloned()
        }
    }
}

fn best_candidate(state: &RunState) -> Candidate {
    top_candidates(&state.candidates, &state.evaluations, 1)
        .into_iter()
        .next()
        .unwrap_or_else(|| Candidate::new(Value::Null))
}

fn preview(s: &str) -> String {
    const MAX: usize = 120;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.seed_count, 5);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_iterations, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = |config: AgentConfig, setting: &str| {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), cgmdse_error::ErrorKind::ConfigInvalid);
            assert_eq!(err.context()[0].1, setting);
        };

        bad(AgentConfig { seed_count: 0, ..Default::default() }, "seed_count");
        bad(AgentConfig { top_k: 0, ..Default::default() }, "top_k");
        bad(AgentConfig { top_k: 6, ..Default::default() }, "top_k");
        bad(AgentConfig { temperature: Some(3.5), ..Default::default() }, "temperature");

        let zero_rounds = AgentConfig { max_iterations: 0, ..Default::default() };
        assert!(zero_rounds.validate().is_ok());
    }

    #[test]
    fn test_resolve_pick() {
        let candidates = vec![
            Candidate::new(json!({ "id": 1, "microcontroller": "nRF52832" })),
            Candidate::new(json!({ "id": 2, "microcontroller": "MSP430FR2433" })),
        ];

        let pick = resolve_pick(json!("#2"), &candidates).unwrap();
        assert_eq!(pick.display("microcontroller"), "MSP430FR2433");

        let pick = resolve_pick(json!({ "id": 9, "microcontroller": "STM32L0" }), &candidates).unwrap();
        assert_eq!(pick.id().as_deref(), Some("9"));

        assert!(resolve_pick(json!(7), &candidates).is_none());
        assert!(resolve_pick(Value::Null, &candidates).is_none());
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "≤".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 121);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
