//! Candidates, scores and the final selection
//!
//! Everything here is produced by the LLM. A candidate is any JSON value and
//! a score may be a number, a word or missing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One proposed component configuration, kept exactly as the LLM wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(Value);

impl Candidate {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Normalised id, see [`normalize_id`].
    pub fn id(&self) -> Option<String> {
        self.field("id").and_then(normalize_id)
    }

    /// Give the candidate an id if it has none. Non-object candidates are
    /// left alone.
    pub fn ensure_id(&mut self, id: impl Into<Value>) {
        if self.id().is_some() {
            return;
        }
        if let Value::Object(map) = &mut self.0 {
            map.insert("id".into(), id.into());
        }
    }

    /// A field as display text, `N/A` when absent.
    pub fn display(&self, name: &str) -> String {
        match self.field(name) {
            None | Some(Value::Null) => "N/A".into(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// The BLE description; seeds name it `ble_module_tx_interval`, the
    /// refined and hand-written ones usually `ble_module`.
    pub fn ble(&self) -> String {
        if self.field("ble_module").is_some() {
            self.display("ble_module")
        } else {
            self.display("ble_module_tx_interval")
        }
    }
}

/// Ids arrive as `1`, `1.0`, `"1"` or `"#1"` depending on the model's mood;
/// all of them normalise to `"1"`.
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 => Some(format!("{:.0}", f)),
            _ => Some(n.to_string()),
        },
        Value::String(s) => {
            let s = s.trim().trim_start_matches('#').trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    }
}

/// The four fixed evaluation axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Accuracy,
    Power,
    Cost,
    Reliability,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Accuracy, Axis::Power, Axis::Cost, Axis::Reliability];

    pub fn label(&self) -> &'static str {
        match self {
            Axis::Accuracy => "Accuracy",
            Axis::Power => "Power",
            Axis::Cost => "Cost",
            Axis::Reliability => "Reliability",
        }
    }
}

/// A score as the evaluator gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Numeric(f64),
    Qualitative(String),
    Other(Value),
}

impl Score {
    /// Numeric reading of the score. Accepts strings such as `"8.5"` or
    /// `"8.5/10"`; anything else, including `NaN` and infinities, has no
    /// numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Score::Numeric(n) => *n,
            Score::Qualitative(s) => s.split('/').next()?.trim().parse().ok()?,
            Score::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Numeric(n) if n.fract() == 0.0 => write!(f, "{:.0}", n),
            Score::Numeric(n) => write!(f, "{}", n),
            Score::Qualitative(s) => f.write_str(s),
            Score::Other(v) => write!(f, "{}", v),
        }
    }
}

/// The evaluator's verdict on one candidate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub candidate_id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub feedback: Value,
    /// Whatever else the model chose to include
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Evaluation {
    pub fn candidate_key(&self) -> Option<String> {
        normalize_id(&self.candidate_id)
    }

    pub fn is_for(&self, candidate: &Candidate) -> bool {
        match (self.candidate_key(), candidate.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn score(&self, axis: Axis) -> Option<&Score> {
        match axis {
            Axis::Accuracy => self.accuracy_score.as_ref(),
            Axis::Power => self.power_score.as_ref(),
            Axis::Cost => self.cost_score.as_ref(),
            Axis::Reliability => self.reliability_score.as_ref(),
        }
    }

    /// Overall score used for ranking; missing or non-numeric ranks as 0.
    pub fn overall(&self) -> f64 {
        self.overall_score
            .as_ref()
            .and_then(Score::as_f64)
            .unwrap_or(0.0)
    }
}

/// Find the evaluation belonging to `candidate`.
pub fn evaluation_for<'a>(
    evaluations: &'a [Evaluation],
    candidate: &Candidate,
) -> Option<&'a Evaluation> {
    evaluations.iter().find(|e| e.is_for(candidate))
}

/// The `k` best candidates by overall score, highest first. Candidates with
/// no evaluation rank as 0; ties keep their current order, so exactly
/// `min(k, candidates.len())` are returned.
pub fn top_candidates(candidates: &[Candidate], evaluations: &[Evaluation], k: usize) -> Vec<Candidate> {
    let mut ranked: Vec<(f64, &Candidate)> = candidates
        .iter()
        .map(|c| (evaluation_for(evaluations, c).map_or(0.0, Evaluation::overall), c))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(k).map(|(_, c)| c.clone()).collect()
}

/// The final pick and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub top_pick: Candidate,
    pub reasoning: String,
}

/// Rationale as plain text. Models sometimes answer with an object of
/// paragraphs or a list; those are joined with spaces.
pub fn flatten_reasoning(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => join_texts(map.values()),
        Value::Array(items) => join_texts(items.iter()),
        other => other.to_string(),
    }
}

fn join_texts<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(flatten_reasoning)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
