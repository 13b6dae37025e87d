//! Fixed-width text report of a finished run

use crate::candidate::{Axis, Candidate, Evaluation};
use crate::state::RunState;

const RULE_WIDTH: usize = 80;
const WRAP_WIDTH: usize = 76;
const INDENT: &str = "    ";

/// Render the final state: seeds, final candidates with scores, and the top
/// pick with its score breakdown and rationale.
pub fn render(state: &RunState) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out: Vec<String> = Vec::new();

    out.push(String::new());
    out.push(heavy.clone());
    out.push(centered("GLUCOSE MONITORING SYSTEM - DESIGN EXPLORATION"));
    out.push(heavy.clone());
    out.push(String::new());
    out.push(format!("  Iterations completed: {}", state.iteration));
    out.push(format!("  Initial candidates: {}", state.initial_candidates.len()));
    out.push(format!("  Final candidates: {}", state.candidates.len()));
    if state.usage.total_calls > 0 {
        out.push(format!(
            "  LLM calls: {} ({} tokens)",
            state.usage.total_calls,
            state.usage.total_tokens()
        ));
    }
    out.push(String::new());

    out.push(light.clone());
    out.push("  INITIAL CANDIDATES".into());
    out.push(light.clone());
    for c in &state.initial_candidates {
        out.push(String::new());
        out.push(format!("  #{}: {}", id_of(c), c.display("microcontroller")));
        out.push(format!(
            "      Sensor: {} | ADC: {}-bit | BLE: {}",
            c.display("sensor_type"),
            c.display("adc_bits"),
            c.ble()
        ));
        out.push(format!("      Battery: {}", c.display("battery")));
    }
    out.push(String::new());

    out.push(light.clone());
    out.push("  FINAL CANDIDATES".into());
    out.push(light);
    for c in &state.candidates {
        out.push(String::new());
        out.push(format!("  #{}: {}", id_of(c), c.display("microcontroller")));
        push_components(&mut out, c);
        if let Some(e) = state.evaluation_for(c) {
            out.push(format!("      * Score: {}/10", overall_text(e)));
        }
    }

    if let Some(selection) = &state.selection {
        let pick = &selection.top_pick;
        out.push(String::new());
        out.push(heavy.clone());
        out.push(centered("TOP PICK"));
        out.push(heavy.clone());
        out.push(String::new());
        out.push(format!("  {}", pick.display("microcontroller")));
        push_components(&mut out, pick);

        if let Some(e) = state.evaluation_for(pick) {
            out.push(String::new());
            out.push("  Score Breakdown:".into());
            for axis in Axis::ALL {
                let score = e
                    .score(axis)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "N/A".into());
                out.push(format!("      * {:<12} {}/10", format!("{}:", axis.label()), score));
            }
            out.push(format!("      {}", "─".repeat(21)));
            out.push(format!("      * {:<12} {}/10", "Overall:", overall_text(e)));
        }

        out.push(String::new());
        out.push("  Why this is the best choice:".into());
        out.extend(wrap(&selection.reasoning, WRAP_WIDTH));
    }

    out.push(String::new());
    out.push(heavy);
    out.join("\n")
}

fn push_components(out: &mut Vec<String>, c: &Candidate) {
    out.push(format!("      * Sensor: {}", c.display("sensor_type")));
    out.push(format!("      * ADC: {}-bit", c.display("adc_bits")));
    out.push(format!("      * BLE: {}", c.ble()));
    out.push(format!("      * Battery: {}", c.display("battery")));
}

fn id_of(c: &Candidate) -> String {
    c.id().unwrap_or_else(|| "?".into())
}

fn overall_text(e: &Evaluation) -> String {
    e.overall_score
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".into())
}

fn centered(title: &str) -> String {
    let pad = RULE_WIDTH.saturating_sub(title.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), title)
}

/// Greedy word wrap; every line is indented and at most `width` characters.
/// A single word longer than the width gets a line of its own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::from(INDENT);

    for word in text.split_whitespace() {
        let has_words = line.len() > INDENT.len();
        if has_words && line.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::replace(&mut line, String::from(INDENT)));
        }
        if line.len() > INDENT.len() {
            line.push(' ');
        }
        line.push_str(word);
    }

    if line.len() > INDENT.len() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::DesignBrief;
    use crate::candidate::Selection;
    use serde_json::json;

    fn finished_state() -> RunState {
        let mut state = RunState::new(DesignBrief::glucose_monitor(), 2);
        let a = Candidate::new(json!({
            "id": 1, "microcontroller": "nRF52832", "sensor_type": "enzymatic amperometric",
            "adc_bits": 12, "ble_module": "integrated", "battery": "CR2032 225 mAh"
        }));
        let b = Candidate::new(json!({ "id": 2, "microcontroller": "MSP430FR2433" }));
        state.initial_candidates = vec![a.clone(), b.clone()];
        state.candidates = vec![a.clone(), b];
        state.iteration = 2;
        state.evaluations = vec![serde_json::from_value(json!({
            "candidate_id": 1, "accuracy_score": 8, "power_score": 9,
            "cost_score": 7, "reliability_score": 8.5, "overall_score": 8.1
        }))
        .unwrap()];
        state.selection = Some(Selection {
            top_pick: a,
            reasoning: "The nRF52832 integrates the radio and ADC, which keeps the bill of \
                        materials small and the sleep current low while meeting accuracy."
                .into(),
        });
        state
    }

    #[test]
    fn test_render_sections() {
        let report = render(&finished_state());

        assert!(report.contains("GLUCOSE MONITORING SYSTEM - DESIGN EXPLORATION"));
        assert!(report.contains("  Iterations completed: 2"));
        assert!(report.contains("  Final candidates: 2"));
        assert!(report.contains("  #1: nRF52832"));
        assert!(report.contains("      * ADC: 12-bit"));
        assert!(report.contains("      * Score: 8.1/10"));
        assert!(report.contains("TOP PICK"));
        assert!(report.contains("      * Accuracy:    8/10"));
        assert!(report.contains("      * Reliability: 8.5/10"));
        assert!(report.contains("      * Overall:     8.1/10"));
        assert!(report.contains("  #2: MSP430FR2433"));
        assert!(report.contains("      * Battery: N/A"));
        assert!(report.contains("Why this is the best choice:"));
    }

    #[test]
    fn test_render_without_selection() {
        let mut state = finished_state();
        state.selection = None;
        let report = render(&state);
        assert!(!report.contains("TOP PICK"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(50);
        let lines = wrap(&text, 76);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.starts_with("    word"));
            assert!(line.chars().count() <= 76);
        }
        let words: usize = lines.iter().map(|l| l.split_whitespace().count()).sum();
        assert_eq!(words, 50);
    }

    #[test]
    fn test_wrap_edge_cases() {
        assert!(wrap("   ", 76).is_empty());
        assert_eq!(wrap("one", 76), vec!["    one".to_string()]);

        let long = "x".repeat(100);
        let lines = wrap(&format!("a {} b", long), 76);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], format!("    {}", long));
    }
}
