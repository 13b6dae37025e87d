//! Prompt templates for each pipeline stage

use crate::brief::DesignBrief;
use crate::candidate::{Candidate, Evaluation};
use serde::Serialize;

pub const SEED_SYSTEM: &str =
    "You are a technical design assistant. Always respond with valid JSON only.";
pub const EVALUATE_SYSTEM: &str =
    "You are a technical evaluator. Always respond with valid JSON only.";
pub const REFINE_SYSTEM: &str =
    "You are a design optimization expert. Always respond with valid JSON only.";
pub const SELECT_SYSTEM: &str = "You are a senior design architect. Always respond with valid \
     JSON. The selection_reasoning must be a plain string, not a nested object.";

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn requirements_context(brief: &DesignBrief) -> String {
    let req = &brief.requirements;
    format!(
        "- Sampling interval: {}\n- Alert thresholds: {}\n- Battery life: {}",
        req.text_or("sampling_interval", "unspecified"),
        brief.alert_thresholds(),
        req.text_or("battery_life", "unspecified"),
    )
}

/// Ask for `count` complete candidate configurations.
pub fn seed_prompt(brief: &DesignBrief, count: usize) -> String {
    let req = &brief.requirements;
    let con = &brief.constraints;

    format!(
        r#"You are a CPS design assistant performing Design Space Exploration (DSE)
for a continuous glucose monitoring (CGM) system. Generate {count} complete
candidate hardware configurations that respect ALL objectives and constraints.

===========================
      SYSTEM OBJECTIVES
===========================
1. Alert latency requirement: {latency}
2. Battery life requirement: {battery}
3. Measurement accuracy target (MARD): {mard}
4. BLE link reliability target: {ble_reliability}

===========================
       HARD CONSTRAINTS
===========================
- Sampling interval: {sampling}
- Sampling stability: {stability}
- Alert thresholds: {alerts}
- ADC bits must be one of: {adc_bits}
- Sensor <-> AFE compatibility: {afe}
- MCU <-> BLE interface allowed: {interface}
- BLE range constraint: {ble_range}
- Physical constraint: {form_factor}

===========================
      DESIGN PARAMETERS
===========================
1. Sensor & AFE: sensor type, bias voltage, response time (tau),
   AFE gain, filtering, ADC resolution, noise floor
2. Microcontroller: MCU family (Cortex-M0/M4, Nordic nRF52, TI MSP430, ...),
   ADC sampling, clock modes, duty cycling
3. BLE subsystem: module, TX power, connection/advertising interval,
   payload size, retry/ACK strategy
4. Battery & power: capacity, chemistry, regulator efficiency,
   sleep strategy, power gating
5. System timing: sampling schedule vs. filtering window,
   BLE message bundling

===========================
       REQUIRED OUTPUT
===========================
Return a JSON array with exactly {count} candidates. Each candidate must contain:
  id (1-{count}), microcontroller, sensor_type, sensor_bias_voltage, sensor_tau,
  afe_gain_filter, adc_bits, ble_module_tx_interval, battery, power_gating,
  sampling_interval, ble_bundling, rationale

The rationale must link the design choices to latency, power, accuracy and
BLE reliability, and discuss any trade-offs.

Return ONLY valid JSON. NO markdown, NO explanations outside JSON."#,
        count = count,
        latency = req.text_or("alert_latency", "<10s"),
        battery = req.text_or("battery_life", "unspecified"),
        mard = req.text_or("mard_target", "<=10%"),
        ble_reliability = req.text_or("ble_reliability", ">=99%"),
        sampling = req.text_or("sampling_interval", "unspecified"),
        stability = con.text_or("sampling_stability", "±0.2 min max drift"),
        alerts = brief.alert_thresholds(),
        adc_bits = con.text_or("adc_bits", "unspecified"),
        afe = con.text_or("afe_sensor_compat", "AFE bias must match sensor output"),
        interface = con.text_or("mcu_ble_interface", "{UART, SPI, I2C}"),
        ble_range = con.text_or("ble_range", "≤5m"),
        form_factor = con.text_or("battery_form_factor", "Wearable patch form factor"),
    )
}

/// Ask for a score on every axis for each candidate.
pub fn evaluation_prompt(brief: &DesignBrief, candidates: &[Candidate]) -> String {
    format!(
        r#"Evaluate each of these glucose monitoring system candidates based on:
1. Accuracy (how well the ADC and sensor meet precision needs)
2. Power efficiency (battery life optimization)
3. Cost (component affordability)
4. Reliability (proven components, robustness)

Requirements context:
{requirements}

Candidates to evaluate:
{candidates}

Return a JSON array with an evaluation for each candidate:
- candidate_id
- accuracy_score (0-10)
- power_score (0-10)
- cost_score (0-10)
- reliability_score (0-10)
- overall_score (weighted average)
- feedback (brief improvement suggestions)

Return ONLY valid JSON, no markdown or explanation."#,
        requirements = requirements_context(brief),
        candidates = pretty(candidates),
    )
}

/// Ask for improved versions of the top candidates, guided by their feedback.
pub fn refinement_prompt(
    brief: &DesignBrief,
    top: &[Candidate],
    feedback: &[Evaluation],
) -> String {
    let con = &brief.constraints;
    format!(
        r#"Refine these top {count} glucose monitoring system candidates based on evaluation feedback.

Current top candidates:
{top}

Evaluation feedback:
{feedback}

Requirements:
{requirements}

Constraints:
- ADC bits must be one of: {adc_bits}
- BLE range: {ble_range}

Improve each candidate based on its feedback while respecting constraints.
Keep each candidate's id.
Return a JSON array with the {count} refined candidates (same structure as input).
Return ONLY valid JSON, no markdown or explanation."#,
        count = top.len(),
        top = pretty(top),
        feedback = pretty(feedback),
        requirements = requirements_context(brief),
        adc_bits = con.text_or("adc_bits", "unspecified"),
        ble_range = con.text_or("ble_range", "unspecified"),
    )
}

/// Ask for the single best candidate and a prose rationale.
pub fn selection_prompt(
    brief: &DesignBrief,
    candidates: &[Candidate],
    evaluations: &[Evaluation],
) -> String {
    format!(
        r#"Select the BEST candidate from these refined glucose monitoring system designs.

Final candidates:
{candidates}

Latest evaluations:
{evaluations}

Requirements:
{requirements}

Return a JSON object with:
- top_pick: the complete selected candidate object
- selection_reasoning: a single STRING (not nested object) with 2-3 paragraphs explaining why this is the best choice, considering accuracy, power efficiency, cost, and reliability trade-offs.

Example format:
{{
  "top_pick": {{...candidate object...}},
  "selection_reasoning": "This candidate offers the best balance of..."
}}

Return ONLY valid JSON, no markdown or explanation."#,
        candidates = pretty(candidates),
        evaluations = pretty(evaluations),
        requirements = pretty(&brief.requirements),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_prompt_carries_brief() {
        let prompt = seed_prompt(&DesignBrief::glucose_monitor(), 5);

        assert!(prompt.contains("Generate 5 complete"));
        assert!(prompt.contains("exactly 5 candidates"));
        assert!(prompt.contains("Sampling interval: 5 ± 0.2 min"));
        assert!(prompt.contains("Alert thresholds: <70 / >180 mg/dL"));
        assert!(prompt.contains("ADC bits must be one of: {10,12,14,16}"));
        assert!(prompt.contains("Alert latency requirement: <10s"));
        assert!(prompt.contains("MCU <-> BLE interface allowed: {UART, SPI, I2C}"));
    }

    #[test]
    fn test_seed_prompt_prefers_brief_over_defaults() {
        let mut brief = DesignBrief::glucose_monitor();
        brief.requirements.insert("alert_latency", "<5s");
        let prompt = seed_prompt(&brief, 3);

        assert!(prompt.contains("Alert latency requirement: <5s"));
        assert!(prompt.contains("id (1-3)"));
    }

    #[test]
    fn test_evaluation_prompt_lists_candidates() {
        let candidates = vec![Candidate::new(json!({ "id": 1, "microcontroller": "nRF52832" }))];
        let prompt = evaluation_prompt(&DesignBrief::glucose_monitor(), &candidates);

        assert!(prompt.contains("\"microcontroller\": \"nRF52832\""));
        assert!(prompt.contains("Battery life: >=24h"));
        assert!(prompt.contains("overall_score"));
    }

    #[test]
    fn test_refinement_prompt_counts_top() {
        let top = vec![
            Candidate::new(json!({ "id": 2 })),
            Candidate::new(json!({ "id": 4 })),
        ];
        let prompt = refinement_prompt(&DesignBrief::glucose_monitor(), &top, &[]);

        assert!(prompt.starts_with("Refine these top 2 "));
        assert!(prompt.contains("with the 2 refined candidates"));
        assert!(prompt.contains("BLE range: ≤5m"));
    }

    #[test]
    fn test_selection_prompt_has_literal_braces() {
        let prompt = selection_prompt(&DesignBrief::glucose_monitor(), &[], &[]);
        assert!(prompt.contains("\"top_pick\": {...candidate object...}"));
        assert!(prompt.contains("\"battery_life\": \">=24h\""));
    }
}
