//! Tolerant parsing of generator payloads.
//!
//! Providers return free text that is supposed to contain a JSON object.
//! Perspective payloads degrade gracefully: a body with no usable JSON
//! becomes a narrative-only report with no score. Gate and alternatives
//! payloads must carry their structured fields, so those parsers fail and
//! the pipeline skips the stage.

use crucible_types::{CrucibleError, GateDecision, Result};

use crate::{AlternativeIdea, PerspectiveReport, ViabilityVerdict};

/// Strip a surrounding Markdown code fence, if present.
fn strip_code_fences(text: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.len() > 2
        && lines[0].starts_with("```")
        && lines.last().map_or(false, |l| l.trim() == "```")
    {
        lines[1..lines.len() - 1].join("\n")
    } else {
        text.trim().to_string()
    }
}

/// Extract the JSON value embedded in a model reply: the whole body, the
/// fence-stripped body, or the outermost `{...}` span, in that order.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    if let Ok(v) = serde_json::from_str(text.trim()) {
        return Some(v);
    }
    let stripped = strip_code_fences(text);
    if let Ok(v) = serde_json::from_str(&stripped) {
        return Some(v);
    }
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

/// Read a 0-100 score from a payload field. Numbers and numeric strings are
/// accepted; anything else is absence.
fn read_score(value: &serde_json::Value) -> Option<f64> {
    let n = match &value["score"] {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.clamp(0.0, 100.0))
}

/// Parse a perspective payload. Never fails: a body with no JSON becomes a
/// narrative-only report.
pub fn parse_perspective_report(text: &str) -> PerspectiveReport {
    match extract_json(text) {
        Some(json) => {
            let score = read_score(&json);
            let narrative = json["narrative"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| text.trim().to_string());
            PerspectiveReport {
                score,
                narrative,
                detail: Some(json),
            }
        }
        None => PerspectiveReport {
            score: None,
            narrative: text.trim().to_string(),
            detail: None,
        },
    }
}

/// Parse the viability verdict. Requires a recognizable `decision` field.
pub fn parse_viability_verdict(text: &str) -> Result<ViabilityVerdict> {
    let json = extract_json(text).ok_or_else(|| CrucibleError::MalformedPayload {
        call: "viability".into(),
        message: "no JSON object in reply".into(),
    })?;

    let decision = json["decision"]
        .as_str()
        .and_then(GateDecision::parse)
        .ok_or_else(|| CrucibleError::MalformedPayload {
            call: "viability".into(),
            message: "missing or unrecognized decision".into(),
        })?;

    let reasoning = json["reasoning"]
        .as_str()
        .or_else(|| json["narrative"].as_str())
        .unwrap_or("")
        .to_string();
    let flaw_type = json["flaw_type"].as_str().map(str::to_string);

    Ok(ViabilityVerdict {
        decision,
        reasoning,
        flaw_type,
        raw: json,
    })
}

/// Parse the alternatives payload: either `{"alternatives": [...]}` or a
/// bare array of `{title, summary}` objects.
pub fn parse_alternatives(text: &str) -> Result<Vec<AlternativeIdea>> {
    let json = extract_json_array_or_object(text).ok_or_else(|| CrucibleError::MalformedPayload {
        call: "alternatives".into(),
        message: "no JSON in reply".into(),
    })?;

    let items = match &json {
        serde_json::Value::Array(arr) => arr.as_slice(),
        serde_json::Value::Object(_) => json["alternatives"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    let alternatives: Vec<AlternativeIdea> = items
        .iter()
        .filter_map(|item| {
            let title = item["title"].as_str()?.to_string();
            let summary = item["summary"]
                .as_str()
                .or_else(|| item["description"].as_str())
                .unwrap_or("")
                .to_string();
            Some(AlternativeIdea { title, summary })
        })
        .collect();

    if alternatives.is_empty() {
        return Err(CrucibleError::MalformedPayload {
            call: "alternatives".into(),
            message: "no usable alternative entries".into(),
        });
    }
    Ok(alternatives)
}

fn extract_json_array_or_object(text: &str) -> Option<serde_json::Value> {
    if let Some(v) = extract_json(text) {
        return Some(v);
    }
    // Bare top-level array, which extract_json's `{`-scan misses.
    let stripped = strip_code_fences(text);
    let start = stripped.find('[')?;
    let end = stripped.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- extract_json ---

    #[test]
    fn extract_json_plain_object() {
        let v = extract_json(r#"{"score": 70}"#).unwrap();
        assert_eq!(v["score"], 70);
    }

    #[test]
    fn extract_json_inside_fences() {
        let text = "```json\n{\"score\": 55, \"narrative\": \"ok\"}\n```";
        let v = extract_json(text).unwrap();
        assert_eq!(v["score"], 55);
    }

    #[test]
    fn extract_json_with_surrounding_prose() {
        let text = "Here is my evaluation:\n{\"score\": 33}\nHope that helps!";
        let v = extract_json(text).unwrap();
        assert_eq!(v["score"], 33);
    }

    #[test]
    fn extract_json_none_for_prose() {
        assert!(extract_json("no structure here at all").is_none());
    }

    // --- parse_perspective_report ---

    #[test]
    fn perspective_report_reads_score_and_narrative() {
        let r = parse_perspective_report(r#"{"score": 72, "narrative": "Strong moat."}"#);
        assert_eq!(r.score, Some(72.0));
        assert_eq!(r.narrative, "Strong moat.");
        assert!(r.detail.is_some());
    }

    #[test]
    fn perspective_report_clamps_score() {
        let r = parse_perspective_report(r#"{"score": 140, "narrative": "n"}"#);
        assert_eq!(r.score, Some(100.0));
        let r = parse_perspective_report(r#"{"score": -3, "narrative": "n"}"#);
        assert_eq!(r.score, Some(0.0));
    }

    #[test]
    fn perspective_report_accepts_string_score() {
        let r = parse_perspective_report(r#"{"score": "64", "narrative": "n"}"#);
        assert_eq!(r.score, Some(64.0));
    }

    #[test]
    fn perspective_report_missing_score_is_none() {
        let r = parse_perspective_report(r#"{"narrative": "n"}"#);
        assert_eq!(r.score, None);
    }

    #[test]
    fn perspective_report_degrades_to_narrative_only() {
        let r = parse_perspective_report("This idea is mediocre, frankly.");
        assert_eq!(r.score, None);
        assert_eq!(r.narrative, "This idea is mediocre, frankly.");
        assert!(r.detail.is_none());
    }

    #[test]
    fn perspective_report_nonsense_score_is_none() {
        let r = parse_perspective_report(r#"{"score": "seventy", "narrative": "n"}"#);
        assert_eq!(r.score, None);
    }

    // --- parse_viability_verdict ---

    #[test]
    fn viability_verdict_parses_stop() {
        let v = parse_viability_verdict(
            r#"{"decision": "stop", "reasoning": "no market", "flaw_type": "fatal_market"}"#,
        )
        .unwrap();
        assert_eq!(v.decision, GateDecision::Stop);
        assert_eq!(v.reasoning, "no market");
        assert_eq!(v.flaw_type.as_deref(), Some("fatal_market"));
        assert_eq!(v.raw["decision"], "stop");
    }

    #[test]
    fn viability_verdict_parses_pivot_focus() {
        let v = parse_viability_verdict(r#"{"decision": "focus_on_pivots", "reasoning": "r"}"#)
            .unwrap();
        assert_eq!(v.decision, GateDecision::PivotFocus);
    }

    #[test]
    fn viability_verdict_rejects_missing_decision() {
        let err = parse_viability_verdict(r#"{"reasoning": "hmm"}"#).unwrap_err();
        assert!(matches!(err, CrucibleError::MalformedPayload { .. }));
    }

    #[test]
    fn viability_verdict_rejects_prose() {
        assert!(parse_viability_verdict("I think you should stop.").is_err());
    }

    // --- parse_alternatives ---

    #[test]
    fn alternatives_from_wrapped_object() {
        let alts = parse_alternatives(
            r#"{"alternatives": [
                {"title": "B2B version", "summary": "Sell to offices"},
                {"title": "Marketplace", "description": "Two-sided"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[0].title, "B2B version");
        assert_eq!(alts[1].summary, "Two-sided");
    }

    #[test]
    fn alternatives_from_bare_array() {
        let alts =
            parse_alternatives(r#"[{"title": "A", "summary": "a"}, {"title": "B", "summary": "b"}]"#)
                .unwrap();
        assert_eq!(alts.len(), 2);
    }

    #[test]
    fn alternatives_empty_is_error() {
        assert!(parse_alternatives(r#"{"alternatives": []}"#).is_err());
        assert!(parse_alternatives("nothing structured").is_err());
    }
}
