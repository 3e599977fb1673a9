//! Export rendering: JSON and a human-readable Markdown report.

use std::fmt::Write;

use crucible_types::{Result, SessionDetail};

pub fn to_json(detail: &SessionDetail) -> Result<String> {
    Ok(serde_json::to_string_pretty(detail)?)
}

pub fn to_markdown(detail: &SessionDetail) -> String {
    let session = &detail.session;
    let mut out = String::new();

    // Infallible: writing to a String cannot fail.
    let _ = writeln!(out, "# {}", session.title);
    let _ = writeln!(out);
    let _ = writeln!(out, "> {}", session.raw_idea.trim());
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Status:** {}", session.status.as_str());
    if let Some(score) = session.overall_score {
        let _ = writeln!(out, "- **Overall score:** {score:.0}/100");
    }
    if let Some(rec) = session.recommendation {
        let _ = writeln!(out, "- **Recommendation:** {}", rec.as_str());
    }
    if let Some(reason) = &session.early_exit_reason {
        let _ = writeln!(out, "- **Analysis halted early:** {reason}");
    }
    if let Some(flaw) = &session.flaw_type {
        let _ = writeln!(out, "- **Dominant flaw:** {flaw}");
    }
    if let Some(refined) = &session.refined_idea {
        let _ = writeln!(out, "- **Refined framing:** {refined}");
    }
    let _ = writeln!(out);

    if !detail.analyses.is_empty() {
        let _ = writeln!(out, "## Scores");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Perspective | Score |");
        let _ = writeln!(out, "|---|---|");
        for a in &detail.analyses {
            let score = a
                .score
                .map(|s| format!("{s:.0}"))
                .unwrap_or_else(|| "—".into());
            let _ = writeln!(out, "| {} | {score} |", a.perspective);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Perspectives");
        let _ = writeln!(out);
        for a in &detail.analyses {
            let _ = writeln!(out, "### {}", a.perspective);
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", a.narrative.trim());
            let _ = writeln!(out);
        }
    }

    for artifact in &detail.artifacts {
        let heading = match artifact.kind.stage_name() {
            "execution_plan" => "Execution plan",
            "marketing" => "Marketing strategy",
            "revenue_projection" => "Revenue projection",
            other => other,
        };
        let _ = writeln!(out, "## {heading}");
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", artifact.content.trim());
        let _ = writeln!(out);
    }

    if !detail.alternatives.is_empty() {
        let _ = writeln!(out, "## Alternatives worth considering");
        let _ = writeln!(out);
        for alt in &detail.alternatives {
            let _ = writeln!(out, "- **{}** — {}", alt.title, alt.summary.trim());
        }
        let _ = writeln!(out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_types::{
        Alternative, Analysis, Artifact, ArtifactKind, Recommendation, Session,
    };

    fn sample_detail() -> SessionDetail {
        let mut session = Session::new("Robot barista carts for office parks.");
        session.overall_score = Some(68.0);
        session.recommendation = Some(Recommendation::Refine);
        session.complete();
        let id = session.id;
        SessionDetail {
            session,
            analyses: vec![
                Analysis::new(id, "first_principles", Some(70.0), "Solid core.".into(), None),
                Analysis::new(id, "financial", None, "Unclear margins.".into(), None),
            ],
            artifacts: vec![Artifact::new(
                id,
                ArtifactKind::ExecutionPlan,
                "Week 1: build the cart.".into(),
            )],
            alternatives: vec![Alternative::new(
                id,
                "Office kiosks".into(),
                "Sell to offices.".into(),
            )],
        }
    }

    #[test]
    fn markdown_report_carries_every_section() {
        let md = to_markdown(&sample_detail());
        assert!(md.starts_with("# Robot barista carts for office parks\n"));
        assert!(md.contains("**Overall score:** 68/100"));
        assert!(md.contains("**Recommendation:** refine"));
        assert!(md.contains("| first_principles | 70 |"));
        assert!(md.contains("| financial | — |"));
        assert!(md.contains("### financial"));
        assert!(md.contains("## Execution plan"));
        assert!(md.contains("Week 1: build the cart."));
        assert!(md.contains("- **Office kiosks** — Sell to offices."));
    }

    #[test]
    fn markdown_omits_empty_sections() {
        let mut detail = sample_detail();
        detail.artifacts.clear();
        detail.alternatives.clear();
        let md = to_markdown(&detail);
        assert!(!md.contains("## Execution plan"));
        assert!(!md.contains("## Alternatives"));
    }

    #[test]
    fn json_export_is_parseable_and_complete() {
        let json = to_json(&sample_detail()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["session"]["status"], "completed");
        assert_eq!(value["analyses"].as_array().unwrap().len(), 2);
        assert_eq!(value["artifacts"][0]["kind"], "execution_plan");
    }
}
