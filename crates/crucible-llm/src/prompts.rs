//! Prompt construction for each generator call.
//!
//! Every prompt demands a bare JSON reply so the parsers in `parse.rs` have
//! something to work with; the parsers still tolerate fenced or prose-wrapped
//! replies.

use crucible_types::{Analysis, Perspective};

pub const SYSTEM: &str = "You are a rigorous startup analyst. You evaluate business ideas \
honestly, without flattery. Reply with a single JSON object and nothing else: \
no markdown fences, no commentary outside the JSON.";

/// Digest of the analyses so far, fed into downstream calls. Narratives are
/// truncated so later prompts stay bounded.
pub fn analyses_digest(analyses: &[Analysis]) -> String {
    let mut out = String::new();
    for a in analyses {
        let score = a
            .score
            .map(|s| format!("{s:.0}"))
            .unwrap_or_else(|| "unscored".into());
        let snippet: String = a.narrative.chars().take(400).collect();
        out.push_str(&format!("- {} ({score}): {snippet}\n", a.perspective));
    }
    out
}

pub fn perspective_prompt(idea: &str, perspective: &Perspective) -> String {
    format!(
        "Evaluate this business idea through the \"{}\" lens.\n\
        Focus: {}\n\n\
        IDEA:\n{}\n\n\
        Reply with JSON: {{\"score\": <0-100 integer>, \"narrative\": \"<3-6 sentence assessment>\", \
        \"refined_idea\": \"<optional one-sentence sharper restatement of the idea>\"}}.\n\
        Only include refined_idea when you can genuinely improve the framing.",
        perspective.label, perspective.focus, idea
    )
}

pub fn viability_prompt(idea: &str, analyses: &[Analysis], initial_score: f64) -> String {
    format!(
        "The core analysis of this idea produced a weak initial score of {:.0}/100.\n\
        Decide whether a full deep-dive is worth running.\n\n\
        IDEA:\n{}\n\n\
        ANALYSES SO FAR:\n{}\n\
        Reply with JSON: {{\"decision\": \"continue\" | \"focus_on_pivots\" | \"stop\", \
        \"reasoning\": \"<2-4 sentences>\", \"flaw_type\": \"<short classification of the \
        dominant flaw, e.g. fatal_market, weak_moat, unit_economics>\"}}.\n\
        Use \"stop\" only when the idea has no viable path forward in any form; \
        use \"focus_on_pivots\" when the core is weak but adjacent framings could work.",
        initial_score, idea, analyses_digest(analyses)
    )
}

pub fn execution_plan_prompt(idea: &str, analyses: &[Analysis]) -> String {
    format!(
        "Write a 90-day execution plan for this idea, grounded in the analysis below.\n\n\
        IDEA:\n{}\n\n\
        ANALYSES:\n{}\n\
        Reply with JSON: {{\"narrative\": \"<the plan as markdown: milestones, first hires, \
        validation experiments, week-by-week for the first month>\"}}.",
        idea,
        analyses_digest(analyses)
    )
}

pub fn marketing_prompt(idea: &str, analyses: &[Analysis]) -> String {
    format!(
        "Write a launch marketing strategy for this idea, grounded in the analysis below.\n\n\
        IDEA:\n{}\n\n\
        ANALYSES:\n{}\n\
        Reply with JSON: {{\"narrative\": \"<the strategy as markdown: positioning, channels, \
        first campaign, one sample headline per channel>\"}}.",
        idea,
        analyses_digest(analyses)
    )
}

pub fn revenue_prompt(idea: &str, analyses: &[Analysis]) -> String {
    format!(
        "Project revenue for this idea over 24 months, grounded in the analysis below.\n\n\
        IDEA:\n{}\n\n\
        ANALYSES:\n{}\n\
        Reply with JSON: {{\"narrative\": \"<the projection as markdown: pricing model, \
        conservative/base/optimistic scenarios, the assumptions behind each>\"}}.",
        idea,
        analyses_digest(analyses)
    )
}

pub fn alternatives_prompt(idea: &str, analyses: &[Analysis]) -> String {
    format!(
        "Suggest 3-5 alternative or adjacent ideas the founder could pivot to, informed by \
        what the analysis below revealed about this one.\n\n\
        IDEA:\n{}\n\n\
        ANALYSES:\n{}\n\
        Reply with JSON: {{\"alternatives\": [{{\"title\": \"<short name>\", \
        \"summary\": \"<2-3 sentences on what it is and why it sidesteps the flaws found>\"}}]}}.",
        idea,
        analyses_digest(analyses)
    )
}
