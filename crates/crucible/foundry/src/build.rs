use crucible_types::{ArtifactKind, Decision, Plan};

/// Everything a draft is built from.
#[derive(Clone, Copy, Debug)]
pub struct BuildInput<'a> {
    pub decision: &'a Decision,
    pub plan: &'a Plan,
    pub domain_tag: &'a str,
    /// Phrases active vows require in every artifact.
    pub required_phrases: &'a [String],
    pub max_line_length: usize,
}

impl BuildInput<'_> {
    fn title(&self) -> String {
        format!("{} catalyst {}", self.domain_tag, self.decision.catalyst_id)
    }

    fn steps(&self) -> Vec<&str> {
        let body = self
            .plan
            .synthesis_text
            .split(" Open check:")
            .next()
            .unwrap_or_default();
        body.split(';')
            .map(|s| s.trim().trim_end_matches('.'))
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn open_check(&self) -> Option<&str> {
        self.plan
            .synthesis_text
            .split_once(" Open check:")
            .map(|(_, q)| q.trim())
    }
}

/// Kinds compiled for a decision.
pub fn kinds_for(decision: &Decision, time_critical: bool) -> Vec<ArtifactKind> {
    if !decision.accepted {
        return vec![ArtifactKind::Report];
    }
    let mut kinds = vec![ArtifactKind::Spec, ArtifactKind::Code];
    if !time_critical {
        kinds.push(ArtifactKind::Test);
    }
    kinds.push(ArtifactKind::Report);
    kinds
}

/// Draft content for one kind. Deterministic in its input.
pub fn build(kind: ArtifactKind, input: &BuildInput<'_>) -> String {
    let mut out = vec![format!("# {}: {}", kind, input.title()), String::new()];
    match kind {
        ArtifactKind::Spec => spec(input, &mut out),
        ArtifactKind::Code => code(input, &mut out),
        ArtifactKind::Test => test(input, &mut out),
        ArtifactKind::Report => report(input, &mut out),
    }
    let mut content = out.join("\n");
    content.push('\n');
    content
}

fn spec(input: &BuildInput<'_>, out: &mut Vec<String>) {
    let width = input.max_line_length;
    out.push("## Steps".into());
    for (i, step) in input.steps().iter().enumerate() {
        out.extend(wrap(step, width, &format!("{}. ", i + 1), "   "));
    }
    out.push(String::new());
    out.push("## Rationale".into());
    if let Some(conflict) = &input.plan.resolved_conflict {
        out.extend(wrap(
            &format!(
                "{} vs {}: {}",
                conflict.agent_a, conflict.agent_b, conflict.description
            ),
            width,
            "",
            "",
        ));
    }
    if let Some(q) = input.open_check() {
        out.push(String::new());
        out.push("## Open check".into());
        out.extend(wrap(q, width, "", ""));
    }
    constraints_markdown(input, out);
}

fn code(input: &BuildInput<'_>, out: &mut Vec<String>) {
    let width = input.max_line_length;
    let steps = input.steps();
    out.push(format!("// decision {} (plan {})", input.decision.id, input.plan.id));
    for phrase in input.required_phrases {
        out.extend(wrap(phrase, width, "// constraint: ", "//   "));
    }
    out.push(format!("pub fn {}() -> &'static [&'static str] {{", fn_name(input)));
    out.push("    &[".into());
    for step in &steps {
        let escaped = step.replace('\\', "\\\\").replace('"', "\\\"");
        out.extend(wrap_literal(&escaped, width, "        "));
    }
    out.push("    ]".into());
    out.push("}".into());
}

fn test(input: &BuildInput<'_>, out: &mut Vec<String>) {
    let name = fn_name(input);
    out.push(format!("// covers decision {}", input.decision.id));
    for phrase in input.required_phrases {
        out.extend(wrap(phrase, input.max_line_length, "// constraint: ", "//   "));
    }
    out.push("#[test]".into());
    out.push(format!("fn {}_lists_every_step() {{", name));
    out.push(format!("    assert_eq!({}().len(), {});", name, input.steps().len()));
    out.push("}".into());
}

fn report(input: &BuildInput<'_>, out: &mut Vec<String>) {
    let d = input.decision;
    let width = input.max_line_length;
    out.push("## Outcome".into());
    out.push(format!(
        "{} at confidence {:.3} (threshold {:.3}, retries {})",
        if d.accepted { "accepted" } else { "not accepted" },
        d.confidence,
        d.threshold_used,
        d.retries_consumed
    ));
    out.push(String::new());
    out.push("## Thesis".into());
    out.extend(wrap(&input.plan.thesis, width, "", ""));
    if let Some(anti) = &input.plan.antithesis {
        out.push(String::new());
        out.push("## Antithesis".into());
        out.extend(wrap(anti, width, "", ""));
    }
    out.push(String::new());
    out.push("## Provenance".into());
    out.push(format!("- catalyst: {}", d.catalyst_id));
    out.push(format!("- plan: {}", d.plan_id));
    out.push(format!("- decision: {}", d.id));
    constraints_markdown(input, out);
}

fn constraints_markdown(input: &BuildInput<'_>, out: &mut Vec<String>) {
    if input.required_phrases.is_empty() {
        return;
    }
    out.push(String::new());
    out.push("## Constraints".into());
    for phrase in input.required_phrases {
        out.extend(wrap(phrase, input.max_line_length, "- ", "  "));
    }
}

fn fn_name(input: &BuildInput<'_>) -> String {
    let ident: String = input
        .domain_tag
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let ident = ident.trim_matches('_');
    if ident.is_empty() {
        "resolution_steps".into()
    } else {
        format!("{}_resolution_steps", ident)
    }
}

/// Greedy word wrap; `first` prefixes the first line, `rest` the others.
fn wrap(text: &str, width: usize, first: &str, rest: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = first.to_string();
    let mut empty = true;
    for word in text.split_whitespace() {
        if !empty && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::replace(&mut line, rest.to_string()));
            empty = true;
        }
        if !empty {
            line.push(' ');
        }
        line.push_str(word);
        empty = false;
    }
    if !empty {
        lines.push(line);
    }
    lines
}

/// Wrap a string literal as adjacent `concat!` pieces.
fn wrap_literal(text: &str, width: usize, indent: &str) -> Vec<String> {
    let budget = width.saturating_sub(indent.len() + 16).max(16);
    let pieces = wrap(text, budget, "", "");
    if pieces.len() <= 1 {
        return vec![format!("{indent}\"{}\",", pieces.first().map(String::as_str).unwrap_or_default())];
    }
    let mut out = vec![format!("{indent}concat!(")];
    let last = pieces.len() - 1;
    for (i, piece) in pieces.iter().enumerate() {
        let sep = if i == last { "" } else { " " };
        out.push(format!("{indent}    \"{piece}{sep}\","));
    }
    out.push(format!("{indent}),"));
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use crucible_types::{
        AgentOutputs, CatalystId, Decision, DecisionId, Plan, PlanId, ResolvedConflict, RoleKind,
        RoleOutput, Stance,
    };

    pub(crate) fn plan_and_decision(accepted: bool) -> (Plan, Decision) {
        let out = |r, s| RoleOutput::new(r, s, "x", 0.8);
        let plan = Plan {
            id: PlanId::generate(),
            catalyst_id: CatalystId::generate(),
            cycle: 3,
            thesis: "contain the latency anomaly by isolating checkout behind a guarded path for latency; keep a rollback path ready before the change ships.".into(),
            antithesis: None,
            synthesis_text: format!(
                "contain the latency anomaly by isolating checkout behind a guarded path for latency; keep a rollback path ready before the change ships; apply the rule '{}'. Open check: Which hidden assumption links latency to checkout?",
                "warm every cache shard ".repeat(12).trim()
            ),
            confidence: 0.8,
            agent_outputs: AgentOutputs {
                innovator: out(RoleKind::Innovator, Stance::Propose),
                falsifier: out(RoleKind::Falsifier, Stance::Approve),
                narrator: out(RoleKind::Narrator, Stance::Approve),
                provocateur: out(RoleKind::Provocateur, Stance::Question),
            },
            resolved_conflict: Some(ResolvedConflict {
                agent_a: RoleKind::Innovator,
                agent_b: RoleKind::Provocateur,
                description: "question carried as an open check".into(),
            }),
            attempt: 0,
            created_at: Utc::now(),
        };
        let decision = Decision {
            id: DecisionId::generate(),
            plan_id: plan.id.clone(),
            catalyst_id: plan.catalyst_id.clone(),
            cycle: 3,
            accepted,
            threshold_used: 0.7,
            retries_consumed: 0,
            confidence: 0.8,
            decided_at: Utc::now(),
        };
        (plan, decision)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::plan_and_decision;
    use super::*;
    use crate::lint::lint;

    #[test]
    fn every_kind_lints_clean() {
        let (plan, decision) = plan_and_decision(true);
        let phrases = vec!["cite evidence".to_string()];
        let input = BuildInput {
            decision: &decision,
            plan: &plan,
            domain_tag: "latency",
            required_phrases: &phrases,
            max_line_length: 120,
        };
        for kind in kinds_for(&decision, false) {
            let content = build(kind, &input);
            assert!(lint(kind, &content, 120).is_empty(), "{kind}:\n{content}");
            assert!(content.contains("cite evidence"));
        }
    }

    #[test]
    fn build_is_deterministic() {
        let (plan, decision) = plan_and_decision(true);
        let input = BuildInput {
            decision: &decision,
            plan: &plan,
            domain_tag: "latency",
            required_phrases: &[],
            max_line_length: 120,
        };
        assert_eq!(build(ArtifactKind::Spec, &input), build(ArtifactKind::Spec, &input));
    }

    #[test]
    fn kinds_follow_acceptance_and_urgency() {
        let (_, accepted) = plan_and_decision(true);
        let (_, rejected) = plan_and_decision(false);
        assert_eq!(kinds_for(&accepted, false).len(), 4);
        assert!(!kinds_for(&accepted, true).contains(&ArtifactKind::Test));
        assert_eq!(kinds_for(&rejected, false), vec![ArtifactKind::Report]);
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap(&"word ".repeat(50), 20, "- ", "  ");
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert!(lines[0].starts_with("- "));
        assert!(lines[1].starts_with("  word"));
    }

    #[test]
    fn fn_name_sanitizes_domain() {
        let (plan, decision) = plan_and_decision(true);
        let input = BuildInput {
            decision: &decision,
            plan: &plan,
            domain_tag: "<domain>",
            required_phrases: &[],
            max_line_length: 120,
        };
        assert_eq!(fn_name(&input), "domain_resolution_steps");
    }
}
