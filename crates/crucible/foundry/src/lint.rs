use crucible_types::ArtifactKind;
use crucible_vows::VowViolation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintRule {
    Empty,
    Header,
    LineLength,
    TrailingWhitespace,
    Fixme,
    MissingMarker,
    Vow,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFinding {
    pub rule: LintRule,
    /// 1-based line, when the finding points at one.
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl LintFinding {
    fn new(rule: LintRule, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            rule,
            line,
            message: message.into(),
        }
    }
}

/// Style and structure rules. An empty result passes.
pub fn lint(kind: ArtifactKind, content: &str, max_line_length: usize) -> Vec<LintFinding> {
    if content.trim().is_empty() {
        return vec![LintFinding::new(LintRule::Empty, None, "content is empty")];
    }
    let mut findings = Vec::new();

    let header = format!("# {}: ", kind);
    match content.lines().next() {
        Some(first) if first.starts_with(&header) && first.len() > header.len() => {}
        _ => findings.push(LintFinding::new(
            LintRule::Header,
            Some(1),
            format!("first line must be '{}<title>'", header),
        )),
    }

    for (idx, line) in content.lines().enumerate() {
        let n = idx + 1;
        let width = line.chars().count();
        if width > max_line_length {
            findings.push(LintFinding::new(
                LintRule::LineLength,
                Some(n),
                format!("{} characters exceeds {}", width, max_line_length),
            ));
        }
        if line.ends_with(' ') || line.ends_with('\t') {
            findings.push(LintFinding::new(
                LintRule::TrailingWhitespace,
                Some(n),
                "trailing whitespace",
            ));
        }
        if line.contains("FIXME") {
            findings.push(LintFinding::new(LintRule::Fixme, Some(n), "unresolved FIXME"));
        }
    }

    let marker = kind.required_marker();
    if !content.contains(marker) {
        findings.push(LintFinding::new(
            LintRule::MissingMarker,
            None,
            format!("{} artifact must contain '{}'", kind, marker.trim_end()),
        ));
    }
    findings
}

/// Findings for vows the content breaks.
pub fn vow_findings(violations: &[VowViolation]) -> Vec<LintFinding> {
    violations
        .iter()
        .map(|v| LintFinding::new(LintRule::Vow, None, format!("violates {}", v)))
        .collect()
}
