use crate::hash::ContentHash;
use crate::ids::{ArtifactId, CatalystId, Cycle, DecisionId, PlanId, StreamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Code,
    Spec,
    Test,
    Report,
}

impl ArtifactKind {
    /// Section marker the linter requires in content of this kind.
    pub fn required_marker(&self) -> &'static str {
        match self {
            Self::Spec => "## Rationale",
            Self::Code => "fn ",
            Self::Test => "#[test]",
            Self::Report => "## Outcome",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Spec => write!(f, "spec"),
            Self::Test => write!(f, "test"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// Provenance manifest emitted with every published artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub decision_id: DecisionId,
    pub plan_id: PlanId,
    pub catalyst_id: CatalystId,
    pub stream: StreamId,
    pub cycle: Cycle,
}

/// Compiled, signed output of the foundry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub decision_id: DecisionId,
    pub kind: ArtifactKind,
    pub content: String,
    /// BLAKE3 of `content` only.
    pub digest: ContentHash,
    /// Hex-encoded ed25519 signature over the digest bytes.
    pub signature: String,
    /// Hex-encoded ed25519 verifying key.
    pub public_key: String,
    pub provenance: Provenance,
    pub published_at: DateTime<Utc>,
}

impl Artifact {
    pub fn verify_digest(&self) -> bool {
        digest_of(&self.content) == self.digest
    }
}

/// Content digest of an artifact body.
pub fn digest_of(content: &str) -> ContentHash {
    ContentHash::hash(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_content_only() {
        assert_eq!(digest_of("fn main() {}"), digest_of("fn main() {}"));
        assert_ne!(digest_of("a"), digest_of("b"));
    }

    #[test]
    fn verify_digest_detects_edits() {
        let mut artifact = Artifact {
            id: ArtifactId::generate(),
            decision_id: DecisionId::generate(),
            kind: ArtifactKind::Report,
            content: "# report: x\n## Outcome\nok".into(),
            digest: digest_of("# report: x\n## Outcome\nok"),
            signature: String::new(),
            public_key: String::new(),
            provenance: Provenance {
                decision_id: DecisionId::new("dec-1"),
                plan_id: PlanId::new("plan-1"),
                catalyst_id: CatalystId::new("cat-1"),
                stream: StreamId::primary(),
                cycle: 1,
            },
            published_at: Utc::now(),
        };
        assert!(artifact.verify_digest());
        artifact.content.push('!');
        assert!(!artifact.verify_digest());
    }

    #[test]
    fn markers_per_kind() {
        assert_eq!(ArtifactKind::Test.required_marker(), "#[test]");
        assert_eq!(ArtifactKind::Report.to_string(), "report");
    }
}
