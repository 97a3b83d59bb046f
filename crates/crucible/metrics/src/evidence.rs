use crate::error::MetricsResult;
use crate::scores::Liberation;
use crate::stop_rule::StopRuleEvaluation;
use chrono::{DateTime, Utc};
use crucible_foundry::{verify_signature, SystemKey};
use crucible_types::{ArtifactId, ContentHash, Cycle, MetricsSnapshot, StreamId};
use serde::{Deserialize, Serialize};

/// What the evidence pack attests to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBody {
    pub stream: StreamId,
    pub cycle: Cycle,
    pub snapshot: MetricsSnapshot,
    pub evaluation: StopRuleEvaluation,
    pub chain_entries: u64,
    pub chain_tip: Option<ContentHash>,
    pub chain_verified: bool,
    pub artifact_ids: Vec<ArtifactId>,
    pub liberations: Vec<Liberation>,
}

/// Content-addressed, signed record emitted when the Stop Rule halts a
/// stream.
///
/// The digest covers the body only; the signature is over the digest bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    pub digest: ContentHash,
    pub body: EvidenceBody,
    pub signature: String,
    pub public_key: String,
    pub sealed_at: DateTime<Utc>,
}

impl EvidencePack {
    pub fn seal(body: EvidenceBody, key: &SystemKey) -> MetricsResult<Self> {
        let digest = ContentHash::of_json(&body)?;
        Ok(Self {
            signature: key.sign(&digest),
            public_key: key.public_key_hex(),
            digest,
            body,
            sealed_at: Utc::now(),
        })
    }

    pub fn verify_hash(&self) -> bool {
        ContentHash::of_json(&self.body).is_ok_and(|d| d == self.digest)
    }

    pub fn verify(&self) -> bool {
        self.verify_hash() && verify_signature(&self.digest, &self.signature, &self.public_key)
    }

    pub fn summary(&self) -> String {
        format!(
            "cycle {} on {}: {} artifacts, {} liberations, chain {} ({} entries)",
            self.body.cycle,
            self.body.stream,
            self.body.artifact_ids.len(),
            self.body.liberations.len(),
            if self.body.chain_verified { "verified" } else { "BROKEN" },
            self.body.chain_entries
        )
    }
}
