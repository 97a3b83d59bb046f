use crate::build::{build, kinds_for, BuildInput};
use crate::config::FoundryConfig;
use crate::error::{FoundryError, FoundryResult};
use crate::keys::{verify_signature, SystemKey};
use crate::lint::{lint, vow_findings, LintFinding};
use chrono::Utc;
use crucible_ledger::events::ArtifactPublished;
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt, StoreError};
use crucible_types::{
    digest_of, Artifact, ArtifactId, ArtifactKind, ContentHash, Decision, OpKind, Plan,
    Provenance, StreamId,
};
use crucible_vows::VowRegistry;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-compilation request.
#[derive(Clone, Debug)]
pub struct CompileRequest<'a> {
    pub decision: &'a Decision,
    pub plan: &'a Plan,
    pub domain_tag: &'a str,
    pub stream: &'a StreamId,
    /// Skip the test artifact.
    pub time_critical: bool,
}

/// Linted draft awaiting hash and signature.
#[derive(Clone, Debug)]
pub struct Draft {
    pub kind: ArtifactKind,
    pub content: String,
}

/// Foundry: build, lint, hash, sign, publish.
pub struct Foundry {
    ledger: Arc<Ledger>,
    vows: Arc<VowRegistry>,
    key: SystemKey,
    config: FoundryConfig,
}

impl Foundry {
    pub fn new(ledger: Arc<Ledger>, vows: Arc<VowRegistry>, key: SystemKey, config: FoundryConfig) -> Self {
        Self {
            ledger,
            vows,
            key,
            config,
        }
    }

    /// Load (or create) the system key from the ledger's store.
    pub async fn open(ledger: Arc<Ledger>, vows: Arc<VowRegistry>, config: FoundryConfig) -> FoundryResult<Self> {
        let key = SystemKey::load_or_create(ledger.store().as_ref()).await?;
        Ok(Self::new(ledger, vows, key, config))
    }

    pub fn public_key_hex(&self) -> String {
        self.key.public_key_hex()
    }

    pub fn key(&self) -> &SystemKey {
        &self.key
    }

    /// Build and lint every draft for the decision. Style findings and vow
    /// violations are checked together; the first failing kind aborts.
    pub fn prepare(&self, req: &CompileRequest<'_>) -> FoundryResult<Vec<Draft>> {
        let required = self.vows.required_phrases()?;
        let input = BuildInput {
            decision: req.decision,
            plan: req.plan,
            domain_tag: req.domain_tag,
            required_phrases: &required,
            max_line_length: self.config.max_line_length,
        };
        let mut drafts = Vec::new();
        for kind in kinds_for(req.decision, req.time_critical) {
            let content = build(kind, &input);
            let violations = self.vows.check(&content)?;
            let mut findings: Vec<LintFinding> = lint(kind, &content, self.config.max_line_length);
            findings.extend(vow_findings(&violations));
            if !findings.is_empty() {
                return Err(FoundryError::Validation {
                    kind,
                    findings,
                    violated_vows: violations.into_iter().map(|v| v.vow_id).collect(),
                });
            }
            drafts.push(Draft { kind, content });
        }
        Ok(drafts)
    }

    /// Compile and publish all artifacts for a decision.
    ///
    /// Nothing is published unless every draft passes; a failure is recorded
    /// as `ValidationFailed` and returned as a validation error.
    pub async fn compile(&self, req: &CompileRequest<'_>) -> FoundryResult<Vec<Artifact>> {
        let drafts = match self.prepare(req) {
            Ok(drafts) => drafts,
            Err(e @ FoundryError::Validation { .. }) => {
                if let FoundryError::Validation { kind, findings, violated_vows } = &e {
                    warn!(decision = %req.decision.id, %kind, findings = findings.len(), "artifact failed validation");
                    self.ledger
                        .commit(
                            OpKind::ValidationFailed,
                            &json!({
                                "decision_id": req.decision.id,
                                "plan_id": req.plan.id,
                                "kind": kind,
                                "findings": findings,
                                "violated_vows": violated_vows,
                            }),
                        )
                        .await?;
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let mut artifacts = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let digest = digest_of(&draft.content);
            let signature = self.key.sign(&digest);
            let artifact = Artifact {
                id: ArtifactId::generate(),
                decision_id: req.decision.id.clone(),
                kind: draft.kind,
                content: draft.content,
                digest,
                signature,
                public_key: self.key.public_key_hex(),
                provenance: Provenance {
                    decision_id: req.decision.id.clone(),
                    plan_id: req.plan.id.clone(),
                    catalyst_id: req.decision.catalyst_id.clone(),
                    stream: req.stream.clone(),
                    cycle: req.decision.cycle,
                },
                published_at: Utc::now(),
            };
            self.publish(&artifact).await?;
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }

    /// Write an artifact once and commit its provenance.
    pub async fn publish(&self, artifact: &Artifact) -> FoundryResult<()> {
        let store = self.ledger.store();
        if store
            .get(Collection::Artifacts, artifact.id.as_str())
            .await?
            .is_some()
        {
            return Err(StoreError::Conflict(format!("artifact {} already published", artifact.id)).into());
        }
        store
            .put_json(Collection::Artifacts, artifact.id.as_str(), artifact)
            .await?;
        self.ledger
            .commit(
                OpKind::ArtifactPublished,
                &ArtifactPublished {
                    artifact_id: artifact.id.clone(),
                    decision_id: artifact.provenance.decision_id.clone(),
                    plan_id: artifact.provenance.plan_id.clone(),
                    catalyst_id: artifact.provenance.catalyst_id.clone(),
                    kind: artifact.kind,
                    digest: artifact.digest.clone(),
                    signature: artifact.signature.clone(),
                },
            )
            .await?;
        info!(artifact = %artifact.id, kind = %artifact.kind, digest = %artifact.digest.short(), "artifact published");
        Ok(())
    }
}

/// Digest and signature both check out.
pub fn verify_artifact(artifact: &Artifact) -> bool {
    artifact.verify_digest() && verify_signature(&artifact.digest, &artifact.signature, &artifact.public_key)
}

/// Digest of arbitrary content, as the foundry computes it.
pub fn hash(content: &str) -> ContentHash {
    digest_of(content)
}
