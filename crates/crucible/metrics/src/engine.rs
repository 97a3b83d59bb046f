use crate::config::StopRuleConfig;
use crate::error::MetricsResult;
use crate::evidence::{EvidenceBody, EvidencePack};
use crate::scores::{compute_snapshot, detect_plateau, LedgerFacts};
use crate::stop_rule::{evaluate, StopRuleEvaluation};
use crucible_foundry::SystemKey;
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt};
use crucible_types::{Cycle, ErrorClass, Heuristic, MetricsSnapshot, OpKind, Scaffold, StreamId};
use std::sync::Arc;
use tracing::{error, info};

/// Storage key of the snapshot for `cycle`; zero-padded so keys sort by cycle.
fn snapshot_key(cycle: Cycle) -> String {
    format!("{cycle:012}")
}

/// Metrics Engine: composite scores, plateau detection and the Stop Rule.
pub struct MetricsEngine {
    ledger: Arc<Ledger>,
    config: StopRuleConfig,
}

impl MetricsEngine {
    pub fn new(ledger: Arc<Ledger>, config: StopRuleConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &StopRuleConfig {
        &self.config
    }

    pub async fn facts(&self) -> MetricsResult<LedgerFacts> {
        Ok(LedgerFacts::from_records(&self.ledger.records().await?))
    }

    /// Compute (without recording) the snapshot for `cycle`.
    pub async fn snapshot(
        &self,
        cycle: Cycle,
        heuristics: &[Heuristic],
        scaffolds: &[Scaffold],
    ) -> MetricsResult<MetricsSnapshot> {
        let facts = self.facts().await?;
        Ok(compute_snapshot(cycle, &facts, heuristics, scaffolds))
    }

    /// Store a snapshot and commit it to the ledger.
    pub async fn record(&self, snapshot: &MetricsSnapshot) -> MetricsResult<()> {
        self.ledger
            .store()
            .put_json(Collection::MetricsSnapshots, &snapshot_key(snapshot.cycle), snapshot)
            .await?;
        self.ledger.commit(OpKind::MetricsSnapshot, snapshot).await?;
        info!(cycle = snapshot.cycle, scores = ?snapshot.scores, "metrics snapshot");
        Ok(())
    }

    /// Every recorded snapshot, oldest cycle first.
    pub async fn history(&self) -> MetricsResult<Vec<MetricsSnapshot>> {
        let mut history: Vec<MetricsSnapshot> = self
            .ledger
            .store()
            .list_json(Collection::MetricsSnapshots)
            .await?;
        history.sort_by_key(|s| s.cycle);
        Ok(history)
    }

    pub async fn latest(&self) -> MetricsResult<Option<MetricsSnapshot>> {
        Ok(self.history().await?.pop())
    }

    pub async fn plateau(&self, cycle: Cycle) -> MetricsResult<bool> {
        let facts = self.facts().await?;
        Ok(detect_plateau(
            &facts,
            cycle,
            self.config.trend_window,
            self.config.plateau_epsilon,
        ))
    }

    /// Stop Rule over the recorded history up to and including `cycle`.
    pub async fn evaluate(&self, cycle: Cycle) -> MetricsResult<StopRuleEvaluation> {
        let mut history = self.history().await?;
        history.retain(|s| s.cycle <= cycle);
        let facts = self.facts().await?;
        Ok(evaluate(&self.config, cycle, &history, &facts))
    }

    /// Seal an evidence pack for a halting stream.
    ///
    /// The chain is verified as part of sealing; a broken chain is recorded
    /// in the pack rather than raised, so the pack documents what was found.
    pub async fn evidence_pack(
        &self,
        stream: &StreamId,
        cycle: Cycle,
        evaluation: StopRuleEvaluation,
        key: &SystemKey,
    ) -> MetricsResult<EvidencePack> {
        let (chain_verified, chain_entries, chain_tip) = match self.ledger.verify_chain().await {
            Ok(report) => (true, report.entries, report.tip),
            Err(e) if e.class() == ErrorClass::IntegrityError => {
                error!(error = %e, "evidence pack sealed over a broken chain");
                let tip = self.ledger.tip().await?;
                (false, self.ledger.len().await?, tip.map(|t| t.hash))
            }
            Err(e) => return Err(e.into()),
        };
        let facts = self.facts().await?;
        let snapshot = self
            .latest()
            .await?
            .unwrap_or_else(|| MetricsSnapshot::new(cycle));
        let body = EvidenceBody {
            stream: stream.clone(),
            cycle,
            snapshot,
            evaluation,
            chain_entries,
            chain_tip,
            chain_verified,
            artifact_ids: facts.artifacts,
            liberations: facts.liberations,
        };
        let pack = EvidencePack::seal(body, key)?;
        info!(digest = %pack.digest.short(), "evidence pack sealed");
        Ok(pack)
    }
}
