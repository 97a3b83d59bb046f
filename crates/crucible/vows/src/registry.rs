use crate::error::{VowError, VowResult};
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt};
use crucible_types::{Cycle, OpKind, Vow, VowId, VowRule};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A compilation blocked (or flagged) by an active vow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VowViolation {
    pub vow_id: VowId,
    pub text: String,
    pub rule: VowRule,
}

impl std::fmt::Display for VowViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vow {} ({})", self.vow_id, self.text)
    }
}

/// Operator-facing view of one vow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VowStatus {
    pub vow: Vow,
    pub eligible_for_liberation: bool,
    pub cycles_until_eligible: u64,
    pub adherence_ratio: f64,
}

/// Vow Registry (CLA).
pub struct VowRegistry {
    vows: RwLock<Vec<Vow>>,
    ledger: Arc<Ledger>,
    /// Held from the eligibility check until the vow is marked liberated.
    liberation: Mutex<()>,
}

impl VowRegistry {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            vows: RwLock::new(Vec::new()),
            ledger,
            liberation: Mutex::new(()),
        }
    }

    /// Load persisted vows.
    pub async fn open(ledger: Arc<Ledger>) -> VowResult<Self> {
        let vows: Vec<Vow> = ledger.store().list_json(Collection::Vows).await?;
        Ok(Self {
            vows: RwLock::new(vows),
            ledger,
            liberation: Mutex::new(()),
        })
    }

    fn read(&self) -> VowResult<std::sync::RwLockReadGuard<'_, Vec<Vow>>> {
        self.vows.read().map_err(|_| VowError::LockPoisoned)
    }

    fn write(&self) -> VowResult<std::sync::RwLockWriteGuard<'_, Vec<Vow>>> {
        self.vows.write().map_err(|_| VowError::LockPoisoned)
    }

    async fn persist(&self, vow: &Vow) -> VowResult<()> {
        self.ledger
            .store()
            .put_json(Collection::Vows, vow.id.as_str(), vow)
            .await?;
        Ok(())
    }

    pub fn get(&self, id: &VowId) -> VowResult<Vow> {
        self.read()?
            .iter()
            .find(|v| &v.id == id)
            .cloned()
            .ok_or_else(|| VowError::Unknown(id.clone()))
    }

    pub fn all(&self) -> VowResult<Vec<Vow>> {
        Ok(self.read()?.clone())
    }

    /// Active (non-liberated) vows.
    pub fn active(&self) -> VowResult<Vec<Vow>> {
        Ok(self.read()?.iter().filter(|v| v.is_active()).cloned().collect())
    }

    /// Declare a vow at `cycle`. Adherence is logged from then on.
    pub async fn declare_vow(
        &self,
        text: impl Into<String>,
        min_cycles: u64,
        cycle: Cycle,
    ) -> VowResult<Vow> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(VowError::EmptyText);
        }
        let vow = Vow::new(text, min_cycles, cycle);
        self.ledger
            .commit(
                OpKind::VowDeclared,
                &json!({
                    "vow_id": vow.id,
                    "text": vow.text,
                    "rule": vow.rule,
                    "min_cycles": min_cycles,
                    "declared_at_cycle": cycle,
                }),
            )
            .await?;
        self.write()?.push(vow.clone());
        self.persist(&vow).await?;
        info!(vow = %vow.id, min_cycles, "vow declared");
        Ok(vow)
    }

    /// Liberate a vow. Allowed only once `min_cycles` have elapsed since
    /// declaration and with a non-empty justification, which is recorded
    /// verbatim.
    pub async fn request_liberation(
        &self,
        id: &VowId,
        justification: &str,
        current_cycle: Cycle,
    ) -> VowResult<Vow> {
        let _guard = self.liberation.lock().await;
        let vow = self.get(id)?;
        if vow.liberated {
            return Err(VowError::AlreadyLiberated(id.clone()));
        }
        if !vow.eligible_for_liberation(current_cycle) {
            warn!(vow = %id, current_cycle, "liberation requested too early");
            return Err(VowError::TooEarly {
                vow: id.clone(),
                current: current_cycle,
                eligible_at: vow.declared_at_cycle + vow.min_cycles,
            });
        }
        if justification.trim().is_empty() {
            return Err(VowError::EmptyJustification);
        }

        self.ledger
            .commit(
                OpKind::VowLiberated,
                &json!({
                    "vow_id": id,
                    "cycle": current_cycle,
                    "justification": justification,
                }),
            )
            .await?;

        let updated = {
            let mut vows = self.write()?;
            let vow = vows
                .iter_mut()
                .find(|v| &v.id == id)
                .ok_or_else(|| VowError::Unknown(id.clone()))?;
            vow.liberated = true;
            vow.liberation_justification = Some(justification.to_string());
            vow.liberated_at_cycle = Some(current_cycle);
            vow.clone()
        };
        self.persist(&updated).await?;
        info!(vow = %id, current_cycle, "vow liberated");
        Ok(updated)
    }

    /// Active vows that `content` would break. Advisory vows never appear.
    pub fn check(&self, content: &str) -> VowResult<Vec<VowViolation>> {
        Ok(self
            .read()?
            .iter()
            .filter(|v| v.is_active() && v.rule.violated_by(content))
            .map(|v| VowViolation {
                vow_id: v.id.clone(),
                text: v.text.clone(),
                rule: v.rule.clone(),
            })
            .collect())
    }

    /// Phrases active `Require` vows demand in every artifact.
    pub fn required_phrases(&self) -> VowResult<Vec<String>> {
        Ok(self
            .read()?
            .iter()
            .filter(|v| v.is_active())
            .filter_map(|v| match &v.rule {
                VowRule::Require(phrase) => Some(phrase.clone()),
                _ => None,
            })
            .collect())
    }

    /// Log one cycle of adherence for every active vow declared at or before
    /// `cycle`. A vow holds unless it appears in `violated`.
    pub async fn log_adherence(
        &self,
        cycle: Cycle,
        violated: &[VowId],
    ) -> VowResult<BTreeMap<VowId, bool>> {
        let (entries, touched) = {
            let mut vows = self.write()?;
            let mut entries = BTreeMap::new();
            let mut touched = Vec::new();
            for vow in vows
                .iter_mut()
                .filter(|v| v.is_active() && v.declared_at_cycle <= cycle)
            {
                let held = !violated.contains(&vow.id);
                vow.adherence_log.insert(cycle, held);
                entries.insert(vow.id.clone(), held);
                touched.push(vow.clone());
            }
            (entries, touched)
        };
        if entries.is_empty() {
            return Ok(entries);
        }
        self.ledger
            .commit(
                OpKind::VowAdherence,
                &json!({ "cycle": cycle, "adherence": entries }),
            )
            .await?;
        for vow in &touched {
            self.persist(vow).await?;
        }
        Ok(entries)
    }

    pub fn status(&self, current_cycle: Cycle) -> VowResult<Vec<VowStatus>> {
        Ok(self
            .read()?
            .iter()
            .map(|v| VowStatus {
                eligible_for_liberation: !v.liberated && v.eligible_for_liberation(current_cycle),
                cycles_until_eligible: (v.declared_at_cycle + v.min_cycles)
                    .saturating_sub(current_cycle),
                adherence_ratio: v.adherence_ratio(),
                vow: v.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_store::{InMemoryStore, SqliteStore};

    fn registry() -> (Arc<Ledger>, VowRegistry) {
        let ledger = Arc::new(Ledger::new(Arc::new(InMemoryStore::new())));
        (ledger.clone(), VowRegistry::new(ledger))
    }

    #[tokio::test]
    async fn liberation_gated_by_min_cycles() {
        let (ledger, reg) = registry();
        let vow = reg.declare_vow("never use unsafe", 3, 0).await.unwrap();

        let early = reg
            .request_liberation(&vow.id, "a thorough and excellent justification", 2)
            .await;
        assert!(matches!(early, Err(VowError::TooEarly { eligible_at: 3, .. })));

        let empty = reg.request_liberation(&vow.id, "   ", 3).await;
        assert!(matches!(empty, Err(VowError::EmptyJustification)));

        let freed = reg
            .request_liberation(&vow.id, "migrated to checked arithmetic", 3)
            .await
            .unwrap();
        assert!(freed.liberated);
        assert_eq!(
            freed.liberation_justification.as_deref(),
            Some("migrated to checked arithmetic")
        );

        let records = ledger.records_of(OpKind::VowLiberated).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].payload["justification"],
            "migrated to checked arithmetic"
        );
        assert!(matches!(
            reg.request_liberation(&vow.id, "again", 9).await,
            Err(VowError::AlreadyLiberated(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_liberations_record_once() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let ledger = Arc::new(Ledger::new(store));
        let reg = Arc::new(VowRegistry::new(ledger.clone()));
        let vow = reg.declare_vow("never skip review", 0, 0).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                let id = vow.id.clone();
                tokio::spawn(async move {
                    reg.request_liberation(&id, &format!("review tooling replaced ({i})"), 1)
                        .await
                })
            })
            .collect();

        let mut freed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(v) => {
                    assert!(v.liberated);
                    freed += 1;
                }
                Err(e) => assert!(matches!(e, VowError::AlreadyLiberated(_)), "{e}"),
            }
        }
        assert_eq!(freed, 1);
        assert_eq!(ledger.records_of(OpKind::VowLiberated).await.unwrap().len(), 1);
        assert_eq!(reg.get(&vow.id).unwrap().liberated_at_cycle, Some(1));
    }

    #[tokio::test]
    async fn check_only_reports_active_vows() {
        let (_, reg) = registry();
        let vow = reg.declare_vow("never use unsafe", 0, 0).await.unwrap();
        reg.declare_vow("be gentle", 0, 0).await.unwrap();

        let hits = reg.check("we use unsafe blocks").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].vow_id, vow.id);

        reg.request_liberation(&vow.id, "reviewed", 1).await.unwrap();
        assert!(reg.check("we use unsafe blocks").unwrap().is_empty());
    }

    #[tokio::test]
    async fn adherence_logged_per_cycle() {
        let (_, reg) = registry();
        let a = reg.declare_vow("never use unsafe", 1, 1).await.unwrap();
        let b = reg.declare_vow("must cite evidence", 1, 1).await.unwrap();
        let future = reg.declare_vow("avoid panics", 1, 5).await.unwrap();

        let log = reg.log_adherence(2, &[b.id.clone()]).await.unwrap();
        assert_eq!(log.get(&a.id), Some(&true));
        assert_eq!(log.get(&b.id), Some(&false));
        assert!(!log.contains_key(&future.id));
        assert_eq!(reg.get(&b.id).unwrap().adherence_ratio(), 0.0);
    }

    #[tokio::test]
    async fn required_phrases_and_status() {
        let (ledger, reg) = registry();
        reg.declare_vow("must cite evidence", 2, 1).await.unwrap();
        assert_eq!(reg.required_phrases().unwrap(), vec!["cite evidence".to_string()]);
        let status = reg.status(2).unwrap();
        assert_eq!(status[0].cycles_until_eligible, 1);
        assert!(!status[0].eligible_for_liberation);

        let reopened = VowRegistry::open(ledger).await.unwrap();
        assert_eq!(reopened.all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_text_rejected() {
        let (_, reg) = registry();
        assert!(matches!(
            reg.declare_vow(" ", 1, 0).await,
            Err(VowError::EmptyText)
        ));
    }
}
