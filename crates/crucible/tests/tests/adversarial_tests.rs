#[path = "adversarial/tamper_ledger.rs"]
mod tamper_ledger;

#[path = "adversarial/forge_artifact.rs"]
mod forge_artifact;

#[path = "adversarial/collusion.rs"]
mod collusion;
