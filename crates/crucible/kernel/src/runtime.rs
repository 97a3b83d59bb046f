use crate::config::{CrucibleConfig, StoreConfig};
use crate::error::{KernelError, KernelResult};
use crucible_foundry::Foundry;
use crucible_genesis::GenesisEngine;
use crucible_heuristics::HeuristicStore;
use crucible_ledger::Ledger;
use crucible_metrics::MetricsEngine;
use crucible_scaffold::ScaffoldManager;
use crucible_scanner::{JsonDirSource, TelemetryScanner};
use crucible_store::{CrucibleStore, InMemoryStore, SqliteStore};
use crucible_synthesizer::Synthesizer;
use crucible_vows::VowRegistry;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Every component of one crucible, wired to a single store.
///
/// Streams share one `Crucible`: the ledger and the heuristic store are the
/// shared mutable resources, everything per-cycle lives in the stream's
/// cursor.
pub struct Crucible {
    pub config: CrucibleConfig,
    pub ledger: Arc<Ledger>,
    pub heuristics: Arc<HeuristicStore>,
    pub vows: Arc<VowRegistry>,
    pub scaffolds: Arc<ScaffoldManager>,
    pub synthesizer: Arc<Synthesizer>,
    pub genesis: Arc<GenesisEngine>,
    pub foundry: Arc<Foundry>,
    pub metrics: Arc<MetricsEngine>,
    pub scanner: Arc<TelemetryScanner>,
    /// Serializes claims on the internal catalyst queue.
    pub(crate) queue: Mutex<()>,
}

impl Crucible {
    /// Open the store named by the configuration and restore every
    /// component from it.
    pub async fn open(config: CrucibleConfig) -> KernelResult<Arc<Self>> {
        config.validate().map_err(KernelError::Config)?;

        let store: Arc<dyn CrucibleStore> = match &config.store {
            StoreConfig::Memory => Arc::new(InMemoryStore::new()),
            StoreConfig::Sqlite { path } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        KernelError::Config(format!("cannot create {}: {e}", parent.display()))
                    })?;
                }
                Arc::new(SqliteStore::open(path).await?)
            }
        };

        let mut scanner = TelemetryScanner::new();
        if let Some(dir) = &config.telemetry.dir {
            scanner.add_source(Box::new(JsonDirSource::new(dir.clone())));
        }

        Self::with_store(store, config, scanner).await
    }

    /// Wire components over an existing store.
    pub async fn with_store(
        store: Arc<dyn CrucibleStore>,
        config: CrucibleConfig,
        scanner: TelemetryScanner,
    ) -> KernelResult<Arc<Self>> {
        config.validate().map_err(KernelError::Config)?;

        let ledger = Arc::new(
            Ledger::new(store).with_max_commit_retries(config.ledger.max_commit_retries),
        );
        let heuristics =
            Arc::new(HeuristicStore::open(ledger.clone(), config.heuristics.clone()).await?);
        let vows = Arc::new(VowRegistry::open(ledger.clone()).await?);
        let scaffolds =
            Arc::new(ScaffoldManager::open(ledger.clone(), config.scaffold.clone()).await?);

        let history = Synthesizer::load_history(&ledger).await?;
        let synthesizer = Arc::new(Synthesizer::new(
            ledger.clone(),
            heuristics.clone(),
            history,
            config.synthesis.clone(),
        ));
        let genesis = Arc::new(GenesisEngine::new(
            synthesizer.clone(),
            heuristics.clone(),
            ledger.clone(),
        ));
        let foundry =
            Arc::new(Foundry::open(ledger.clone(), vows.clone(), config.foundry.clone()).await?);
        let metrics = Arc::new(MetricsEngine::new(ledger.clone(), config.stop_rule.clone()));

        info!(
            entries = ledger.len().await?,
            heuristics = heuristics.len(),
            public_key = %foundry.public_key_hex(),
            "crucible opened"
        );

        Ok(Arc::new(Self {
            config,
            ledger,
            heuristics,
            vows,
            scaffolds,
            synthesizer,
            genesis,
            foundry,
            metrics,
            scanner: Arc::new(scanner),
            queue: Mutex::new(()),
        }))
    }
}
