//! Configuration for the crucible kernel.
//!
//! Layered the same way everywhere: built-in defaults, then an optional
//! file, then `CRUCIBLE_*` environment variables (`__` separates nested
//! keys, e.g. `CRUCIBLE_SYNTHESIS__CONFIDENCE_THRESHOLD=0.8`).

use crucible_foundry::FoundryConfig;
use crucible_heuristics::HeuristicConfig;
use crucible_metrics::StopRuleConfig;
use crucible_scaffold::ScaffoldConfig;
use crucible_synthesizer::SynthesisConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main kernel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrucibleConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub heuristics: HeuristicConfig,

    #[serde(default)]
    pub scaffold: ScaffoldConfig,

    #[serde(default)]
    pub stop_rule: StopRuleConfig,

    #[serde(default)]
    pub foundry: FoundryConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local; everything is lost on exit.
    Memory,

    /// Durable local database, created on first use.
    Sqlite {
        #[serde(default = "default_db_path")]
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: default_db_path(),
        }
    }
}

/// External signal input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Directory of `*.json` / `*.jsonl` signal files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Transparent retries of a colliding commit before surfacing it.
    #[serde(default = "default_commit_retries")]
    pub max_commit_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: default_commit_retries(),
        }
    }
}

/// Cycle-level policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Times ARCHITECT is retried after a novelty violation before the
    /// cycle is aborted.
    #[serde(default = "default_novelty_retries")]
    pub max_novelty_retries: u32,

    /// Run genesis on the first cycle of an empty heuristic store.
    #[serde(default = "default_true")]
    pub bootstrap_genesis: bool,

    /// Idle cycles charged to untouched heuristics per completed cycle.
    #[serde(default = "default_idle_cycles")]
    pub decay_idle_cycles: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_novelty_retries: default_novelty_retries(),
            bootstrap_genesis: true,
            decay_idle_cycles: default_idle_cycles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".crucible/crucible.db")
}

fn default_commit_retries() -> u32 {
    crucible_ledger::DEFAULT_MAX_COMMIT_RETRIES
}

fn default_novelty_retries() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_idle_cycles() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CrucibleConfig {
    /// Load configuration: defaults, then `path` if given, then environment.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CrucibleConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CRUCIBLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Scratch configuration for tests and demos: in-memory store, relaxed
    /// thresholds, short windows.
    pub fn demo() -> Self {
        let mut c = Self {
            store: StoreConfig::Memory,
            ..Self::default()
        };
        c.synthesis.confidence_threshold = 0.6;
        c.synthesis.novelty_threshold = 0.7;
        c.scaffold.default_ttl_cycles = 3;
        c.stop_rule.trend_window = 2;
        c.stop_rule.novelty_window = 3;
        c.stop_rule.novelty_target = 0.4;
        c.stop_rule.fidelity_target = 0.8;
        c
    }

    /// Stricter gates for unattended runs.
    pub fn strict() -> Self {
        let mut c = Self::default();
        c.synthesis.confidence_threshold = 0.8;
        c.synthesis.max_retries = 5;
        c.synthesis.novelty_threshold = 0.5;
        c.stop_rule.trend_window = 5;
        c.stop_rule.novelty_window = 8;
        c.stop_rule.novelty_target = 0.6;
        c.stop_rule.fidelity_target = 1.0;
        c.cycle.max_novelty_retries = 1;
        c
    }

    pub fn validate(&self) -> Result<(), String> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(format!("{name} must be within [0, 1], got {v}"))
            }
        };
        unit("synthesis.confidence_threshold", self.synthesis.confidence_threshold)?;
        unit("synthesis.novelty_threshold", self.synthesis.novelty_threshold)?;
        unit("scaffold.conflict_threshold", self.scaffold.conflict_threshold)?;
        unit("heuristics.synthesis_floor", self.heuristics.synthesis_floor)?;
        unit("stop_rule.novelty_target", self.stop_rule.novelty_target)?;
        unit("stop_rule.fidelity_target", self.stop_rule.fidelity_target)?;
        if self.synthesis.max_novelty_attempts == 0 {
            return Err("synthesis.max_novelty_attempts must be at least 1".into());
        }
        if self.stop_rule.trend_window == 0 {
            return Err("stop_rule.trend_window must be at least 1".into());
        }
        if self.foundry.max_line_length < 40 {
            return Err("foundry.max_line_length must be at least 40".into());
        }
        Ok(())
    }
}
