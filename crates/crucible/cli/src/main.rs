//! Crucible CLI - drive the decision cycle from a terminal
//!
//! Step commands (`scan`, `plan`, `execute`, `integrate`) each advance the
//! stream's persisted cursor by one state, so a cycle can be walked through
//! across separate invocations against a durable store. `cycle` runs the
//! whole loop in-process.

use clap::{Parser, Subcommand};
use crucible_kernel::{CrucibleConfig, Crucible, KernelError, Orchestrator, StreamPlan};
use crucible_types::StreamId;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::{AuditCommands, Context, ScaffoldCommands, VowCommands};

/// Crucible CLI application
#[derive(Parser)]
#[command(name = "crucible")]
#[command(about = "Crucible - autonomous decision cycle over a hash-chained ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CRUCIBLE_CONFIG")]
    config: Option<String>,

    /// Catalyst stream to drive
    #[arg(short, long, env = "CRUCIBLE_STREAM", default_value = "primary")]
    stream: String,

    /// Machine-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long, env = "CRUCIBLE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// SCAN: select the highest-severity catalyst
    Scan,

    /// ARCHITECT: deliberate on the selected catalyst
    Plan {
        /// Preview the provocateur's question without claiming it
        #[arg(long)]
        ghost: bool,
    },

    /// Run the three-pass genesis on the selected catalyst
    Decompose,

    /// EXECUTE: build, lint, sign and publish artifacts
    Execute {
        /// Skip the test artifact
        #[arg(long)]
        time_critical: bool,
    },

    /// Vow registry
    Vow {
        #[command(subcommand)]
        command: VowCommands,
    },

    /// Scaffold constraints
    Scaffold {
        #[command(subcommand)]
        command: ScaffoldCommands,
    },

    /// INTEGRATE: decay, scaffold pass, metrics and the Stop Rule
    Integrate,

    /// Current scores and recorded history
    Metrics,

    /// Stop Rule configuration, or an evaluation with --check
    StopRule {
        #[arg(long)]
        check: bool,
    },

    /// Run whole cycles
    Cycle {
        /// Cycles to run (stops early on halt)
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,

        #[arg(long)]
        time_critical: bool,
    },

    /// Run a built-in self test (chain, digest, tie-break, vow-gate,
    /// non-collusion, metrics, scaffold, all)
    Selftest {
        id: String,

        /// Commit the report to the ledger
        #[arg(long)]
        save: bool,
    },

    /// Chain verification and audit clearance
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Trace an artifact back to its catalyst
    Lineage { artifact_id: String },

    /// Run several catalyst streams concurrently
    Streams {
        #[arg(short = 'n', long, default_value_t = 2)]
        count: usize,

        /// Cycles per stream
        #[arg(long, default_value_t = 1)]
        cycles: u64,

        #[arg(long)]
        time_critical: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Exit code of the first kernel error in the chain; anything else is
/// internal.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<KernelError>())
        .map_or(1, |e| u8::try_from(e.exit_code()).unwrap_or(1))
}

fn init_tracing(config: &CrucibleConfig, json: bool) {
    let env_filter = EnvFilter::try_from_env("CRUCIBLE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| config.logging.level.clone().into());

    // Logs go to stderr so `--json` output stays parseable.
    if json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CrucibleConfig::load(cli.config.as_deref())
        .map_err(|e| KernelError::Config(e.to_string()))?;
    init_tracing(&config, cli.log_json);

    let crucible = Crucible::open(config).await?;
    let ctx = Context {
        orchestrator: Orchestrator::new(crucible, StreamId::new(cli.stream)),
        json: cli.json,
    };

    match cli.command {
        Commands::Scan => commands::scan(&ctx).await,
        Commands::Plan { ghost } => commands::plan(&ctx, ghost).await,
        Commands::Decompose => commands::decompose(&ctx).await,
        Commands::Execute { time_critical } => commands::execute(&ctx, time_critical).await,
        Commands::Vow { command } => commands::vow(&ctx, command).await,
        Commands::Scaffold { command } => commands::scaffold(&ctx, command).await,
        Commands::Integrate => commands::integrate(&ctx).await,
        Commands::Metrics => commands::metrics(&ctx).await,
        Commands::StopRule { check } => commands::stop_rule(&ctx, check).await,
        Commands::Cycle { count, time_critical } => {
            commands::cycle(&ctx, count, time_critical).await
        }
        Commands::Selftest { id, save } => commands::selftest(&ctx, &id, save).await,
        Commands::Audit { command } => commands::audit(&ctx, command).await,
        Commands::Lineage { artifact_id } => commands::lineage(&ctx, &artifact_id).await,
        Commands::Streams {
            count,
            cycles,
            time_critical,
        } => {
            let plan = StreamPlan {
                streams: count,
                cycles,
                time_critical,
            };
            commands::streams(&ctx, plan).await
        }
        Commands::Config => commands::show_config(&ctx),
    }
}
