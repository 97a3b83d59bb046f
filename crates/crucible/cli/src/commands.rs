//! Command handlers. Each step command advances the stream's persisted
//! cursor by exactly one state.

use crate::output::{self, emit, field, flag, print_info, print_success, print_warning};
use anyhow::Context as _;
use clap::Subcommand;
use colored::*;
use crucible_kernel::{
    run_streams, selftest, CycleOutcome, KernelError, KernelResult, Orchestrator, SelfTestId,
    StreamPlan,
};
use crucible_metrics::StopRuleEvaluation;
use crucible_types::{MetricsSnapshot, VowId};
use std::sync::Arc;

#[derive(Subcommand)]
pub enum VowCommands {
    /// Declare a binding constraint
    Declare {
        /// Constraint text, e.g. "never bypass review"
        text: String,

        /// Cycles before liberation may be requested
        #[arg(long, default_value_t = 3)]
        min_cycles: u64,
    },

    /// Liberate a vow once its minimum cycles have elapsed
    Liberate {
        /// Vow ID
        id: String,

        /// Why the vow no longer applies (recorded verbatim)
        #[arg(short, long)]
        justification: String,
    },

    /// Show every vow with its adherence and eligibility
    Status,
}

#[derive(Subcommand)]
pub enum ScaffoldCommands {
    /// Declare a temporary constraint
    Declare {
        text: String,

        /// Cycles before the scaffold dissolves
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// List scaffolds and their lifecycle state
    List,
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Re-verify the whole hash chain and payload digests
    Verify,

    /// Clear an integrity halt once the chain verifies again
    Resume {
        /// Auditor's note, committed with the clearance
        #[arg(short, long)]
        note: String,
    },
}

pub struct Context {
    pub orchestrator: Orchestrator,
    pub json: bool,
}

impl Context {
    /// Unwrap a step result. A halted stream is not an error for a step
    /// command: its evidence pack is reported instead.
    async fn step<T>(&self, result: KernelResult<T>) -> anyhow::Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(KernelError::Halted { .. }) => {
                self.evidence().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn evidence(&self) -> anyhow::Result<()> {
        match self.orchestrator.evidence().await? {
            Some(pack) => emit(self.json, &pack, |p| {
                print_warning(&format!("stream {} is halted", self.orchestrator.stream()));
                field("evidence", &p.digest);
                field("summary", p.summary());
                field("signature valid", flag(p.verify()));
            }),
            None => {
                print_warning("stream is halted but no evidence pack is stored");
                Ok(())
            }
        }
    }
}

pub async fn scan(ctx: &Context) -> anyhow::Result<()> {
    let Some(outcome) = ctx.step(ctx.orchestrator.scan().await).await? else {
        return Ok(());
    };
    emit(ctx.json, &outcome, |o| {
        print_success(&format!("cycle {} selected catalyst {}", o.cycle, o.catalyst.id));
        field("domain", &o.catalyst.domain_tag);
        field("severity", format!("{:.2}", o.catalyst.severity));
        field("internal", flag(o.catalyst.is_internal()));
        field("evidence", &o.catalyst.source_evidence);
        field("considered", format!("{} ({} skipped)", o.considered, o.skipped));
    })
}

pub async fn plan(ctx: &Context, ghost: bool) -> anyhow::Result<()> {
    if ghost {
        let question = ctx.orchestrator.ghost().await?;
        return emit(ctx.json, &question, |q| {
            print_info("ghost provocation (not claimed)");
            field("question", &q.text);
            field("novelty", format!("{:.2}", q.novelty.unwrap_or_default()));
        });
    }
    let Some(outcome) = ctx.step(ctx.orchestrator.architect().await).await? else {
        return Ok(());
    };
    emit(ctx.json, &outcome, |o| {
        if o.accepted {
            print_success(&format!("plan {} accepted", o.plan_id));
        } else {
            print_warning(&format!("plan {} below threshold", o.plan_id));
        }
        field("decision", &o.decision_id);
        field("confidence", format!("{:.3}", o.confidence));
        field("novelty", format!("{:.3}", o.novelty));
        field("retries", o.retries_consumed);
        if let Some(g) = &o.genesis {
            field("genesis", format!("{:?}, {} passes", g.trigger, g.passes.len()));
        }
        if !o.reinforced.is_empty() {
            field("reinforced", o.reinforced.len());
        }
        if let Some(id) = &o.learned {
            field("learned", id);
        }
    })
}

pub async fn decompose(ctx: &Context) -> anyhow::Result<()> {
    let Some(report) = ctx.step(ctx.orchestrator.decompose().await).await? else {
        return Ok(());
    };
    emit(ctx.json, &report, |r| {
        print_success(&format!("genesis on {}", r.catalyst_id));
        for pass in &r.passes {
            field(
                &format!("pass {}", pass.pass),
                format!("{} ({:.2})", pass.output, pass.confidence),
            );
        }
    })
}

pub async fn execute(ctx: &Context, time_critical: bool) -> anyhow::Result<()> {
    let Some(outcome) = ctx.step(ctx.orchestrator.execute(time_critical).await).await? else {
        return Ok(());
    };
    emit(ctx.json, &outcome, |o| {
        print_success(&format!("published {} artifacts", o.artifacts.len()));
        for a in &o.artifacts {
            field(&a.kind.to_string(), format!("{} {}", a.id, a.digest.short()));
        }
    })
}

pub async fn integrate(ctx: &Context) -> anyhow::Result<()> {
    let Some(outcome) = ctx.step(ctx.orchestrator.integrate().await).await? else {
        return Ok(());
    };
    emit(ctx.json, &outcome, |o| {
        print_success(&format!("cycle {} integrated", o.cycle));
        field("decayed", o.decayed);
        field("synthesized", o.synthesized);
        field("scaffold transitions", o.transitions.len());
        field("internal catalysts", o.raised.len());
        print_snapshot(&o.snapshot);
        match &o.evidence {
            Some(pack) => print_warning(&format!("Stop Rule met; halted ({})", pack.digest)),
            None => field("stop rule", format!("not met: {}", o.evaluation.unmet().join(", "))),
        }
    })
}

pub async fn cycle(ctx: &Context, count: u64, time_critical: bool) -> anyhow::Result<()> {
    for _ in 0..count {
        match ctx.orchestrator.run_cycle(time_critical).await? {
            CycleOutcome::Completed(report) => {
                let halted = report.halted();
                emit(ctx.json, &report, |r| {
                    print_success(&format!("cycle {} completed on {}", r.cycle, r.stream));
                    if let Some(a) = &r.architect {
                        field("plan", format!("{} ({:.3})", a.plan_id, a.confidence));
                    }
                    if let Some(e) = &r.execute {
                        field("artifacts", e.artifacts.len());
                    }
                    if let Some(reason) = &r.validation_failure {
                        print_warning(&format!("publication refused: {reason}"));
                    }
                    print_snapshot(&r.integrate.snapshot);
                    if let Some(pack) = &r.integrate.evidence {
                        print_warning(&format!("Stop Rule met; halted ({})", pack.digest));
                    }
                })?;
                if halted {
                    break;
                }
            }
            CycleOutcome::Halted(_) => {
                ctx.evidence().await?;
                break;
            }
        }
    }
    Ok(())
}

pub async fn vow(ctx: &Context, command: VowCommands) -> anyhow::Result<()> {
    match command {
        VowCommands::Declare { text, min_cycles } => {
            let vow = ctx.orchestrator.declare_vow(&text, min_cycles).await?;
            emit(ctx.json, &vow, |v| {
                print_success(&format!("vow {} declared", v.id));
                field("rule", format!("{:?}", v.rule));
                field("eligible at cycle", v.declared_at_cycle + v.min_cycles);
            })
        }
        VowCommands::Liberate { id, justification } => {
            let vow = ctx
                .orchestrator
                .liberate_vow(&VowId::new(id), &justification)
                .await?;
            emit(ctx.json, &vow, |v| {
                print_success(&format!("vow {} liberated", v.id));
                field("justification", v.liberation_justification.as_deref().unwrap_or_default());
            })
        }
        VowCommands::Status => {
            let statuses = ctx.orchestrator.vow_status().await?;
            emit(ctx.json, &statuses, |all| {
                if all.is_empty() {
                    println!("{}", "No vows".dimmed());
                }
                for s in all {
                    let state = if s.vow.liberated {
                        "liberated".dimmed()
                    } else if s.eligible_for_liberation {
                        "eligible".yellow()
                    } else {
                        "binding".green()
                    };
                    println!("{} [{}] {}", s.vow.id, state, s.vow.text);
                    field("adherence", format!("{:.2}", s.adherence_ratio));
                    if !s.vow.liberated && !s.eligible_for_liberation {
                        field("cycles until eligible", s.cycles_until_eligible);
                    }
                }
            })
        }
    }
}

pub async fn scaffold(ctx: &Context, command: ScaffoldCommands) -> anyhow::Result<()> {
    match command {
        ScaffoldCommands::Declare { text, ttl } => {
            let scaffold = ctx.orchestrator.declare_scaffold(&text, ttl).await?;
            emit(ctx.json, &scaffold, |s| {
                print_success(&format!("scaffold {} declared", s.id));
                field("ttl", s.ttl_cycles);
            })
        }
        ScaffoldCommands::List => {
            let scaffolds = ctx
                .orchestrator
                .crucible()
                .scaffolds
                .all()
                .map_err(KernelError::from)?;
            emit(ctx.json, &scaffolds, |all| {
                if all.is_empty() {
                    println!("{}", "No scaffolds".dimmed());
                }
                for s in all {
                    println!("{} [{}] {}", s.id, s.state, s.constraint_text);
                }
            })
        }
    }
}

pub async fn metrics(ctx: &Context) -> anyhow::Result<()> {
    let report = ctx.orchestrator.metrics().await?;
    emit(ctx.json, &report, |r| {
        print_info(&format!("metrics at cycle {} ({} recorded)", r.cycle, r.history.len()));
        print_snapshot(&r.current);
        field("plateau", flag(r.plateau));
    })
}

pub async fn stop_rule(ctx: &Context, check: bool) -> anyhow::Result<()> {
    if !check {
        let config = &ctx.orchestrator.crucible().config.stop_rule;
        return emit(ctx.json, config, |c| {
            print_info("stop rule configuration");
            field("trend window", c.trend_window);
            field("novelty window", c.novelty_window);
            field("novelty target", c.novelty_target);
            field("fidelity target", c.fidelity_target);
            field("plateau epsilon", c.plateau_epsilon);
        });
    }
    let evaluation = ctx.orchestrator.stop_rule_check().await?;
    emit(ctx.json, &evaluation, print_evaluation)
}

fn print_evaluation(e: &StopRuleEvaluation) {
    if e.halt {
        print_warning(&format!("Stop Rule met at cycle {}", e.cycle));
    } else {
        print_info(&format!("Stop Rule not met at cycle {}", e.cycle));
    }
    field("acceptance trend", format!("{:?} {}", e.acceptance_trend, flag(e.trend_non_decreasing)));
    field("novelty rate", format!("{:.3} {}", e.novelty_rate, flag(e.novelty_met)));
    field("fidelity", format!("{:.3} {}", e.fidelity, flag(e.fidelity_met)));
    field("novelty event", flag(e.novelty_event));
    field("plateau", flag(e.plateau));
    field("liberation", flag(e.liberation_event));
}

fn print_snapshot(snapshot: &MetricsSnapshot) {
    for (name, value) in &snapshot.scores {
        field(name, format!("{value:.3}"));
    }
}

pub async fn selftest(ctx: &Context, id: &str, save: bool) -> anyhow::Result<()> {
    let id: SelfTestId = id.parse()?;
    let crucible = ctx.orchestrator.crucible();
    let report = selftest::run(crucible, id).await?;
    if save {
        selftest::save(crucible, &report).await?;
    }
    emit(ctx.json, &report, |r| {
        for c in &r.checks {
            let mark = if c.passed { "PASS".green() } else { "FAIL".red() };
            println!("{} [{}] {}", mark, c.id, c.name);
            field("detail", &c.detail);
        }
    })?;
    report.into_result()?;
    Ok(())
}

pub async fn audit(ctx: &Context, command: AuditCommands) -> anyhow::Result<()> {
    match command {
        AuditCommands::Verify => {
            let chain = ctx.orchestrator.verify_chain().await?;
            let payloads = ctx
                .orchestrator
                .crucible()
                .ledger
                .audit_payloads()
                .await
                .map_err(KernelError::from)?;
            emit(ctx.json, &chain, |c| {
                print_success(&format!("{} entries verified", c.entries));
                field("payloads", payloads);
                if let Some(tip) = &c.tip {
                    field("tip", tip);
                }
            })
        }
        AuditCommands::Resume { note } => {
            let clearance = ctx.orchestrator.resume_after_audit(&note).await?;
            emit(ctx.json, &clearance, |c| {
                print_success(&format!("stream {} resumed", c.stream));
                field("entries", c.chain.entries);
            })
        }
    }
}

pub async fn lineage(ctx: &Context, artifact_id: &str) -> anyhow::Result<()> {
    let lineage = ctx
        .orchestrator
        .lineage(artifact_id)
        .await
        .with_context(|| format!("tracing artifact {artifact_id}"))?;
    emit(ctx.json, &lineage, |l| {
        print_info(&format!("lineage of {}", l.artifact.artifact_id));
        field("artifact", format!("{} (seq {})", l.artifact.kind, l.seqs[0]));
        field("decision", format!("{} accepted={} (seq {})", l.decision.decision_id, l.decision.accepted, l.seqs[1]));
        field("plan", format!("{} confidence={:.3} (seq {})", l.plan.plan_id, l.plan.confidence, l.seqs[2]));
        field("catalyst", format!("{} {} (seq {})", l.catalyst.catalyst_id, l.catalyst.domain_tag, l.seqs[3]));
    })
}

pub async fn streams(ctx: &Context, plan: StreamPlan) -> anyhow::Result<()> {
    let reports = run_streams(Arc::clone(ctx.orchestrator.crucible()), &plan).await?;
    emit(ctx.json, &reports, |all| {
        for r in all {
            let status = match (&r.halted, &r.stopped_by) {
                (Some(_), _) => "halted".yellow(),
                (None, Some(_)) => "stopped".red(),
                (None, None) => "ok".green(),
            };
            println!("{} [{}] completed={} aborted={}", r.stream, status, r.completed, r.aborted);
            if let Some(e) = &r.error {
                field("error", e);
            }
        }
    })
}

pub fn show_config(ctx: &Context) -> anyhow::Result<()> {
    let config = &ctx.orchestrator.crucible().config;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        output::print_info("effective configuration");
        println!("{config:#?}");
    }
    Ok(())
}
