use crate::config::StopRuleConfig;
use crate::scores::{detect_plateau, LedgerFacts};
use crucible_types::{score, Cycle, MetricsSnapshot};
use serde::{Deserialize, Serialize};

/// Outcome of one Stop Rule check, with every condition spelled out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopRuleEvaluation {
    pub cycle: Cycle,
    /// Acceptance rates of the last `k` snapshots, oldest first.
    pub acceptance_trend: Vec<f64>,
    pub trend_non_decreasing: bool,
    pub novelty_rate: f64,
    pub novelty_met: bool,
    pub fidelity: f64,
    pub fidelity_met: bool,
    pub novelty_event: bool,
    pub plateau: bool,
    pub liberation_event: bool,
    pub halt: bool,
}

impl StopRuleEvaluation {
    /// Conditions that kept the rule from firing.
    pub fn unmet(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.trend_non_decreasing {
            out.push("acceptance trend");
        }
        if !self.novelty_met {
            out.push("novelty target");
        }
        if !self.fidelity_met {
            out.push("fidelity target");
        }
        if !(self.novelty_event || (self.plateau && self.liberation_event)) {
            out.push("novelty event or plateau with liberation");
        }
        out
    }
}

/// Evaluate the Stop Rule at `cycle`.
///
/// `history` is every recorded snapshot in cycle order; its last entry is
/// the snapshot the targets are read from.
pub fn evaluate(
    config: &StopRuleConfig,
    cycle: Cycle,
    history: &[MetricsSnapshot],
    facts: &LedgerFacts,
) -> StopRuleEvaluation {
    let k = config.trend_window.max(1) as usize;
    let acceptance_trend: Vec<f64> = history
        .iter()
        .rev()
        .take(k)
        .rev()
        .map(|s| s.get(score::ACCEPTANCE_RATE))
        .collect();
    let trend_non_decreasing =
        acceptance_trend.len() == k && acceptance_trend.windows(2).all(|w| w[1] >= w[0]);

    let latest = history.last();
    let novelty_rate = latest.map_or(0.0, |s| s.get(score::NOVELTY_RATE));
    let fidelity = latest.map_or(0.0, |s| s.get(score::FIDELITY));
    let novelty_met = novelty_rate >= config.novelty_target;
    let fidelity_met = fidelity >= config.fidelity_target;

    let novelty_event = facts
        .best_novelty_within(cycle, config.novelty_window)
        .is_some_and(|n| n >= config.novelty_event_min);
    let plateau = detect_plateau(facts, cycle, config.trend_window, config.plateau_epsilon);
    let liberation_event = !facts.liberations.is_empty();

    let halt = trend_non_decreasing
        && novelty_met
        && fidelity_met
        && (novelty_event || (plateau && liberation_event));

    StopRuleEvaluation {
        cycle,
        acceptance_trend,
        trend_non_decreasing,
        novelty_rate,
        novelty_met,
        fidelity,
        fidelity_met,
        novelty_event,
        plateau,
        liberation_event,
        halt,
    }
}
