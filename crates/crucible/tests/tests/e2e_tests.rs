#[path = "e2e/full_cycle.rs"]
mod full_cycle;

#[path = "e2e/stop_rule_halt.rs"]
mod stop_rule_halt;

#[path = "e2e/scaffold_feedback.rs"]
mod scaffold_feedback;

#[path = "e2e/vow_lifecycle.rs"]
mod vow_lifecycle;

#[path = "e2e/concurrent_streams.rs"]
mod concurrent_streams;

#[path = "e2e/durable_steps.rs"]
mod durable_steps;
