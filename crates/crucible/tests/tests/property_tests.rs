#[path = "property/chain_integrity.rs"]
mod chain_integrity;

#[path = "property/heuristic_bounds.rs"]
mod heuristic_bounds;

#[path = "property/selection_order.rs"]
mod selection_order;

#[path = "property/digest_determinism.rs"]
mod digest_determinism;
