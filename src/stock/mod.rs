//! Stock ledger and alerting engine.
//!
//! An ingredient's balance plus its append-only movement history form the
//! ledger; `stock_alerts` rows are state derived from it. Every path that
//! touches a balance (recording a movement, editing an ingredient, resolving
//! an alert, the sweep) runs as one transaction and ends by reconciling the
//! touched ingredient through the single rule in [`alerts`], so the invariant
//! of at most one open alert per ingredient and alert type holds after every
//! call.

pub mod alerts;
pub mod ledger;
pub mod movements;
pub mod sweep;

#[cfg(test)]
mod integration_tests;

pub use alerts::{reconcile, resolve_alert, ReconcileOutcome};
pub use movements::apply_movement;
pub use sweep::sweep;
