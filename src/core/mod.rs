//! Core business logic for the GiftLink marketplace.
//!
//! Leaf modules first: [`ledger`] holds the pure points primitives and atomic
//! balance updates, [`item`] the listing model and state-machine guards,
//! [`request`] the pending-request tracker, [`migration`] the legacy gift
//! adapter, and [`monthly`] the quota reset. [`settlement`] coordinates them:
//! every lifecycle transition runs through it so that guard checks, ledger
//! mutations, and item/request updates stay consistent.

/// Item model operations and lifecycle transition guards
pub mod item;
/// Gift-points ledger primitives and atomic balance updates
pub mod ledger;
/// Lazy migration of legacy gift records into the item catalog
pub mod migration;
/// Monthly request-quota reset
pub mod monthly;
/// Request tracking and the one-pending-request-per-item invariant
pub mod request;
/// Settlement orchestrator - coordinates transitions, ledger, and compensation
pub mod settlement;
/// User points-projection operations
pub mod user;
