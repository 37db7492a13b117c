//! # Medals Engine
//!
//! Client-side state reconciliation for a shared board of per-entity
//! counters (medal counts per country).
//!
//! This crate holds the state model and every state transition. It knows
//! nothing about HTTP, websockets or threads; the `medals-client` crate
//! drives it.
//!
//! ## Design Principles
//!
//! - **No IO**: persistence and transport are the caller's concern
//! - **Values, not mutation**: every transition returns a new [`EntityStore`]
//! - **Absorbing**: remote events for unknown ids never fail
//!
//! ## Core Concepts
//!
//! ### Dual values
//!
//! Each counter is a [`DualValue`]: what the user sees and edits
//! (`displayed`) and what was last confirmed persisted (`saved`). A counter
//! is dirty when the two differ; dirtiness is derived, never stored.
//!
//! ### Reconciliation
//!
//! The [`reconcile`] module folds remote add/delete/patch events and local
//! increment/decrement/reset/save actions into the store. A remote patch
//! wins over unsaved local edits on the same entity (last-writer-wins);
//! edits on other entities are untouched.
//!
//! ### Targeted undo
//!
//! Optimistic commits record only what they touched ([`SaveUndo`],
//! [`RemovedEntity`]) so a rollback cannot discard changes that landed
//! while the commit was in flight.
//!
//! ## Quick Start
//!
//! ```rust
//! use medals_engine::{aggregate, reconcile, Entity, EntityStore};
//!
//! let store = EntityStore::new();
//!
//! // A remote add arrives...
//! let store = reconcile::apply_remote_add(
//!     &store,
//!     Entity::settled(2, "X", [("gold", 0), ("silver", 0), ("bronze", 0)]),
//! );
//!
//! // ...and the user bumps gold.
//! let store = reconcile::apply_local_delta(&store, 2, "gold", 1).unwrap();
//!
//! let gold = store.get(2).unwrap().counter("gold").unwrap();
//! assert_eq!((gold.displayed, gold.saved), (1, 0));
//! assert_eq!(aggregate::total(&store), 1);
//! assert_eq!(reconcile::compute_save_diff(&store, 2).len(), 1);
//! ```

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod operation;
pub mod reconcile;
pub mod schema;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use entity::{Counter, DualValue, Entity, EntityDto};
pub use error::Error;
pub use operation::{
    ChangeRecord, PatchOp, RemoteEvent, TARGET_ADD, TARGET_DELETE, TARGET_PATCH,
};
pub use schema::{CounterKinds, DEFAULT_COUNTER_KINDS};
pub use snapshot::{BoardView, CounterTotal, RemovedEntity, SaveUndo, StagedCounter};
pub use store::EntityStore;

/// Type aliases for clarity
pub type EntityId = i64;
pub type CounterName = String;
