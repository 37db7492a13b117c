//! Medals Client - realtime session against a shared medal board.
//!
//! Wraps the `medals-engine` state model with the pieces that do IO:
//! a REST persistence adapter, a websocket hub transport, the optimistic
//! commit coordinator and the listener that folds remote events into the
//! live store. [`MedalBoard`] ties them together.

pub mod board;
pub mod cli;
pub mod commit;
pub mod config;
pub mod error;
pub mod hub;
pub mod listener;
pub mod persistence;
pub mod store_handle;

pub use board::MedalBoard;
pub use commit::{Alert, CommitCoordinator, CommitKind, CommitOutcome, CommitPhase, CommitRecord};
pub use config::Config;
pub use error::{ClientError, PersistenceError, Result, TransportError};
pub use hub::{ChannelTransport, EventTransport, HubTransport, Notification};
pub use listener::EventListener;
pub use persistence::{HttpPersistence, Persistence};
pub use store_handle::{RemoteMark, StoreHandle, TouchedSince};
