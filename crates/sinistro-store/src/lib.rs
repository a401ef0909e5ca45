//! Persistence for the Sinistro monthly ledgers (local files + `Dragonfly`).
//!
//! Every month record lives twice: in a local key-value store on the
//! operator's machine, and in a shared remote store reachable over the
//! network. The sync engine reconciles the two; this crate only provides
//! the primitives it needs.
//!
//! # Architecture
//!
//! ```text
//! LocalMonthStore<K: LocalKv>          RemoteMonthStore<R: RemoteKv>
//!     |                                     |
//!     +-- FileKv   (<dir>/<key>.json)       +-- DragonflyRemote ({ns}/{key} + {ns}:index)
//!     +-- MemoryKv (tests)                  +-- MemoryRemote    (tests, simulated outage)
//! ```
//!
//! # Modules
//!
//! - [`local`] -- synchronous local key-value primitives
//! - [`remote`] -- asynchronous remote key-value primitives
//! - [`month_store`] -- typed month record stores over both
//! - [`import`] -- bulk import from a backup document
//! - [`error`] -- Shared error types

pub mod error;
pub mod import;
pub mod local;
pub mod month_store;
pub mod remote;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use import::{ImportReport, import_records};
pub use local::{FileKv, LocalKv, MemoryKv};
pub use month_store::{
    DEFAULT_NAMESPACE, DEFAULT_REMOTE_TIMEOUT, LocalMonthStore, MonthScan, RemoteMonthStore,
};
pub use remote::{DragonflyRemote, MemoryRemote, RemoteKv};
