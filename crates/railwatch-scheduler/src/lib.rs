//! # Railwatch Scheduler
//!
//! Single-pass reconciliation of watched reservations.
//!
//! ## Architecture
//! ```text
//! ReconciliationLoop (one pass, bounded concurrency)
//!   for each TrackedEntity:
//!     ├── StatusFetcher.fetch        → StatusSnapshot
//!     ├── StateStore.load            → PersistedState (empty if new)
//!     ├── ChangeDetector             → notify?
//!     │     └── NotifyRouter.resolve → RoutingTarget
//!     │           └── Dispatcher
//!     │                 ├── Push  (text/plain POST)
//!     │                 └── Email (Email + Priority headers)
//!     └── StateStore.save            (always, after a successful fetch)
//! ```

pub mod detect;
pub mod dispatch;
pub mod engine;
pub mod notify;
pub mod persistence;
pub mod store;

pub use detect::ChangeDetector;
pub use dispatch::{ChannelOutcome, DispatchResult, Dispatcher, NotifyChannel};
pub use engine::{BatchReport, EntityReport, Outcome, ReconciliationLoop, Stage};
pub use notify::NotifyRouter;
pub use persistence::SqliteStateStore;
pub use store::{FileStateStore, MemoryStateStore};
