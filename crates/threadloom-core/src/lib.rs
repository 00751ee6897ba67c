//! # threadloom-core
//!
//! The deterministic reconciliation engine for threadloom.
//!
//! Posts arrive as self-describing records that may reference posts arriving
//! earlier or later. The engine classifies each record into one of six
//! structural kinds, indexes it in a [`Registry`], stands in placeholders for
//! forward-referenced thread-sources and promotes them once their record
//! arrives, without losing the children attached in the meantime. Authors
//! are attached afterwards by [`reconcile`].
//!
//! ## Architectural Constraints
//!
//! - Every collection is a `BTreeMap`/`BTreeSet`; registry state does not
//!   depend on hash seeds and compares with `==`.
//! - Parent and child links are ids resolved through the registry.
//! - All mutation goes through `&mut Registry`: one writer per load.
//! - No async, no network dependencies.

// =============================================================================
// MODULES
// =============================================================================

pub mod classify;
pub mod formats;
pub mod post;
pub mod primitives;
pub mod promotion;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod types;
pub mod user;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{PostId, PostKind, PostState, ThreadError, UserId, UserState};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use classify::{RecordShape, References, classify};
pub use post::{ChildIndex, Parents, Post};
pub use reconcile::{ReconcileReport, reconcile};
pub use record::{Record, flatten};
pub use registry::{Registry, RegistryStats, Slot, Stored};
pub use user::{User, UserRegistry, VersionKey};

// =============================================================================
// RE-EXPORTS: Formats & Snapshots
// =============================================================================

pub use formats::{FrameReader, FrameWriter, SnapshotManifest, read_frames, write_frames};
pub use snapshot::{read_snapshot, write_snapshot};
