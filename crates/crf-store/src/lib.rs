//! Stores for the report lifecycle: the mutable per-work-item draft, the
//! append-only published snapshot history with checksum integrity
//! verification, and atomic JSON file persistence.

pub mod checksum;
pub mod draft;
pub mod snapshot;
pub mod state;

pub use checksum::{IntegrityReport, sha256_hex, snapshot_checksum, verify_snapshot};
pub use draft::DraftStore;
pub use snapshot::SnapshotStore;
pub use state::{CURRENT_STATE_VERSION, StateError, StoreState, load_state, save_state};
