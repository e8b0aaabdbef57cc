//! Detached-session persistence.
//!
//! When the user views a past version, HEAD is detached and the app records
//! *why* in `<project>/.manager_meta/session.json`: the branch they came from
//! and the snapshot being viewed. The record exists exactly while the app
//! itself has HEAD detached. A detached HEAD without a record means the app
//! went down mid-operation, which the classifier reports as inconsistent.
//!
//! - [`types`]: the on-disk record
//! - [`store`]: load / save / clear with atomic writes

mod store;
mod types;

pub use store::SessionStore;
pub use types::{SessionRecord, SnapshotInfo};

/// Project-relative directory holding app metadata; listed in `.gitignore`.
pub const SESSION_META_DIR: &str = ".manager_meta";

/// Session file name inside [`SESSION_META_DIR`].
pub const SESSION_FILE_NAME: &str = "session.json";
