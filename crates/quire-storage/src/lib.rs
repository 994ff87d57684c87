//! Document tree storage for quire.
//!
//! The [`Storage`] trait hides where documents live. Every path crossing the
//! trait is a project-relative pathname such as `docs/cs/index.md`; backends
//! map pathnames to their own layout.
//!
//! - [`FsStorage`] reads a project directory and watches it with `notify`,
//!   debouncing editor save bursts into single events per pathname.
//! - [`MockStorage`] keeps everything in memory (behind the `mock` feature).

mod debouncer;
mod event;
mod fs;
#[cfg(feature = "mock")]
mod mock;
mod storage;

pub use event::{StorageEvent, StorageEventKind, StorageEventReceiver, WatchHandle};
pub use fs::FsStorage;
#[cfg(feature = "mock")]
pub use mock::MockStorage;
pub use storage::{DOCS_DIR, SITE_CONFIG, Storage, StorageError, StorageErrorKind};
