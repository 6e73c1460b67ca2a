//! monofs: a flat, single-root, block-addressable filesystem over a
//! 2048-byte-cluster partition.
//!
//! A partition is mounted through a single cloneable [`MonoFs`] handle
//! ([`mount::MonoFs`]), which owns the global metadata lock, the free-space
//! bit vector, the root directory index, and the table of currently open
//! files. Opening a file returns a [`session::FileSession`] whose `read`,
//! `write`, `seek`, `truncate`, and `eof` methods walk the on-disk two-level
//! index described in [`raw`]. Closing (dropping) a session persists its
//! file size and releases the per-file lock acquired at open time.
//!
//! There is no directory hierarchy: every file lives directly under `/` and
//! is named by an 8.3 [`monofs_common::CanonicalPath`].

pub mod bitvector;
pub mod cache;
pub mod constants;
pub mod directory_index;
pub mod error;
pub mod file_index;
pub mod mount;
pub mod open_table;
pub mod raw;
pub mod session;
pub mod sync;

pub use error::FsError;
pub use mount::{MonoFs, OpenMode};
pub use session::FileSession;
