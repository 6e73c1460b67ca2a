//! Common on-disk primitives shared by the monofs filesystem engine:
//! little-endian integer codecs, fixed-width padded strings, and the
//! canonical `/NAME.EXT` path form.

/// Little-endian integer newtypes for packed on-disk structures.
pub mod le;
/// Fixed-width ASCII-space-padded byte strings.
pub mod fixed_str;
/// The canonical `/NAME.EXT` path form.
pub mod path;

pub use fixed_str::FixedByteStr;
pub use le::Le32;
pub use path::{CanonicalPath, PathError};
