//! Fixed-width byte strings padded with ASCII space (0x20), used for the
//! 8-byte name and 3-byte extension fields of a file descriptor entry.

/// Errors raised while packing a string into a [`FixedByteStr`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FixedStrError {
    /// The string contains a byte outside the printable ASCII range, or a
    /// '.' where one is not allowed.
    #[error("string contains a non-ASCII or disallowed byte")]
    InvalidByte,
    /// The string is longer than the field it is meant to fill.
    #[error("string of length {0} does not fit in a {1}-byte field")]
    TooLong(usize, usize),
    /// The string is empty where at least one character is required.
    #[error("string must not be empty")]
    Empty,
}

/// An `N`-byte field holding `0..=N` ASCII characters, right-padded with
/// ASCII space.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, bytemuck::Zeroable, bytemuck::Pod)]
pub struct FixedByteStr<const N: usize> {
    raw: [u8; N],
}

impl<const N: usize> FixedByteStr<N> {
    /// A field filled entirely with spaces.
    pub const EMPTY: Self = Self { raw: [b' '; N] };

    /// Packs `s` into the field, padding the remainder with spaces.
    /// `s` must be non-empty, at most `N` bytes, and contain no '.'.
    pub fn pack(s: &str) -> Result<Self, FixedStrError> {
        if s.is_empty() {
            return Err(FixedStrError::Empty);
        }
        if s.len() > N {
            return Err(FixedStrError::TooLong(s.len(), N));
        }
        if !s.bytes().all(|b| b.is_ascii_graphic() && b != b'.') {
            return Err(FixedStrError::InvalidByte);
        }
        let mut raw = [b' '; N];
        raw[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self { raw })
    }

    /// Wraps an already-padded `N`-byte field as read from disk.
    pub fn from_raw(raw: [u8; N]) -> Self {
        Self { raw }
    }

    /// The raw, space-padded bytes as stored on disk.
    pub fn as_raw(&self) -> &[u8; N] {
        &self.raw
    }

    /// The field with trailing ASCII-space padding trimmed off.
    pub fn trimmed(&self) -> &str {
        let end = self
            .raw
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        // Packing only ever accepts ASCII, so this is always valid UTF-8.
        core::str::from_utf8(&self.raw[..end]).unwrap_or("")
    }
}

impl<const N: usize> core::fmt::Debug for FixedByteStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("FixedByteStr").field(&self.trimmed()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_pads_with_spaces() {
        let f = FixedByteStr::<8>::pack("HI").unwrap();
        assert_eq!(f.as_raw(), b"HI      ");
        assert_eq!(f.trimmed(), "HI");
    }

    #[test]
    fn pack_rejects_too_long() {
        assert_eq!(
            FixedByteStr::<3>::pack("TOOLONG"),
            Err(FixedStrError::TooLong(7, 3))
        );
    }

    #[test]
    fn pack_rejects_empty() {
        assert_eq!(FixedByteStr::<8>::pack(""), Err(FixedStrError::Empty));
    }

    #[test]
    fn pack_rejects_dot() {
        assert_eq!(
            FixedByteStr::<8>::pack("A.B"),
            Err(FixedStrError::InvalidByte)
        );
    }

    #[test]
    fn exact_fit_has_no_padding() {
        let f = FixedByteStr::<3>::pack("TXT").unwrap();
        assert_eq!(f.trimmed(), "TXT");
    }
}
