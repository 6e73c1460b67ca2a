//! The canonical `/NAME.EXT` path form: a single leading slash, 1-8 name
//! characters, a dot, and 1-3 extension characters. No subdirectories.

use crate::fixed_str::FixedByteStr;

/// A malformed canonical path.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed path: expected /NAME.EXT with 1-8 name and 1-3 extension characters")]
pub struct PathError;

/// A parsed `/NAME.EXT` path, ready to be packed into a descriptor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalPath {
    name: FixedByteStr<8>,
    ext: FixedByteStr<3>,
}

impl CanonicalPath {
    /// Parses `s` following the strict rules of the on-disk name form:
    /// first character `/`, then 1-8 non-`.` name characters, then `.`,
    /// then 1-3 non-`.` extension characters consuming the rest of `s`.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let bytes = s.as_bytes();
        if bytes.len() < 2 || bytes[0] != b'/' {
            return Err(PathError);
        }
        if bytes[1] == b'.' {
            return Err(PathError);
        }

        let mut idx = 1;
        let mut name_len = 0usize;
        loop {
            if idx >= bytes.len() {
                return Err(PathError);
            }
            if bytes[idx] == b'.' {
                break;
            }
            name_len += 1;
            if name_len > 8 {
                return Err(PathError);
            }
            idx += 1;
        }
        let name_bytes = &bytes[1..idx];
        idx += 1; // skip '.'

        let ext_bytes = &bytes[idx..];
        if ext_bytes.is_empty() || ext_bytes.len() > 3 {
            return Err(PathError);
        }

        let name_str = core::str::from_utf8(name_bytes).map_err(|_| PathError)?;
        let ext_str = core::str::from_utf8(ext_bytes).map_err(|_| PathError)?;

        Ok(Self {
            name: FixedByteStr::pack(name_str).map_err(|_| PathError)?,
            ext: FixedByteStr::pack(ext_str).map_err(|_| PathError)?,
        })
    }

    /// Reconstructs a `CanonicalPath` from already-padded on-disk name and
    /// extension fields, as read back out of a descriptor entry.
    pub fn from_padded(name: FixedByteStr<8>, ext: FixedByteStr<3>) -> Self {
        Self { name, ext }
    }

    /// The name field, padded with ASCII space, exactly as stored on disk.
    pub fn name(&self) -> &FixedByteStr<8> {
        &self.name
    }

    /// The extension field, padded with ASCII space, exactly as stored on disk.
    pub fn ext(&self) -> &FixedByteStr<3> {
        &self.ext
    }
}

impl core::fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "/{}.{}", self.name.trimmed(), self.ext.trimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_path() {
        let p = CanonicalPath::parse("/A.TXT").unwrap();
        assert_eq!(p.name().trimmed(), "A");
        assert_eq!(p.ext().trimmed(), "TXT");
        assert_eq!(p.to_string(), "/A.TXT");
    }

    #[test]
    fn parses_max_length_name_and_extension() {
        let p = CanonicalPath::parse("/ABCDEFGH.XYZ").unwrap();
        assert_eq!(p.name().trimmed(), "ABCDEFGH");
        assert_eq!(p.ext().trimmed(), "XYZ");
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert_eq!(CanonicalPath::parse("A.TXT"), Err(PathError));
    }

    #[test]
    fn rejects_dot_as_second_character() {
        assert_eq!(CanonicalPath::parse("/.TXT"), Err(PathError));
    }

    #[test]
    fn rejects_name_over_eight_characters() {
        assert_eq!(CanonicalPath::parse("/ABCDEFGHI.TXT"), Err(PathError));
    }

    #[test]
    fn rejects_missing_dot() {
        assert_eq!(CanonicalPath::parse("/ABCDEFGH"), Err(PathError));
    }

    #[test]
    fn rejects_empty_extension() {
        assert_eq!(CanonicalPath::parse("/A."), Err(PathError));
    }

    #[test]
    fn rejects_extension_over_three_characters() {
        assert_eq!(CanonicalPath::parse("/A.TOOLONG"), Err(PathError));
    }

    #[test]
    fn rejects_extra_dot_in_extension() {
        assert_eq!(CanonicalPath::parse("/A.T.T"), Err(PathError));
    }
}
