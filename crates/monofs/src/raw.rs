//! On-disk record shapes: the 32-byte file descriptor entry and the 4-byte
//! index entry shared by every L1/L2 index cluster.

use monofs_common::{CanonicalPath, FixedByteStr, Le32};

/// One entry of a root or file L1/L2 index cluster: the cluster number of
/// the next level down, or 0 if absent.
pub type IndexEntry = Le32;

/// A 32-byte record inside a file-descriptor cluster describing one file.
///
/// Layout (offsets in bytes): `0..8` name, `8..11` extension, `11` reserved,
/// `12..16` file L1 index cluster number, `16..20` file size, `20..32`
/// unused.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct DescriptorEntry {
    name: FixedByteStr<8>,
    ext: FixedByteStr<3>,
    reserved: u8,
    file_l1_cluster: Le32,
    file_size: Le32,
    unused: [u8; 12],
}

static_assertions::const_assert_eq!(core::mem::size_of::<DescriptorEntry>(), 32);
static_assertions::const_assert_eq!(core::mem::offset_of!(DescriptorEntry, name), 0);
static_assertions::const_assert_eq!(core::mem::offset_of!(DescriptorEntry, ext), 8);
static_assertions::const_assert_eq!(core::mem::offset_of!(DescriptorEntry, reserved), 11);
static_assertions::const_assert_eq!(core::mem::offset_of!(DescriptorEntry, file_l1_cluster), 12);
static_assertions::const_assert_eq!(core::mem::offset_of!(DescriptorEntry, file_size), 16);
static_assertions::const_assert_eq!(core::mem::offset_of!(DescriptorEntry, unused), 20);

impl DescriptorEntry {
    /// A zeroed, free entry.
    pub const FREE: Self = Self {
        name: FixedByteStr::EMPTY,
        ext: FixedByteStr::EMPTY,
        reserved: 0,
        file_l1_cluster: Le32::ZERO,
        file_size: Le32::ZERO,
        unused: [0; 12],
    };

    /// Builds a fresh entry for a newly created, empty file.
    pub fn new(path: &CanonicalPath, file_l1_cluster: u32) -> Self {
        Self {
            name: *path.name(),
            ext: *path.ext(),
            reserved: 0,
            file_l1_cluster: Le32::new(file_l1_cluster),
            file_size: Le32::ZERO,
            unused: [0; 12],
        }
    }

    /// An entry is free iff its first filename byte is 0x00. A space-padded
    /// name (the only other legal content of that byte) is never zero.
    pub fn is_free(&self) -> bool {
        self.name.as_raw()[0] == 0x00
    }

    pub fn path(&self) -> CanonicalPath {
        CanonicalPath::from_padded(self.name, self.ext)
    }

    pub fn file_l1_cluster(&self) -> u32 {
        self.file_l1_cluster.get()
    }

    pub fn file_size(&self) -> u32 {
        self.file_size.get()
    }

    pub fn set_file_size(&mut self, size: u32) {
        self.file_size.set(size);
    }
}

/// A root/file L1 or L2 index cluster: 512 four-byte cluster-number entries.
pub type IndexClusterBuf = [IndexEntry; crate::constants::ENTRIES_PER_INDEX_CLUSTER];

/// A file-descriptor cluster: 64 thirty-two-byte descriptor entries.
pub type DescriptorClusterBuf = [DescriptorEntry; crate::constants::ENTRIES_PER_DESCRIPTOR_CLUSTER];

/// Reads and reinterprets a whole cluster as 512 index entries.
pub fn read_index_cluster(
    partition: &dyn monofs_io::Partition,
    cluster_no: u32,
) -> Result<IndexClusterBuf, crate::error::FsError> {
    let mut buf = [0u8; crate::constants::CLUSTER_SIZE];
    partition.read_cluster(cluster_no, &mut buf)?;
    Ok(*bytemuck::from_bytes(&buf))
}

/// Writes 512 index entries back as a whole cluster.
pub fn write_index_cluster(
    partition: &dyn monofs_io::Partition,
    cluster_no: u32,
    entries: &IndexClusterBuf,
) -> Result<(), crate::error::FsError> {
    partition.write_cluster(cluster_no, bytemuck::bytes_of(entries).try_into().unwrap())?;
    Ok(())
}

/// Reads and reinterprets a whole cluster as 64 descriptor entries.
pub fn read_descriptor_cluster(
    partition: &dyn monofs_io::Partition,
    cluster_no: u32,
) -> Result<DescriptorClusterBuf, crate::error::FsError> {
    let mut buf = [0u8; crate::constants::CLUSTER_SIZE];
    partition.read_cluster(cluster_no, &mut buf)?;
    Ok(*bytemuck::from_bytes(&buf))
}

/// Writes 64 descriptor entries back as a whole cluster.
pub fn write_descriptor_cluster(
    partition: &dyn monofs_io::Partition,
    cluster_no: u32,
    entries: &DescriptorClusterBuf,
) -> Result<(), crate::error::FsError> {
    partition.write_cluster(cluster_no, bytemuck::bytes_of(entries).try_into().unwrap())?;
    Ok(())
}

/// Writes an all-zero cluster, used whenever a freshly allocated cluster
/// must start empty.
pub fn zero_cluster(
    partition: &dyn monofs_io::Partition,
    cluster_no: u32,
) -> Result<(), crate::error::FsError> {
    partition.write_cluster(cluster_no, &[0u8; crate::constants::CLUSTER_SIZE])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_not_free_and_round_trips() {
        let path = CanonicalPath::parse("/A.TXT").unwrap();
        let entry = DescriptorEntry::new(&path, 42);
        assert!(!entry.is_free());
        assert_eq!(entry.file_l1_cluster(), 42);
        assert_eq!(entry.file_size(), 0);
        assert_eq!(entry.path().to_string(), "/A.TXT");
    }

    #[test]
    fn free_entry_has_zero_first_byte() {
        assert!(DescriptorEntry::FREE.is_free());
    }

    #[test]
    fn cluster_bufs_are_bytemuck_compatible() {
        let buf = [0u8; crate::constants::CLUSTER_SIZE];
        let entries: &DescriptorClusterBuf = bytemuck::from_bytes(&buf);
        assert!(entries.iter().all(DescriptorEntry::is_free));
    }
}
