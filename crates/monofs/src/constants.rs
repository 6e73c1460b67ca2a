//! Geometry constants derived from the 2048-byte cluster size.

pub use monofs_io::CLUSTER_SIZE;

/// Cluster number 0 means "absent" everywhere an index entry or a file
/// descriptor's `fileL1Cluster` field is read.
pub const NO_CLUSTER: u32 = 0;

/// Each index entry (L1 or L2) is a 4-byte cluster number.
pub const INDEX_ENTRY_SIZE: usize = 4;

/// Number of 4-byte entries in one L1 or L2 index cluster.
pub const ENTRIES_PER_INDEX_CLUSTER: usize = CLUSTER_SIZE / INDEX_ENTRY_SIZE;

/// Each file descriptor entry is 32 bytes.
pub const DESCRIPTOR_ENTRY_SIZE: usize = 32;

/// Number of descriptor entries in one file-descriptor cluster.
pub const ENTRIES_PER_DESCRIPTOR_CLUSTER: usize = CLUSTER_SIZE / DESCRIPTOR_ENTRY_SIZE;

/// Fixed capacity of a per-open-file cluster cache.
pub const CACHE_CAPACITY: usize = 128;

/// Number of bits packed into one bit-vector cluster.
pub const BITS_PER_BV_CLUSTER: u32 = (CLUSTER_SIZE * 8) as u32;

/// Largest file size addressable by a two-level index:
/// 512 L2 clusters per L1, 512 data clusters per L2, 2048 bytes per cluster.
pub const MAX_FILE_SIZE: u64 =
    ENTRIES_PER_INDEX_CLUSTER as u64 * ENTRIES_PER_INDEX_CLUSTER as u64 * CLUSTER_SIZE as u64;

/// Rounds `n` up to the next multiple of `chunk`, both nonzero.
pub const fn ceil_div(n: u32, chunk: u32) -> u32 {
    (n + chunk - 1) / chunk
}
