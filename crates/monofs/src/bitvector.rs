//! A packed free/used bit per cluster. Bit 0 of each byte is the lowest
//! cluster number in that byte; a set bit (1) means free.

use monofs_io::{Partition, CLUSTER_SIZE};

use crate::constants::BITS_PER_BV_CLUSTER;
use crate::error::FsError;

/// Owns the free/used bit for every cluster on the mounted partition.
///
/// Every method here assumes the caller already holds the global metadata
/// exclusive lock; the allocator itself does no locking. Production callers
/// never hold a bare `BitVectorAllocator` across an `allocate`/`deallocate`
/// call without that lock -- they go through [`crate::mount::MonoFs`], which
/// also implements [`ClusterAllocator`] by taking the lock itself before
/// delegating here. See that impl for why a second implementation is
/// needed: a write or truncate running under only the per-file lock must
/// not mutate the shared bit vector without also holding the global lock.
#[derive(Clone, Copy)]
pub struct BitVectorAllocator {
    size_in_clusters: u32,
}

/// Allocates and frees cluster numbers from the bit vector. Implemented
/// directly by [`BitVectorAllocator`] for callers that already hold the
/// global metadata lock (e.g. `DirectoryIndex::create`, called from
/// `MonoFs::open`/`format` while that lock is held), and by
/// [`crate::mount::MonoFs`] for callers that only hold a per-file lock
/// (`FileIndex::write`/`truncate`, via `FileSession`), where it must take
/// the global lock itself around each call to keep allocator mutations
/// serialized.
pub trait ClusterAllocator {
    fn allocate(&self, partition: &dyn Partition) -> Result<u32, FsError>;
    fn deallocate(&self, partition: &dyn Partition, cluster_number: u32) -> Result<(), FsError>;
}

impl BitVectorAllocator {
    pub fn new(size_in_clusters: u32) -> Self {
        Self { size_in_clusters }
    }

    /// Format-time initialization: marks every bit-vector cluster and the
    /// root L1 cluster in-use, and every other addressable cluster free.
    pub fn initialize(
        &self,
        partition: &dyn Partition,
        root_l1_cluster: u32,
    ) -> Result<(), FsError> {
        // Clusters [0, root_l1_cluster] are metadata: the bit vector itself
        // plus the root L1 cluster immediately after it.
        let in_use_count = root_l1_cluster as u64 + 1;

        for cluster_idx in 0..self.size_in_clusters {
            let mut buf = [0u8; CLUSTER_SIZE];
            for (i, byte) in buf.iter_mut().enumerate() {
                let global_byte = cluster_idx as u64 * CLUSTER_SIZE as u64 + i as u64;
                let first_bit = global_byte * 8;
                *byte = if first_bit + 7 < in_use_count {
                    0x00
                } else if first_bit >= in_use_count {
                    0xFF
                } else {
                    let in_use_bits = (in_use_count - first_bit) as u32;
                    0xFFu8 << in_use_bits
                };
            }
            partition.write_cluster(cluster_idx, &buf)?;
        }
        Ok(())
    }
}

impl ClusterAllocator for BitVectorAllocator {
    /// Scans bit-vector clusters in ascending order for the first free
    /// cluster, clears its bit, and returns its number.
    fn allocate(&self, partition: &dyn Partition) -> Result<u32, FsError> {
        let mut buf = [0u8; CLUSTER_SIZE];
        for cluster_idx in 0..self.size_in_clusters {
            partition.read_cluster(cluster_idx, &mut buf)?;
            if let Some(byte_idx) = buf.iter().position(|&b| b != 0) {
                let bit_idx = buf[byte_idx].trailing_zeros();
                buf[byte_idx] &= !(1 << bit_idx);
                partition.write_cluster(cluster_idx, &buf)?;
                let cluster_number = cluster_idx * BITS_PER_BV_CLUSTER + byte_idx as u32 * 8 + bit_idx;
                log::debug!("allocated cluster {cluster_number}");
                return Ok(cluster_number);
            }
        }
        Err(FsError::OutOfSpace)
    }

    /// Marks `cluster_number` free again. The caller guarantees it was
    /// previously allocated.
    fn deallocate(&self, partition: &dyn Partition, cluster_number: u32) -> Result<(), FsError> {
        let cluster_idx = cluster_number / BITS_PER_BV_CLUSTER;
        let bit_in_cluster = cluster_number % BITS_PER_BV_CLUSTER;
        let byte_idx = (bit_in_cluster / 8) as usize;
        let bit_idx = bit_in_cluster % 8;

        let mut buf = [0u8; CLUSTER_SIZE];
        partition.read_cluster(cluster_idx, &mut buf)?;
        buf[byte_idx] |= 1 << bit_idx;
        partition.write_cluster(cluster_idx, &buf)?;
        log::debug!("deallocated cluster {cluster_number}");
        Ok(())
    }
}
