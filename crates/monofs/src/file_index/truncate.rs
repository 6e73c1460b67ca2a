use monofs_common::Le32;
use monofs_io::{Partition, CLUSTER_SIZE};

use super::{split_offset, FileIndex};
use crate::bitvector::{BitVectorAllocator, ClusterAllocator};
use crate::cache::ClusterCache;
use crate::error::FsError;
use crate::raw::{read_index_cluster, write_index_cluster};

impl FileIndex {
    /// Removes the bytes in `[cursor, *file_size)`. `*file_size` becomes
    /// `cursor`. A data cluster whose first removed byte sits at the start
    /// of the cluster is deallocated; one truncated mid-cluster keeps its
    /// allocation so its surviving prefix stays intact. A no-op (not an
    /// error) when the cursor is already at the end of the file -- this is
    /// also what every `open('w')` on a brand-new, still-empty file runs
    /// into, so it has to succeed.
    ///
    /// `allocator` must serialize with every other allocator mutation on the
    /// partition -- see [`FileIndex::write`] for why production callers pass
    /// `MonoFs` itself rather than a bare `BitVectorAllocator`.
    pub fn truncate(
        &self,
        partition: &dyn Partition,
        allocator: &dyn ClusterAllocator,
        cache: &ClusterCache,
        cursor: u64,
        file_size: &mut u32,
    ) -> Result<(), FsError> {
        if cursor > *file_size as u64 {
            return Err(FsError::InvalidArgument);
        }
        if cursor == *file_size as u64 {
            return Ok(());
        }

        let (start_l1, start_l2, start_byte) = split_offset(cursor);
        let mut l1 = read_index_cluster(partition, self.file_l1_cluster)?;
        let mut remaining: i64 = *file_size as i64 - cursor as i64;
        let mut first_visit = true;

        for l1_idx in start_l1..l1.len() {
            if l1[l1_idx].is_zero() {
                break;
            }
            let l2_cluster_no = l1[l1_idx].get();
            let mut l2 = read_index_cluster(partition, l2_cluster_no)?;
            let l2_start = if l1_idx == start_l1 { start_l2 } else { 0 };

            for l2_idx in l2_start..l2.len() {
                if remaining <= 0 {
                    break;
                }
                if l2[l2_idx].is_zero() {
                    break;
                }
                let byte_offset = if first_visit && l2_idx == l2_start {
                    start_byte
                } else {
                    0
                };
                if byte_offset != 0 {
                    remaining -= (CLUSTER_SIZE - byte_offset) as i64;
                } else {
                    allocator.deallocate(partition, l2[l2_idx].get())?;
                    cache.invalidate(l2[l2_idx].get());
                    l2[l2_idx] = Le32::ZERO;
                    remaining -= CLUSTER_SIZE as i64;
                }
                first_visit = false;
            }

            if l2.iter().all(|e| e.is_zero()) {
                allocator.deallocate(partition, l2_cluster_no)?;
                l1[l1_idx] = Le32::ZERO;
            } else {
                write_index_cluster(partition, l2_cluster_no, &l2)?;
            }

            if remaining <= 0 {
                write_index_cluster(partition, self.file_l1_cluster, &l1)?;
                *file_size = cursor as u32;
                return Ok(());
            }
        }

        write_index_cluster(partition, self.file_l1_cluster, &l1)?;
        *file_size = cursor as u32;
        Ok(())
    }
}
