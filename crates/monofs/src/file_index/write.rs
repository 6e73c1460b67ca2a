use monofs_io::{Partition, CLUSTER_SIZE};

use super::{split_offset, FileIndex};
use crate::bitvector::{BitVectorAllocator, ClusterAllocator};
use crate::cache::ClusterCache;
use crate::error::FsError;
use crate::raw::{read_index_cluster, write_index_cluster, zero_cluster};

impl FileIndex {
    /// Writes `buf` starting at `*cursor`, growing the index as needed.
    ///
    /// On success, `*cursor` advances by `buf.len()` and `*file_size` is
    /// incremented by `buf.len()` unconditionally -- even when the write
    /// overlaps existing content, per the documented behavior this format
    /// preserves rather than silently correcting.
    ///
    /// `allocator` must serialize with every other allocator mutation on the
    /// partition -- every production caller (every `FileSession` write)
    /// passes `MonoFs` itself, which takes the global metadata lock around
    /// each allocate/deallocate before delegating to the bit vector, since a
    /// write only ever holds the per-file lock.
    pub fn write(
        &self,
        partition: &dyn Partition,
        allocator: &dyn ClusterAllocator,
        cache: &ClusterCache,
        cursor: &mut u64,
        file_size: &mut u32,
        buf: &[u8],
    ) -> Result<usize, FsError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let (start_l1, start_l2, start_byte) = split_offset(*cursor);
        let mut l1 = read_index_cluster(partition, self.file_l1_cluster)?;
        let mut written = 0usize;

        for l1_idx in start_l1..l1.len() {
            let (l2_cluster_no, fresh_l1_entry) = if l1[l1_idx].is_zero() {
                let new_cluster = allocator.allocate(partition)?;
                zero_cluster(partition, new_cluster)?;
                l1[l1_idx] = new_cluster.into();
                (new_cluster, true)
            } else {
                (l1[l1_idx].get(), false)
            };
            let mut l2 = read_index_cluster(partition, l2_cluster_no)?;

            let is_first_l1 = l1_idx == start_l1;
            let starts_mid_tree = is_first_l1 && !fresh_l1_entry;
            let l2_start = if starts_mid_tree { start_l2 } else { 0 };
            let mut byte_offset = if starts_mid_tree { start_byte } else { 0 };

            for l2_idx in l2_start..l2.len() {
                if l2[l2_idx].is_zero() {
                    let new_cluster = allocator.allocate(partition)?;
                    let zero_buf = [0u8; CLUSTER_SIZE];
                    cache.write(partition, new_cluster, &zero_buf)?;
                    l2[l2_idx] = new_cluster.into();
                    byte_offset = 0;
                }
                let cluster_no = l2[l2_idx].get();

                let mut cluster_buf = [0u8; CLUSTER_SIZE];
                cache.read(partition, cluster_no, &mut cluster_buf)?;
                let n = (CLUSTER_SIZE - byte_offset).min(buf.len() - written);
                cluster_buf[byte_offset..byte_offset + n].copy_from_slice(&buf[written..written + n]);
                cache.write(partition, cluster_no, &cluster_buf)?;
                written += n;

                if written == buf.len() {
                    *file_size += buf.len() as u32;
                    *cursor += buf.len() as u64;
                    write_index_cluster(partition, l2_cluster_no, &l2)?;
                    write_index_cluster(partition, self.file_l1_cluster, &l1)?;
                    return Ok(written);
                }
                byte_offset = 0;
            }
            write_index_cluster(partition, l2_cluster_no, &l2)?;
        }

        Err(FsError::OutOfSpace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory_index::DirectoryIndex;
    use monofs_common::CanonicalPath;
    use monofs_io::MemoryPartition;

    fn new_file(partition: &MemoryPartition) -> (BitVectorAllocator, ClusterCache, FileIndex) {
        let allocator = BitVectorAllocator::new(1);
        allocator.initialize(partition, 1).unwrap();
        zero_cluster(partition, 1).unwrap();
        let dir = DirectoryIndex::new(1);
        let path = CanonicalPath::parse("/A.TXT").unwrap();
        let (_, file_l1) = dir.create(partition, &allocator, &path).unwrap();
        (allocator, ClusterCache::new(), FileIndex::new(file_l1))
    }

    #[test]
    fn single_short_write_grows_one_data_cluster() {
        let partition = MemoryPartition::new(64);
        let (allocator, cache, file_index) = new_file(&partition);
        let mut cursor = 0u64;
        let mut size = 0u32;
        let n = file_index
            .write(&partition, &allocator, &cache, &mut cursor, &mut size, b"hello")
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(cursor, 5);
        assert_eq!(size, 5);
    }

    #[test]
    fn write_spanning_two_clusters_advances_cursor_and_size() {
        let partition = MemoryPartition::new(64);
        let (allocator, cache, file_index) = new_file(&partition);
        let mut cursor = 0u64;
        let mut size = 0u32;
        let payload = vec![b'x'; CLUSTER_SIZE + 10];
        let n = file_index
            .write(&partition, &allocator, &cache, &mut cursor, &mut size, &payload)
            .unwrap();
        assert_eq!(n, payload.len());
        assert_eq!(cursor, payload.len() as u64);
        assert_eq!(size, payload.len() as u32);
    }

    #[test]
    fn write_fails_with_out_of_space_when_allocator_is_exhausted() {
        let partition = MemoryPartition::new(2);
        let allocator = BitVectorAllocator::new(1);
        allocator.initialize(&partition, 1).unwrap();
        zero_cluster(&partition, 1).unwrap();
        // Only cluster 0 (bit vector) and 1 (root L1) exist; nothing is
        // free for file data, so even fetching a file L1 cluster fails.
        let dir = DirectoryIndex::new(1);
        let path = CanonicalPath::parse("/A.TXT").unwrap();
        assert!(dir.create(&partition, &allocator, &path).is_err());
    }
}
