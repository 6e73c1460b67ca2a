use monofs_io::{Partition, CLUSTER_SIZE};

use super::{split_offset, FileIndex};
use crate::cache::ClusterCache;
use crate::error::FsError;
use crate::raw::read_index_cluster;

impl FileIndex {
    /// Reads up to `buf.len()` bytes starting at `*cursor`, clamped to
    /// `file_size - *cursor`. Never allocates: an absent L2 or data cluster
    /// under the cursor would violate the invariant that every offset below
    /// `file_size` is backed by a cluster, so encountering one here stops
    /// the read early rather than allocating.
    pub fn read(
        &self,
        partition: &dyn Partition,
        cache: &ClusterCache,
        cursor: &mut u64,
        file_size: u32,
        buf: &mut [u8],
    ) -> Result<usize, FsError> {
        if buf.is_empty() || *cursor >= file_size as u64 {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(file_size as u64 - *cursor) as usize;

        let (start_l1, start_l2, start_byte) = split_offset(*cursor);
        let l1 = read_index_cluster(partition, self.file_l1_cluster)?;
        let mut read_so_far = 0usize;

        'outer: for l1_idx in start_l1..l1.len() {
            if l1[l1_idx].is_zero() {
                break;
            }
            let l2 = read_index_cluster(partition, l1[l1_idx].get())?;
            let l2_start = if l1_idx == start_l1 { start_l2 } else { 0 };

            for l2_idx in l2_start..l2.len() {
                if l2[l2_idx].is_zero() {
                    break 'outer;
                }
                let byte_offset = if l1_idx == start_l1 && l2_idx == l2_start {
                    start_byte
                } else {
                    0
                };

                let mut cluster_buf = [0u8; CLUSTER_SIZE];
                cache.read(partition, l2[l2_idx].get(), &mut cluster_buf)?;
                let n = (CLUSTER_SIZE - byte_offset).min(want - read_so_far);
                buf[read_so_far..read_so_far + n]
                    .copy_from_slice(&cluster_buf[byte_offset..byte_offset + n]);
                read_so_far += n;

                if read_so_far == want {
                    *cursor += read_so_far as u64;
                    return Ok(read_so_far);
                }
            }
        }

        *cursor += read_so_far as u64;
        Ok(read_so_far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitvector::BitVectorAllocator;
    use crate::directory_index::DirectoryIndex;
    use crate::raw::zero_cluster;
    use monofs_common::CanonicalPath;
    use monofs_io::MemoryPartition;

    #[test]
    fn read_returns_zero_at_end_of_file() {
        let partition = MemoryPartition::new(64);
        let allocator = BitVectorAllocator::new(1);
        allocator.initialize(&partition, 1).unwrap();
        zero_cluster(&partition, 1).unwrap();
        let dir = DirectoryIndex::new(1);
        let path = CanonicalPath::parse("/A.TXT").unwrap();
        let (_, file_l1) = dir.create(&partition, &allocator, &path).unwrap();
        let file_index = FileIndex::new(file_l1);
        let cache = ClusterCache::new();

        let mut cursor = 0u64;
        let mut out = [0u8; 16];
        let n = file_index.read(&partition, &cache, &mut cursor, 0, &mut out).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn read_after_write_round_trips() {
        let partition = MemoryPartition::new(64);
        let allocator = BitVectorAllocator::new(1);
        allocator.initialize(&partition, 1).unwrap();
        zero_cluster(&partition, 1).unwrap();
        let dir = DirectoryIndex::new(1);
        let path = CanonicalPath::parse("/A.TXT").unwrap();
        let (_, file_l1) = dir.create(&partition, &allocator, &path).unwrap();
        let file_index = FileIndex::new(file_l1);
        let cache = ClusterCache::new();

        let mut cursor = 0u64;
        let mut size = 0u32;
        file_index
            .write(&partition, &allocator, &cache, &mut cursor, &mut size, b"hello world")
            .unwrap();

        let mut read_cursor = 0u64;
        let mut out = [0u8; 11];
        let n = file_index
            .read(&partition, &cache, &mut read_cursor, size, &mut out)
            .unwrap();
        assert_eq!(n, 11);
        assert_eq!(&out, b"hello world");
    }
}
