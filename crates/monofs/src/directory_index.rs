//! Enumerates, finds, creates, and removes file descriptor entries in the
//! root directory's two-level index (L1 index cluster -> L2 index clusters
//! -> file-descriptor clusters -> 32-byte descriptor entries).

use monofs_common::CanonicalPath;
use monofs_io::Partition;

use crate::bitvector::{BitVectorAllocator, ClusterAllocator};
use crate::constants::{ENTRIES_PER_DESCRIPTOR_CLUSTER, ENTRIES_PER_INDEX_CLUSTER};
use crate::error::FsError;
use crate::raw::{
    read_descriptor_cluster, read_index_cluster, write_descriptor_cluster, write_index_cluster,
    zero_cluster, DescriptorEntry,
};

/// The location of one descriptor entry: its cluster number and its index
/// (0..64) within that cluster.
pub type DescriptorLocation = (u32, usize);

/// Walks and mutates the root directory's descriptor tree.
pub struct DirectoryIndex {
    root_l1_cluster: u32,
}

impl DirectoryIndex {
    pub fn new(root_l1_cluster: u32) -> Self {
        Self { root_l1_cluster }
    }

    /// Counts every non-free descriptor entry reachable from the root L1
    /// cluster.
    pub fn count_files(&self, partition: &dyn Partition) -> Result<u32, FsError> {
        let mut count = 0u32;
        let l1 = read_index_cluster(partition, self.root_l1_cluster)?;
        for l1_entry in l1.iter().filter(|e| !e.is_zero()) {
            let l2 = read_index_cluster(partition, l1_entry.get())?;
            for l2_entry in l2.iter().filter(|e| !e.is_zero()) {
                let descriptors = read_descriptor_cluster(partition, l2_entry.get())?;
                count += descriptors.iter().filter(|d| !d.is_free()).count() as u32;
            }
        }
        Ok(count)
    }

    /// Finds the first descriptor entry whose name matches `path`.
    pub fn lookup(
        &self,
        partition: &dyn Partition,
        path: &CanonicalPath,
    ) -> Result<Option<DescriptorLocation>, FsError> {
        let target = path.to_string();
        let l1 = read_index_cluster(partition, self.root_l1_cluster)?;
        for l1_entry in l1.iter().filter(|e| !e.is_zero()) {
            let l2 = read_index_cluster(partition, l1_entry.get())?;
            for l2_entry in l2.iter().filter(|e| !e.is_zero()) {
                let descriptor_cluster = l2_entry.get();
                let descriptors = read_descriptor_cluster(partition, descriptor_cluster)?;
                for (idx, entry) in descriptors.iter().enumerate() {
                    if !entry.is_free() && entry.path().to_string() == target {
                        return Ok(Some((descriptor_cluster, idx)));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Allocates a descriptor entry for `path` and a fresh, empty file L1
    /// index cluster for it. Returns the entry's location and the file L1
    /// cluster number.
    ///
    /// Proceeds in three passes, same order the lookup tree is walked in:
    /// reuse a free entry in any existing descriptor cluster; else add a
    /// descriptor cluster under an L2 cluster with room; else add a new L2
    /// cluster under a free root L1 entry. Clusters allocated during a
    /// failed attempt are not rolled back.
    pub fn create(
        &self,
        partition: &dyn Partition,
        allocator: &BitVectorAllocator,
        path: &CanonicalPath,
    ) -> Result<(DescriptorLocation, u32), FsError> {
        let mut l1 = read_index_cluster(partition, self.root_l1_cluster)?;

        // First pass: a free entry inside any existing descriptor cluster.
        for l1_entry in l1.iter().filter(|e| !e.is_zero()) {
            let l2 = read_index_cluster(partition, l1_entry.get())?;
            for l2_entry in l2.iter().filter(|e| !e.is_zero()) {
                let descriptor_cluster = l2_entry.get();
                let mut descriptors = read_descriptor_cluster(partition, descriptor_cluster)?;
                if let Some(idx) = descriptors.iter().position(DescriptorEntry::is_free) {
                    let file_l1 = allocator.allocate(partition)?;
                    zero_cluster(partition, file_l1)?;
                    descriptors[idx] = DescriptorEntry::new(path, file_l1);
                    write_descriptor_cluster(partition, descriptor_cluster, &descriptors)?;
                    return Ok(((descriptor_cluster, idx), file_l1));
                }
            }
        }

        // Second pass: room for a new descriptor cluster under an existing
        // L2 cluster.
        for l1_entry in l1.iter().filter(|e| !e.is_zero()) {
            let mut l2 = read_index_cluster(partition, l1_entry.get())?;
            if let Some(l2_idx) = l2.iter().position(|e| e.is_zero()) {
                let descriptor_cluster = allocator.allocate(partition)?;
                let file_l1 = allocator.allocate(partition)?;
                zero_cluster(partition, file_l1)?;

                let mut descriptors = [DescriptorEntry::FREE; ENTRIES_PER_DESCRIPTOR_CLUSTER];
                descriptors[0] = DescriptorEntry::new(path, file_l1);
                write_descriptor_cluster(partition, descriptor_cluster, &descriptors)?;

                l2[l2_idx] = descriptor_cluster.into();
                write_index_cluster(partition, l1_entry.get(), &l2)?;
                return Ok(((descriptor_cluster, 0), file_l1));
            }
        }

        // Third pass: every existing L2 cluster is full; add a new one
        // under a free root L1 entry.
        if let Some(l1_idx) = l1.iter().position(|e| e.is_zero()) {
            let l2_cluster = allocator.allocate(partition)?;
            let descriptor_cluster = allocator.allocate(partition)?;
            let file_l1 = allocator.allocate(partition)?;
            zero_cluster(partition, file_l1)?;

            let mut descriptors = [DescriptorEntry::FREE; ENTRIES_PER_DESCRIPTOR_CLUSTER];
            descriptors[0] = DescriptorEntry::new(path, file_l1);
            write_descriptor_cluster(partition, descriptor_cluster, &descriptors)?;

            let mut l2 = [monofs_common::Le32::ZERO; ENTRIES_PER_INDEX_CLUSTER];
            l2[0] = descriptor_cluster.into();
            write_index_cluster(partition, l2_cluster, &l2)?;

            l1[l1_idx] = l2_cluster.into();
            write_index_cluster(partition, self.root_l1_cluster, &l1)?;
            return Ok(((descriptor_cluster, 0), file_l1));
        }

        Err(FsError::OutOfSpace)
    }

    /// Zeroes the descriptor entry at `location`. The enclosing L2 entry and
    /// root L1 entry are left intact even if the descriptor cluster becomes
    /// entirely empty; directory metadata accretes until reformat.
    pub fn remove(
        &self,
        partition: &dyn Partition,
        location: DescriptorLocation,
    ) -> Result<(), FsError> {
        let (descriptor_cluster, idx) = location;
        let mut descriptors = read_descriptor_cluster(partition, descriptor_cluster)?;
        descriptors[idx] = DescriptorEntry::FREE;
        write_descriptor_cluster(partition, descriptor_cluster, &descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monofs_io::MemoryPartition;

    fn formatted(num_clusters: u32) -> (MemoryPartition, BitVectorAllocator, DirectoryIndex) {
        let partition = MemoryPartition::new(num_clusters);
        let allocator = BitVectorAllocator::new(1);
        allocator.initialize(&partition, 1).unwrap();
        zero_cluster(&partition, 1).unwrap();
        (partition, allocator, DirectoryIndex::new(1))
    }

    #[test]
    fn create_then_lookup_round_trips() {
        let (partition, allocator, dir) = formatted(64);
        let path = CanonicalPath::parse("/A.TXT").unwrap();
        let (location, file_l1) = dir.create(&partition, &allocator, &path).unwrap();
        assert_ne!(file_l1, 0);
        assert_eq!(dir.lookup(&partition, &path).unwrap(), Some(location));
        assert_eq!(dir.count_files(&partition).unwrap(), 1);
    }

    #[test]
    fn remove_frees_the_entry_for_reuse_but_not_the_indexes() {
        let (partition, allocator, dir) = formatted(64);
        let path_a = CanonicalPath::parse("/A.TXT").unwrap();
        let (location_a, _) = dir.create(&partition, &allocator, &path_a).unwrap();
        dir.remove(&partition, location_a).unwrap();
        assert_eq!(dir.lookup(&partition, &path_a).unwrap(), None);
        assert_eq!(dir.count_files(&partition).unwrap(), 0);

        // A subsequent create reuses the freed entry (first pass).
        let path_b = CanonicalPath::parse("/B.TXT").unwrap();
        let (location_b, _) = dir.create(&partition, &allocator, &path_b).unwrap();
        assert_eq!(location_b, location_a);
    }

    #[test]
    fn second_file_shares_the_first_descriptor_cluster() {
        let (partition, allocator, dir) = formatted(64);
        let path_a = CanonicalPath::parse("/A.TXT").unwrap();
        let path_b = CanonicalPath::parse("/B.TXT").unwrap();
        let (loc_a, _) = dir.create(&partition, &allocator, &path_a).unwrap();
        let (loc_b, _) = dir.create(&partition, &allocator, &path_b).unwrap();
        assert_eq!(loc_a.0, loc_b.0);
        assert_eq!(loc_b.1, loc_a.1 + 1);
    }

    #[test]
    fn filling_one_descriptor_cluster_allocates_a_new_one() {
        let (partition, allocator, dir) = formatted(2048);
        let mut first_location = None;
        for i in 0..ENTRIES_PER_DESCRIPTOR_CLUSTER + 1 {
            let name = format!("/F{i}.TXT");
            let path = CanonicalPath::parse(&name).unwrap();
            let (location, _) = dir.create(&partition, &allocator, &path).unwrap();
            if i == 0 {
                first_location = Some(location.0);
            }
            if i == ENTRIES_PER_DESCRIPTOR_CLUSTER {
                assert_ne!(location.0, first_location.unwrap());
                assert_eq!(location.1, 0);
            }
        }
        assert_eq!(
            dir.count_files(&partition).unwrap(),
            ENTRIES_PER_DESCRIPTOR_CLUSTER as u32 + 1
        );
    }
}
