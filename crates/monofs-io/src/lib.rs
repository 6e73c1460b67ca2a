//! Block device traits for the monofs filesystem engine.
//!
//! The engine never touches a disk, a file, or a network socket directly: it
//! only ever talks to something implementing [`Partition`]. This mirrors how
//! a kernel never assumes anything about the storage medium beyond "read a
//! block, write a block". [`MemoryPartition`] and [`FilePartition`] are two
//! reference implementations good enough for tests and small command line
//! tools; production users are expected to bring their own.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, RwLock};

/// Size in bytes of a single addressable unit on the partition.
pub const CLUSTER_SIZE: usize = 2048;

/// Errors a [`Partition`] implementation can report.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// The requested cluster index is not backed by the partition.
    #[error("cluster {0} is out of bounds")]
    OutOfBounds(u32),
    /// The underlying medium (file, device, ...) reported an I/O failure.
    #[error("partition I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A block device addressed in fixed-size [`CLUSTER_SIZE`] clusters.
///
/// Implementations are expected to be safe to call from multiple threads at
/// once: the engine issues reads and writes to independent clusters from
/// independent threads without any coordination beyond what it documents for
/// its own locks.
pub trait Partition: Send + Sync {
    /// Total number of clusters addressable on this partition.
    fn num_clusters(&self) -> u32;

    /// Reads cluster `cluster_no` into `buf`.
    fn read_cluster(&self, cluster_no: u32, buf: &mut [u8; CLUSTER_SIZE]) -> Result<(), PartitionError>;

    /// Writes `buf` to cluster `cluster_no`.
    fn write_cluster(&self, cluster_no: u32, buf: &[u8; CLUSTER_SIZE]) -> Result<(), PartitionError>;
}

/// An in-memory partition backed by a single buffer, useful for tests and
/// for exercising the engine without touching a real disk.
pub struct MemoryPartition {
    clusters: RwLock<Vec<[u8; CLUSTER_SIZE]>>,
}

impl MemoryPartition {
    /// Creates a partition with `num_clusters` zeroed clusters.
    pub fn new(num_clusters: u32) -> Self {
        Self {
            clusters: RwLock::new(vec![[0u8; CLUSTER_SIZE]; num_clusters as usize]),
        }
    }
}

impl Partition for MemoryPartition {
    fn num_clusters(&self) -> u32 {
        self.clusters.read().unwrap().len() as u32
    }

    fn read_cluster(&self, cluster_no: u32, buf: &mut [u8; CLUSTER_SIZE]) -> Result<(), PartitionError> {
        let clusters = self.clusters.read().unwrap();
        let cluster = clusters
            .get(cluster_no as usize)
            .ok_or(PartitionError::OutOfBounds(cluster_no))?;
        buf.copy_from_slice(cluster);
        Ok(())
    }

    fn write_cluster(&self, cluster_no: u32, buf: &[u8; CLUSTER_SIZE]) -> Result<(), PartitionError> {
        let mut clusters = self.clusters.write().unwrap();
        let cluster = clusters
            .get_mut(cluster_no as usize)
            .ok_or(PartitionError::OutOfBounds(cluster_no))?;
        cluster.copy_from_slice(buf);
        Ok(())
    }
}

/// A partition backed by a regular file, sized to an exact number of
/// clusters on creation. Reads and writes serialize on a single internal
/// lock, since `File` does not expose safe concurrent positioned I/O across
/// platforms without extra traits.
pub struct FilePartition {
    file: Mutex<File>,
    num_clusters: u32,
}

impl FilePartition {
    /// Opens an existing file as a partition. `file`'s length must be an
    /// exact multiple of [`CLUSTER_SIZE`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PartitionError> {
        let file = File::options().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            num_clusters: (len / CLUSTER_SIZE as u64) as u32,
        })
    }

    /// Creates a fresh, zeroed file of exactly `num_clusters` clusters and
    /// opens it as a partition.
    pub fn create(path: impl AsRef<Path>, num_clusters: u32) -> Result<Self, PartitionError> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(num_clusters as u64 * CLUSTER_SIZE as u64)?;
        Ok(Self {
            file: Mutex::new(file),
            num_clusters,
        })
    }
}

impl Partition for FilePartition {
    fn num_clusters(&self) -> u32 {
        self.num_clusters
    }

    fn read_cluster(&self, cluster_no: u32, buf: &mut [u8; CLUSTER_SIZE]) -> Result<(), PartitionError> {
        if cluster_no >= self.num_clusters {
            return Err(PartitionError::OutOfBounds(cluster_no));
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(cluster_no as u64 * CLUSTER_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_cluster(&self, cluster_no: u32, buf: &[u8; CLUSTER_SIZE]) -> Result<(), PartitionError> {
        if cluster_no >= self.num_clusters {
            return Err(PartitionError::OutOfBounds(cluster_no));
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(cluster_no as u64 * CLUSTER_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }
}
