//! Mount/unmount/format interlock, the global metadata lock, and the
//! process-wide handle (`MonoFs`) every other public operation hangs off.
//! Re-architected from the original design's static globals into a cloneable
//! handle returned by [`MonoFs::new`], per the rewrite guidance to make
//! thread safety explicit in the type instead of implicit in file-scope
//! statics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use monofs_common::CanonicalPath;
use monofs_io::Partition;

use crate::bitvector::{BitVectorAllocator, ClusterAllocator};
use crate::constants::{ceil_div, BITS_PER_BV_CLUSTER};
use crate::directory_index::DirectoryIndex;
use crate::error::FsError;
use crate::open_table::{FileHandleRecord, OpenFileTable};
use crate::raw::{read_descriptor_cluster, write_descriptor_cluster, zero_cluster};
use crate::session::FileSession;
use crate::sync::Semaphore;

/// The mode a file is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    pub fn as_char(self) -> char {
        match self {
            OpenMode::Read => 'r',
            OpenMode::Write => 'w',
            OpenMode::Append => 'a',
        }
    }
}

fn partition_key(partition: &Arc<dyn Partition>) -> usize {
    Arc::as_ptr(partition).cast::<()>() as usize
}

struct MountState {
    partition: Option<Arc<dyn Partition>>,
    formatted: HashMap<usize, bool>,
    waiting_to_unmount: u32,
    waiting_to_format: u32,
    root_l1_cluster: u32,
    bit_vector_size_in_clusters: u32,
    allocator: BitVectorAllocator,
    directory: DirectoryIndex,
    open_files: OpenFileTable,
}

impl MountState {
    fn new() -> Self {
        Self {
            partition: None,
            formatted: HashMap::new(),
            waiting_to_unmount: 0,
            waiting_to_format: 0,
            root_l1_cluster: 0,
            bit_vector_size_in_clusters: 0,
            allocator: BitVectorAllocator::new(0),
            directory: DirectoryIndex::new(0),
            open_files: OpenFileTable::new(),
        }
    }
}

struct Inner {
    state: RwLock<MountState>,
    num_open_files: AtomicU32,
    ok_to_mount: Semaphore,
    ok_to_unmount: Semaphore,
    ok_to_format: Semaphore,
}

/// A process-wide handle to the mounted filesystem. Cheap to clone; every
/// clone refers to the same mount state. At most one partition may be
/// mounted through a given `MonoFs` (and its clones) at any time.
#[derive(Clone)]
pub struct MonoFs(Arc<Inner>);

impl MonoFs {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            state: RwLock::new(MountState::new()),
            num_open_files: AtomicU32::new(0),
            ok_to_mount: Semaphore::new(1),
            ok_to_unmount: Semaphore::new(0),
            ok_to_format: Semaphore::new(0),
        }))
    }

    /// Mounts `partition`. Blocks until any prior mount of this handle has
    /// fully unmounted. Whether `partition` has previously been formatted
    /// through this handle is remembered by its `Arc` identity and
    /// preserved across remounts.
    pub fn mount(&self, partition: Arc<dyn Partition>) -> Result<(), FsError> {
        self.0.ok_to_mount.acquire();
        let mut state = self.0.state.write().unwrap();

        let key = partition_key(&partition);
        state.formatted.entry(key).or_insert(false);

        let num_clusters = partition.num_clusters();
        let bit_vector_size_in_clusters = ceil_div(num_clusters, BITS_PER_BV_CLUSTER);
        state.bit_vector_size_in_clusters = bit_vector_size_in_clusters;
        state.root_l1_cluster = bit_vector_size_in_clusters;
        state.allocator = BitVectorAllocator::new(bit_vector_size_in_clusters);
        state.directory = DirectoryIndex::new(bit_vector_size_in_clusters);
        state.partition = Some(partition);
        log::info!("mounted partition ({num_clusters} clusters)");
        Ok(())
    }

    /// Unmounts, blocking until every open file on this partition closes.
    pub fn unmount(&self) -> Result<(), FsError> {
        let mut state = self.0.state.write().unwrap();
        if state.partition.is_none() {
            return Err(FsError::NotMounted);
        }
        if self.0.num_open_files.load(Ordering::SeqCst) > 0 {
            state.waiting_to_unmount += 1;
            log::warn!(
                "unmount waiting on {} open file(s) to close",
                self.0.num_open_files.load(Ordering::SeqCst)
            );
            drop(state);
            self.0.ok_to_unmount.acquire();
            state = self.0.state.write().unwrap();
            state.waiting_to_unmount -= 1;
            if state.partition.is_none() {
                // Another thread already completed the unmount.
                return Ok(());
            }
        }

        state.partition = None;
        state.root_l1_cluster = 0;
        state.bit_vector_size_in_clusters = 0;
        state.open_files = OpenFileTable::new();
        let waiting_to_format = state.waiting_to_format;
        drop(state);

        self.0.ok_to_format.release(waiting_to_format);
        self.0.ok_to_mount.release(1);
        log::info!("unmounted partition");
        Ok(())
    }

    /// Formats the mounted partition, blocking until every open file
    /// closes. Fails with [`FsError::Busy`] if this partition was already
    /// formatted through this handle -- that guard is permanent per
    /// partition identity and survives unmounting and remounting.
    pub fn format(&self) -> Result<(), FsError> {
        let mut state = self.0.state.write().unwrap();
        if state.partition.is_none() {
            return Err(FsError::NotMounted);
        }
        if self.0.num_open_files.load(Ordering::SeqCst) > 0 {
            state.waiting_to_format += 1;
            log::warn!(
                "format waiting on {} open file(s) to close",
                self.0.num_open_files.load(Ordering::SeqCst)
            );
            drop(state);
            self.0.ok_to_format.acquire();
            state = self.0.state.write().unwrap();
            state.waiting_to_format -= 1;
            if state.partition.is_none() {
                return Err(FsError::RaceLost);
            }
        }

        let partition = state.partition.clone().unwrap();
        let key = partition_key(&partition);
        if *state.formatted.get(&key).unwrap_or(&false) {
            return Err(FsError::Busy);
        }

        let num_clusters = partition.num_clusters();
        let bit_vector_size_in_clusters = ceil_div(num_clusters, BITS_PER_BV_CLUSTER);
        let root_l1_cluster = bit_vector_size_in_clusters;

        let allocator = BitVectorAllocator::new(bit_vector_size_in_clusters);
        allocator.initialize(partition.as_ref(), root_l1_cluster)?;
        zero_cluster(partition.as_ref(), root_l1_cluster)?;

        state.bit_vector_size_in_clusters = bit_vector_size_in_clusters;
        state.root_l1_cluster = root_l1_cluster;
        state.allocator = allocator;
        state.directory = DirectoryIndex::new(root_l1_cluster);
        state.open_files = OpenFileTable::new();
        state.formatted.insert(key, true);
        log::info!("formatted partition ({num_clusters} clusters)");
        Ok(())
    }

    /// Whether a descriptor exists for `path`.
    pub fn exists(&self, path: &str) -> Result<bool, FsError> {
        let path = CanonicalPath::parse(path).map_err(|_| FsError::InvalidArgument)?;
        let state = self.0.state.read().unwrap();
        let partition = self.require_formatted(&state)?;
        Ok(state.directory.lookup(partition.as_ref(), &path)?.is_some())
    }

    /// The number of files currently recorded in the root directory.
    pub fn read_root_dir(&self) -> Result<u32, FsError> {
        let state = self.0.state.read().unwrap();
        let partition = self.require_formatted(&state)?;
        state.directory.count_files(partition.as_ref())
    }

    /// Opens `path` in `mode`, creating it for mode `Write` if absent.
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<FileSession, FsError> {
        let path = CanonicalPath::parse(path).map_err(|_| FsError::InvalidArgument)?;
        let mut state = self.0.state.write().unwrap();
        let partition = self.require_formatted(&state)?;

        let record = match state.open_files.get(&path) {
            Some(record) => record,
            None => match state.directory.lookup(partition.as_ref(), &path)? {
                Some(location) => {
                    let descriptors = read_descriptor_cluster(partition.as_ref(), location.0)?;
                    let file_l1_cluster = descriptors[location.1].file_l1_cluster();
                    let record = Arc::new(FileHandleRecord::new(path, location, file_l1_cluster));
                    state.open_files.insert(record.clone());
                    record
                }
                None => {
                    if mode != OpenMode::Write {
                        return Err(FsError::NotFound);
                    }
                    let (location, file_l1_cluster) =
                        state.directory.create(partition.as_ref(), &state.allocator, &path)?;
                    let record = Arc::new(FileHandleRecord::new(path, location, file_l1_cluster));
                    state.open_files.insert(record.clone());
                    record
                }
            },
        };

        record.increment_open_count();
        self.0.num_open_files.fetch_add(1, Ordering::SeqCst);
        drop(state);

        match mode {
            OpenMode::Read => record.lock.acquire_shared(),
            OpenMode::Write | OpenMode::Append => record.lock.acquire_exclusive(),
        }

        let descriptors = read_descriptor_cluster(partition.as_ref(), record.descriptor_location.0)?;
        let file_size = descriptors[record.descriptor_location.1].file_size();

        let mut session = FileSession::new(self.clone(), record, partition, mode, file_size);
        match mode {
            OpenMode::Write => session.truncate()?,
            OpenMode::Append => session.seek(file_size as u64)?,
            OpenMode::Read => {}
        }
        Ok(session)
    }

    /// Deletes `path`. Fails if it does not exist or is currently open.
    pub fn delete(&self, path: &str) -> Result<(), FsError> {
        let path = CanonicalPath::parse(path).map_err(|_| FsError::InvalidArgument)?;
        let mut state = self.0.state.write().unwrap();
        let partition = self.require_formatted(&state)?;

        let (location, file_l1_cluster) = match state.open_files.get(&path) {
            Some(record) => {
                if record.open_count() > 0 {
                    return Err(FsError::Busy);
                }
                (record.descriptor_location, record.file_l1_cluster)
            }
            None => match state.directory.lookup(partition.as_ref(), &path)? {
                Some(location) => {
                    let descriptors = read_descriptor_cluster(partition.as_ref(), location.0)?;
                    (location, descriptors[location.1].file_l1_cluster())
                }
                None => return Err(FsError::NotFound),
            },
        };

        deallocate_file_tree(partition.as_ref(), &state.allocator, file_l1_cluster)?;
        state.directory.remove(partition.as_ref(), location)?;
        state.open_files.remove(&path);
        Ok(())
    }

    fn require_formatted(&self, state: &MountState) -> Result<Arc<dyn Partition>, FsError> {
        let partition = state.partition.clone().ok_or(FsError::NotMounted)?;
        let key = partition_key(&partition);
        if !*state.formatted.get(&key).unwrap_or(&false) {
            return Err(FsError::NotFormatted);
        }
        Ok(partition)
    }

    /// Called from [`FileSession`]'s `Drop`: persists the cached file size,
    /// decrements open counts, wakes queued unmount/format waiters, and
    /// flushes the cache for mutating modes.
    pub(crate) fn close_session(
        &self,
        record: &Arc<FileHandleRecord>,
        partition: &Arc<dyn Partition>,
        mode: OpenMode,
        file_size: u32,
    ) {
        let mut state = self.0.state.write().unwrap();
        record.decrement_open_count();
        let remaining = self.0.num_open_files.fetch_sub(1, Ordering::SeqCst) - 1;

        if let Ok(mut descriptors) = read_descriptor_cluster(partition.as_ref(), record.descriptor_location.0)
        {
            descriptors[record.descriptor_location.1].set_file_size(file_size);
            let _ = write_descriptor_cluster(partition.as_ref(), record.descriptor_location.0, &descriptors);
        }

        if remaining == 0 {
            if state.waiting_to_unmount > 0 {
                self.0.ok_to_unmount.release(state.waiting_to_unmount);
            } else if state.waiting_to_format > 0 {
                self.0.ok_to_format.release(state.waiting_to_format);
            }
        }
        drop(state);

        if mode != OpenMode::Read {
            let _ = record.cache.write_back(partition.as_ref());
        }

        match mode {
            OpenMode::Read => record.lock.release_shared(),
            OpenMode::Write | OpenMode::Append => record.lock.release_exclusive(),
        }
    }
}

/// Lets `MonoFs` itself stand in for a `BitVectorAllocator` at call sites
/// that only hold the per-file lock -- every `FileSession` write/truncate.
/// Each call takes the global metadata lock for just that one allocate or
/// deallocate, so concurrent writers to different files can never race each
/// other over the shared bit vector.
impl ClusterAllocator for MonoFs {
    fn allocate(&self, partition: &dyn Partition) -> Result<u32, FsError> {
        let state = self.0.state.write().unwrap();
        state.allocator.allocate(partition)
    }

    fn deallocate(&self, partition: &dyn Partition, cluster_number: u32) -> Result<(), FsError> {
        let state = self.0.state.write().unwrap();
        state.allocator.deallocate(partition, cluster_number)
    }
}

impl Default for MonoFs {
    fn default() -> Self {
        Self::new()
    }
}

fn deallocate_file_tree(
    partition: &dyn Partition,
    allocator: &BitVectorAllocator,
    file_l1_cluster: u32,
) -> Result<(), FsError> {
    let l1 = crate::raw::read_index_cluster(partition, file_l1_cluster)?;
    for l1_entry in l1.iter().filter(|e| !e.is_zero()) {
        let l2 = crate::raw::read_index_cluster(partition, l1_entry.get())?;
        for l2_entry in l2.iter().filter(|e| !e.is_zero()) {
            allocator.deallocate(partition, l2_entry.get())?;
        }
        allocator.deallocate(partition, l1_entry.get())?;
    }
    allocator.deallocate(partition, file_l1_cluster)?;
    Ok(())
}
