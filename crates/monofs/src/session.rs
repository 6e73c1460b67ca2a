//! A single open file. Borrows nothing from [`MonoFs`] or the
//! [`FileHandleRecord`] by lifetime -- it holds owning handles (`Arc`s) so it
//! can be moved freely and dropped whenever the caller is done with it. Its
//! `Drop` implementation runs the exact close sequence: persist the cached
//! file size, decrement open counts, wake any thread blocked in `unmount`
//! or `format`, flush the per-file cache for mutating modes, and release the
//! per-file lock in the mode it was acquired.

use std::sync::Arc;

use monofs_io::Partition;

use crate::error::FsError;
use crate::file_index::FileIndex;
use crate::mount::{MonoFs, OpenMode};
use crate::open_table::FileHandleRecord;

pub struct FileSession {
    engine: MonoFs,
    record: Arc<FileHandleRecord>,
    partition: Arc<dyn Partition>,
    mode: OpenMode,
    cursor: u64,
    file_size: u32,
    file_index: FileIndex,
    closed: bool,
}

impl FileSession {
    pub(crate) fn new(
        engine: MonoFs,
        record: Arc<FileHandleRecord>,
        partition: Arc<dyn Partition>,
        mode: OpenMode,
        file_size: u32,
    ) -> Self {
        let file_index = FileIndex::new(record.file_l1_cluster);
        Self {
            engine,
            record,
            partition,
            mode,
            cursor: 0,
            file_size,
            file_index,
            closed: false,
        }
    }

    /// Reads up to `buf.len()` bytes from the current cursor. Valid only
    /// when opened for reading.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.mode != OpenMode::Read {
            return Err(FsError::InvalidArgument);
        }
        self.file_index.read(
            self.partition.as_ref(),
            &self.record.cache,
            &mut self.cursor,
            self.file_size,
            buf,
        )
    }

    /// Writes `buf` at the current cursor, growing the file as needed.
    /// Valid only when opened for writing or appending.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        if self.mode == OpenMode::Read {
            return Err(FsError::InvalidArgument);
        }
        self.file_index.write(
            self.partition.as_ref(),
            &self.engine,
            &self.record.cache,
            &mut self.cursor,
            &mut self.file_size,
            buf,
        )
    }

    /// Discards every byte from the current cursor to the end of the file.
    /// Valid only when opened for writing or appending.
    pub fn truncate(&mut self) -> Result<(), FsError> {
        if self.mode == OpenMode::Read {
            return Err(FsError::InvalidArgument);
        }
        self.file_index.truncate(
            self.partition.as_ref(),
            &self.engine,
            &self.record.cache,
            self.cursor,
            &mut self.file_size,
        )
    }

    /// Moves the cursor to `offset`. Fails if `offset` is past the current
    /// end of the file.
    pub fn seek(&mut self, offset: u64) -> Result<(), FsError> {
        if offset > self.file_size as u64 {
            return Err(FsError::InvalidArgument);
        }
        self.cursor = offset;
        Ok(())
    }

    /// Whether the cursor has reached the end of the file.
    pub fn eof(&self) -> bool {
        self.cursor >= self.file_size as u64
    }

    /// The current cursor position.
    pub fn file_pos(&self) -> u64 {
        self.cursor
    }

    /// The file's size as of the last write or truncate through this
    /// session.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    /// Closes the session early. Equivalent to dropping it, but lets the
    /// caller observe the point at which the per-file lock is released
    /// instead of leaving it implicit in scope exit.
    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.engine
            .close_session(&self.record, &self.partition, self.mode, self.file_size);
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        self.close_once();
    }
}
