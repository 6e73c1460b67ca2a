//! The error kinds every `monofs` operation reports failure through.

/// An error returned by a `monofs` operation.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// A null path, a mode outside `{r, w, a}`, a malformed path, a seek
    /// beyond `fileSize`, a write in `'r'` mode, or a truncate in `'r'` mode.
    #[error("invalid argument")]
    InvalidArgument,
    /// The operation requires a mounted partition.
    #[error("no partition is mounted")]
    NotMounted,
    /// The operation requires a formatted partition.
    #[error("the mounted partition is not formatted")]
    NotFormatted,
    /// `open('r'|'a')` or `delete` targeted a path with no descriptor.
    #[error("file not found")]
    NotFound,
    /// `delete` targeted a file with a nonzero open count, or `format` was
    /// called twice on an already-formatted mounted partition.
    #[error("resource is busy")]
    Busy,
    /// A cluster allocation failed during `create`, `write`, or the
    /// truncate prelude.
    #[error("out of space")]
    OutOfSpace,
    /// Read past the end of a file.
    #[error("end of file")]
    EndOfFile,
    /// A thread woke from the unmount/format wait and found the partition
    /// had already been taken out from under it.
    #[error("lost the race for the mounted partition")]
    RaceLost,
    /// The underlying partition reported an I/O failure.
    #[error("partition error: {0}")]
    Partition(#[from] monofs_io::PartitionError),
}
