//! End-to-end scenarios driving [`MonoFs`] the way a real caller would:
//! through `mount`/`format`/`open`/`delete`, never by poking the index
//! modules directly.

use std::sync::Arc;

use monofs::{FsError, MonoFs, OpenMode};
use monofs_io::{MemoryPartition, Partition};
use pretty_assertions::assert_eq;

fn formatted_fs(num_clusters: u32) -> (MonoFs, Arc<dyn Partition>) {
    let partition: Arc<dyn Partition> = Arc::new(MemoryPartition::new(num_clusters));
    let fs = MonoFs::new();
    fs.mount(partition.clone()).unwrap();
    fs.format().unwrap();
    (fs, partition)
}

#[test]
fn operations_before_mount_report_not_mounted() {
    let fs = MonoFs::new();
    assert!(matches!(fs.read_root_dir(), Err(FsError::NotMounted)));
    assert!(matches!(fs.open("/A.TXT", OpenMode::Read), Err(FsError::NotMounted)));
}

#[test]
fn operations_before_format_report_not_formatted() {
    let partition: Arc<dyn Partition> = Arc::new(MemoryPartition::new(512));
    let fs = MonoFs::new();
    fs.mount(partition).unwrap();
    assert!(matches!(fs.read_root_dir(), Err(FsError::NotFormatted)));
}

#[test]
fn create_write_close_then_reopen_and_read_round_trips() {
    let (fs, _partition) = formatted_fs(512);

    let mut session = fs.open("/HELLO.TXT", OpenMode::Write).unwrap();
    session.write(b"hello, monofs").unwrap();
    drop(session);

    assert_eq!(fs.read_root_dir().unwrap(), 1);
    assert!(fs.exists("/HELLO.TXT").unwrap());

    let mut session = fs.open("/HELLO.TXT", OpenMode::Read).unwrap();
    let mut buf = [0u8; 13];
    let n = session.read(&mut buf).unwrap();
    assert_eq!(n, 13);
    assert_eq!(&buf, b"hello, monofs");
    assert!(session.eof());
}

#[test]
fn opening_an_absent_file_for_read_fails_not_found() {
    let (fs, _partition) = formatted_fs(512);
    assert!(matches!(fs.open("/GONE.TXT", OpenMode::Read), Err(FsError::NotFound)));
}

#[test]
fn opening_for_write_creates_the_file_if_absent() {
    let (fs, _partition) = formatted_fs(512);
    let session = fs.open("/NEW.TXT", OpenMode::Write).unwrap();
    drop(session);
    assert!(fs.exists("/NEW.TXT").unwrap());
}

#[test]
fn append_mode_seeks_to_the_current_end_of_file() {
    let (fs, _partition) = formatted_fs(512);
    let mut session = fs.open("/LOG.TXT", OpenMode::Write).unwrap();
    session.write(b"first ").unwrap();
    drop(session);

    let mut session = fs.open("/LOG.TXT", OpenMode::Append).unwrap();
    assert_eq!(session.file_pos(), 6);
    session.write(b"second").unwrap();
    drop(session);

    let mut session = fs.open("/LOG.TXT", OpenMode::Read).unwrap();
    let mut buf = [0u8; 12];
    session.read(&mut buf).unwrap();
    assert_eq!(&buf, b"first second");
}

#[test]
fn reopening_for_write_truncates_existing_content() {
    let (fs, _partition) = formatted_fs(512);
    let mut session = fs.open("/A.TXT", OpenMode::Write).unwrap();
    session.write(b"0123456789").unwrap();
    drop(session);

    let session = fs.open("/A.TXT", OpenMode::Write).unwrap();
    assert_eq!(session.file_size(), 0);
    drop(session);

    let mut session = fs.open("/A.TXT", OpenMode::Read).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(session.read(&mut buf).unwrap(), 0);
}

#[test]
fn write_reports_its_own_overlapping_growth_bug() {
    // Writing 5 bytes twice at the same offset grows fileSize by 10, even
    // though the file's actual content is still only 5 bytes long -- this
    // preserves the on-disk format's own accounting behavior rather than
    // silently correcting it.
    let (fs, _partition) = formatted_fs(512);
    let mut session = fs.open("/A.TXT", OpenMode::Write).unwrap();
    session.write(b"hello").unwrap();
    session.seek(0).unwrap();
    session.write(b"world").unwrap();
    assert_eq!(session.file_size(), 10);
}

#[test]
fn delete_removes_a_closed_file_but_refuses_an_open_one() {
    let (fs, _partition) = formatted_fs(512);
    let mut write_session = fs.open("/A.TXT", OpenMode::Write).unwrap();
    write_session.write(b"data").unwrap();
    drop(write_session);

    let read_session = fs.open("/A.TXT", OpenMode::Read).unwrap();
    assert!(matches!(fs.delete("/A.TXT"), Err(FsError::Busy)));
    drop(read_session);

    fs.delete("/A.TXT").unwrap();
    assert!(!fs.exists("/A.TXT").unwrap());
    assert!(matches!(fs.delete("/A.TXT"), Err(FsError::NotFound)));
}

#[test]
fn format_twice_without_unmounting_is_busy() {
    let (fs, _partition) = formatted_fs(512);
    assert!(matches!(fs.format(), Err(FsError::Busy)));
}

#[test]
fn unmount_then_remount_remembers_the_partition_was_already_formatted() {
    let (fs, partition) = formatted_fs(512);
    fs.unmount().unwrap();
    fs.mount(partition).unwrap();
    // The format guard is keyed on partition identity, not on the mount
    // session, so it survives the unmount/remount cycle.
    assert!(matches!(fs.format(), Err(FsError::Busy)));
    assert_eq!(fs.read_root_dir().unwrap(), 0);
}

#[test]
fn a_second_partition_can_be_formatted_independently() {
    let (fs, _partition) = formatted_fs(512);
    let other: Arc<dyn Partition> = Arc::new(MemoryPartition::new(512));
    fs.unmount().unwrap();
    fs.mount(other).unwrap();
    fs.format().unwrap();
    assert_eq!(fs.read_root_dir().unwrap(), 0);
}

#[test]
fn unmount_waits_for_every_open_session_to_close() {
    use std::thread;
    use std::time::Duration;

    let (fs, _partition) = formatted_fs(512);
    let session = fs.open("/A.TXT", OpenMode::Write).unwrap();

    let fs2 = fs.clone();
    let handle = thread::spawn(move || fs2.unmount());

    thread::sleep(Duration::from_millis(30));
    drop(session);
    handle.join().unwrap().unwrap();
}

#[test]
fn opening_for_write_fails_once_the_partition_has_no_room_for_a_file_l1_cluster() {
    // 2 clusters total: one for the bit vector, one for the root L1 index.
    // There is nothing physically left to hand out for a file's own L1
    // index cluster, whether the allocator reports that as OutOfSpace or the
    // partition itself rejects the out-of-range cluster number.
    let (fs, _partition) = formatted_fs(2);
    assert!(fs.open("/A.TXT", OpenMode::Write).is_err());
}

#[test]
fn truncate_shrinks_a_file_in_place() {
    let (fs, _partition) = formatted_fs(512);
    let mut session = fs.open("/A.TXT", OpenMode::Write).unwrap();
    session.write(&vec![1u8; 3000]).unwrap();
    session.seek(1000).unwrap();
    session.truncate().unwrap();
    assert_eq!(session.file_size(), 1000);
    drop(session);

    let session = fs.open("/A.TXT", OpenMode::Read).unwrap();
    assert_eq!(session.file_size(), 1000);
}
