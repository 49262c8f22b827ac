/*!
 * Handle-Based Operation Tests
 * Descriptor operations skip path validation entirely
 */

use os_file_broker::syscalls::flags::{O_CREAT, O_RDONLY, O_RDWR};
use os_file_broker::{
    AccessValidator, AllowList, ErrorCode, OperationDispatcher, OperationRequest,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn open_in_scratch(flags: i32, contents: &[u8]) -> (TempDir, PathBuf, OperationDispatcher, OwnedFd) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let path = root.join("data");
    fs::write(&path, contents).unwrap();

    let list = AllowList::sandboxed([root.to_string_lossy()]).unwrap();
    let broker = OperationDispatcher::new(AccessValidator::new(list));
    let fd = broker
        .dispatch(OperationRequest::Open {
            path: path.to_string_lossy().into_owned(),
            flags: flags | O_CREAT,
            mode: 0o644,
        })
        .into_descriptor()
        .expect("descriptor");
    (dir, path, broker, fd)
}

#[test]
fn test_read_sized_to_available_bytes() {
    let (_dir, _path, broker, fd) = open_in_scratch(O_RDONLY, b"short");

    let resp = broker.dispatch(OperationRequest::Read {
        fd: fd.as_raw_fd(),
        count: 4096,
    });
    assert_eq!(resp.data(), Some(&b"short"[..]));

    // End of file
    let resp = broker.dispatch(OperationRequest::Read {
        fd: fd.as_raw_fd(),
        count: 4096,
    });
    assert_eq!(resp.data(), Some(&b""[..]));
}

#[test]
fn test_unsatisfiable_read_is_out_of_memory() {
    let (_dir, _path, broker, fd) = open_in_scratch(O_RDONLY, b"x");

    let resp = broker.dispatch(OperationRequest::Read {
        fd: fd.as_raw_fd(),
        count: usize::MAX,
    });
    assert_eq!(resp.error, ErrorCode::OUT_OF_MEMORY);
}

#[test]
fn test_write_on_read_only_descriptor() {
    let (_dir, _path, broker, fd) = open_in_scratch(O_RDONLY, b"x");

    let resp = broker.dispatch(OperationRequest::Write {
        fd: fd.as_raw_fd(),
        data: b"nope".to_vec(),
    });
    assert_eq!(resp.error.errno(), Some(libc::EBADF));
    assert_eq!(resp.written(), Some(-1));
}

#[test]
fn test_fstat_matches_stat() {
    let (_dir, path, broker, fd) = open_in_scratch(O_RDONLY, b"0123456789");

    let by_fd = broker.dispatch(OperationRequest::Fstat { fd: fd.as_raw_fd() });
    let by_path = broker.dispatch(OperationRequest::Stat {
        path: path.to_string_lossy().into_owned(),
    });
    assert_eq!(by_fd.stat_result(), by_path.stat_result());
    assert_eq!(by_fd.stat_result().map(|st| st.size), Some(10));
}

#[test]
fn test_fchmod_futimes_ftruncate() {
    let (_dir, path, broker, fd) = open_in_scratch(O_RDWR, b"0123456789");
    let raw = fd.as_raw_fd();

    assert!(broker
        .dispatch(OperationRequest::Fchmod { fd: raw, mode: 0o640 })
        .is_success());
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);

    assert!(broker
        .dispatch(OperationRequest::Futimes {
            fd: raw,
            atime_ms: 1500.0,
            mtime_ms: 1500.0,
        })
        .is_success());
    let resp = broker.dispatch(OperationRequest::Fstat { fd: raw });
    assert_eq!(resp.stat_result().map(|st| st.atime_ms), Some(1500.0));
    assert_eq!(resp.stat_result().map(|st| st.mtime_ms), Some(1500.0));

    assert!(broker
        .dispatch(OperationRequest::Ftruncate { fd: raw, length: 3 })
        .is_success());
    assert_eq!(fs::read(&path).unwrap(), b"012");

    let resp = broker.dispatch(OperationRequest::Ftruncate {
        fd: raw,
        length: -1,
    });
    assert_eq!(resp.error.errno(), Some(libc::EINVAL));
}

#[test]
fn test_negative_descriptor_rejected() {
    let broker = OperationDispatcher::new(AccessValidator::new(AllowList::unrestricted()));

    for request in [
        OperationRequest::Read { fd: -1, count: 1 },
        OperationRequest::Fstat { fd: -1 },
        OperationRequest::Fchmod { fd: -1, mode: 0o600 },
        OperationRequest::Ftruncate { fd: -1, length: 0 },
        OperationRequest::Close { fd: -1 },
    ] {
        let resp = broker.dispatch(request);
        assert_eq!(resp.error.errno(), Some(libc::EBADF));
    }
}

#[test]
fn test_handle_ops_ignore_allow_list() {
    let (_dir, _path, _broker, fd) = open_in_scratch(O_RDONLY, b"trusted");

    // A broker that would deny every path still serves an open handle
    let locked = OperationDispatcher::new(AccessValidator::new(
        AllowList::sandboxed(Vec::<String>::new()).unwrap(),
    ));
    let resp = locked.dispatch(OperationRequest::Read {
        fd: fd.as_raw_fd(),
        count: 64,
    });
    assert_eq!(resp.data(), Some(&b"trusted"[..]));
}
