/*!
 * Dispatcher Tests
 * Path-based operations: validation first, then the real system call
 */

use os_file_broker::syscalls::flags::{O_CREAT, O_NOFOLLOW, O_RDONLY, O_WRONLY};
use os_file_broker::{
    AccessValidator, AllowList, ErrorCode, OperationDispatcher, OperationRequest,
    OperationResponse,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    _dir: TempDir,
    root: PathBuf,
    outside: PathBuf,
    broker: OperationDispatcher,
}

fn sandbox() -> Sandbox {
    let dir = TempDir::new().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let root = base.join("sandbox");
    let outside = base.join("outside");
    fs::create_dir(&root).unwrap();
    fs::create_dir(&outside).unwrap();

    let list = AllowList::sandboxed([root.to_string_lossy()]).unwrap();
    Sandbox {
        _dir: dir,
        root,
        outside,
        broker: OperationDispatcher::new(AccessValidator::new(list)),
    }
}

fn s(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().into_owned()
}

fn errno(resp: &OperationResponse) -> Option<i32> {
    resp.error.errno()
}

#[test]
fn test_dotdot_escape_denied_without_syscall() {
    let sb = sandbox();
    fs::write(sb.outside.join("passwd"), b"root:x").unwrap();
    let escaping = s(sb.root.join("../outside/passwd"));

    let resp = sb.broker.dispatch(OperationRequest::Open {
        path: escaping.clone(),
        flags: O_RDONLY,
        mode: 0,
    });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);
    assert!(resp.descriptor().is_none());

    let resp = sb.broker.dispatch(OperationRequest::Unlink { path: escaping });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);
    assert_eq!(fs::read(sb.outside.join("passwd")).unwrap(), b"root:x");
}

#[test]
fn test_mkdir_under_root() {
    let sb = sandbox();

    let resp = sb.broker.dispatch(OperationRequest::Mkdir {
        path: s(sb.root.join("new_dir")),
        mode: 0o755,
    });
    assert_eq!(resp.error, ErrorCode::SUCCESS);
    assert!(sb.root.join("new_dir").is_dir());

    let resp = sb.broker.dispatch(OperationRequest::Mkdir {
        path: s(sb.root.join("new_dir")),
        mode: 0o755,
    });
    assert_eq!(errno(&resp), Some(libc::EEXIST));
}

#[test]
fn test_open_write_close_reopen_read() {
    let sb = sandbox();
    let path = s(sb.root.join("notes.txt"));
    let payload = b"broker round trip".to_vec();

    let fd = sb
        .broker
        .dispatch(OperationRequest::Open {
            path: path.clone(),
            flags: O_CREAT | O_WRONLY,
            mode: 0o644,
        })
        .into_descriptor()
        .expect("descriptor");

    let resp = sb.broker.dispatch(OperationRequest::Write {
        fd: fd.as_raw_fd(),
        data: payload.clone(),
    });
    assert_eq!(resp.written(), Some(payload.len() as isize));

    let resp = sb.broker.dispatch(OperationRequest::Close {
        fd: fd.into_raw_fd(),
    });
    assert!(resp.is_success());

    let fd = sb
        .broker
        .dispatch(OperationRequest::Open {
            path,
            flags: O_RDONLY,
            mode: 0,
        })
        .into_descriptor()
        .expect("descriptor");
    let resp = sb.broker.dispatch(OperationRequest::Read {
        fd: fd.as_raw_fd(),
        count: 4096,
    });
    assert_eq!(resp.data(), Some(payload.as_slice()));
}

#[test]
fn test_open_mode_applied_on_create() {
    let sb = sandbox();
    let path = sb.root.join("private");

    let resp = sb.broker.dispatch(OperationRequest::Open {
        path: s(&path),
        flags: O_CREAT | O_WRONLY,
        mode: 0o600,
    });
    assert!(resp.is_success());
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    // umask can only clear bits
    assert_eq!(mode & 0o077, 0);
    assert_eq!(mode & 0o600, 0o600);
}

#[test]
fn test_utimes_millisecond_conversion() {
    let sb = sandbox();
    let path = s(sb.root.join("stamped"));
    fs::write(&path, b"x").unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Utimes {
        path: path.clone(),
        atime_ms: 1500.0,
        mtime_ms: 2_000_250.0,
    });
    assert!(resp.is_success());

    let resp = sb.broker.dispatch(OperationRequest::Stat { path });
    let stat = resp.stat_result().expect("stat payload");
    assert_eq!(stat.atime_ms, 1500.0);
    assert_eq!(stat.mtime_ms, 2_000_250.0);
}

#[test]
fn test_lutimes_leaves_target_alone() {
    let sb = sandbox();
    let target = sb.root.join("target");
    let link = sb.root.join("link");
    fs::write(&target, b"x").unwrap();
    symlink(&target, &link).unwrap();
    let before = fs::metadata(&target).unwrap().modified().unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Lutimes {
        path: s(&link),
        atime_ms: 3000.0,
        mtime_ms: 4000.0,
    });
    assert!(resp.is_success());

    let resp = sb.broker.dispatch(OperationRequest::Lstat { path: s(&link) });
    assert_eq!(resp.stat_result().map(|st| st.mtime_ms), Some(4000.0));
    assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), before);
}

#[test]
fn test_readlink_exact_lengths() {
    let sb = sandbox();

    for len in [1usize, 100, 254, 255, 256, 511, 1024, 4000] {
        let link = s(sb.root.join(format!("link-{}", len)));
        let target = "t".repeat(len);

        let resp = sb.broker.dispatch(OperationRequest::Symlink {
            target: target.clone(),
            link: link.clone(),
        });
        assert!(resp.is_success(), "symlink of length {}", len);

        let resp = sb.broker.dispatch(OperationRequest::Readlink { path: link });
        assert_eq!(resp.link(), Some(target.as_str()));
    }
}

#[test]
fn test_readlink_on_regular_file() {
    let sb = sandbox();
    fs::write(sb.root.join("plain"), b"x").unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Readlink {
        path: s(sb.root.join("plain")),
    });
    assert_eq!(errno(&resp), Some(libc::EINVAL));
}

#[test]
fn test_readdir_lists_entries_only() {
    let sb = sandbox();
    fs::write(sb.root.join("a"), b"").unwrap();
    fs::write(sb.root.join("b"), b"").unwrap();
    fs::create_dir(sb.root.join("c")).unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Readdir {
        path: s(&sb.root),
    });
    let mut entries = resp.entries().expect("entries").to_vec();
    entries.sort();
    assert_eq!(entries, vec!["a", "b", "c"]);
}

#[test]
fn test_stat_idempotent() {
    let sb = sandbox();
    let path = s(sb.root.join("steady"));
    fs::write(&path, b"unchanging").unwrap();

    for request in [
        OperationRequest::Stat { path: path.clone() },
        OperationRequest::Lstat { path: path.clone() },
    ] {
        let first = sb.broker.dispatch(request.clone());
        let second = sb.broker.dispatch(request);
        assert_eq!(first.stat_result(), second.stat_result());
        assert_eq!(first.stat_result().map(|st| st.size), Some(10));
        assert!(first.stat_result().is_some_and(|st| st.is_file()));
    }
}

#[test]
fn test_stat_failure_carries_record() {
    let sb = sandbox();

    let resp = sb.broker.dispatch(OperationRequest::Stat {
        path: s(sb.root.join("missing")),
    });
    assert_eq!(errno(&resp), Some(libc::ENOENT));
    assert_eq!(resp.stat_result().map(|st| st.error), Some(resp.error));

    let resp = sb.broker.dispatch(OperationRequest::Stat {
        path: "relative".into(),
    });
    assert_eq!(errno(&resp), Some(libc::EINVAL));
    assert_eq!(resp.stat_result().map(|st| st.error), Some(resp.error));

    let resp = sb.broker.dispatch(OperationRequest::Stat {
        path: s(&sb.outside),
    });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);
    assert_eq!(
        resp.stat_result().map(|st| st.error),
        Some(ErrorCode::ACCESS_DENIED)
    );
}

#[test]
fn test_symlink_location_validated_target_text_not() {
    let sb = sandbox();
    fs::write(sb.root.join("inside"), b"x").unwrap();

    // Outside location is denied even though the target text points inside
    let resp = sb.broker.dispatch(OperationRequest::Symlink {
        target: s(sb.root.join("inside")),
        link: s(sb.outside.join("link")),
    });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);
    assert!(fs::symlink_metadata(sb.outside.join("link")).is_err());

    // Target text is stored verbatim, even when it names a disallowed path
    let resp = sb.broker.dispatch(OperationRequest::Symlink {
        target: "/etc/passwd".into(),
        link: s(sb.root.join("link")),
    });
    assert!(resp.is_success());
    assert_eq!(
        fs::read_link(sb.root.join("link")).unwrap(),
        PathBuf::from("/etc/passwd")
    );
}

#[test]
fn test_escaping_link_not_followed() {
    let sb = sandbox();
    fs::write(sb.outside.join("secret"), b"s").unwrap();
    symlink(&sb.outside, sb.root.join("escape")).unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Open {
        path: s(sb.root.join("escape/secret")),
        flags: O_RDONLY,
        mode: 0,
    });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);

    let resp = sb.broker.dispatch(OperationRequest::Stat {
        path: s(sb.root.join("escape")),
    });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);

    // The link itself is inside the root
    let resp = sb.broker.dispatch(OperationRequest::Lstat {
        path: s(sb.root.join("escape")),
    });
    assert!(resp.stat_result().is_some_and(|st| st.is_symbolic_link()));

    let resp = sb.broker.dispatch(OperationRequest::Unlink {
        path: s(sb.root.join("escape")),
    });
    assert!(resp.is_success());
    assert!(sb.outside.join("secret").exists());
}

#[test]
fn test_dangling_link_cannot_create_outside() {
    let sb = sandbox();
    symlink(sb.outside.join("planted"), sb.root.join("dangling")).unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Open {
        path: s(sb.root.join("dangling")),
        flags: O_CREAT | O_WRONLY,
        mode: 0o644,
    });
    assert!(!resp.is_success());
    assert!(!sb.outside.join("planted").exists());
}

#[test]
fn test_rename_checks_both_paths() {
    let sb = sandbox();
    fs::write(sb.root.join("from"), b"x").unwrap();

    let resp = sb.broker.dispatch(OperationRequest::Rename {
        from: s(sb.root.join("from")),
        to: s(sb.outside.join("stolen")),
    });
    assert_eq!(resp.error, ErrorCode::ACCESS_DENIED);
    assert!(sb.root.join("from").exists());

    let resp = sb.broker.dispatch(OperationRequest::Rename {
        from: s(sb.root.join("from")),
        to: s(sb.root.join("to")),
    });
    assert!(resp.is_success());
    assert!(sb.root.join("to").exists());

    // Destination subtree does not exist yet: admitted, then refused by the OS
    let resp = sb.broker.dispatch(OperationRequest::Rename {
        from: s(sb.root.join("to")),
        to: s(sb.root.join("later/dir/file")),
    });
    assert_eq!(errno(&resp), Some(libc::ENOENT));
}

#[test]
fn test_chmod_truncate_unlink_rmdir() {
    let sb = sandbox();
    let file = sb.root.join("file");
    fs::write(&file, b"0123456789").unwrap();
    fs::create_dir(sb.root.join("dir")).unwrap();

    assert!(sb
        .broker
        .dispatch(OperationRequest::Chmod {
            path: s(&file),
            mode: 0o600,
        })
        .is_success());
    assert_eq!(fs::metadata(&file).unwrap().permissions().mode() & 0o777, 0o600);

    assert!(sb
        .broker
        .dispatch(OperationRequest::Truncate {
            path: s(&file),
            length: 4,
        })
        .is_success());
    assert_eq!(fs::read(&file).unwrap(), b"0123");

    let resp = sb.broker.dispatch(OperationRequest::Rmdir { path: s(&file) });
    assert_eq!(errno(&resp), Some(libc::ENOTDIR));

    assert!(sb
        .broker
        .dispatch(OperationRequest::Unlink { path: s(&file) })
        .is_success());
    assert!(sb
        .broker
        .dispatch(OperationRequest::Rmdir {
            path: s(sb.root.join("dir")),
        })
        .is_success());
    assert!(fs::read_dir(&sb.root).unwrap().next().is_none());
}

#[test]
fn test_unsandboxed_admits_any_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("anywhere");
    fs::write(&path, b"x").unwrap();

    let broker = OperationDispatcher::new(AccessValidator::new(AllowList::unrestricted()));
    let resp = broker.dispatch(OperationRequest::Stat { path: s(&path) });
    assert!(resp.is_success());
}

#[test]
fn test_open_nofollow_refuses_trailing_link() {
    let sb = sandbox();
    fs::write(sb.root.join("data"), b"payload").unwrap();
    fs::write(sb.outside.join("secret"), b"s").unwrap();
    symlink(sb.root.join("data"), sb.root.join("inner")).unwrap();
    symlink(sb.outside.join("secret"), sb.root.join("outer")).unwrap();

    for link in ["inner", "outer"] {
        let resp = sb.broker.dispatch(OperationRequest::Open {
            path: s(sb.root.join(link)),
            flags: O_RDONLY | O_NOFOLLOW,
            mode: 0,
        });
        assert_eq!(errno(&resp), Some(libc::ELOOP), "link {}", link);
        assert!(resp.descriptor().is_none());
    }

    let resp = sb.broker.dispatch(OperationRequest::Open {
        path: s(sb.root.join("inner")),
        flags: O_RDONLY,
        mode: 0,
    });
    assert_eq!(resp.error, ErrorCode::SUCCESS);
}
