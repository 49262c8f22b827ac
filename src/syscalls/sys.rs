/*!
 * Raw System Calls
 * Thin wrappers over libc for calls std does not expose with the needed semantics
 */

use crate::core::types::ErrorCode;
use nix::errno::Errno;
use std::ffi::CString;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use super::time::{to_timespec, to_timeval};

/// First readlink buffer size
pub const READLINK_INITIAL_BUFFER: usize = 255;

/// Largest readlink buffer; a link that fills it reports out-of-memory
pub const READLINK_MAX_BUFFER: usize = 1 << 20;

/// errno of the last failed call on this thread
#[inline]
pub fn last_errno() -> ErrorCode {
    ErrorCode::from_errno(Errno::last() as i32)
}

fn c_path(path: &Path) -> Result<CString, ErrorCode> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| ErrorCode::from_errno(libc::EINVAL))
}

/// open(2). A zero `mode` selects the two-argument form.
pub fn open(path: &Path, flags: i32, mode: u32) -> Result<OwnedFd, ErrorCode> {
    let path = c_path(path)?;
    let flags = flags | libc::O_CLOEXEC;

    let fd = if mode == 0 {
        // SAFETY: path is NUL-terminated and outlives the call
        unsafe { libc::open(path.as_ptr(), flags) }
    } else {
        // SAFETY: as above; mode is passed as the variadic third argument
        unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) }
    };

    if fd < 0 {
        return Err(last_errno());
    }
    // SAFETY: fd was just returned by open and has no other owner
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// close(2) on a descriptor whose ownership was transferred to the broker
pub fn close(fd: RawFd) -> Result<(), ErrorCode> {
    if fd < 0 {
        return Err(ErrorCode::from_errno(libc::EBADF));
    }
    // SAFETY: close only consumes the integer; an invalid fd yields EBADF
    if unsafe { libc::close(fd) } < 0 {
        return Err(last_errno());
    }
    Ok(())
}

/// utimes(2), following symlinks
pub fn utimes(path: &Path, atime_ms: f64, mtime_ms: f64) -> Result<(), ErrorCode> {
    let path = c_path(path)?;
    let times = [to_timeval(atime_ms), to_timeval(mtime_ms)];
    // SAFETY: path is NUL-terminated; times points at two initialized timevals
    if unsafe { libc::utimes(path.as_ptr(), times.as_ptr()) } < 0 {
        return Err(last_errno());
    }
    Ok(())
}

/// Set times on a symlink itself
pub fn lutimes(path: &Path, atime_ms: f64, mtime_ms: f64) -> Result<(), ErrorCode> {
    let path = c_path(path)?;
    let times = [to_timespec(atime_ms), to_timespec(mtime_ms)];
    // SAFETY: path is NUL-terminated; times points at two initialized timespecs
    let rc = unsafe {
        libc::utimensat(
            libc::AT_FDCWD,
            path.as_ptr(),
            times.as_ptr(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if rc < 0 {
        return Err(last_errno());
    }
    Ok(())
}

pub fn futimes(fd: RawFd, atime_ms: f64, mtime_ms: f64) -> Result<(), ErrorCode> {
    let times = [to_timespec(atime_ms), to_timespec(mtime_ms)];
    // SAFETY: times points at two initialized timespecs; a bad fd yields EBADF
    if unsafe { libc::futimens(fd, times.as_ptr()) } < 0 {
        return Err(last_errno());
    }
    Ok(())
}

pub fn truncate(path: &Path, length: i64) -> Result<(), ErrorCode> {
    let path = c_path(path)?;
    // SAFETY: path is NUL-terminated and outlives the call
    if unsafe { libc::truncate(path.as_ptr(), length as libc::off_t) } < 0 {
        return Err(last_errno());
    }
    Ok(())
}

/// readlink(2) with a growing buffer
pub fn readlink(path: &Path) -> Result<Vec<u8>, ErrorCode> {
    let path = c_path(path)?;
    read_growing(|buf| {
        // SAFETY: buf is valid for buf.len() writable bytes
        let n = unsafe { libc::readlink(path.as_ptr(), buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            Err(last_errno())
        } else {
            Ok(n as usize)
        }
    })
}

/// Call `fill` with buffers of 255, 510, ... bytes until the result no longer
/// fills the buffer. A result that fills the largest buffer is out-of-memory,
/// never a truncated value.
pub(crate) fn read_growing<F>(mut fill: F) -> Result<Vec<u8>, ErrorCode>
where
    F: FnMut(&mut [u8]) -> Result<usize, ErrorCode>,
{
    let mut size = READLINK_INITIAL_BUFFER;
    loop {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| ErrorCode::OUT_OF_MEMORY)?;
        buf.resize(size, 0);

        let n = fill(&mut buf)?;
        if n < size {
            buf.truncate(n);
            return Ok(buf);
        }
        if size >= READLINK_MAX_BUFFER {
            return Err(ErrorCode::OUT_OF_MEMORY);
        }
        size = (size * 2).min(READLINK_MAX_BUFFER);
    }
}

/// View a caller-owned descriptor as a `File` without taking ownership
pub fn borrow_file(fd: RawFd) -> Result<ManuallyDrop<File>, ErrorCode> {
    if fd < 0 {
        return Err(ErrorCode::from_errno(libc::EBADF));
    }
    // SAFETY: fd is non-negative; ManuallyDrop keeps the File from closing
    // a descriptor the caller still owns
    Ok(ManuallyDrop::new(unsafe { File::from_raw_fd(fd) }))
}

/// Single read(2), sized to the bytes actually returned
pub fn read(fd: RawFd, count: usize) -> Result<Vec<u8>, ErrorCode> {
    let mut file = borrow_file(fd)?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(count)
        .map_err(|_| ErrorCode::OUT_OF_MEMORY)?;
    buf.resize(count, 0);

    loop {
        match file.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ErrorCode::from_io_error(&e)),
        }
    }
}

/// Single write(2)
pub fn write(fd: RawFd, data: &[u8]) -> Result<usize, ErrorCode> {
    let mut file = borrow_file(fd)?;
    loop {
        match file.write(data) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ErrorCode::from_io_error(&e)),
        }
    }
}
