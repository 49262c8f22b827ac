/*!
 * Flag Constants
 * Host values for open flags and permission bits
 */

pub use libc::{
    O_APPEND, O_CREAT, O_DIRECTORY, O_EXCL, O_NOFOLLOW, O_NONBLOCK, O_RDONLY, O_RDWR, O_SYNC,
    O_TRUNC, O_WRONLY,
};

// Permission bits, widened to the mode type used in requests
pub const S_IRWXU: u32 = libc::S_IRWXU as u32;
pub const S_IRUSR: u32 = libc::S_IRUSR as u32;
pub const S_IWUSR: u32 = libc::S_IWUSR as u32;
pub const S_IXUSR: u32 = libc::S_IXUSR as u32;
pub const S_IRWXG: u32 = libc::S_IRWXG as u32;
pub const S_IRGRP: u32 = libc::S_IRGRP as u32;
pub const S_IWGRP: u32 = libc::S_IWGRP as u32;
pub const S_IXGRP: u32 = libc::S_IXGRP as u32;
pub const S_IRWXO: u32 = libc::S_IRWXO as u32;
pub const S_IROTH: u32 = libc::S_IROTH as u32;
pub const S_IWOTH: u32 = libc::S_IWOTH as u32;
pub const S_IXOTH: u32 = libc::S_IXOTH as u32;

/// Mask selecting the access mode from open flags
pub const O_ACCMODE: i32 = libc::O_ACCMODE;

/// True if `flags` ask for write access
#[inline]
#[must_use]
pub const fn wants_write(flags: i32) -> bool {
    matches!(flags & O_ACCMODE, O_WRONLY | O_RDWR)
}
