//! Raw descriptor plumbing for stream capture.

use std::io::{self, Write};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

/// Open an anonymous pipe, returning `(read_end, write_end)`.
pub(crate) fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [-1; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: both descriptors were just created and are owned by nobody else.
    let (reader, writer) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(&reader)?;
    set_cloexec(&writer)?;
    Ok((reader, writer))
}

fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own.
    if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Duplicate a process stream descriptor so it can be restored later.
pub(crate) fn save(target: RawFd) -> io::Result<OwnedFd> {
    // SAFETY: `target` is one of the standard descriptors, open for the
    // lifetime of the process.
    let borrowed = unsafe { BorrowedFd::borrow_raw(target) };
    borrowed.try_clone_to_owned()
}

/// Point `target` at the same open file as `source`.
pub(crate) fn redirect(source: &OwnedFd, target: RawFd) -> io::Result<()> {
    loop {
        // SAFETY: dup2 onto a standard descriptor; `source` stays open for the call.
        if unsafe { libc::dup2(source.as_raw_fd(), target) } != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Push anything buffered in Rust's stdout/stderr handles to the current descriptors.
pub(crate) fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}
