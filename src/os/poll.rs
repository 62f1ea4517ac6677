// src/os/poll.rs

//! Blocking readiness wait on the display controller descriptor.
//!
//! The page-flip driver parks the calling thread on the DRM file
//! descriptor until the kernel reports a pending completion event. The
//! wait is deliberately unbounded: there is no timeout, and the only exit
//! paths besides readable data are a hangup/error condition on the
//! descriptor or a failure of the poll call itself.

use log::{trace, warn};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::unix::io::BorrowedFd;

/// Result of one blocking wait on the display descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The descriptor has readable event data to dispatch.
    Readable,
    /// The descriptor reported hangup or error; the device is gone.
    Hangup,
    /// The poll call itself failed, or woke without readable data.
    Failed,
}

/// Blocks indefinitely until `fd` is readable or the wait is aborted.
///
/// Hangup takes precedence over readability: if the kernel reports both,
/// the caller must treat the device as lost rather than dispatch stale
/// events from a dying descriptor.
pub fn wait_readable(fd: BorrowedFd<'_>) -> PollOutcome {
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];

    match poll(&mut fds, PollTimeout::NONE) {
        Err(err) => {
            warn!("poll on display descriptor failed: {}", err);
            PollOutcome::Failed
        }
        Ok(_) => {
            let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
            trace!("display descriptor poll returned {:?}", revents);

            if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                PollOutcome::Hangup
            } else if revents.contains(PollFlags::POLLIN) {
                PollOutcome::Readable
            } else {
                PollOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::{AsFd, AsRawFd, FromRawFd, OwnedFd};

    fn pipe_pair() -> (OwnedFd, OwnedFd) {
        let mut fds = [0 as libc::c_int; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe() failed");
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
    }

    fn write_byte(fd: &OwnedFd) {
        let written = unsafe { libc::write(fd.as_raw_fd(), b"x".as_ptr().cast(), 1) };
        assert_eq!(written, 1);
    }

    #[test_log::test]
    fn readable_data_reports_readable() {
        let (read_end, write_end) = pipe_pair();
        write_byte(&write_end);
        assert_eq!(wait_readable(read_end.as_fd()), PollOutcome::Readable);
    }

    #[test_log::test]
    fn closed_writer_reports_hangup() {
        let (read_end, write_end) = pipe_pair();
        drop(write_end);
        assert_eq!(wait_readable(read_end.as_fd()), PollOutcome::Hangup);
    }

    #[test_log::test]
    fn hangup_wins_over_pending_data() {
        // Data left in the pipe plus a closed writer raises POLLIN|POLLHUP;
        // the wait must still report the hangup.
        let (read_end, write_end) = pipe_pair();
        write_byte(&write_end);
        drop(write_end);
        assert_eq!(wait_readable(read_end.as_fd()), PollOutcome::Hangup);
    }
}
