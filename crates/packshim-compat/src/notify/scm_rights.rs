//! Listener-descriptor handoff over `SCM_RIGHTS`.
//!
//! A seccomp notification listener is only usable by whoever holds the
//! descriptor, and its raw number carries no meaning in another process.
//! Moving it to the supervisor therefore takes an explicit transfer:
//! ancillary data on an `AF_UNIX` socketpair, one descriptor per message,
//! alongside a single placeholder payload byte.

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};

use nix::errno::Errno;
use nix::sys::socket::{
    recvmsg, sendmsg, socketpair, AddressFamily, ControlMessage, ControlMessageOwned, MsgFlags,
    SockFlag, SockType, UnixAddr,
};

/// Create the `AF_UNIX` stream pair the handoff travels over.
///
/// Returns `(supervisor_end, restricted_end)`; after fork, each process
/// closes the end it does not own.
pub fn channel() -> nix::Result<(OwnedFd, OwnedFd)> {
    socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::SOCK_CLOEXEC,
    )
}

/// Send one descriptor as `SCM_RIGHTS` ancillary data.
pub fn send_fd(socket: BorrowedFd<'_>, fd: BorrowedFd<'_>) -> nix::Result<()> {
    let payload = [0u8; 1];
    let iov = [IoSlice::new(&payload)];
    let fds = [fd.as_raw_fd()];
    let cmsgs = [ControlMessage::ScmRights(&fds)];
    sendmsg::<UnixAddr>(
        socket.as_raw_fd(),
        &iov,
        &cmsgs,
        MsgFlags::empty(),
        None,
    )?;
    Ok(())
}

/// Receive one descriptor sent with [`send_fd`].
///
/// # Errors
///
/// `EBADMSG` if the peer's message carried no descriptor.
pub fn recv_fd(socket: BorrowedFd<'_>) -> nix::Result<OwnedFd> {
    let mut payload = [0u8; 1];
    let mut iov = [IoSliceMut::new(&mut payload)];
    let mut cmsg_buffer = nix::cmsg_space!([std::os::fd::RawFd; 1]);

    let msg = recvmsg::<UnixAddr>(
        socket.as_raw_fd(),
        &mut iov,
        Some(&mut cmsg_buffer),
        MsgFlags::empty(),
    )?;

    for cmsg in msg.cmsgs()? {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            if let Some(&fd) = fds.first() {
                // SAFETY: the kernel installed fd into this process for us;
                // we are its first and only owner.
                return Ok(unsafe { std::os::fd::FromRawFd::from_raw_fd(fd) });
            }
        }
    }

    Err(Errno::EBADMSG)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{Read, Write};
    use std::os::fd::{AsFd, FromRawFd};

    use super::*;

    #[test]
    fn channel_creation() {
        let (a, b) = channel().unwrap();
        assert!(a.as_raw_fd() >= 0);
        assert!(b.as_raw_fd() >= 0);
        assert_ne!(a.as_raw_fd(), b.as_raw_fd());
    }

    #[test]
    fn transferred_fd_still_works() {
        let (supervisor_end, restricted_end) = channel().unwrap();

        let mut pipe_fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(pipe_fds.as_mut_ptr()) }, 0);
        let pipe_read = unsafe { OwnedFd::from_raw_fd(pipe_fds[0]) };
        let pipe_write = unsafe { OwnedFd::from_raw_fd(pipe_fds[1]) };

        send_fd(restricted_end.as_fd(), pipe_read.as_fd()).unwrap();
        let received = recv_fd(supervisor_end.as_fd()).unwrap();

        // The duplicate must read what the original pipe carries.
        File::from(pipe_write).write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        File::from(received).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn recv_without_descriptor_is_an_error() {
        let (a, b) = channel().unwrap();
        let payload = [0u8; 1];
        let iov = [IoSlice::new(&payload)];
        sendmsg::<UnixAddr>(b.as_raw_fd(), &iov, &[], MsgFlags::empty(), None).unwrap();
        assert_eq!(recv_fd(a.as_fd()).unwrap_err(), Errno::EBADMSG);
    }
}
