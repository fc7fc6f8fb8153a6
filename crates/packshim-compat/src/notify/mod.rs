//! Two-process syscall forwarding.
//!
//! Higher-fidelity alternative to the errno filter: instead of
//! synthesizing a fixed failure, each blocked syscall suspends its caller
//! while an unrestricted supervisor process produces a genuine result.
//!
//! ## Modules
//!
//! - **supervisor** - the unrestricted side: notification loop and answer
//!   policy
//! - **`scm_rights`** - listener-descriptor handoff between the processes
//!
//! The restricted side is [`install_and_hand_off`]: install the notify
//! rule table, then push the resulting listener through an `AF_UNIX`
//! socket. From that point on, every matching syscall suspends until the
//! supervisor answers.

pub mod scm_rights;
pub mod supervisor;

use std::os::fd::{AsFd, BorrowedFd};

use thiserror::Error;

use crate::filter::{self, FilterError};
use crate::rules::RuleTable;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("listener transfer failed: {0}")]
    Transfer(#[from] nix::errno::Errno),
}

/// Restricted endpoint setup: install `table` (whose blocked rules carry
/// `Notify`) and hand the listener to the supervisor over `socket`.
///
/// The descriptor's number means nothing across the process boundary, so
/// the handoff travels as `SCM_RIGHTS` ancillary data. The local copy is
/// closed on return; only the supervisor can answer from then on.
///
/// # Errors
///
/// Installation and transfer failures are reported to this side; a
/// partially completed handoff is not retried.
pub fn install_and_hand_off(table: &RuleTable, socket: BorrowedFd<'_>) -> Result<(), NotifyError> {
    let listener = filter::install_with_listener(table)?;
    scm_rights::send_fd(socket, listener.as_fd())?;
    Ok(())
}
