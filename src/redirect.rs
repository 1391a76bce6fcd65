//! Pointing the interpreter's stdout/stderr at files for one command.
//!
//! Redirection happens at the descriptor level so builtins and spawned
//! children observe it the same way. [`apply`] hands back a guard that owns
//! duplicates of the original descriptors and puts them back when dropped,
//! including when the command body fails or panics.

use crate::error::ExecError;
use crate::parser::{OpenMode, Redirect, RedirectionPlan, Stream};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;

/// Permission bits for files created by a redirection (before umask).
const CREATE_MODE: u32 = 0o644;

/// One stream's original descriptor, kept alive until restoration.
struct SavedStream {
    stream: Stream,
    original: OwnedFd,
}

/// Active redirections for a single dispatch cycle.
///
/// Dropping the guard flushes pending output into the redirection targets
/// and re-installs the saved descriptors in reverse order of application.
#[must_use = "redirections are undone as soon as the guard is dropped"]
pub struct ActiveRedirections {
    saved: Vec<SavedStream>,
}

impl ActiveRedirections {
    fn none() -> Self {
        Self { saved: Vec::new() }
    }

    /// Number of streams currently redirected.
    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    fn redirect(&mut self, stream: Stream, target: &File) -> io::Result<()> {
        flush(stream);
        let fd = stream.fd();
        // SAFETY: descriptors 1 and 2 stay open for the whole process lifetime.
        let original = unsafe { BorrowedFd::borrow_raw(fd) }.try_clone_to_owned()?;
        self.saved.push(SavedStream { stream, original });
        dup2(target.as_raw_fd(), fd)
    }
}

impl Drop for ActiveRedirections {
    fn drop(&mut self) {
        while let Some(SavedStream { stream, original }) = self.saved.pop() {
            flush(stream);
            if let Err(err) = dup2(original.as_raw_fd(), stream.fd()) {
                log::warn!("failed to restore {stream:?}: {err}");
            } else {
                log::debug!("restored {stream:?}");
            }
        }
    }
}

/// Installs every redirection in `plan`.
///
/// Targets are created if missing, then truncated or appended to per their
/// mode. If any target cannot be opened, the streams already redirected for
/// this plan are restored before the error is returned.
pub fn apply(plan: &RedirectionPlan) -> Result<ActiveRedirections, ExecError> {
    let mut active = ActiveRedirections::none();
    for (stream, redirect) in plan.entries() {
        let file = open_target(redirect).map_err(|source| ExecError::Redirect {
            path: redirect.path.clone(),
            source,
        })?;
        active
            .redirect(stream, &file)
            .map_err(|source| ExecError::Redirect {
                path: redirect.path.clone(),
                source,
            })?;
        log::debug!("redirected {stream:?} to {}", redirect.path.display());
    }
    Ok(active)
}

fn open_target(redirect: &Redirect) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(CREATE_MODE);
    match redirect.mode {
        OpenMode::Truncate => options.truncate(true),
        OpenMode::Append => options.append(true),
    };
    options.open(&redirect.path)
}

fn flush(stream: Stream) {
    let _ = match stream {
        Stream::Stdout => io::stdout().flush(),
        Stream::Stderr => io::stderr().flush(),
    };
}

fn dup2(src: libc::c_int, dst: libc::c_int) -> io::Result<()> {
    // SAFETY: plain descriptor syscall; both descriptors are owned elsewhere.
    if unsafe { libc::dup2(src, dst) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
