//! Scoped signal dispositions.
//!
//! The interpreter must survive Ctrl-C and Ctrl-\ typed while a child runs,
//! while the child itself reacts to them normally. The interpreter side is
//! an [`IgnoreInterrupts`] guard held from just before the spawn until the
//! wait returns; the child side resets both signals to their defaults
//! between `fork` and `exec`.

use std::process::Command;

/// Signals the interactive interpreter ignores for itself.
#[cfg(unix)]
const INTERACTIVE_SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGQUIT];

/// Ignores SIGINT and SIGQUIT until dropped, then puts back whatever
/// dispositions were installed before.
#[must_use = "signals are only ignored while the guard is alive"]
pub struct IgnoreInterrupts {
    #[cfg(unix)]
    previous: Vec<(libc::c_int, libc::sighandler_t)>,
}

impl IgnoreInterrupts {
    #[cfg(unix)]
    pub fn install() -> Self {
        let previous = INTERACTIVE_SIGNALS
            .iter()
            // SAFETY: SIG_IGN is a valid disposition for both signals.
            .map(|&sig| (sig, unsafe { libc::signal(sig, libc::SIG_IGN) }))
            .collect();
        log::trace!("ignoring SIGINT and SIGQUIT");
        Self { previous }
    }

    #[cfg(not(unix))]
    pub fn install() -> Self {
        Self {}
    }
}

impl Drop for IgnoreInterrupts {
    fn drop(&mut self) {
        #[cfg(unix)]
        for &(sig, handler) in &self.previous {
            if handler == libc::SIG_ERR {
                continue;
            }
            // SAFETY: `handler` was returned by `signal` for this very signal.
            unsafe {
                libc::signal(sig, handler);
            }
        }
        log::trace!("restored interrupt dispositions");
    }
}

/// Arrange for the child spawned by `cmd` to start with default handling
/// of the signals the interpreter ignores.
#[cfg(unix)]
pub fn restore_defaults_in_child(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: the hook only calls `signal`, which is async-signal-safe.
    unsafe {
        cmd.pre_exec(|| {
            for sig in INTERACTIVE_SIGNALS {
                if libc::signal(sig, libc::SIG_DFL) == libc::SIG_ERR {
                    return Err(std::io::Error::last_os_error());
                }
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn restore_defaults_in_child(_cmd: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::lock_process_state;

    fn current_disposition(sig: libc::c_int) -> libc::sighandler_t {
        // SAFETY: querying through `sigaction` with a null new action changes nothing.
        unsafe {
            let mut old: libc::sigaction = std::mem::zeroed();
            libc::sigaction(sig, std::ptr::null(), &mut old);
            old.sa_sigaction
        }
    }

    #[test]
    fn guard_ignores_then_restores() {
        let _lock = lock_process_state();
        let before = current_disposition(libc::SIGINT);
        {
            let _guard = IgnoreInterrupts::install();
            assert_eq!(current_disposition(libc::SIGINT), libc::SIG_IGN);
            assert_eq!(current_disposition(libc::SIGQUIT), libc::SIG_IGN);
        }
        assert_eq!(current_disposition(libc::SIGINT), before);
    }

    #[test]
    fn child_starts_with_default_interrupt_handling() {
        let _lock = lock_process_state();
        let _guard = IgnoreInterrupts::install();

        // A shell that inherited SIG_IGN for SIGINT would survive this.
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", "kill -INT $$; exit 0"]);
        restore_defaults_in_child(&mut cmd);
        let status = cmd.status().expect("spawn sh");

        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(libc::SIGINT));
    }
}
