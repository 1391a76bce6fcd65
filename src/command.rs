use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Status of a finished command, 0 meaning success.
pub type ExitCode = i32;

/// Status reported when no command of the given name exists.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// Status reported when a command exists but could not be started.
pub const EXIT_NOT_EXECUTABLE: ExitCode = 126;

/// A resolved command, ready to run once.
///
/// `stdout` and `stderr` are the interpreter's own streams, already pointing
/// at any redirection targets for the current line. Builtins get this via a
/// blanket impl; programs on disk implement it directly.
pub trait ExecutableCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// One step of name resolution.
///
/// The interpreter asks its factories in order; the first one returning
/// `Some` owns the name, so builtins shadow programs on `PATH`.
pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
