use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::ExecError;
use crate::signal;
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin: a program resolved on disk.
pub struct ExternalCommand {
    /// Name as typed by the user; becomes the child's `argv[0]`.
    name: OsString,
    /// Resolved location of the executable.
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

/// Creates [`ExternalCommand`]s for names that resolve to an executable.
#[derive(Debug, Default)]
pub struct ExternalLauncher;

impl CommandFactory for ExternalLauncher {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let program = find_command_path(env.search_path(), &env.current_dir, Path::new(name))?;
        log::debug!("resolved {name:?} to {}", program.display());
        Some(Box::new(ExternalCommand::new(
            name.into(),
            program.into_owned(),
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        // The child writes straight to the descriptors; anything still
        // buffered on our side has to land first.
        stdout.flush()?;
        stderr.flush()?;

        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .envs(env.vars.iter())
            .current_dir(&env.current_dir);
        set_arg0(&mut cmd, &self.name);
        signal::restore_defaults_in_child(&mut cmd);

        let name = self.name.to_string_lossy().into_owned();
        // Ctrl-C while the child runs is the child's business alone.
        let _interrupts = signal::IgnoreInterrupts::install();
        let mut child = cmd.spawn().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ExecError::CommandNotFound(name.clone()),
            _ => ExecError::Launch {
                name: name.clone(),
                source,
            },
        })?;
        log::debug!("spawned {name} as pid {}", child.id());

        let exit_status = child.wait()?;
        log::debug!("{name} finished with {exit_status}");
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn set_arg0(cmd: &mut std::process::Command, name: &OsString) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut std::process::Command, _name: &OsString) {}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Name with a `/` in it (absolute, `./foo`, `bin/sh`): used as a path, relative
///   ones against `current_dir`; returned as typed if it is an executable file.
/// - Bare name: each directory of `search_path` is tried in order and the first
///   executable match wins.
/// - Empty name: `None`.
pub fn find_command_path<'a>(
    search_path: &str,
    current_dir: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(std::path::Component::Normal(name)), None) => {
            find_in_path(search_path, &name.to_string_lossy()).map(Cow::Owned)
        }
        _ => {
            if is_executable(&current_dir.join(path)) {
                Some(Cow::Borrowed(path))
            } else {
                None
            }
        }
    }
}

/// Ordered search of a colon-separated directory list for an executable `name`.
///
/// Empty entries are skipped.
pub fn find_in_path(search_path: &str, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    search_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
