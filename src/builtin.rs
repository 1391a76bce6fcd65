use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::os_reason;
use crate::external::find_in_path;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use std::path::PathBuf;

/// The commands implemented inside the interpreter.
///
/// Lookup is by exact, case-sensitive name. Adding a builtin means adding a
/// variant here and a command struct below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Echo,
    Exit,
    Type,
    Pwd,
    Cd,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Echo,
        Builtin::Exit,
        Builtin::Type,
        Builtin::Pwd,
        Builtin::Cd,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Echo => "echo",
            Builtin::Exit => "exit",
            Builtin::Type => "type",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
        }
    }

    fn create(self, args: &[&str]) -> Box<dyn ExecutableCommand> {
        match self {
            Builtin::Echo => instantiate::<Echo>(args),
            Builtin::Exit => instantiate::<Exit>(args),
            Builtin::Type => instantiate::<Type>(args),
            Builtin::Pwd => instantiate::<Pwd>(args),
            Builtin::Cd => instantiate::<Cd>(args),
        }
    }
}

/// Factory for every [`Builtin`].
#[derive(Debug, Default)]
pub struct Builtins;

impl CommandFactory for Builtins {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        Builtin::lookup(name).map(|builtin| builtin.create(args))
    }
}

/// In-process implementation of one [`Builtin`].
///
/// Most commands parse their operands with [`parse_with_argh`]; `echo` and
/// `exit` take them verbatim.
pub(crate) trait BuiltinCommand: Sized + 'static {
    const KIND: Builtin;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit>;

    /// Executes the command.
    ///
    /// An `Err` is reported on stderr by the caller and becomes status 1.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

fn parse_with_argh<T: BuiltinCommand + FromArgs>(args: &[&str]) -> Result<T, EarlyExit> {
    T::from_args(&[T::KIND.name()], args)
}

fn instantiate<T: BuiltinCommand>(args: &[&str]) -> Box<dyn ExecutableCommand> {
    match T::parse(args) {
        Ok(cmd) => Box::new(cmd),
        Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
            output,
            is_error: status.is_err(),
        }),
    }
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let result = <T as BuiltinCommand>::execute(*self, stdout, env);
        stdout.flush()?;
        match result {
            Ok(x) => Ok(x),
            Err(e) => {
                log::debug!("{} failed: {e:#}", T::KIND.name());
                writeln!(stderr, "{e}")?;
                stderr.flush()?;
                Ok(1)
            }
        }
    }
}

/// Usage text or an argument error produced by argh instead of a command.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let text = self.output.trim_end();
        if self.is_error {
            writeln!(stderr, "{text}")?;
            stderr.flush()?;
            Ok(1)
        } else {
            writeln!(stdout, "{text}")?;
            stdout.flush()?;
            Ok(0)
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    const KIND: Builtin = Builtin::Pwd;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_with_argh(args)
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let cwd = env::current_dir().map_err(|e| anyhow!("pwd: {}", os_reason(&e)))?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. A leading `~` stands for $HOME.
    pub target: Option<String>,
}

impl Cd {
    fn resolve_target(&self, env: &Environment) -> Result<String> {
        let home = || env.get_var("HOME").ok_or_else(|| anyhow!("cd: HOME not set"));
        match self.target.as_deref() {
            None | Some("") => Ok(home()?.to_string()),
            Some(t) => match t.strip_prefix('~') {
                Some(rest) => Ok(format!("{}{rest}", home()?)),
                None => Ok(t.to_string()),
            },
        }
    }
}

impl BuiltinCommand for Cd {
    const KIND: Builtin = Builtin::Cd;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_with_argh(args)
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = self.resolve_target(env)?;
        let new_dir = env.current_dir.join(&target);

        env::set_current_dir(&new_dir).map_err(|e| anyhow!("cd: {target}: {}", os_reason(&e)))?;
        env.current_dir = env::current_dir().unwrap_or(new_dir);
        log::debug!("working directory is now {}", env.current_dir.display());
        Ok(0)
    }
}

/// Exit the shell with the given status (0 when omitted or not a number).
pub struct Exit {
    pub status: Option<String>,
}

impl Exit {
    fn code(&self) -> ExitCode {
        self.status
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }
}

impl BuiltinCommand for Exit {
    const KIND: Builtin = Builtin::Exit;

    /// Any operand text is accepted, including ones that look like options.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Exit {
            status: args.first().map(|s| s.to_string()),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let code = self.code();
        env.exit_request = Some(code);
        Ok(code)
    }
}

/// Write the arguments to standard output, separated by spaces and followed by a newline.
pub struct Echo {
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    const KIND: Builtin = Builtin::Echo;

    /// Operands are printed verbatim, so nothing is treated as an option.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Tell how each name would be interpreted if used as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

/// What a command name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Builtin,
    Executable(PathBuf),
    NotFound,
}

/// Resolves `name` the way the dispatcher would: builtins first, then `PATH`.
pub fn resolve(env: &Environment, name: &str) -> Resolution {
    if Builtin::lookup(name).is_some() {
        return Resolution::Builtin;
    }
    match find_in_path(env.search_path(), name) {
        Some(path) => Resolution::Executable(path),
        None => Resolution::NotFound,
    }
}

impl BuiltinCommand for Type {
    const KIND: Builtin = Builtin::Type;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_with_argh(args)
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if self.names.is_empty() {
            return Err(anyhow!("type: missing argument"));
        }
        let mut code = 0;
        for name in &self.names {
            match resolve(env, name) {
                Resolution::Builtin => writeln!(stdout, "{name} is a shell builtin")?,
                Resolution::Executable(path) => writeln!(stdout, "{name} is {}", path.display())?,
                Resolution::NotFound => {
                    writeln!(stdout, "{name}: not found")?;
                    code = 1;
                }
            }
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_process_state;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn empty_env() -> Environment {
        Environment::with_vars(HashMap::new(), PathBuf::from("/"))
    }

    /// Runs a builtin through the registry, returning (status, stdout, stderr).
    fn run(env: &mut Environment, name: &str, args: &[&str]) -> (ExitCode, String, String) {
        let cmd = Builtins
            .try_create(env, name, args)
            .expect("builtin should exist");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = cmd.execute(&mut out, &mut err, env).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    /// Restores the working directory when a test ends, even on panic.
    struct CwdGuard(PathBuf);

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = stdenv::set_current_dir(&self.0);
        }
    }

    fn cwd_guard() -> CwdGuard {
        CwdGuard(stdenv::current_dir().unwrap())
    }

    #[test]
    fn test_registry_lookup_is_exact() {
        assert_eq!(Builtin::lookup("echo"), Some(Builtin::Echo));
        assert_eq!(Builtin::lookup("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::lookup("ECHO"), None);
        assert_eq!(Builtin::lookup("ls"), None);
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::lookup(builtin.name()), Some(builtin));
        }
        assert!(Builtins.try_create(&empty_env(), "cat", &[]).is_none());
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_process_state();
        let cur = stdenv::current_dir().unwrap();
        let mut env = empty_env();

        let (code, out, _) = run(&mut env, "pwd", &[]);

        assert_eq!(code, 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_echo_joins_operands_verbatim() {
        let mut env = empty_env();

        let (code, out, _) = run(&mut env, "echo", &["hello", "  world", "-n", "--help"]);
        assert_eq!(code, 0);
        assert_eq!(out, "hello   world -n --help\n");

        let (_, out, _) = run(&mut env, "echo", &[]);
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_process_state();
        let temp = TempDir::new().unwrap();
        let _cwd = cwd_guard();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let mut env = empty_env();

        let target = canonical_temp.to_string_lossy().into_owned();
        let (code, _, err) = run(&mut env, "cd", &[target.as_str()]);

        assert_eq!(code, 0, "stderr: {err}");
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_relative_to_current_dir() {
        let _lock = lock_process_state();
        let temp = TempDir::new().unwrap();
        let _cwd = cwd_guard();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir(canonical_temp.join("sub")).unwrap();
        let mut env = empty_env();

        let target = canonical_temp.to_string_lossy().into_owned();
        run(&mut env, "cd", &[target.as_str()]);
        let (code, _, _) = run(&mut env, "cd", &["sub"]);
        assert_eq!(code, 0);
        assert_eq!(env.current_dir, canonical_temp.join("sub"));

        run(&mut env, "cd", &[".."]);
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_process_state();
        let temp = TempDir::new().unwrap();
        let _cwd = cwd_guard();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let mut env = empty_env();
        env.set_var("HOME", canonical_temp.to_string_lossy());

        let (code, _, _) = run(&mut env, "cd", &[]);

        assert_eq!(code, 0);
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_expands_leading_tilde() {
        let _lock = lock_process_state();
        let temp = TempDir::new().unwrap();
        let _cwd = cwd_guard();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir(canonical_temp.join("docs")).unwrap();
        let mut env = empty_env();
        env.set_var("HOME", canonical_temp.to_string_lossy());

        let (code, _, _) = run(&mut env, "cd", &["~/docs"]);
        assert_eq!(code, 0);
        assert_eq!(env.current_dir, canonical_temp.join("docs"));

        let (code, _, _) = run(&mut env, "cd", &["~"]);
        assert_eq!(code, 0);
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_keeps_inner_tilde_literal() {
        let _lock = lock_process_state();
        let temp = TempDir::new().unwrap();
        let _cwd = cwd_guard();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir_all(canonical_temp.join("a~b").join("~")).unwrap();
        let mut env = empty_env();
        env.current_dir = canonical_temp.clone();
        env.set_var("HOME", "/nonexistent_home_for_cd_test");
        stdenv::set_current_dir(&canonical_temp).unwrap();

        let (code, _, err) = run(&mut env, "cd", &["a~b"]);
        assert_eq!((code, err.as_str()), (0, ""));
        assert_eq!(env.current_dir, canonical_temp.join("a~b"));

        let (code, _, err) = run(&mut env, "cd", &["./~"]);
        assert_eq!((code, err.as_str()), (0, ""));
        assert_eq!(env.current_dir, canonical_temp.join("a~b").join("~"));
    }

    #[test]
    fn test_cd_without_home_errors() {
        let mut env = empty_env();
        let (code, _, err) = run(&mut env, "cd", &[]);
        assert_eq!(code, 1);
        assert_eq!(err, "cd: HOME not set\n");
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_process_state();
        let orig = stdenv::current_dir().unwrap();
        let mut env = empty_env();
        env.current_dir = orig.clone();

        let (code, out, err) = run(&mut env, "cd", &["/nonexistent_dir_for_cd_test"]);

        assert_eq!(code, 1);
        assert_eq!(out, "");
        assert_eq!(
            err,
            "cd: /nonexistent_dir_for_cd_test: No such file or directory\n"
        );
        assert_eq!(stdenv::current_dir().unwrap(), orig);
        assert_eq!(env.current_dir, orig);
    }

    #[test]
    fn test_cd_rejects_unknown_options() {
        let mut env = empty_env();
        let (code, out, err) = run(&mut env, "cd", &["-x"]);
        assert_eq!(code, 1);
        assert_eq!(out, "");
        assert!(!err.is_empty());
    }

    #[test]
    fn test_help_goes_to_stdout() {
        let mut env = empty_env();
        let (code, out, err) = run(&mut env, "type", &["--help"]);
        assert_eq!(code, 0);
        assert!(out.contains("Usage: type"), "got {out:?}");
        assert_eq!(err, "");
    }

    #[test]
    fn test_exit_records_requested_status() {
        let cases: [(&[&str], ExitCode); 5] = [
            (&[], 0),
            (&["3"], 3),
            (&["-1"], -1),
            (&["abc"], 0),
            (&["7", "ignored"], 7),
        ];
        for (args, expected) in cases {
            let mut env = empty_env();
            let (code, out, err) = run(&mut env, "exit", args);
            assert_eq!(code, expected, "exit {args:?}");
            assert_eq!(env.exit_request, Some(expected));
            assert_eq!((out.as_str(), err.as_str()), ("", ""));
        }
    }

    #[test]
    fn test_type_reports_builtins_paths_and_missing() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        for dir in [first.path(), second.path()] {
            let tool = dir.join("mytool");
            fs::write(&tool, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let mut env = empty_env();
        env.set_var(
            "PATH",
            format!("{}:{}", first.path().display(), second.path().display()),
        );

        let (code, out, _) = run(&mut env, "type", &["echo", "mytool", "nosuchcmd_xyz"]);

        assert_eq!(code, 1);
        assert_eq!(
            out,
            format!(
                "echo is a shell builtin\nmytool is {}\nnosuchcmd_xyz: not found\n",
                first.path().join("mytool").display()
            )
        );

        let (code, out, _) = run(&mut env, "type", &["type", "exit", "cd", "pwd"]);
        assert_eq!(code, 0);
        assert_eq!(out.lines().count(), 4);
        assert!(out.lines().all(|l| l.ends_with(" is a shell builtin")));
    }

    #[test]
    fn test_type_without_operand() {
        let mut env = empty_env();
        let (code, out, err) = run(&mut env, "type", &[]);
        assert_eq!(code, 1);
        assert_eq!(out, "");
        assert_eq!(err, "type: missing argument\n");
    }

    #[test]
    fn test_resolve_prefers_builtins() {
        let mut env = empty_env();
        env.set_var("PATH", "/bin:/usr/bin");
        assert_eq!(resolve(&env, "echo"), Resolution::Builtin);
        assert_eq!(resolve(&env, "definitely_not_a_command_42"), Resolution::NotFound);
        assert!(matches!(resolve(&env, "sh"), Resolution::Executable(_)));
    }
}
