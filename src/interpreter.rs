use crate::builtin::Builtins;
use crate::command::{CommandFactory, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND, ExitCode};
use crate::env::Environment;
use crate::error::{ExecError, ParseError};
use crate::external::ExternalLauncher;
use crate::lexer;
use crate::parser::{self, ParsedCommand};
use crate::reader::{LineReader, ReadOutcome};
use crate::redirect;
use std::io::{self, Write};

/// Prompt shown before each line.
pub const PROMPT: &str = "$ ";

/// Status recorded for a line that fails to parse.
pub const EXIT_SYNTAX_ERROR: ExitCode = 2;

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried in order to create commands by name. See [`Default`] for the
/// factories included out of the box.
///
/// Example
/// ```
/// use minishell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("type", &["type"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    last_status: ExitCode,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self::with_env(Environment::new(), commands)
    }

    /// Create an interpreter over an explicit environment.
    pub fn with_env(env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env,
            commands,
            last_status: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Status of the most recent dispatch cycle.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Status the process should exit with: the `exit` operand if one was
    /// requested, the last command's status otherwise.
    pub fn exit_status(&self) -> ExitCode {
        self.env.exit_request.unwrap_or(self.last_status)
    }

    /// Run a single command invocation by name with arguments, on the
    /// current streams.
    ///
    /// Returns the command's exit code or an error if the command cannot be created
    /// or fails to execute.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(&mut io::stdout(), &mut io::stderr(), &mut self.env);
            }
        }
        Err(ExecError::CommandNotFound(name.to_string()).into())
    }

    /// Executes a parsed command with its redirections.
    ///
    /// Streams are restored before this returns, whatever the outcome.
    /// Failures are reported on stderr and turned into a status.
    pub fn execute(&mut self, command: &ParsedCommand) -> ExitCode {
        let redirections = match redirect::apply(&command.plan) {
            Ok(active) => active,
            Err(err) => {
                report(&anyhow::Error::from(err));
                return 1;
            }
        };

        let args: Vec<&str> = command.args().iter().map(String::as_str).collect();
        let status = match self.run(command.name(), &args) {
            Ok(code) => code,
            // Still inside the redirection, like the command's own output.
            Err(err) => report(&err),
        };

        drop(redirections);
        status
    }

    /// One dispatch cycle: tokenize, extract redirections, execute.
    ///
    /// Returns `None` for a blank line. Parse errors are reported and
    /// nothing is executed.
    pub fn execute_line(&mut self, line: &str) -> Option<ExitCode> {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(err) => {
                log::debug!("rejected line {line:?}: {err}");
                let _ = writeln!(io::stderr(), "minishell: {err}");
                self.last_status = EXIT_SYNTAX_ERROR;
                return Some(EXIT_SYNTAX_ERROR);
            }
        };
        log::debug!("dispatching {:?} with {:?}", command.argv, command.plan);

        let status = self.execute(&command);
        log::debug!("{} exited with {status}", command.name());
        self.last_status = status;
        Some(status)
    }

    /// Read-eval loop over `reader` until end of input or `exit`.
    ///
    /// Returns the status the process should exit with: the `exit` operand,
    /// or 0 when input runs out.
    pub fn repl(&mut self, reader: &mut dyn LineReader) -> ExitCode {
        loop {
            let line = match reader.read_line(PROMPT) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Interrupted) => continue,
                Ok(ReadOutcome::Eof) => {
                    log::debug!("end of input");
                    return 0;
                }
                Err(err) => {
                    log::warn!("failed to read input: {err:#}");
                    return 0;
                }
            };

            self.execute_line(&line);

            if let Some(code) = self.env.exit_request {
                log::debug!("exit requested with status {code}");
                return code;
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `echo`, `exit`, `type`, `pwd`, `cd`
    /// - external command launcher
    fn default() -> Self {
        Self::new(vec![Box::new(Builtins), Box::new(ExternalLauncher)])
    }
}

fn parse_line(line: &str) -> Result<Option<ParsedCommand>, ParseError> {
    let words = lexer::split_into_words(line)?;
    parser::parse_command(words)
}

/// Writes `err` to stderr and picks the status it stands for.
fn report(err: &anyhow::Error) -> ExitCode {
    let _ = writeln!(io::stderr(), "{err}");
    match err.downcast_ref::<ExecError>() {
        Some(ExecError::CommandNotFound(_)) => EXIT_NOT_FOUND,
        Some(ExecError::Launch { .. }) => EXIT_NOT_EXECUTABLE,
        Some(ExecError::Redirect { .. }) | None => 1,
    }
}
