use argh::FromArgs;
use minishell::Interpreter;
use minishell::command::ExitCode;
use std::io::{self, Write};

#[derive(FromArgs)]
/// A small interactive command interpreter.
struct Options {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status.
    command: Option<String>,

    #[argh(switch, short = 'v')]
    /// log dispatch details to stderr.
    verbose: bool,
}

fn main() {
    let options: Options = argh::from_env();

    let level = if options.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let code = run(options);
    let _ = io::stdout().flush();
    std::process::exit(code);
}

fn run(options: Options) -> ExitCode {
    let mut sh = Interpreter::default();
    match options.command {
        Some(line) => {
            sh.execute_line(&line);
            sh.exit_status()
        }
        None => {
            let mut reader = minishell::reader::for_stdin();
            sh.repl(reader.as_mut())
        }
    }
}
