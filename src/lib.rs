//! A small interactive command interpreter.
//!
//! A line goes through three stages: [`lexer`] splits it into words honoring
//! shell quoting, [`parser`] pulls out `>`/`>>`/`2>`/`2>>` redirections, and the
//! [`Interpreter`] runs the result either in-process (the builtins `echo`,
//! `exit`, `type`, `pwd` and `cd`) or as a child process found on `PATH`.
//! Redirections are applied to the interpreter's own stdout/stderr descriptors
//! for the duration of one command and always restored afterwards.
//!
//! The crate targets Unix: redirection and signal handling work on raw
//! file descriptors and POSIX signal dispositions.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod reader;
pub mod redirect;
mod signal;

#[cfg(test)]
mod test_support;

pub use builtin::{Builtin, Builtins, Resolution, resolve};
pub use external::{ExternalLauncher, find_command_path, find_in_path};
pub use interpreter::{EXIT_SYNTAX_ERROR, PROMPT};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
