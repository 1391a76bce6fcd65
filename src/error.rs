//! Error types shared by the parsing and execution stages.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Syntax problems detected before anything is executed.
///
/// A line that fails to parse is dropped as a whole: no command runs and
/// no redirection target is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `'` or `"` was opened and never closed.
    #[error("unexpected EOF while looking for matching `{0}'")]
    UnterminatedQuote(char),
    /// A redirection operator was the last token on the line.
    #[error("syntax error: `{0}' expects a file name")]
    MissingRedirectTarget(String),
}

/// Failures of a single dispatch cycle after parsing succeeded.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A redirection target could not be opened or installed.
    #[error("{}: {}", path.display(), os_reason(source))]
    Redirect { path: PathBuf, source: io::Error },
    /// No builtin and no executable on the search path.
    #[error("{0}: command not found")]
    CommandNotFound(String),
    /// The executable was found but the process could not be started.
    #[error("{name}: {}", os_reason(source))]
    Launch { name: String, source: io::Error },
}

/// Renders an I/O error the way `strerror` would, without the
/// trailing `(os error N)` that `io::Error` appends.
pub fn os_reason(err: &io::Error) -> String {
    let text = err.to_string();
    match (err.raw_os_error(), text.rfind(" (os error ")) {
        (Some(_), Some(idx)) => text[..idx].to_string(),
        _ => text,
    }
}
