//! Splits lexed words into the command's argument vector and its
//! output redirections.

use crate::error::ParseError;
use std::path::PathBuf;

/// Standard stream a redirection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// File descriptor number of the stream in the interpreter process.
    pub fn fd(self) -> i32 {
        match self {
            Stream::Stdout => 1,
            Stream::Stderr => 2,
        }
    }
}

/// How a redirection target is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `>`: the file is emptied first.
    Truncate,
    /// `>>`: writes go to the end of the file.
    Append,
}

/// One redirected stream: where it goes and how the file is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: PathBuf,
    pub mode: OpenMode,
}

/// At most one redirection per stream.
///
/// When a line redirects the same stream more than once, the rightmost
/// operator wins and the earlier ones are ignored entirely (their files
/// are neither created nor truncated).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionPlan {
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
}

impl RedirectionPlan {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }

    /// Redirections in the order they are applied: stdout, then stderr.
    pub fn entries(&self) -> impl Iterator<Item = (Stream, &Redirect)> {
        let stdout = self.stdout.as_ref().map(|r| (Stream::Stdout, r));
        let stderr = self.stderr.as_ref().map(|r| (Stream::Stderr, r));
        stdout.into_iter().chain(stderr)
    }

    fn set(&mut self, stream: Stream, redirect: Redirect) {
        match stream {
            Stream::Stdout => self.stdout = Some(redirect),
            Stream::Stderr => self.stderr = Some(redirect),
        }
    }
}

/// Recognized operators and what they redirect.
const OPERATORS: &[(&str, Stream, OpenMode)] = &[
    (">", Stream::Stdout, OpenMode::Truncate),
    ("1>", Stream::Stdout, OpenMode::Truncate),
    (">>", Stream::Stdout, OpenMode::Append),
    ("1>>", Stream::Stdout, OpenMode::Append),
    ("2>", Stream::Stderr, OpenMode::Truncate),
    ("2>>", Stream::Stderr, OpenMode::Append),
];

fn operator(word: &str) -> Option<(Stream, OpenMode)> {
    OPERATORS
        .iter()
        .find(|(op, _, _)| *op == word)
        .map(|&(_, stream, mode)| (stream, mode))
}

/// A command ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command name followed by its arguments; never empty.
    pub argv: Vec<String>,
    pub plan: RedirectionPlan,
}

impl ParsedCommand {
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

/// Extracts redirections from lexed words.
///
/// Returns `Ok(None)` for an empty line. The first word is always the
/// command name, even if it looks like an operator; every later operator
/// consumes the word right after it as its target.
pub fn parse_command(words: Vec<String>) -> Result<Option<ParsedCommand>, ParseError> {
    let mut words = words.into_iter();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let mut argv = vec![name];
    let mut plan = RedirectionPlan::default();

    while let Some(word) = words.next() {
        match operator(&word) {
            Some((stream, mode)) => {
                let target = words
                    .next()
                    .ok_or_else(|| ParseError::MissingRedirectTarget(word.clone()))?;
                plan.set(
                    stream,
                    Redirect {
                        path: PathBuf::from(target),
                        mode,
                    },
                );
            }
            None => argv.push(word),
        }
    }

    Ok(Some(ParsedCommand { argv, plan }))
}
