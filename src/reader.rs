//! Sources of input lines for the REPL.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal, Write};

/// Result of asking for one more line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line of input without its line terminator.
    Line(String),
    /// The user pressed Ctrl-C while editing; the partial line is gone.
    Interrupted,
    /// No more input.
    Eof,
}

/// Something that can hand the REPL one line of text at a time.
pub trait LineReader {
    /// Shows `prompt` where appropriate and reads the next line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;
}

/// Interactive line editing with history, for terminals.
pub struct EditorReader {
    editor: DefaultEditor,
}

impl EditorReader {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

/// Plain buffered reading, for pipes and files.
///
/// The prompt is only written when `show_prompt` is set, which the binary
/// does when standard output is a terminal.
pub struct BufferedReader<R> {
    input: R,
    show_prompt: bool,
}

impl<R: BufRead> BufferedReader<R> {
    pub fn new(input: R, show_prompt: bool) -> Self {
        Self { input, show_prompt }
    }
}

impl<R: BufRead> LineReader for BufferedReader<R> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        if self.show_prompt {
            let mut stdout = io::stdout();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
        }

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(ReadOutcome::Line(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Picks the reader for the process's standard input.
///
/// The line editor is used only when both stdin and stdout are terminals;
/// if it cannot be set up, plain reading takes over.
pub fn for_stdin() -> Box<dyn LineReader> {
    let interactive = io::stdout().is_terminal();
    if interactive && io::stdin().is_terminal() {
        match EditorReader::new() {
            Ok(reader) => return Box::new(reader),
            Err(err) => log::warn!("line editing unavailable: {err}"),
        }
    }
    Box::new(BufferedReader::new(io::stdin().lock(), interactive))
}
