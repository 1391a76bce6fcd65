//! Lexical analysis of a command line into argument words.
//!
//! Quoting rules follow the POSIX shell subset the interpreter understands:
//! backslash escapes outside quotes, fully literal single quotes, and double
//! quotes where a backslash only escapes `"`, `\`, `$` and `` ` ``. Quoting
//! never ends a word, so `a'b'c` lexes to the single word `abc`.

use crate::error::ParseError;

/// Characters that may follow a backslash inside double quotes and lose it.
const DOUBLE_QUOTE_ESCAPES: [char; 4] = ['"', '\\', '$', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    /// Between words, skipping blanks.
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    /// Set once the current word has started, so `''` still yields a word.
    in_word: bool,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            in_word: false,
            buffer: String::new(),
        }
    }

    /// Runs the machine to the end of input.
    ///
    /// Any quote still open when the input runs out fails the whole line;
    /// words lexed before that point are dropped with the machine.
    fn make_words(mut self) -> Result<Vec<String>, ParseError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => return Err(ParseError::UnterminatedQuote('\'')),
            LexingState::ReadingDoubleQuote => return Err(ParseError::UnterminatedQuote('"')),
            LexingState::Start | LexingState::ReadingWord => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) {
        if is_blank(ch) {
            return;
        }
        self.in_word = true;
        self.state = LexingState::ReadingWord;
        self.unquoted_char(ch);
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        if is_blank(ch) {
            self.finish_word(out);
            self.state = LexingState::Start;
        } else {
            self.unquoted_char(ch);
        }
    }

    fn unquoted_char(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            // A trailing backslash has nothing to escape and is kept as is.
            '\\' => match self.read_char() {
                Some(next) => self.buffer.push(next),
                None => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.peek_char() {
                Some(next) if DOUBLE_QUOTE_ESCAPES.contains(&next) => {
                    self.read_char();
                    self.buffer.push(next);
                }
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if self.in_word {
            out.push(std::mem::take(&mut self.buffer));
            self.in_word = false;
        }
    }
}

/// Word separators, matching C `isspace`.
fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Splits `line` into argument words, resolving quotes and escapes.
///
/// Returns an empty vector for a blank line.
pub fn split_into_words(line: &str) -> Result<Vec<String>, ParseError> {
    let words = LexingFSM::new(line).make_words()?;
    log::trace!("lexed {line:?} into {words:?}");
    Ok(words)
}
