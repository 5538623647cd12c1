//! Shell-style word splitting for the free-form `additional_options` input.
//!
//! The grammar is a fixed subset of POSIX shell word splitting, without any expansion:
//!
//! - Unquoted space, tab and newline separate words. Runs of separators collapse.
//! - Single quotes preserve everything literally up to the next `'`.
//! - Inside double quotes a backslash escapes only `"`, `\`, `$`, `` ` `` and newline.
//!   Before any other character the backslash is kept as-is.
//! - An unquoted backslash escapes the next character.
//! - Backslash followed by newline is a line continuation and disappears.
//! - Quoted and unquoted parts that touch form a single word, so `""` is an empty word.
//! - `$`, globs and `~` are never expanded.

/// Errors that can occur while splitting an options string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated quoted string")]
    UnfinishedQuote,
    /// The input ends with an unquoted backslash.
    #[error("unterminated backslash escape")]
    TrailingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole input and returns the collected words.
    ///
    /// Nothing is returned on error: a half-split options string must never reach
    /// the command line.
    fn make_words(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(LexingError::UnfinishedQuote);
            }
            LexingState::ReadingWord => out.push(std::mem::take(&mut self.buffer)),
            LexingState::Start => {}
        }

        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            ' ' | '\t' | '\n' => {}
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => {
                // a continuation between words starts nothing
                if self.read_escaped()? {
                    self.state = LexingState::ReadingWord;
                }
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
        Ok(())
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) -> Result<(), LexingError> {
        match ch {
            ' ' | '\t' | '\n' => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => {
                self.read_escaped()?;
            }
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.read_char() {
                None => return Err(LexingError::UnfinishedQuote),
                Some('\n') => {}
                Some(c @ ('"' | '\\' | '$' | '`')) => self.buffer.push(c),
                Some(c) => {
                    self.buffer.push('\\');
                    self.buffer.push(c);
                }
            },
            c => self.buffer.push(c),
        }
        Ok(())
    }

    /// Consumes the character after an unquoted backslash.
    ///
    /// Returns `false` for a line continuation, which contributes nothing.
    fn read_escaped(&mut self) -> Result<bool, LexingError> {
        match self.read_char() {
            None => Err(LexingError::TrailingEscape),
            Some('\n') => Ok(false),
            Some(c) => {
                self.buffer.push(c);
                Ok(true)
            }
        }
    }
}

/// Splits `line` into words following the grammar described in the module docs.
///
/// # Errors
///
/// Returns a [`LexingError`] for an unclosed quote or a dangling backslash.
pub fn split_words(line: &str) -> Result<Vec<String>, LexingError> {
    LexingFSM::new(line).make_words()
}
