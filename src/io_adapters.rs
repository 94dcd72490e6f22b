use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use log::warn;
use std::io::{BufRead, ErrorKind, Write};

/// Source of prompted input lines.
///
/// The interpreter reads commands from it, and redirection builtins read their
/// content line from the same source.
pub trait LineSource {
    /// Show `prompt` and read one line without its terminator.
    ///
    /// Returns `Ok(None)` once the input is exhausted. Bytes that are not valid
    /// UTF-8 come back as U+FFFD rather than as an error.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Hook for sources that keep their own recall history.
    fn remember(&mut self, _line: &str) {}
}

/// Interactive line editor input.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

/// Outcome of one editor read.
#[derive(Debug, PartialEq, Eq)]
enum EditorRead {
    Line(String),
    Retry,
    End,
}

fn classify(result: rustyline::Result<String>) -> Result<EditorRead> {
    match result {
        Ok(line) => Ok(EditorRead::Line(line)),
        // Ctrl-C drops the line being edited
        Err(ReadlineError::Interrupted) => Ok(EditorRead::Retry),
        Err(ReadlineError::Eof) => Ok(EditorRead::End),
        Err(ReadlineError::Io(err)) if err.kind() == ErrorKind::InvalidData => {
            warn!("undecodable input line: {}", err);
            Ok(EditorRead::Line(char::REPLACEMENT_CHARACTER.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match classify(self.editor.readline(prompt))? {
                EditorRead::Line(line) => return Ok(Some(line)),
                EditorRead::Retry => continue,
                EditorRead::End => return Ok(None),
            }
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(err) = self.editor.add_history_entry(line) {
            warn!("failed to add history entry: {}", err);
        }
    }
}

/// Line input over any buffered reader, with prompts echoed to `prompt_out`.
///
/// Used for non-interactive standard input and for driving sessions in tests.
pub struct BufReadInput<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> BufReadInput<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for BufReadInput<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.prompt_out, "{}", prompt)?;
        self.prompt_out.flush()?;

        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}
