use crate::command::{CommandFactory, ExecutableCommand};
use crate::fs::{FsError, WriteMode};
use crate::interpreter::Factory;
use crate::io_adapters::LineSource;
use crate::session::Session;
use crate::tokenizer::join_quoted;
use anyhow::{Context, Result, anyhow};
use log::debug;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+").expect("word pattern is a valid regex"));

/// Built-in commands known to the shell at compile time.
///
/// Each builtin owns its shape validation: [`BuiltinCommand::from_args`] turns the raw
/// argument tokens into a typed value, or rejects them so that only the usage string
/// is printed. Nothing touches the filesystem before that conversion succeeds.
pub(crate) trait BuiltinCommand: Sized + 'static {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Literal usage line printed when the arguments have the wrong shape.
    fn usage() -> &'static str;

    /// Validate the argument tokens, returning `None` on a shape mismatch.
    fn from_args(args: &[String]) -> Option<Self>;

    /// Executes the command against the session.
    ///
    /// An `Err` is an operation failure; it is printed and the session goes on.
    fn execute(
        self,
        input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        if let Err(e) = BuiltinCommand::execute(*self, input, stdout, session) {
            debug!("{} failed: {:#}", T::name(), e);
            writeln!(stdout, "{:#}", e)?;
        }
        Ok(())
    }
}

struct InvalidArgs {
    usage: &'static str,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<()> {
        writeln!(stdout, "{}", self.usage)?;
        Ok(())
    }
}

impl<T: BuiltinCommand> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn create(&self, args: &[String]) -> Box<dyn ExecutableCommand> {
        match T::from_args(args) {
            Some(cmd) => Box::new(cmd),
            None => {
                debug!("{}: rejected {} argument(s)", T::name(), args.len());
                Box::new(InvalidArgs { usage: T::usage() })
            }
        }
    }
}

/// Factories for every builtin, one per command name.
pub(crate) fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Ls>::default()),
        Box::new(Factory::<Mkdir>::default()),
        Box::new(Factory::<Rmdir>::default()),
        Box::new(Factory::<Touch>::default()),
        Box::new(Factory::<Cp>::default()),
        Box::new(Factory::<Rm>::default()),
        Box::new(Factory::<Cat>::default()),
        Box::new(Factory::<Wc>::default()),
        Box::new(Factory::<Overwrite>::default()),
        Box::new(Factory::<Append>::default()),
        Box::new(Factory::<History>::default()),
        Box::new(Factory::<Exit>::default()),
    ]
}

fn single(args: &[String]) -> Option<String> {
    match args {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// Print a message, either a single token or a quoted multi-word one.
pub struct Echo {
    pub message: String,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn usage() -> &'static str {
        "Usage: echo <message>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        let message = single(args).or_else(|| join_quoted(args))?;
        Some(Self { message })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<()> {
        writeln!(stdout, "{}", self.message)?;
        Ok(())
    }
}

/// Print the current directory.
pub struct Pwd;

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn usage() -> &'static str {
        "Usage: pwd"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        args.is_empty().then_some(Self)
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        writeln!(stdout, "{}", session.current_dir().display())?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CdTarget {
    Parent,
    Home,
    Path(String),
}

/// Change the session's current directory.
pub struct Cd {
    pub target: CdTarget,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn usage() -> &'static str {
        "Usage: cd <directory>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        let target = match args {
            [] => CdTarget::Home,
            [dir] if dir == ".." => CdTarget::Parent,
            [dir] => {
                let stripped = dir.replace('"', "");
                if stripped.is_empty() {
                    CdTarget::Home
                } else {
                    CdTarget::Path(stripped)
                }
            }
            _ => return None,
        };
        Some(Self { target })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let next = match self.target {
            CdTarget::Parent => {
                let current = session.current_dir();
                current
                    .parent()
                    .map(|p| p.to_path_buf())
                    .ok_or_else(|| FsError::NoParent(current.to_path_buf()))
                    .context("Error changing directory")?
            }
            CdTarget::Home => session
                .fs()
                .home_dir()
                .ok_or_else(|| anyhow!("Error changing directory: home directory is unknown"))?,
            CdTarget::Path(dir) => {
                // absolute paths resolve to themselves
                let candidate = session.resolve(&dir);
                if !session.fs().is_dir(&candidate) {
                    writeln!(stdout, "Directory does not exist")?;
                    return Ok(());
                }
                candidate
            }
        };
        session.set_current_dir(next);
        Ok(())
    }
}

/// List the entries of the current directory.
pub struct Ls {
    pub reverse: bool,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn usage() -> &'static str {
        "Usage: ls or ls -r"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [] => Some(Self { reverse: false }),
            [flag] if flag == "-r" => Some(Self { reverse: true }),
            _ => None,
        }
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let mut names = session
            .fs()
            .list_dir(session.current_dir())
            .context("Error listing directory")?;
        if self.reverse {
            names.reverse();
        }
        for name in names {
            writeln!(stdout, "{}", name)?;
        }
        Ok(())
    }
}

/// Create directories, including missing parents.
pub struct Mkdir {
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn usage() -> &'static str {
        "Usage: mkdir <directory1> <directory2> ..."
    }

    fn from_args(args: &[String]) -> Option<Self> {
        (!args.is_empty()).then(|| Self {
            dirs: args.to_vec(),
        })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        // each directory stands alone; earlier ones stay if a later one fails
        for dir in &self.dirs {
            let path = session.resolve(dir);
            match session.fs().create_dir_all(&path) {
                Ok(()) => writeln!(stdout, "Directory created: {}", path.display())?,
                Err(e) => {
                    let e = anyhow::Error::new(e).context("Error creating directory");
                    writeln!(stdout, "{:#}", e)?
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RmdirTarget {
    /// `*`: the whole tree rooted at the current directory.
    CurrentTree,
    Empty(String),
}

/// Remove an empty directory, or the current directory tree.
pub struct Rmdir {
    pub target: RmdirTarget,
}

impl BuiltinCommand for Rmdir {
    fn name() -> &'static str {
        "rmdir"
    }

    fn usage() -> &'static str {
        "Usage: rmdir * or rmdir <directory>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        let target = match args {
            [star] if star == "*" => RmdirTarget::CurrentTree,
            [dir] => RmdirTarget::Empty(dir.clone()),
            _ => return None,
        };
        Some(Self { target })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let path = match self.target {
            RmdirTarget::CurrentTree => {
                let path = session.current_dir().to_path_buf();
                if path.parent().is_none() {
                    return Err(anyhow!("refusing to remove the filesystem root"))
                        .context("Error removing directory");
                }
                session
                    .fs()
                    .remove_dir_tree(&path)
                    .context("Error removing directory")?;
                path
            }
            RmdirTarget::Empty(dir) => {
                let path = session.resolve(&dir);
                match session.fs().remove_empty_dir(&path) {
                    Ok(()) => path,
                    Err(FsError::NotEmpty(_)) => {
                        writeln!(stdout, "Directory is not empty: {}", path.display())?;
                        return Ok(());
                    }
                    Err(FsError::NotFound(_) | FsError::NotADirectory(_)) => {
                        writeln!(stdout, "Directory not found: {}", path.display())?;
                        return Ok(());
                    }
                    Err(e) => return Err(e).context("Error removing directory"),
                }
            }
        };
        writeln!(stdout, "Directory removed: {}", path.display())?;
        session.recover_current_dir();
        Ok(())
    }
}

/// Create an empty file that must not exist yet.
pub struct Touch {
    pub file: String,
}

impl BuiltinCommand for Touch {
    fn name() -> &'static str {
        "touch"
    }

    fn usage() -> &'static str {
        "Usage: touch <file>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        Some(Self { file: single(args)? })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let path = session.resolve(&self.file);
        session
            .fs()
            .create_empty_file(&path)
            .context("Error creating file")?;
        writeln!(stdout, "File created: {}", path.display())?;
        Ok(())
    }
}

/// Copy a file or a directory tree, overwriting existing targets.
pub struct Cp {
    pub source: String,
    pub destination: String,
}

impl BuiltinCommand for Cp {
    fn name() -> &'static str {
        "cp"
    }

    fn usage() -> &'static str {
        "Usage: cp <source> <destination>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [source, destination] => Some(Self {
                source: source.clone(),
                destination: destination.clone(),
            }),
            _ => None,
        }
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let from = session.resolve(&self.source);
        let to = session.resolve(&self.destination);
        session
            .fs()
            .copy(&from, &to)
            .context("Error copying file/directory")?;
        writeln!(stdout, "Copied: {} to {}", self.source, self.destination)?;
        Ok(())
    }
}

/// Delete a regular file.
pub struct Rm {
    pub file: String,
}

impl BuiltinCommand for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn usage() -> &'static str {
        "Usage: rm <file>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        Some(Self { file: single(args)? })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let path = session.resolve(&self.file);
        match session.fs().delete_file(&path) {
            Ok(()) => writeln!(stdout, "File removed: {}", path.display())?,
            Err(FsError::NotFound(_) | FsError::NotAFile(_)) => {
                writeln!(stdout, "File not found: {}", self.file)?
            }
            Err(e) => return Err(e).context("Error removing file"),
        }
        Ok(())
    }
}

/// Print one file, or two files one after the other.
pub struct Cat {
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn usage() -> &'static str {
        "Usage: cat <file> or cat <file1> <file2>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        matches!(args.len(), 1 | 2).then(|| Self {
            files: args.to_vec(),
        })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let paths: Vec<PathBuf> = self.files.iter().map(|f| session.resolve(f)).collect();
        if let Some(missing) = self
            .files
            .iter()
            .zip(&paths)
            .find(|(_, path)| !session.fs().is_file(path))
        {
            writeln!(stdout, "File not found: {}", missing.0)?;
            return Ok(());
        }

        let mut lines = Vec::new();
        for path in &paths {
            lines.extend(session.fs().read_lines(path).context("Error reading file")?);
        }
        for line in lines {
            writeln!(stdout, "{}", line)?;
        }
        Ok(())
    }
}

/// Line, word and character counts of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub lines: usize,
    pub words: usize,
    pub chars: usize,
}

impl Counts {
    /// Count `lines`, which must not carry line terminators.
    pub fn of(lines: &[String]) -> Self {
        Self {
            lines: lines.len(),
            words: lines.iter().map(|l| WORD.find_iter(l).count()).sum(),
            chars: lines.iter().map(|l| l.chars().count()).sum(),
        }
    }
}

/// Print line, word and character counts followed by the file name.
pub struct Wc {
    pub file: String,
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn usage() -> &'static str {
        "Usage: wc <file>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        Some(Self { file: single(args)? })
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        let path = session.resolve(&self.file);
        let lines = match session.fs().read_lines(&path) {
            Ok(lines) => lines,
            Err(FsError::NotFound(_) | FsError::NotAFile(_)) => {
                writeln!(stdout, "File not found: {}", self.file)?;
                return Ok(());
            }
            Err(e) => return Err(e).context("Error reading file"),
        };
        let counts = Counts::of(&lines);
        writeln!(
            stdout,
            "{} {} {} {}",
            counts.lines, counts.words, counts.chars, self.file
        )?;
        Ok(())
    }
}

const CONTENT_PROMPT: &str = "Enter content to write to the file: ";

/// Prompt for one line and write it to `file`.
fn redirect(
    file: &str,
    mode: WriteMode,
    input: &mut dyn LineSource,
    stdout: &mut dyn Write,
    session: &mut Session,
) -> Result<()> {
    let Some(content) = input.read_line(CONTENT_PROMPT)? else {
        writeln!(stdout)?;
        writeln!(stdout, "No content read, {} left unchanged", file)?;
        return Ok(());
    };
    let path = session.resolve(file);
    session
        .fs()
        .write_lines(&path, &[content], mode)
        .context("Error writing to file")?;
    writeln!(stdout, "Content written to {}", file)?;
    Ok(())
}

/// `>`: replace a file's content with one prompted line.
pub struct Overwrite {
    pub file: String,
}

impl BuiltinCommand for Overwrite {
    fn name() -> &'static str {
        ">"
    }

    fn usage() -> &'static str {
        "Usage: > <file>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        Some(Self { file: single(args)? })
    }

    fn execute(
        self,
        input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        redirect(&self.file, WriteMode::Truncate, input, stdout, session)
    }
}

/// `>>`: append one prompted line to a file.
pub struct Append {
    pub file: String,
}

impl BuiltinCommand for Append {
    fn name() -> &'static str {
        ">>"
    }

    fn usage() -> &'static str {
        "Usage: >> <file>"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        Some(Self { file: single(args)? })
    }

    fn execute(
        self,
        input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        redirect(&self.file, WriteMode::Append, input, stdout, session)
    }
}

/// Print every recorded input line, 1-indexed.
pub struct History;

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn usage() -> &'static str {
        "Usage: history"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        args.is_empty().then_some(Self)
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        for (i, line) in session.history().iter().enumerate() {
            writeln!(stdout, "{} {}", i + 1, line)?;
        }
        Ok(())
    }
}

/// End the session. Arguments are ignored.
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn usage() -> &'static str {
        "Usage: exit"
    }

    fn from_args(_args: &[String]) -> Option<Self> {
        Some(Self)
    }

    fn execute(
        self,
        _input: &mut dyn LineSource,
        _stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()> {
        session.should_exit = true;
        Ok(())
    }
}
