use crate::builtin::default_commands;
use crate::command::CommandFactory;
use crate::io_adapters::LineSource;
use crate::session::Session;
use crate::tokenizer::{self, ParsedCommand};
use anyhow::Result;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::Write;

/// Prompt shown before each command line.
pub const PROMPT: &str = ">";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, see `BuiltinCommand`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The command interpreter: reads a line, records it, tokenizes it and dispatches
/// it to the command registered under its name.
///
/// Example
/// ```
/// use std::io::Cursor;
/// use term_shell::{BufReadInput, Interpreter, LocalFilesystem, Session};
///
/// let session = Session::new(std::env::temp_dir(), Box::new(LocalFilesystem::new()));
/// let mut sh = Interpreter::with_builtins(session);
/// let mut input = BufReadInput::new(Cursor::new("echo \"hello world\"\nexit\n"), std::io::sink());
/// let mut out = Vec::new();
/// sh.repl(&mut input, &mut out).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
/// ```
pub struct Interpreter {
    session: Session,
    commands: BTreeMap<&'static str, Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with a custom set of command factories.
    ///
    /// Factories are keyed by [`CommandFactory::name`]; a later factory replaces an
    /// earlier one with the same name.
    pub fn new(session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let mut table = BTreeMap::new();
        for factory in commands {
            let name = factory.name();
            if table.insert(name, factory).is_some() {
                warn!("command {} registered twice, keeping the last one", name);
            }
        }
        Self {
            session,
            commands: table,
        }
    }

    /// Create an interpreter with every builtin command.
    pub fn with_builtins(session: Session) -> Self {
        Self::new(session, default_commands())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Record, tokenize and execute one input line.
    ///
    /// Only failures of the output stream (or of `input` during a prompted read)
    /// are returned; everything else is reported on `stdout`.
    pub fn run_line(
        &mut self,
        line: &str,
        input: &mut dyn LineSource,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        self.session.record(line);

        let ParsedCommand { name, args } = match tokenizer::parse_line(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                writeln!(stdout, "{}", e)?;
                return Ok(());
            }
        };

        match self.commands.get(name.as_str()) {
            Some(factory) => {
                debug!("dispatch {} with {} argument(s)", name, args.len());
                factory
                    .create(&args)
                    .execute(input, stdout, &mut self.session)
            }
            None => {
                debug!("unknown command {:?}", name);
                writeln!(stdout, "Unknown command: {}", name)?;
                Ok(())
            }
        }
    }

    /// Read-Eval-Print Loop. Runs until `exit` or the end of input.
    pub fn repl(&mut self, input: &mut dyn LineSource, stdout: &mut dyn Write) -> Result<()> {
        while !self.session.should_exit {
            let Some(line) = input.read_line(PROMPT)? else {
                info!("end of input");
                break;
            };
            input.remember(&line);
            self.run_line(&line, input, stdout)?;
            stdout.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod session_tests {
    use crate::fs::LocalFilesystem;
    use crate::io_adapters::BufReadInput;
    use crate::{Interpreter, Session};
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::tempdir;

    /// Run `script` through a fresh interpreter rooted at `dir`.
    fn run_script(dir: &Path, script: &str) -> (Interpreter, String) {
        run_bytes(dir, script.as_bytes())
    }

    fn run_bytes(dir: &Path, script: &[u8]) -> (Interpreter, String) {
        let session = Session::new(dir.to_path_buf(), Box::new(LocalFilesystem));
        let mut interp = Interpreter::with_builtins(session);
        let mut input = BufReadInput::new(Cursor::new(script.to_vec()), std::io::sink());
        let mut out = Vec::new();
        interp.repl(&mut input, &mut out).unwrap();
        (interp, String::from_utf8(out).expect("utf8"))
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_blank_lines_are_invalid_and_recorded() {
        let tmp = tempdir().unwrap();
        let (interp, out) = run_script(tmp.path(), "\n   \n\t\n");
        assert_eq!(out, "Invalid command. Please try again.\n".repeat(3));
        assert_eq!(interp.session().history().len(), 3);
        assert!(entries(tmp.path()).is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let tmp = tempdir().unwrap();
        let (_, out) = run_script(tmp.path(), "frobnicate now\n");
        assert_eq!(out, "Unknown command: frobnicate\n");
    }

    #[test]
    fn test_history_includes_itself() {
        let tmp = tempdir().unwrap();
        let (_, out) = run_script(tmp.path(), "echo hi\nnope\nhistory\n");
        assert_eq!(
            out,
            "hi\nUnknown command: nope\n1 echo hi\n2 nope\n3 history\n"
        );
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let tmp = tempdir().unwrap();
        let (interp, out) = run_script(tmp.path(), "echo before\nexit\necho after\n");
        assert_eq!(out, "before\n");
        assert!(interp.session().should_exit);
        assert_eq!(interp.session().history().last().unwrap(), "exit");
    }

    #[test]
    fn test_end_of_input_ends_gracefully() {
        let tmp = tempdir().unwrap();
        let (interp, out) = run_script(tmp.path(), "echo last");
        assert_eq!(out, "last\n");
        assert!(!interp.session().should_exit);
    }

    #[test]
    fn test_shape_errors_have_no_side_effects() {
        let tmp = tempdir().unwrap();
        let script = "mkdir\ntouch a b\ncp only\nrm\nrmdir a b\n> a b\n>> \nwc a b\ncat a b c\n";
        let (_, out) = run_script(tmp.path(), script);
        assert_eq!(
            out,
            "Usage: mkdir <directory1> <directory2> ...\n\
             Usage: touch <file>\n\
             Usage: cp <source> <destination>\n\
             Usage: rm <file>\n\
             Usage: rmdir * or rmdir <directory>\n\
             Usage: > <file>\n\
             Usage: >> <file>\n\
             Usage: wc <file>\n\
             Usage: cat <file> or cat <file1> <file2>\n"
        );
        assert!(entries(tmp.path()).is_empty());
    }

    #[test]
    fn test_touch_then_cat_prints_nothing() {
        let tmp = tempdir().unwrap();
        let (_, out) = run_script(tmp.path(), "touch f\ncat f\n");
        assert_eq!(
            out,
            format!("File created: {}\n", tmp.path().join("f").display())
        );
    }

    #[test]
    fn test_mkdir_then_rmdir_round_trip() {
        let tmp = tempdir().unwrap();
        run_script(tmp.path(), "mkdir d\nrmdir d\n");
        assert!(!tmp.path().join("d").exists());
    }

    #[test]
    fn test_relative_paths_follow_session_dir() {
        let tmp = tempdir().unwrap();
        let (interp, _) = run_script(tmp.path(), "mkdir work\ncd work\ntouch note\nmkdir inner\ncd ..\n");
        assert!(tmp.path().join("work/note").is_file());
        assert!(tmp.path().join("work/inner").is_dir());
        assert_eq!(interp.session().current_dir(), tmp.path());
    }

    #[test]
    fn test_cd_nonexistent_keeps_dir() {
        let tmp = tempdir().unwrap();
        let (interp, out) = run_script(tmp.path(), "cd missing\npwd\n");
        assert_eq!(
            out,
            format!("Directory does not exist\n{}\n", tmp.path().display())
        );
        assert_eq!(interp.session().current_dir(), tmp.path());
    }

    #[test]
    fn test_redirect_reads_content_line_outside_history() {
        let tmp = tempdir().unwrap();
        let script = "> f.txt\nfirst\n>> f.txt\nsecond\ncat f.txt\nhistory\n";
        let (interp, out) = run_script(tmp.path(), script);
        assert_eq!(
            out,
            "Content written to f.txt\n\
             Content written to f.txt\n\
             first\nsecond\n\
             1 > f.txt\n2 >> f.txt\n3 cat f.txt\n4 history\n"
        );
        assert_eq!(interp.session().history().len(), 4);
    }

    #[test]
    fn test_wc_and_echo_through_the_loop() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("f"), "ab\nc d\n").unwrap();
        let (_, out) = run_script(tmp.path(), "wc f\necho \"a b\"\n");
        assert_eq!(out, "2 3 5 f\na b\n");
    }

    #[test]
    fn test_rmdir_star_then_session_stays_usable() {
        let tmp = tempdir().unwrap();
        let work = tmp.path().join("work");
        fs::create_dir_all(work.join("a/b")).unwrap();
        fs::write(work.join("a/file"), "x").unwrap();

        let (interp, out) = run_script(&work, "rmdir *\npwd\n");
        assert!(!work.exists());
        assert!(out.ends_with(&format!("{}\n", tmp.path().display())), "{}", out);
        assert_eq!(interp.session().current_dir(), tmp.path());
    }

    #[test]
    fn test_undecodable_line_does_not_end_session() {
        let tmp = tempdir().unwrap();
        let (interp, out) = run_bytes(tmp.path(), b"echo one\necho \xff\xfe\necho two\n");
        assert_eq!(out, "one\n\u{FFFD}\u{FFFD}\ntwo\n");
        assert_eq!(interp.session().history().len(), 3);
    }

    #[test]
    fn test_cp_onto_itself_keeps_data() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("f"), "precious\n").unwrap();
        fs::create_dir(tmp.path().join("d")).unwrap();
        fs::write(tmp.path().join("d/g"), "also precious\n").unwrap();

        let (_, out) = run_script(tmp.path(), "cp f f\ncp d d\ncp f ./f\n");
        assert_eq!(out, "Copied: f to f\nCopied: d to d\nCopied: f to ./f\n");
        assert_eq!(fs::read_to_string(tmp.path().join("f")).unwrap(), "precious\n");
        assert_eq!(
            fs::read_to_string(tmp.path().join("d/g")).unwrap(),
            "also precious\n"
        );
    }
}
