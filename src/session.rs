use crate::fs::Filesystem;
use log::info;
use std::path::{Path, PathBuf};

/// Long-lived interpreter state.
///
/// The session owns the shell's notion of the current directory. The process
/// working directory is never changed; every relative argument is resolved against
/// [`Session::current_dir`] instead.
pub struct Session {
    current_dir: PathBuf,
    history: Vec<String>,
    /// When set to true, the interpreter loop stops before reading another line.
    pub should_exit: bool,
    fs: Box<dyn Filesystem>,
}

impl Session {
    /// Create a session rooted at `current_dir`.
    pub fn new(current_dir: PathBuf, fs: Box<dyn Filesystem>) -> Self {
        Self {
            current_dir,
            history: Vec::new(),
            should_exit: false,
            fs,
        }
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    /// Resolve a command argument against the current directory.
    ///
    /// Absolute arguments are returned unchanged. No normalization is performed.
    pub fn resolve(&self, arg: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(arg)
    }

    /// Replace the current directory.
    ///
    /// Callers must have checked that `dir` exists.
    pub fn set_current_dir(&mut self, dir: PathBuf) {
        info!("current directory: {} -> {}", self.current_dir.display(), dir.display());
        self.current_dir = dir;
    }

    /// Move up to the nearest existing ancestor if the current directory is gone.
    pub fn recover_current_dir(&mut self) {
        let mut dir = self.current_dir.clone();
        while !self.fs.is_dir(&dir) {
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => return,
            }
        }
        if dir != self.current_dir {
            self.set_current_dir(dir);
        }
    }

    /// Append a raw input line to the history.
    pub fn record(&mut self, line: impl Into<String>) {
        self.history.push(line.into());
    }

    /// Every recorded line, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFilesystem;

    fn session_at(dir: &str) -> Session {
        Session::new(PathBuf::from(dir), Box::new(LocalFilesystem))
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let session = session_at("/base");
        assert_eq!(session.resolve("a/b"), PathBuf::from("/base/a/b"));
        assert_eq!(session.resolve("/abs"), PathBuf::from("/abs"));
    }

    #[test]
    fn test_resolve_does_not_normalize() {
        let session = session_at("/base");
        assert_eq!(session.resolve("../x"), PathBuf::from("/base/../x"));
    }

    #[test]
    fn test_recover_moves_to_existing_ancestor() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("a/b");
        let mut session = Session::new(gone, Box::new(LocalFilesystem));
        session.recover_current_dir();
        assert_eq!(session.current_dir(), tmp.path());
    }

    #[test]
    fn test_history_keeps_entry_order() {
        let mut session = session_at("/");
        session.record("pwd");
        session.record("");
        session.record("history");
        assert_eq!(session.history(), ["pwd", "", "history"]);
    }
}
