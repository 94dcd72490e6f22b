//! The filesystem collaborator.
//!
//! Builtins never touch the disk directly: every read or mutation goes through the
//! [`Filesystem`] trait, which reports either success or a typed [`FsError`] naming
//! the offending path. [`LocalFilesystem`] is the implementation backed by `std::fs`.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure reported by a [`Filesystem`] call.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Directory is not empty: {}", .0.display())]
    NotEmpty(PathBuf),
    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("No parent directory: {}", .0.display())]
    NoParent(PathBuf),
    #[error("I/O failure on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    /// Classify a raw I/O error raised while operating on `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(path),
            ErrorKind::AlreadyExists => FsError::AlreadyExists(path),
            ErrorKind::DirectoryNotEmpty => FsError::NotEmpty(path),
            ErrorKind::NotADirectory => FsError::NotADirectory(path),
            _ => FsError::Io { path, source: err },
        }
    }
}

/// How [`Filesystem::write_lines`] treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

/// Capabilities the shell needs from the underlying filesystem.
///
/// All paths handed to these methods are already resolved by the session, so
/// implementations never consult the process working directory.
pub trait Filesystem {
    /// Names of the entries of `dir`, sorted by name.
    fn list_dir(&self, dir: &Path) -> FsResult<Vec<String>>;

    /// Create `dir` and any missing parents. An existing directory is not an error.
    fn create_dir_all(&self, dir: &Path) -> FsResult<()>;

    /// Remove `dir` only if it is an empty directory.
    fn remove_empty_dir(&self, dir: &Path) -> FsResult<()>;

    /// Remove `dir` together with everything below it.
    fn remove_dir_tree(&self, dir: &Path) -> FsResult<()>;

    /// Create an empty file, failing if anything already exists at `file`.
    fn create_empty_file(&self, file: &Path) -> FsResult<()>;

    /// Copy a file, or a directory tree, overwriting existing targets.
    ///
    /// Copying an entry onto itself leaves it untouched.
    fn copy(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Delete a regular file. Directories are refused.
    fn delete_file(&self, file: &Path) -> FsResult<()>;

    /// Read a regular file as lines, without line terminators.
    fn read_lines(&self, file: &Path) -> FsResult<Vec<String>>;

    /// Write each line followed by `\n`, creating the file when absent.
    fn write_lines(&self, file: &Path, lines: &[String], mode: WriteMode) -> FsResult<()>;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn home_dir(&self) -> Option<PathBuf>;
}

/// [`Filesystem`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }

    /// Walk `root` up front so that copying a tree into itself terminates.
    fn snapshot(root: &Path) -> FsResult<Vec<(PathBuf, bool)>> {
        let mut found = Vec::new();
        let mut pending = vec![PathBuf::new()];
        while let Some(rel) = pending.pop() {
            let dir = root.join(&rel);
            let entries = fs::read_dir(&dir).map_err(|e| FsError::from_io(&dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| FsError::from_io(&dir, e))?;
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .map_err(|e| FsError::from_io(&path, e))?;
                let is_dir = if file_type.is_symlink() {
                    // copy what a link points at, but never descend through one
                    match fs::metadata(&path) {
                        Ok(meta) if meta.is_file() => false,
                        Ok(_) => {
                            warn!("not following directory link {}", path.display());
                            continue;
                        }
                        Err(e) => {
                            warn!("skipping dangling link {}: {}", path.display(), e);
                            continue;
                        }
                    }
                } else {
                    file_type.is_dir()
                };
                let child = rel.join(entry.file_name());
                if is_dir {
                    pending.push(child.clone());
                }
                found.push((child, is_dir));
            }
        }
        // parents before children
        found.sort_by(|a, b| a.0.components().count().cmp(&b.0.components().count()));
        Ok(found)
    }

    /// Whether both paths name the same existing entry.
    fn same_entry(a: &Path, b: &Path) -> bool {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// `fs::copy` truncates the target first, so a file is never copied onto itself.
    fn copy_file(from: &Path, to: &Path) -> FsResult<()> {
        if Self::same_entry(from, to) {
            debug!("{} and {} are the same file", from.display(), to.display());
            return Ok(());
        }
        fs::copy(from, to)
            .map(drop)
            .map_err(|e| FsError::from_io(to, e))
    }

    fn require_dir(path: &Path) -> FsResult<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(FsError::NotADirectory(path.to_path_buf())),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    fn require_file(path: &Path) -> FsResult<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(FsError::NotAFile(path.to_path_buf())),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }
}

impl Filesystem for LocalFilesystem {
    fn list_dir(&self, dir: &Path) -> FsResult<Vec<String>> {
        Self::require_dir(dir)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| FsError::from_io(dir, e))? {
            let entry = entry.map_err(|e| FsError::from_io(dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn create_dir_all(&self, dir: &Path) -> FsResult<()> {
        if self.is_file(dir) {
            return Err(FsError::AlreadyExists(dir.to_path_buf()));
        }
        fs::create_dir_all(dir).map_err(|e| FsError::from_io(dir, e))
    }

    fn remove_empty_dir(&self, dir: &Path) -> FsResult<()> {
        Self::require_dir(dir)?;
        let mut entries = fs::read_dir(dir).map_err(|e| FsError::from_io(dir, e))?;
        if entries.next().is_some() {
            return Err(FsError::NotEmpty(dir.to_path_buf()));
        }
        fs::remove_dir(dir).map_err(|e| FsError::from_io(dir, e))
    }

    fn remove_dir_tree(&self, dir: &Path) -> FsResult<()> {
        Self::require_dir(dir)?;
        fs::remove_dir_all(dir).map_err(|e| FsError::from_io(dir, e))
    }

    fn create_empty_file(&self, file: &Path) -> FsResult<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(file)
            .map(drop)
            .map_err(|e| FsError::from_io(file, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> FsResult<()> {
        let meta = fs::metadata(from).map_err(|e| FsError::from_io(from, e))?;
        if !meta.is_dir() {
            return Self::copy_file(from, to);
        }
        if Self::same_entry(from, to) {
            return Ok(());
        }

        let entries = Self::snapshot(from)?;
        self.create_dir_all(to)?;
        for (rel, is_dir) in entries {
            let target = to.join(&rel);
            if is_dir {
                self.create_dir_all(&target)?;
            } else {
                Self::copy_file(&from.join(&rel), &target)?;
            }
        }
        Ok(())
    }

    fn delete_file(&self, file: &Path) -> FsResult<()> {
        Self::require_file(file)?;
        fs::remove_file(file).map_err(|e| FsError::from_io(file, e))
    }

    fn read_lines(&self, file: &Path) -> FsResult<Vec<String>> {
        Self::require_file(file)?;
        let text = fs::read_to_string(file).map_err(|e| FsError::from_io(file, e))?;
        Ok(text.lines().map(String::from).collect())
    }

    fn write_lines(&self, file: &Path, lines: &[String], mode: WriteMode) -> FsResult<()> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let mut f = options.open(file).map_err(|e| FsError::from_io(file, e))?;
        for line in lines {
            writeln!(f, "{}", line).map_err(|e| FsError::from_io(file, e))?;
        }
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}
