//! A small interactive shell over a fixed vocabulary of filesystem and text commands.
//!
//! Each input line is recorded in the session history, split into a command name and
//! arguments by the [`tokenizer`], validated against the shape its builtin accepts,
//! and only then executed. Builtins reach the disk exclusively through the
//! [`fs::Filesystem`] collaborator and resolve relative paths against the session's
//! own current directory, never the process working directory.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`],
//! [`session`] and [`fs`] expose the seams for custom commands, session state and
//! alternative filesystems.

mod builtin;
pub mod command;
pub mod config;
pub mod fs;
mod interpreter;
pub mod io_adapters;
pub mod session;
pub mod tokenizer;

pub use fs::LocalFilesystem;
pub use interpreter::{Interpreter, PROMPT};
pub use io_adapters::{BufReadInput, EditorInput, LineSource};
pub use session::Session;
