use crate::io_adapters::LineSource;
use crate::session::Session;
use anyhow::Result;
use std::io::Write;

/// Object-safe trait for any command that can be executed by the shell.
///
/// Instances only exist once the arguments have passed shape validation, so
/// executing one is the first point at which side effects may happen.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// `input` is the session's line source, available to commands that prompt for
    /// more input. Operation failures are reported on `stdout`; an `Err` means the
    /// output stream itself failed.
    fn execute(
        self: Box<Self>,
        input: &mut dyn LineSource,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<()>;
}

/// Factory that validates arguments for one command name.
pub trait CommandFactory {
    /// Name this factory is registered under.
    fn name(&self) -> &'static str;

    /// Build the command for `args`.
    ///
    /// Arguments of the wrong shape still produce a command: one that only prints
    /// the usage string.
    fn create(&self, args: &[String]) -> Box<dyn ExecutableCommand>;
}
