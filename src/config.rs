use anyhow::{Context, Result, ensure};
use argh::FromArgs;
use env_logger::Env;
use log::LevelFilter;
use std::env;
use std::path::{self, PathBuf};

#[derive(FromArgs, Debug)]
/// Interactive shell with a small set of filesystem and text commands.
pub struct Config {
    #[argh(option)]
    /// directory the session starts in. Defaults to the process working directory.
    pub start_dir: Option<PathBuf>,

    #[argh(switch)]
    /// read commands from standard input without the line editor.
    pub plain: bool,

    #[argh(switch, short = 'v')]
    /// log dispatch details to standard error.
    pub verbose: bool,
}

impl Config {
    /// Install the `env_logger` backend. `RUST_LOG` wins over the default `warn`
    /// level, and `--verbose` wins over both.
    pub fn init_logging(&self) {
        let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
        if self.verbose {
            builder.filter_level(LevelFilter::Debug);
        }
        builder.init();
    }

    /// The absolute directory the session should start in.
    pub fn start_dir(&self) -> Result<PathBuf> {
        let dir = match &self.start_dir {
            Some(dir) => path::absolute(dir)
                .with_context(|| format!("can't resolve {}", dir.display()))?,
            None => env::current_dir().context("can't read the process working directory")?,
        };
        ensure!(dir.is_dir(), "start directory {} is not a directory", dir.display());
        Ok(dir)
    }
}
