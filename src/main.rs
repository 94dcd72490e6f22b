use anyhow::Result;
use log::info;
use term_shell::config::Config;
use term_shell::{BufReadInput, EditorInput, Interpreter, LocalFilesystem, Session};

fn main() -> Result<()> {
    let config: Config = argh::from_env();
    config.init_logging();

    let start_dir = config.start_dir()?;
    info!("starting in {}", start_dir.display());
    let session = Session::new(start_dir, Box::new(LocalFilesystem::new()));
    let mut interpreter = Interpreter::with_builtins(session);

    let mut stdout = std::io::stdout();
    if config.plain {
        let mut input = BufReadInput::new(std::io::stdin().lock(), std::io::stdout());
        interpreter.repl(&mut input, &mut stdout)
    } else {
        let mut input = EditorInput::new()?;
        interpreter.repl(&mut input, &mut stdout)
    }
}
