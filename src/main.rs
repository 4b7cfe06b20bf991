mod app;
mod cli;
mod config;
mod constants;
mod display;
mod error;
mod git;
mod repos;
mod scheduler;
mod summary;
mod ui;
mod watcher;

use crate::app::App;
use crate::cli::Cli;
use anyhow::Result;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    ui::set_verbose(cli.verbose);

    if cli.once {
        return app::run_once(&cli);
    }

    // the app owns the terminal and background threads until it is dropped
    let mut app = App::activate(cli)?;
    app.run()
}
