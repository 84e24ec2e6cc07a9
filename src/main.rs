use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

use worker_demo::app::{
    cli,
    input::{PlainLineSource, TerminalLineSource},
};
use worker_demo::config::TaskConfig;
use worker_demo::manager::task_manager::TaskManager;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let manager = TaskManager::new(TaskConfig::default());
    let mut stdout = io::stdout();

    // Worker threads end with the process once main returns.
    if io::stdin().is_terminal() {
        cli::run_cli(&manager, &mut TerminalLineSource::new(), &mut stdout)
    } else {
        let mut input = PlainLineSource::new(io::stdin().lock());
        cli::run_cli(&manager, &mut input, &mut stdout)
    }
}
