mod cli;
mod engine;
mod error;
mod models;
mod pipeline;
mod store;

use clap::{CommandFactory, Parser};
use cli::{App, Cli, DefaultAnswers, Prompter, TerminalPrompter};
use colored::*;
use engine::SystemRunner;
use error::{AppError, Result, EXIT_CANCELLED};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if !cli.has_action() {
        // Usage only; nothing to do
        if let Err(e) = Cli::command().print_help() {
            error!("Failed to print help: {}", e);
        }
        println!();
        return;
    }

    info!("wsl-devkit v{} starting", env!("CARGO_PKG_VERSION"));

    // Ctrl-C outside a raw-mode prompt (line input, a running command) lands here
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", AppError::Cancelled.to_string().yellow());
            process::exit(EXIT_CANCELLED);
        }
    });

    // Prompts and child processes block, so the whole run lives on the blocking pool
    let outcome = tokio::task::spawn_blocking(move || run(cli)).await;

    let code = match outcome {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => report(&e),
        Err(e) => {
            error!("Pipeline task failed: {}", e);
            eprintln!("{} {}", "Error:".red(), e);
            1
        },
    };
    process::exit(code);
}

/// Main application logic
fn run(cli: Cli) -> Result<()> {
    let work_dir = std::env::current_dir()?;
    let settings = cli.settings(work_dir);
    let runner = SystemRunner;

    let terminal;
    let prompter: &dyn Prompter = if settings.assume_yes {
        &DefaultAnswers
    } else {
        terminal = TerminalPrompter::new();
        &terminal
    };

    App::new(&settings, &runner, prompter).run(cli.set_env, cli.mode())
}

/// Prints the error for the operator and returns the exit status to use.
fn report(e: &AppError) -> i32 {
    match e {
        AppError::Cancelled => {
            eprintln!("\n{}", e.to_string().yellow());
        },
        _ => {
            error!("Run failed: {:?}", e);
            eprintln!("{} {}", "Error:".red().bold(), e.to_string().red());
        },
    }
    e.exit_code()
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wsl_devkit={}", cli.log_level())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
