use crate::cli::Prompter;
use crate::engine::CommandRunner;
use crate::error::Result;
use crate::models::{BuildEnv, Mode, Settings, KEY_PASSWORD};
use crate::pipeline::Pipeline;
use crate::store::EnvStore;
use clap::Parser;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::PathBuf;
use tracing::info;

/// Build a Docker development image and turn it into a WSL distribution
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Build the image, export it as a WSL archive and offer to import it
    #[arg(short, long, conflicts_with = "debug")]
    pub install: bool,

    /// Build the image with systemd as init and run it with an interactive terminal
    #[arg(short, long)]
    pub debug: bool,

    /// Do not reuse the build cache
    #[arg(long)]
    pub no_cache: bool,

    /// Accept every default without asking
    #[arg(short = 'y', long = "yes")]
    pub assume_yes: bool,

    /// Re-enter the stored configuration (asks before deleting the existing file)
    #[arg(long)]
    pub set_env: bool,

    /// Env file holding the build user configuration
    #[arg(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Base Dockerfile the generated build description is derived from
    #[arg(long, value_name = "PATH", default_value = "Dockerfile")]
    pub dockerfile: PathBuf,

    /// Prefix of the time-stamped image, container and archive name
    #[arg(long, value_name = "NAME", default_value = "devkit")]
    pub name_prefix: String,

    /// Container engine binary
    #[arg(long, value_name = "BIN", env = "DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    /// WSL binary used for the import
    #[arg(long, value_name = "BIN", env = "WSL_BIN", default_value = "wsl")]
    pub wsl_bin: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,
}

impl Cli {
    /// The pipeline mode, if one was requested.
    pub fn mode(&self) -> Option<Mode> {
        if self.debug {
            Some(Mode::Debug)
        } else if self.install {
            Some(Mode::Install)
        } else {
            None
        }
    }

    /// Whether any flag selecting work was given. Without one, usage is printed.
    pub fn has_action(&self) -> bool {
        self.mode().is_some() || self.set_env
    }

    pub fn log_level(&self) -> &'static str {
        if self.very_verbose {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    /// Resolves the settings for a run rooted at `work_dir`.
    pub fn settings(&self, work_dir: PathBuf) -> Settings {
        let mut settings = Settings::new(work_dir);
        settings.env_file = settings.resolve(&self.env_file);
        settings.dockerfile = settings.resolve(&self.dockerfile);
        settings.name_prefix = self.name_prefix.clone();
        settings.docker_bin = self.docker_bin.clone();
        settings.wsl_bin = self.wsl_bin.clone();
        settings.no_cache = self.no_cache;
        settings.assume_yes = self.assume_yes;
        settings
    }
}

/// CLI application
pub struct App<'a> {
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
}

impl<'a> App<'a> {
    pub fn new(
        settings: &'a Settings,
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            settings,
            runner,
            prompter,
        }
    }

    /// Loads (or re-enters) the configuration, then runs the pipeline for `mode`.
    pub fn run(&self, set_env: bool, mode: Option<Mode>) -> Result<()> {
        let store = EnvStore::new(&self.settings.env_file);

        if set_env {
            self.reset_config(&store)?;
        }

        let env = self.load_config(&store)?;

        if set_env {
            print_summary(&env, &store);
        }

        let Some(mode) = mode else {
            return Ok(());
        };

        if mode == Mode::Debug {
            println!("{}", "=== Debug mode enabled ===".cyan().bold());
        }

        Pipeline::new(self.settings, &env, self.runner, self.prompter).run(mode)
    }

    /// Loads the stored record and fills in whatever is missing.
    pub fn load_config(&self, store: &EnvStore) -> Result<BuildEnv> {
        let loaded = store.load()?;
        let force_defaults = self.settings.assume_yes || !self.prompter.is_interactive();
        let map = store.prompt_missing(loaded, self.prompter, force_defaults)?;
        info!("Configuration ready ({} keys)", map.len());
        BuildEnv::from_map(&map)
    }

    /// Deletes the stored record after confirmation so every key is asked for again.
    fn reset_config(&self, store: &EnvStore) -> Result<()> {
        if !store.exists() {
            return Ok(());
        }
        let question = format!(
            "Delete the existing configuration in {} and enter new values?",
            store.path().display()
        );
        if self.prompter.confirm(&question, true)? {
            store.clear()?;
            println!("Existing configuration deleted.");
        } else {
            println!("{}", "Keeping the existing configuration.".yellow());
        }
        Ok(())
    }
}

/// Renders the record as a table with the password masked.
pub fn summary_table(env: &BuildEnv) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Key", "Value"]);
    for (key, value) in env.pairs() {
        let shown = if key == KEY_PASSWORD {
            "*".repeat(value.chars().count().max(1))
        } else {
            value.to_string()
        };
        table.add_row(vec![key.to_string(), shown]);
    }
    table
}

fn print_summary(env: &BuildEnv, store: &EnvStore) {
    println!(
        "{}",
        format!("Configuration saved to {}", store.path().display()).green()
    );
    println!("{}", summary_table(env));
}
