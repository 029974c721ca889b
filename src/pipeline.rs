//! The build → run / export → import → cleanup pipeline.
//!
//! Every step asks for confirmation first, runs exactly one external operation
//! (cleanup runs two for the container), and aborts the rest of the pipeline on
//! failure. Declining a step is not a failure.

use crate::cli::{with_spinner, Prompter};
use crate::engine::{git_submodule_update, wsl_import, CommandRunner, DockerCli};
use crate::error::{AppError, Result};
use crate::models::{BuildEnv, BuildTarget, GeneratedDockerfile, Mode, Settings};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Drives one run of the pipeline against a runner and a prompter.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    env: &'a BuildEnv,
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    docker: DockerCli,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        env: &'a BuildEnv,
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            settings,
            env,
            runner,
            prompter,
            docker: DockerCli::new(&settings.docker_bin, &settings.work_dir),
        }
    }

    /// Builds a freshly named image, then runs or exports it depending on `mode`.
    pub fn run(&self, mode: Mode) -> Result<()> {
        let target = BuildTarget::generate(&self.settings.name_prefix);
        info!("Starting {:?} pipeline for {}", mode, target);

        if !self.build(&target, mode == Mode::Debug)? {
            println!("{}", "Image build skipped; nothing else to do.".yellow());
            return Ok(());
        }

        match mode {
            Mode::Debug => self.run_debug(&target),
            Mode::Install => self.install(&target),
        }
    }

    /// Runs `git submodule update` when the work directory declares submodules.
    pub fn fetch_build_inputs(&self) -> Result<()> {
        if !self.settings.work_dir.join(".gitmodules").exists() {
            info!("No .gitmodules in work directory; skipping submodule update");
            return Ok(());
        }
        println!("Downloading the files needed for the build...");
        self.runner
            .run(&git_submodule_update(&self.settings.work_dir))
    }

    /// Confirms, fetches inputs and builds the image. Returns `false` when the operator
    /// declined. The generated build description is gone when this returns.
    pub fn build(&self, target: &BuildTarget, debug_mode: bool) -> Result<bool> {
        let question = format!("Build Docker image '{}'?", target);
        if !self.prompter.confirm(&question, true)? {
            return Ok(false);
        }

        self.fetch_build_inputs()?;

        let generated = GeneratedDockerfile::write(&self.settings.dockerfile, debug_mode)?;
        let cmd = self.docker.build(
            self.env,
            generated.path(),
            target,
            self.settings.no_cache,
        );

        match self.runner.run(&cmd) {
            Ok(()) => {
                println!("{}", format!("Docker image '{}' built.", target).green());
                Ok(true)
            },
            Err(e @ AppError::ToolNotFound { .. }) => Err(e),
            Err(e) => {
                error!("Build failed: {}", e);
                if self.runner.probe(&self.docker.info()) {
                    Err(e)
                } else {
                    Err(AppError::EngineUnreachable {
                        program: self.docker.bin().to_string(),
                    })
                }
            },
        }
    }

    /// Debug mode: runs the image with an interactive terminal.
    pub fn run_debug(&self, target: &BuildTarget) -> Result<()> {
        let question = format!("Run container '{}'?", target);
        if !self.prompter.confirm(&question, true)? {
            println!("{}", "Skipping container run.".yellow());
            return Ok(());
        }
        self.runner
            .run(&self.docker.run_interactive(self.env, target))
    }

    /// Install mode: exports the image as an archive, offers the import and the cleanup.
    pub fn install(&self, target: &BuildTarget) -> Result<()> {
        let question = format!("Create a WSL archive from image '{}'?", target);
        if !self.prompter.confirm(&question, true)? {
            println!("{}", "WSL archive export aborted.".yellow());
            return Ok(());
        }

        self.runner
            .run(&self.docker.run_detached(self.env, target))?;
        println!("Container '{}' started.", target);

        let archive = self.export(target)?;
        println!(
            "{}",
            format!("WSL archive written to {}", archive.display()).green()
        );

        let imported = self.offer_import(&archive)?;
        self.cleanup(target, &archive, imported)?;

        println!("{}", "All operations finished.".green().bold());
        Ok(())
    }

    /// Asks for the output directory and exports the container filesystem there
    /// under the progress indicator.
    fn export(&self, target: &BuildTarget) -> Result<PathBuf> {
        let default_dir = self.settings.work_dir.display().to_string();
        let answer = self
            .prompter
            .input("Output directory for the WSL archive", &default_dir)?;
        let dir = self.settings.resolve(Path::new(&answer));
        if let Err(e) = fs::create_dir_all(&dir) {
            self.compensate(target, None);
            return Err(e.into());
        }

        let archive = target.archive_path(&dir);
        debug!("Exporting {} to {}", target, archive.display());

        let export = self.docker.export(target, &archive);
        let result = with_spinner(
            "Creating WSL archive",
            "WSL archive created.",
            "WSL archive creation failed.",
            || self.runner.run(&export),
        );

        match result {
            Ok(()) => Ok(archive),
            Err(e) => {
                self.compensate(target, Some(&archive));
                Err(e)
            },
        }
    }

    /// Removes the export container and any partial archive after a failed export.
    /// Failures here are logged only, the export error is what gets reported.
    fn compensate(&self, target: &BuildTarget, archive: Option<&Path>) {
        warn!("Export failed; removing container {}", target);
        if let Err(e) = self
            .runner
            .run(&self.docker.force_remove_container(target))
        {
            warn!("Could not remove container {}: {}", target, e);
        }
        if let Some(archive) = archive {
            if archive.exists() {
                if let Err(e) = fs::remove_file(archive) {
                    warn!("Could not remove {}: {}", archive.display(), e);
                }
            }
        }
    }

    /// Offers `wsl --install --from-file`. Defaults to yes only on Windows.
    fn offer_import(&self, archive: &Path) -> Result<bool> {
        if !self
            .prompter
            .confirm("Import the archive into WSL? (Windows only)", cfg!(windows))?
        {
            println!("{}", "Skipping WSL import.".yellow());
            return Ok(false);
        }
        println!("Importing {} into WSL...", archive.display());
        self.runner
            .run(&wsl_import(&self.settings.wsl_bin, archive))?;
        Ok(true)
    }

    fn cleanup(&self, target: &BuildTarget, archive: &Path, imported: bool) -> Result<()> {
        let question = format!("Remove container '{}'?", target);
        let container_removed = if self.prompter.confirm(&question, true)? {
            self.runner.run(&self.docker.stop(target))?;
            self.runner.run(&self.docker.remove_container(target))?;
            println!("Container '{}' removed.", target);
            true
        } else {
            println!("{}", format!("Keeping container '{}'.", target).yellow());
            false
        };

        // The image cannot be removed while a container still uses it
        if container_removed {
            let question = format!("Remove image '{}'?", target);
            if self.prompter.confirm(&question, true)? {
                self.runner.run(&self.docker.remove_image(target))?;
                println!("Image '{}' removed.", target);
            } else {
                println!("{}", format!("Keeping image '{}'.", target).yellow());
            }
        }

        let question = format!("Delete the archive {}?", archive.display());
        if self.prompter.confirm(&question, imported)? {
            fs::remove_file(archive)?;
            println!("Archive {} deleted.", archive.display());
        } else {
            println!(
                "{}",
                format!("Keeping archive {}.", archive.display()).yellow()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::testing::{Answer, ScriptedPrompter};
    use crate::cli::DefaultAnswers;
    use crate::engine::testing::RecordingRunner;
    use crate::models::{EnvMap, GENERATED_DOCKERFILE, KEY_GROUP, KEY_PASSWORD, KEY_USER};
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM archlinux\n").unwrap();
        let mut settings = Settings::new(dir.path());
        settings.name_prefix = "test".to_string();
        (dir, settings)
    }

    fn env() -> BuildEnv {
        let mut map = EnvMap::new();
        map.insert(KEY_USER.to_string(), "user".to_string());
        map.insert(KEY_PASSWORD.to_string(), "user".to_string());
        map.insert(KEY_GROUP.to_string(), "users".to_string());
        BuildEnv::from_map(&map).unwrap()
    }

    fn only_program(commands: &[String], sub: &str) -> usize {
        commands
            .iter()
            .filter(|c| c.starts_with(&format!("docker {}", sub)))
            .count()
    }

    #[test]
    fn test_debug_pipeline_builds_and_runs() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        runner.watch(dir.path().join(GENERATED_DOCKERFILE));

        Pipeline::new(&settings, &env, &runner, &DefaultAnswers)
            .run(Mode::Debug)
            .unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("docker build --build-arg DOCKER_USER=user"));
        assert!(commands[1].starts_with("docker run --rm --privileged"));
        // Generated file existed while building and is gone afterwards
        assert!(runner.watched_seen()[0]);
        assert!(!dir.path().join(GENERATED_DOCKERFILE).exists());
    }

    #[test]
    fn test_generated_file_removed_after_failed_build() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        runner.fail_on("docker build", Some(1));

        let err = Pipeline::new(&settings, &env, &runner, &DefaultAnswers)
            .run(Mode::Install)
            .unwrap_err();

        assert!(matches!(err, AppError::CommandFailed { .. }));
        assert!(!dir.path().join(GENERATED_DOCKERFILE).exists());
        // Engine answered the probe, so no later step ran
        assert_eq!(runner.probes().len(), 1);
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn test_engine_unreachable_stops_pipeline() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        runner.fail_on("docker build", Some(1)).probe_fails();

        let err = Pipeline::new(&settings, &env, &runner, &DefaultAnswers)
            .run(Mode::Debug)
            .unwrap_err();

        match &err {
            AppError::EngineUnreachable { program } => assert_eq!(program, "docker"),
            other => panic!("Expected EngineUnreachable, got {:?}", other),
        }
        assert!(err.to_string().contains("not running"));
        assert_ne!(err.exit_code(), 0);
        assert_eq!(runner.probes(), vec!["docker info".to_string()]);
        assert!(!runner.ran("docker run"));
        assert!(!runner.ran("docker export"));
        assert!(!dir.path().join(GENERATED_DOCKERFILE).exists());
    }

    #[test]
    fn test_missing_tool_is_not_probed() {
        let (_dir, settings) = workspace();
        let env = env();

        struct MissingDocker;
        impl CommandRunner for MissingDocker {
            fn run(&self, cmd: &crate::engine::ExternalCommand) -> Result<()> {
                Err(AppError::ToolNotFound {
                    program: cmd.program().to_string(),
                })
            }
            fn probe(&self, _cmd: &crate::engine::ExternalCommand) -> bool {
                panic!("probe should not run when the binary is missing")
            }
        }

        let err = Pipeline::new(&settings, &env, &MissingDocker, &DefaultAnswers)
            .run(Mode::Debug)
            .unwrap_err();
        assert!(matches!(err, AppError::ToolNotFound { .. }));
    }

    #[test]
    fn test_declined_build_runs_nothing() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        let prompter = ScriptedPrompter::new(vec![Answer::No]);

        Pipeline::new(&settings, &env, &runner, &prompter)
            .run(Mode::Install)
            .unwrap();

        assert!(runner.commands().is_empty());
        assert!(!dir.path().join(GENERATED_DOCKERFILE).exists());
    }

    #[test]
    fn test_submodules_fetched_when_declared() {
        let (dir, settings) = workspace();
        fs::write(dir.path().join(".gitmodules"), "").unwrap();
        let env = env();
        let runner = RecordingRunner::new();
        let prompter = ScriptedPrompter::new(vec![Answer::Yes, Answer::No]);

        Pipeline::new(&settings, &env, &runner, &prompter)
            .run(Mode::Debug)
            .unwrap();

        let commands = runner.commands();
        assert_eq!(commands[0], "git submodule update --init --recursive");
        assert!(commands[1].starts_with("docker build"));
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_submodule_failure_aborts_before_build() {
        let (dir, settings) = workspace();
        fs::write(dir.path().join(".gitmodules"), "").unwrap();
        let env = env();
        let runner = RecordingRunner::new();
        runner.fail_on("git", Some(128));

        let err = Pipeline::new(&settings, &env, &runner, &DefaultAnswers)
            .run(Mode::Debug)
            .unwrap_err();
        assert!(matches!(err, AppError::CommandFailed { code: Some(128), .. }));
        assert!(!runner.ran("docker"));
    }

    #[test]
    fn test_no_cache_flag_reaches_build() {
        let (_dir, mut settings) = workspace();
        settings.no_cache = true;
        let env = env();
        let runner = RecordingRunner::new();
        let prompter = ScriptedPrompter::new(vec![Answer::Yes, Answer::No]);

        Pipeline::new(&settings, &env, &runner, &prompter)
            .run(Mode::Debug)
            .unwrap();
        assert!(runner.commands()[0].contains(" --no-cache "));
    }

    #[test]
    fn test_install_with_defaults() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        runner.write_output_on("docker export");

        Pipeline::new(&settings, &env, &runner, &DefaultAnswers)
            .run(Mode::Install)
            .unwrap();

        let commands = runner.commands();
        assert!(commands[0].starts_with("docker build"));
        assert!(commands[1].starts_with("docker run -d --name test_"));
        assert!(commands[2].starts_with(&format!(
            "docker export -o {}",
            dir.path().join("test_").display()
        )));
        let imported = runner.ran("wsl --install --from-file");
        assert_eq!(imported, cfg!(windows));
        assert_eq!(only_program(&commands, "stop"), 1);
        assert_eq!(only_program(&commands, "rm "), 1);
        assert_eq!(only_program(&commands, "rmi"), 1);
    }

    #[test]
    fn test_install_keeps_everything_when_declined() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        let out = dir.path().join("out");
        let prompter = ScriptedPrompter::new(vec![
            Answer::Yes,                             // build
            Answer::Yes,                             // export
            Answer::Text(out.display().to_string()), // directory
            Answer::No,                              // import
            Answer::No,                              // remove container
            Answer::No,                              // delete archive
        ]);

        Pipeline::new(&settings, &env, &runner, &prompter)
            .run(Mode::Install)
            .unwrap();

        assert_eq!(prompter.remaining(), 0);
        assert!(out.is_dir());
        assert!(!runner.ran("wsl"));
        assert!(!runner.ran("docker stop"));
        assert!(!runner.ran("docker rmi"));
    }

    #[test]
    fn test_install_imports_and_deletes_archive() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        runner.write_output_on("docker export");
        let prompter = ScriptedPrompter::new(vec![
            Answer::Yes,
            Answer::Yes,
            Answer::Text("exports".to_string()),
            Answer::Yes,     // import
            Answer::Yes,     // remove container
            Answer::No,      // keep image
            Answer::Default, // archive: default is yes after import
        ]);

        Pipeline::new(&settings, &env, &runner, &prompter)
            .run(Mode::Install)
            .unwrap();

        let exports = dir.path().join("exports");
        assert!(runner.ran(&format!("wsl --install --from-file {}", exports.display())));
        assert!(runner.ran("docker stop"));
        assert!(!runner.ran("docker rmi"));
        assert_eq!(prompter.remaining(), 0);
        assert_eq!(fs::read_dir(&exports).unwrap().count(), 0);
    }

    #[test]
    fn test_export_failure_removes_container() {
        let (dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        runner.fail_on("docker export", Some(1));

        let err = Pipeline::new(&settings, &env, &runner, &DefaultAnswers)
            .run(Mode::Install)
            .unwrap_err();

        assert!(matches!(err, AppError::CommandFailed { .. }));
        let commands = runner.commands();
        assert!(commands.last().unwrap().starts_with("docker rm -f test_"));
        assert!(!runner.ran("wsl"));
        // No archive left behind in the default output directory
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |x| x == "wsl"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_cancelled_prompt_aborts_pipeline() {
        let (_dir, settings) = workspace();
        let env = env();
        let runner = RecordingRunner::new();
        let prompter = ScriptedPrompter::new(vec![Answer::Yes, Answer::Interrupt]);

        let err = Pipeline::new(&settings, &env, &runner, &prompter)
            .run(Mode::Install)
            .unwrap_err();

        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(runner.commands().len(), 1);
    }
}
