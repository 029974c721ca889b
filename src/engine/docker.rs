//! Command lines for the container engine, the VM importer and git.

use super::ExternalCommand;
use crate::models::{BuildEnv, BuildTarget};
use std::path::{Path, PathBuf};

/// Builds `docker` invocations rooted in the work directory.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
    work_dir: PathBuf,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    fn command(&self) -> ExternalCommand {
        ExternalCommand::new(&self.bin).current_dir(&self.work_dir)
    }

    /// Cheap reachability check for the engine.
    pub fn info(&self) -> ExternalCommand {
        self.command().arg("info")
    }

    pub fn build(
        &self,
        env: &BuildEnv,
        dockerfile: &Path,
        target: &BuildTarget,
        no_cache: bool,
    ) -> ExternalCommand {
        let mut cmd = self.command().arg("build").args(env.as_flags("--build-arg"));
        if no_cache {
            cmd = cmd.arg("--no-cache");
        }
        cmd.arg("-f")
            .arg(dockerfile.display().to_string())
            .args(["-t", target.name(), "."])
    }

    /// Throwaway privileged container attached to the terminal.
    pub fn run_interactive(&self, env: &BuildEnv, target: &BuildTarget) -> ExternalCommand {
        self.command()
            .args(["run", "--rm", "--privileged"])
            .args(env.as_flags("-e"))
            .arg("-it")
            .arg(target.name())
    }

    /// Detached container named after the target, used as the export source.
    pub fn run_detached(&self, env: &BuildEnv, target: &BuildTarget) -> ExternalCommand {
        self.command()
            .args(["run", "-d", "--name", target.name(), "--privileged"])
            .args(env.as_flags("-e"))
            .arg(target.image_ref())
    }

    pub fn export(&self, target: &BuildTarget, archive: &Path) -> ExternalCommand {
        self.command()
            .args(["export", "-o"])
            .arg(archive.display().to_string())
            .arg(target.name())
    }

    pub fn stop(&self, target: &BuildTarget) -> ExternalCommand {
        self.command().args(["stop", target.name()])
    }

    pub fn remove_container(&self, target: &BuildTarget) -> ExternalCommand {
        self.command().args(["rm", target.name()])
    }

    pub fn force_remove_container(&self, target: &BuildTarget) -> ExternalCommand {
        self.command().args(["rm", "-f", target.name()])
    }

    pub fn remove_image(&self, target: &BuildTarget) -> ExternalCommand {
        self.command().args(["rmi", target.name()])
    }
}

/// Imports an exported archive as a WSL distribution.
pub fn wsl_import(bin: &str, archive: &Path) -> ExternalCommand {
    ExternalCommand::new(bin)
        .args(["--install", "--from-file"])
        .arg(archive.display().to_string())
}

/// Fetches the submodules the build context depends on.
pub fn git_submodule_update(work_dir: &Path) -> ExternalCommand {
    ExternalCommand::new("git")
        .args(["submodule", "update", "--init", "--recursive"])
        .current_dir(work_dir)
}
