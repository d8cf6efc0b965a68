//! Shell update stager
//!
//! Writes the downloaded binary next to the running executable and spawns a
//! detached shell that waits for this process to exit, moves the staged file
//! over the executable and relaunches it.

use crate::constants::self_update::STAGING_FILE;
use crate::domain::{ports::UpdateStager, DomainError};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

pub struct ShellUpdateStager {
    executable: PathBuf,
}

impl ShellUpdateStager {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Stager for the executable of the running process
    pub fn for_current_exe() -> Result<Self, DomainError> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Name of the release asset to download: the running binary's file name
    pub fn binary_name(&self) -> Option<String> {
        self.executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn staging_path(&self) -> PathBuf {
        self.executable
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(STAGING_FILE)
    }

    fn handoff_command(&self, staged: &Path) -> Command {
        let exe = self.executable.display();
        let staged = staged.display();

        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/c").arg(format!(
                "timeout /t 1 /nobreak & move /y \"{staged}\" \"{exe}\" & powershell Start-Process -FilePath \"{exe}\""
            ));
            cmd
        }

        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("bash");
            cmd.arg("-c").arg(format!(
                "sleep 1; mv -f '{staged}' '{exe}'; chmod +x '{exe}'; '{exe}'"
            ));
            cmd
        }
    }
}

impl UpdateStager for ShellUpdateStager {
    fn stage_update(&self, binary: &[u8]) -> Result<(), DomainError> {
        let staged = self.staging_path();
        std::fs::write(&staged, binary)?;

        let mut cmd = self.handoff_command(&staged);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Not waited on: the child outlives this process
        let child = cmd
            .spawn()
            .map_err(|e| DomainError::Spawn(format!("update handoff: {e}")))?;

        info!(
            pid = child.id(),
            staged = %staged.display(),
            executable = %self.executable.display(),
            "Update staged, relaunch scheduled"
        );
        Ok(())
    }
}
