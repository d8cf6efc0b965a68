//! Hook Executor Service
//! Runs the user's before/after shell fragments around the engine process

use crate::domain::DomainError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

fn shell_command(script: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(script);
        cmd
    }

    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }
}

/// Execute a shell fragment and wait for it.
/// A blank script is a no-op. Callers treat errors as advisory.
pub async fn execute_hook(
    script: &str,
    hook_type: &str,
    working_dir: Option<&Path>,
) -> Result<(), DomainError> {
    if script.trim().is_empty() {
        return Ok(());
    }

    debug!(hook_type = %hook_type, command = %script, "Executing hook");

    let mut cmd = shell_command(script);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let status = cmd.status().await.map_err(|e| {
        DomainError::Spawn(format!("Failed to execute {} hook: {}", hook_type, e))
    })?;

    if !status.success() {
        let exit_code = status.code().unwrap_or(-1);
        warn!(
            hook_type = %hook_type,
            exit_code = exit_code,
            "Hook failed"
        );
        return Err(DomainError::Spawn(format!(
            "{} hook failed with exit code {}",
            hook_type, exit_code
        )));
    }

    debug!(hook_type = %hook_type, "Hook executed successfully");
    Ok(())
}
