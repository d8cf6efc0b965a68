//! Engine Process Controller
//!
//! Owns the single engine child process. `start()` builds the command line
//! from the registry, runs the before hook and spawns the binary with its
//! output redirected into the log file. An exit task per child runs the
//! after hook, cleans up and publishes `Stopped` on a watch channel, which is
//! what `stop()` waits for.

use crate::application::engine_installer::remove_packet_driver;
use crate::application::EngineInstaller;
use crate::constants::keys;
use crate::domain::services::{
    build_engine_args, execute_hook, substitute_tokens, EngineArgsInput,
};
use crate::domain::{DomainError, EngineState, Namespace, StartupScripts, TargetPlatform};
use crate::infrastructure::ResourceRegistry;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

struct RunningEngine {
    pid: Option<u32>,
    /// Taken by the first `stop()` so the child is signalled once
    kill_tx: Option<oneshot::Sender<()>>,
}

struct Shared {
    slot: Mutex<Option<RunningEngine>>,
    state: watch::Sender<EngineState>,
}

impl Shared {
    fn transition(&self, next: EngineState) {
        let prev = self.state.send_replace(next);
        if !prev.can_transition_to(next) {
            warn!(from = %prev, to = %next, "Unexpected engine state transition");
        } else {
            debug!(from = %prev, to = %next, "Engine state");
        }
    }
}

pub struct EngineProcessController {
    registry: Arc<ResourceRegistry>,
    installer: Arc<EngineInstaller>,
    shared: Arc<Shared>,
}

impl EngineProcessController {
    pub fn new(registry: Arc<ResourceRegistry>, installer: Arc<EngineInstaller>) -> Self {
        let (state, _) = watch::channel(EngineState::Stopped);
        Self {
            registry,
            installer,
            shared: Arc::new(Shared {
                slot: Mutex::new(None),
                state,
            }),
        }
    }

    /// True while a process handle is held
    pub async fn is_started(&self) -> bool {
        self.shared.slot.lock().await.is_some()
    }

    pub fn state(&self) -> EngineState {
        *self.shared.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.shared.state.subscribe()
    }

    pub async fn pid(&self) -> Option<u32> {
        self.shared.slot.lock().await.as_ref().and_then(|e| e.pid)
    }

    /// Start the engine, installing the latest release first when nothing is
    /// installed. A no-op when already started.
    pub async fn start(&self) -> Result<(), DomainError> {
        let mut slot = self.shared.slot.lock().await;
        if slot.is_some() {
            debug!("Engine already started");
            return Ok(());
        }

        if !self.installer.is_installed().await? {
            info!("Engine not installed, installing latest release");
            let release = self.installer.resolve(None).await?;
            self.installer.deploy(&release).await?;
        }

        self.shared.transition(EngineState::Starting);
        match self.spawn().await {
            Ok(engine) => {
                info!(pid = ?engine.pid, "Engine started");
                *slot = Some(engine);
                self.shared.transition(EngineState::Running);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Engine failed to start");
                self.shared.transition(EngineState::Stopped);
                Err(e)
            }
        }
    }

    /// Terminate the engine and wait until its exit task has finished.
    /// Returns immediately when nothing is running.
    pub async fn stop(&self) {
        let mut state = self.shared.state.subscribe();
        {
            let mut slot = self.shared.slot.lock().await;
            let Some(engine) = slot.as_mut() else {
                return;
            };
            if let Some(kill) = engine.kill_tx.take() {
                info!(pid = ?engine.pid, "Stopping engine");
                let _ = kill.send(());
                self.shared.transition(EngineState::Stopping);
            }
        }

        let _ = state.wait_for(|s| *s == EngineState::Stopped).await;
    }

    pub async fn restart(&self) -> Result<(), DomainError> {
        self.stop().await;
        self.start().await
    }

    /// Captured output of the current (or last) engine run
    pub async fn read_log(&self) -> Result<String, DomainError> {
        match tokio::fs::read(self.registry.paths().log_file()).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Argument vector for the next engine run
    pub async fn command_line(&self) -> Result<Vec<String>, DomainError> {
        let settings = self.registry.settings();
        let lists = self.registry.list_paths().await?;
        let lua = self.registry.active_paths(Namespace::Lua).await?;
        let blobs = self.registry.active_paths(Namespace::Blobs).await?;
        let profiles = self.registry.profiles().await?;
        let startup_args = settings
            .get_as::<String>(keys::STARTUP_ARGS)
            .await?
            .unwrap_or_default();

        Ok(build_engine_args(&EngineArgsInput {
            debug: settings.get_flag(keys::ENGINE_DEBUG).await?,
            lua: &lua,
            blobs: &blobs,
            startup_args: &startup_args,
            profiles: &profiles,
            lists: &lists,
        }))
    }

    async fn spawn(&self) -> Result<RunningEngine, DomainError> {
        let paths = self.registry.paths();
        tokio::fs::create_dir_all(paths.root()).await?;

        let log = std::fs::File::create(paths.log_file())?;
        let log_err = log.try_clone()?;

        let scripts = self
            .registry
            .settings()
            .get_as::<StartupScripts>(keys::STARTUP_SCRIPTS)
            .await?
            .unwrap_or_default();
        let lists = self.registry.list_paths().await?;
        let before = substitute_tokens(&scripts.before, &lists);
        let after = substitute_tokens(&scripts.after, &lists);

        if let Err(e) = execute_hook(&before, "before", Some(paths.root())).await {
            warn!(error = %e, "Before hook failed");
        }

        let binary = paths.engine_binary(self.installer.platform());
        let args = self.command_line().await?;
        debug!(binary = %binary.display(), args = ?args, "Spawning engine");

        let mut cmd = Command::new(&binary);
        cmd.args(&args)
            .current_dir(paths.root())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let child = cmd
            .spawn()
            .map_err(|e| DomainError::Spawn(format!("{}: {e}", binary.display())))?;
        let pid = child.id();

        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(supervise(
            child,
            kill_rx,
            ExitContext {
                shared: self.shared.clone(),
                after,
                workdir: paths.root().to_path_buf(),
                platform: self.installer.platform().clone(),
            },
        ));

        Ok(RunningEngine {
            pid,
            kill_tx: Some(kill_tx),
        })
    }
}

struct ExitContext {
    shared: Arc<Shared>,
    after: String,
    workdir: std::path::PathBuf,
    platform: TargetPlatform,
}

async fn supervise(mut child: Child, mut kill_rx: oneshot::Receiver<()>, ctx: ExitContext) {
    let pid = child.id();
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut kill_rx => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            terminate(&mut child);
            child.wait().await
        }
    };

    match status {
        Ok(status) => info!(pid = ?pid, status = %status, "Engine exited"),
        Err(e) => error!(error = %e, "Failed to wait for engine"),
    }

    if let Err(e) = execute_hook(&ctx.after, "after", Some(ctx.workdir.as_path())).await {
        warn!(error = %e, "After hook failed");
    }
    remove_packet_driver(&ctx.platform).await;

    let mut slot = ctx.shared.slot.lock().await;
    *slot = None;
    ctx.shared.transition(EngineState::Stopped);
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => return,
            Err(e) => warn!(pid = pid, error = %e, "SIGTERM failed, killing"),
        }
    }
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to kill engine");
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to kill engine");
    }
}
