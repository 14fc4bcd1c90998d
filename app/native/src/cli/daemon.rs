//! The `run` command: wires the controller to its event sources.
//!
//! ```text
//!  signals ─┐
//!  socket  ─┼──▶ ControllerActor ──▶ ratpoison / child processes
//!  fifo    ─┤
//!  watchers ┘
//! ```
//!
//! Everything runs on one current-thread runtime. Window manager calls block
//! the actor for at most the configured timeout; watchers and the shutdown
//! teardown run on the blocking pool.

use std::path::Path;

use tokio::task::JoinHandle;

use crate::actor::{ControllerActor, ControllerHandle};
use crate::config::{self, RpcdConfig};
use crate::control::fifo;
use crate::control::socket::ControlSocket;
use crate::controller::ControllerError;
use crate::error::RpcdError;
use crate::platform::OsLauncher;
use crate::state::{Display, WindowHandle};
use crate::wm::RatpoisonClient;
use crate::wm::watcher::WindowWatcher;
use crate::{logging, signals};

/// Loads the configuration and runs the daemon until shutdown.
///
/// # Errors
///
/// Returns configuration errors, a failed first reconcile run, and I/O errors
/// from the runtime or the control channel. Managed processes are torn down
/// on every error path once they may have been started.
pub fn run(config_path: Option<&Path>, verbose: u8) -> Result<(), RpcdError> {
    let (config, path) = config::load_config(config_path)?;
    logging::init(verbose, config.logging.level.as_deref());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %path.display(), "starting rpcd");

    let base_dir = config::base_dir(&path);
    let wm = RatpoisonClient::new(&config.window_manager.binary, config.window_manager.timeout());
    let mut controller =
        config::build_controller(&config, &base_dir, Box::new(wm.clone()), Box::new(OsLauncher::new()))?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    let baseline = match controller.cold_start() {
        Ok(baseline) => baseline,
        Err(err) => {
            controller.shutdown();
            return Err(ControllerError::from(err).into());
        }
    };
    let displays = controller.displays().displays().to_vec();

    runtime.block_on(async move {
        let (handle, actor) = ControllerActor::spawn(controller);
        match serve(&config, &base_dir, wm, displays, baseline, &handle) {
            Ok(socket) => {
                if let Err(err) = actor.await {
                    tracing::error!(error = %err, "controller task failed");
                }
                drop(socket);
                tracing::info!("rpcd stopped");
                Ok(())
            }
            Err(err) => {
                stop(&handle, actor).await;
                Err(err)
            }
        }
    })
}

/// Starts every event source. The returned socket must outlive the actor.
fn serve(
    config: &RpcdConfig,
    base_dir: &Path,
    wm: RatpoisonClient,
    displays: Vec<Display>,
    baseline: Vec<Vec<WindowHandle>>,
    handle: &ControllerHandle,
) -> Result<ControlSocket, RpcdError> {
    signals::spawn(handle.clone())?;

    let interval = config.window_manager.poll_interval();
    for (display, known) in displays.into_iter().zip(baseline) {
        WindowWatcher::new(wm.clone(), display, interval, known, handle.clone()).spawn();
    }

    let socket_path = config.control.socket_path(base_dir);
    let (socket, _) = ControlSocket::bind(&socket_path, handle.clone())
        .map_err(|err| RpcdError::ControlError(format!("cannot bind {}: {err}", socket_path.display())))?;

    if let Some(fifo_path) = config.control.fifo_path(base_dir) {
        fifo::spawn(&fifo_path, handle.clone())
            .map_err(|err| RpcdError::ControlError(format!("cannot open {}: {err}", fifo_path.display())))?;
    }

    Ok(socket)
}

/// Requests shutdown and waits for teardown to finish.
async fn stop(handle: &ControllerHandle, actor: JoinHandle<()>) {
    if handle.shutdown().await.is_err() {
        tracing::warn!("controller already stopped");
    }
    if let Err(err) = actor.await {
        tracing::error!(error = %err, "controller task failed");
    }
}
