//! Named pipe transport.
//!
//! The pipe is opened read-write so it never reports end-of-file when the
//! last writer closes. Overlong lines are dropped; the pipe stays open.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::task::JoinHandle;

use super::{LineBuffer, LineEvent, dispatch};
use crate::actor::ControllerHandle;

/// Creates the FIFO unless one already exists at `path`.
///
/// # Errors
///
/// Fails when `path` exists but is not a FIFO, or `mkfifo` fails.
pub fn ensure_fifo(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => return Ok(()),
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a FIFO", path.display()),
            ));
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    if unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Opens the FIFO and forwards its lines to the controller.
///
/// # Errors
///
/// Returns the I/O error when the FIFO cannot be created or opened.
pub fn spawn(path: &Path, handle: ControllerHandle) -> io::Result<JoinHandle<()>> {
    ensure_fifo(path)?;
    let receiver = pipe::OpenOptions::new().read_write(true).open_receiver(path)?;
    tracing::info!(path = %path.display(), "control FIFO open");
    Ok(tokio::spawn(read_lines(receiver, handle)))
}

async fn read_lines(mut receiver: pipe::Receiver, handle: ControllerHandle) {
    let mut lines = LineBuffer::new();
    let mut chunk = [0u8; 1024];

    loop {
        let read = match receiver.read(&mut chunk).await {
            Ok(0) => continue,
            Ok(n) => n,
            Err(err) => {
                tracing::error!(error = %err, "control FIFO read failed");
                return;
            }
        };

        for event in lines.feed(&chunk[..read]) {
            match event {
                LineEvent::Line(line) => {
                    if let Some(response) = dispatch(&line, &handle).await {
                        tracing::debug!(response, "FIFO request answered, response dropped");
                    }
                }
                LineEvent::Overflow => tracing::warn!("control FIFO line too long, discarded"),
            }
        }

        if handle.is_closed() {
            return;
        }
    }
}
