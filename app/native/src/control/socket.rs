//! Unix socket transport.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

use super::{LineBuffer, LineEvent, dispatch};
use crate::actor::ControllerHandle;

/// Bound control socket. The socket file is removed on drop.
#[derive(Debug)]
pub struct ControlSocket {
    path: PathBuf,
}

impl ControlSocket {
    /// Binds the socket and starts accepting clients.
    ///
    /// A stale socket file at `path` is replaced; missing parent directories
    /// are created.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the socket cannot be bound.
    pub fn bind(path: &Path, handle: ControllerHandle) -> io::Result<(Self, JoinHandle<()>)> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)?;
        tracing::info!(path = %path.display(), "control socket listening");

        let task = tokio::spawn(serve(listener, handle));
        Ok((Self { path: path.to_path_buf() }, task))
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to remove control socket");
        }
    }
}

async fn serve(listener: UnixListener, handle: ControllerHandle) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tracing::trace!("control client connected");
                tokio::spawn(client(stream, handle.clone()));
            }
            Err(err) => {
                tracing::warn!(error = %err, "control socket accept failed");
            }
        }
        if handle.is_closed() {
            break;
        }
    }
}

async fn client(stream: UnixStream, handle: ControllerHandle) {
    let (mut reader, mut writer) = stream.into_split();
    let mut lines = LineBuffer::new();
    let mut chunk = [0u8; 1024];

    loop {
        let read = match reader.read(&mut chunk).await {
            Ok(0) => return,
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(error = %err, "control client read failed");
                return;
            }
        };

        for event in lines.feed(&chunk[..read]) {
            match event {
                LineEvent::Line(line) => {
                    let Some(mut response) = dispatch(&line, &handle).await else { continue };
                    response.push('\n');
                    if writer.write_all(response.as_bytes()).await.is_err() {
                        return;
                    }
                }
                LineEvent::Overflow => {
                    tracing::warn!("control line too long, closing client");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::mpsc;

    use super::*;
    use crate::actor::{ControlMessage, QueryResult};
    use crate::control::MAX_LINE;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn bind() -> (tempfile::TempDir, ControlSocket, mpsc::Receiver<ControlMessage>) {
        let dir = tempfile::tempdir().unwrap();
        let (sender, rx) = mpsc::channel(16);
        let (socket, _task) = ControlSocket::bind(&dir.path().join("run/control.sock"), ControllerHandle::new(sender)).unwrap();
        (dir, socket, rx)
    }

    #[tokio::test]
    async fn test_variable_lines() {
        let (_dir, socket, mut rx) = bind();
        let mut stream = UnixStream::connect(socket.path()).await.unwrap();
        stream.write_all(b"mode=night\nshow=1\n").await.unwrap();

        for expected in [("mode", "night"), ("show", "1")] {
            let msg = tokio::time::timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
            assert!(matches!(msg, ControlMessage::SetVariable { ref name, ref value } if (name.as_str(), value.as_str()) == expected));
        }
    }

    #[tokio::test]
    async fn test_json_request_gets_response() {
        let (_dir, socket, mut rx) = bind();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let ControlMessage::Query { respond_to, .. } = msg {
                    let _ = respond_to.send(QueryResult::Done);
                }
            }
        });

        let stream = UnixStream::connect(socket.path()).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"{\"type\":\"reset\"}\n").await.unwrap();

        let mut response = String::new();
        let mut reader = BufReader::new(reader);
        tokio::time::timeout(TIMEOUT, reader.read_line(&mut response)).await.unwrap().unwrap();
        assert_eq!(response, "{\"type\":\"done\"}\n");
    }

    #[tokio::test]
    async fn test_overlong_line_closes_client() {
        let (_dir, socket, _rx) = bind();
        let mut stream = UnixStream::connect(socket.path()).await.unwrap();
        stream.write_all(&vec![b'x'; MAX_LINE + 10]).await.unwrap();

        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(TIMEOUT, stream.read(&mut buf)).await.unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    #[tokio::test]
    async fn test_socket_file_removed_on_drop() {
        let (_dir, socket, _rx) = bind();
        let path = socket.path().to_path_buf();
        assert!(path.exists());
        drop(socket);
        assert!(!path.exists());
    }
}
