//! Transport IPC vers le lecteur externe
//!
//! Le lecteur (mpv ou IINA) expose un socket local parlant un protocole
//! JSON délimité par lignes : une commande est un objet
//! `{"command": [...]}`, une réponse porte une paire `data`/`error` où
//! `error != "success"` signale l'échec. Les noms de commandes et la
//! forme des arguments sont un contrat externe figé.

use crate::error::{PlayerError, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::debug;

/// Timeout d'une commande IPC
const COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

/// Client du socket IPC du lecteur externe
#[derive(Debug, Clone)]
pub struct PlayerClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl PlayerClient {
    /// Crée un client pour le socket donné
    pub fn new<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Chemin du socket ciblé
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Envoie une commande et attend sa réponse
    ///
    /// Les lignes d'événements asynchrones émises par le lecteur sont
    /// ignorées ; la première ligne portant `error` est la réponse.
    ///
    /// # Errors
    ///
    /// * [`PlayerError::Unreachable`] - socket absent ou refusé
    /// * [`PlayerError::Command`] - le lecteur a répondu autre chose que
    ///   `success`
    pub async fn command(&self, command: &[Value]) -> Result<Value> {
        let stream = match timeout(self.timeout, UnixStream::connect(&self.socket_path)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(PlayerError::Unreachable(err)),
            Err(_) => return Err(PlayerError::Timeout),
        };
        let (reader, mut writer) = stream.into_split();

        let mut payload = serde_json::to_vec(&json!({ "command": command }))?;
        payload.push(b'\n');
        debug!(socket = %self.socket_path.display(), "Sending player command: {:?}", command);
        timeout(self.timeout, writer.write_all(&payload))
            .await
            .map_err(|_| PlayerError::Timeout)??;

        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = timeout(self.timeout, lines.next_line())
                .await
                .map_err(|_| PlayerError::Timeout)??;
            let Some(line) = line else {
                return Err(PlayerError::Protocol(
                    "connection closed before response".to_string(),
                ));
            };
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line)?;
            // Le lecteur pousse aussi des événements sur le même canal
            if value.get("event").is_some() {
                continue;
            }
            let error = value
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("no error field");
            if error != "success" {
                return Err(PlayerError::Command(error.to_string()));
            }
            return Ok(value.get("data").cloned().unwrap_or(Value::Null));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;

    /// Répond aux connexions avec les lignes données, après avoir lu la
    /// commande entrante
    fn serve(path: &Path, responses: Vec<&'static str>) -> tokio::task::JoinHandle<String> {
        let listener = UnixListener::bind(path).unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let received = String::from_utf8_lossy(&buf[..n]).to_string();
            for line in responses {
                stream.write_all(line.as_bytes()).await.unwrap();
                stream.write_all(b"\n").await.unwrap();
            }
            received
        })
    }

    #[tokio::test]
    async fn test_command_returns_data() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("player.sock");
        let server = serve(&socket, vec![r#"{"data": 3, "error": "success"}"#]);

        let client = PlayerClient::new(&socket);
        let data = client
            .command(&[json!("get_property"), json!("playlist-current-pos")])
            .await
            .unwrap();
        assert_eq!(data, json!(3));

        let received = server.await.unwrap();
        assert!(received.contains(r#""command":["get_property","playlist-current-pos"]"#));
    }

    #[tokio::test]
    async fn test_command_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("player.sock");
        serve(&socket, vec![r#"{"error": "invalid parameter"}"#]);

        let client = PlayerClient::new(&socket);
        let err = client.command(&[json!("seek"), json!("-30")]).await.unwrap_err();
        assert!(matches!(err, PlayerError::Command(message) if message == "invalid parameter"));
    }

    #[tokio::test]
    async fn test_event_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("player.sock");
        serve(
            &socket,
            vec![
                r#"{"event": "property-change", "name": "pause"}"#,
                r#"{"data": null, "error": "success"}"#,
            ],
        );

        let client = PlayerClient::new(&socket);
        let data = client.command(&[json!("cycle"), json!("pause")]).await.unwrap();
        assert_eq!(data, Value::Null);
    }

    #[tokio::test]
    async fn test_missing_socket_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let client = PlayerClient::new(dir.path().join("absent.sock"));
        let err = client.command(&[json!("cycle"), json!("pause")]).await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
