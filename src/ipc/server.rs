//! Unix domain socket server for IPC
//!
//! Provides request-response communication with the engine loop and push
//! notifications of game events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::catalog::LANGUAGES;
use crate::events::GameEvent;
use crate::state::EngineCommand;

use super::protocol::{
    CatalogEntry, EngineStatus, Notification, Request, Response, MAX_MESSAGE_LEN,
};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State every client handler needs
struct Shared {
    command_tx: mpsc::Sender<EngineCommand>,
    event_tx: broadcast::Sender<GameEvent>,
    start_time: Instant,
}

/// What woke the client loop
enum Wake {
    Request(Result<Request, String>),
    /// An engine-bound request finished
    Reply(Response),
    Event(Result<GameEvent, RecvError>),
    Disconnected,
}

impl Server {
    /// Bind the socket and prepare to serve the engine behind `command_tx`
    pub fn new(
        socket_path: &Path,
        command_tx: mpsc::Sender<EngineCommand>,
        event_tx: broadcast::Sender<GameEvent>,
    ) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shared: Arc::new(Shared {
                command_tx,
                event_tx,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(16);
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let read_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut events: Option<broadcast::Receiver<GameEvent>> = None;

        let result = loop {
            let wake = tokio::select! {
                request = request_rx.recv() => match request {
                    Some(request) => Wake::Request(request),
                    None => Wake::Disconnected,
                },
                Some(response) = reply_rx.recv() => Wake::Reply(response),
                event = Self::next_event(&mut events) => Wake::Event(event),
            };

            let sent = match wake {
                Wake::Disconnected => break Ok(()),
                Wake::Request(Err(reason)) => {
                    warn!(%reason, "malformed request");
                    Self::send_message(&mut writer, &Response::error("invalid_request", reason))
                        .await
                }
                Wake::Request(Ok(request)) => {
                    debug!(?request, "received request");

                    if matches!(request, Request::Subscribe) && events.is_none() {
                        events = Some(shared.event_tx.subscribe());
                        debug!("client subscribed to notifications");
                    }

                    if Self::needs_engine(&request) {
                        // Replies go out in completion order
                        let task_shared = Arc::clone(&shared);
                        let reply_tx = reply_tx.clone();
                        tokio::spawn(async move {
                            let response = Self::process_request(request, &task_shared).await;
                            let _ = reply_tx.send(response);
                        });
                        Ok(())
                    } else {
                        let response = Self::process_request(request, &shared).await;
                        Self::send_message(&mut writer, &response).await
                    }
                }
                Wake::Reply(response) => Self::send_message(&mut writer, &response).await,
                Wake::Event(Ok(event)) => {
                    Self::send_message(&mut writer, &Notification::Event { event }).await
                }
                Wake::Event(Err(RecvError::Lagged(n))) => {
                    warn!(skipped = n, "subscriber lagged, events dropped");
                    Ok(())
                }
                Wake::Event(Err(RecvError::Closed)) => {
                    events = None;
                    Ok(())
                }
            };

            if let Err(e) = sent {
                break Err(e);
            }
        };

        read_task.abort();
        result
    }

    /// Read length-prefixed requests until the client goes away
    async fn read_requests(
        mut reader: OwnedReadHalf,
        request_tx: mpsc::Sender<Result<Request, String>>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // 4-byte little-endian length
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            let request = serde_json::from_slice(&msg_buf).map_err(|e| e.to_string());
            if request_tx.send(request).await.is_err() {
                return Ok(());
            }
        }
    }

    async fn next_event(
        events: &mut Option<broadcast::Receiver<GameEvent>>,
    ) -> Result<GameEvent, RecvError> {
        match events {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(writer: &mut OwnedWriteHalf, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Requests that wait on the engine loop
    fn needs_engine(request: &Request) -> bool {
        matches!(
            request,
            Request::GetStatus | Request::Act { .. } | Request::GetAudio
        )
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::Subscribe => Response::Subscribed,

            Request::GetCatalog => Response::Catalog {
                entries: LANGUAGES.iter().map(CatalogEntry::from).collect(),
            },

            Request::GetStatus => Self::status(shared)
                .await
                .map(Response::Status)
                .unwrap_or_else(Self::engine_unavailable),

            Request::Act { action } => {
                info!(?action, "action via IPC");
                Self::ask(shared, |reply| EngineCommand::Act { action, reply })
                    .await
                    .map(Response::Outcome)
                    .unwrap_or_else(Self::engine_unavailable)
            }

            Request::GetAudio => Self::ask(shared, |reply| EngineCommand::Audio { reply })
                .await
                .map(|payload| Response::Audio {
                    data: payload.map(|bytes| STANDARD.encode(bytes)),
                })
                .unwrap_or_else(Self::engine_unavailable),
        }
    }

    async fn status(shared: &Shared) -> Result<EngineStatus> {
        let game = Self::ask(shared, |reply| EngineCommand::Snapshot { reply }).await?;
        let audio_context = Self::ask(shared, |reply| EngineCommand::AudioContext { reply }).await?;

        Ok(EngineStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: shared.start_time.elapsed().as_secs(),
            audio_context,
            game,
        })
    }

    /// Send a command to the engine loop and wait for its reply
    async fn ask<T>(
        shared: &Shared,
        command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        shared
            .command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| anyhow!("engine loop is not running"))?;
        reply_rx.await.context("engine dropped the request")
    }

    fn engine_unavailable(e: anyhow::Error) -> Response {
        error!(?e, "engine request failed");
        Response::error("engine_unavailable", e.to_string())
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioEngine, PacedSink};
    use crate::content::fixture::FixtureProvider;
    use crate::round::{RoundSelector, SystemClock};
    use crate::state::{Action, GameMachine, GameMode};
    use std::time::Duration;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;

    struct Running {
        server: Arc<Server>,
        client: UnixStream,
        _dir: tempfile::TempDir,
    }

    async fn start() -> Running {
        start_with(FixtureProvider::default()).await
    }

    async fn start_with(provider: FixtureProvider) -> Running {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("engine.sock");

        let provider = Arc::new(provider);
        let selector = RoundSelector::new(
            provider.clone(),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        )
        .with_rng(StdRng::seed_from_u64(1));
        let audio = Arc::new(AudioEngine::new(Arc::new(PacedSink)));
        let (event_tx, _) = broadcast::channel(64);
        let (command_tx, command_rx) = mpsc::channel(8);

        let mut machine = GameMachine::new(selector, provider, audio, event_tx.clone());
        tokio::spawn(async move { machine.run(command_rx).await });

        let server = Arc::new(Server::new(&socket_path, command_tx, event_tx).unwrap());
        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        let client = UnixStream::connect(&socket_path).await.unwrap();
        Running {
            server,
            client,
            _dir: dir,
        }
    }

    async fn send(client: &mut UnixStream, body: &[u8]) {
        client
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        client.write_all(body).await.unwrap();
    }

    async fn request(client: &mut UnixStream, request: &Request) {
        send(client, &serde_json::to_vec(request).unwrap()).await;
    }

    async fn read(client: &mut UnixStream) -> Value {
        let mut len_buf = [0u8; 4];
        client.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        client.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let mut running = start().await;
        request(&mut running.client, &Request::Ping).await;
        assert_eq!(read(&mut running.client).await["type"], "pong");
    }

    #[tokio::test]
    async fn test_socket_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let running = start().await;
        let mode = std::fs::metadata(&running.server.socket_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_status_reports_home() {
        let mut running = start().await;
        request(&mut running.client, &Request::GetStatus).await;

        let reply = read(&mut running.client).await;
        assert_eq!(reply["type"], "status");
        assert_eq!(reply["game"]["mode"], "home");
        assert!(reply["audio_context"].is_null());
    }

    #[tokio::test]
    async fn test_action_round_trip() {
        let mut running = start().await;
        request(
            &mut running.client,
            &Request::Act {
                action: Action::ChooseRandom,
            },
        )
        .await;

        let reply: Response = serde_json::from_value(read(&mut running.client).await).unwrap();
        match reply {
            Response::Outcome(outcome) => {
                assert_eq!(outcome.notice, None);
                assert_eq!(outcome.snapshot.mode, GameMode::Playing);
            }
            other => panic!("unexpected response {other:?}"),
        }

        request(&mut running.client, &Request::GetAudio).await;
        let reply = read(&mut running.client).await;
        assert_eq!(reply["type"], "audio");
        assert!(reply["data"].is_string());
    }

    #[tokio::test]
    async fn test_unavailable_action_reports_notice() {
        let mut running = start().await;
        request(
            &mut running.client,
            &Request::Act {
                action: Action::RequestHint,
            },
        )
        .await;

        let reply = read(&mut running.client).await;
        assert_eq!(reply["type"], "outcome");
        assert_eq!(reply["notice"]["notice"], "not_available");
        assert_eq!(reply["notice"]["mode"], "home");
    }

    #[tokio::test]
    async fn test_slow_clue_does_not_hold_back_other_requests() {
        let mut running = start_with(FixtureProvider {
            clue_delay: Duration::from_millis(400),
            ..Default::default()
        })
        .await;

        request(
            &mut running.client,
            &Request::Act {
                action: Action::ChooseRandom,
            },
        )
        .await;
        assert_eq!(read(&mut running.client).await["snapshot"]["mode"], "playing");

        request(
            &mut running.client,
            &Request::Act {
                action: Action::AskClue {
                    question: "Is it warm there?".to_string(),
                },
            },
        )
        .await;
        request(
            &mut running.client,
            &Request::Act {
                action: Action::RequestHint,
            },
        )
        .await;
        request(&mut running.client, &Request::Ping).await;

        let mut order = Vec::new();
        for _ in 0..3 {
            let msg = read(&mut running.client).await;
            let kind = match msg["type"].as_str() {
                Some("pong") => "pong",
                Some("outcome") if msg["snapshot"]["clues"].as_array().unwrap().is_empty() => {
                    assert_eq!(msg["snapshot"]["hints_remaining"], 2);
                    "hint"
                }
                Some("outcome") => "clue",
                other => panic!("unexpected message {other:?}"),
            };
            order.push(kind);
        }

        assert_eq!(order[2], "clue");
        assert!(order.contains(&"hint"));
        assert!(order.contains(&"pong"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let mut running = start().await;
        request(&mut running.client, &Request::Subscribe).await;
        assert_eq!(read(&mut running.client).await["type"], "subscribed");

        request(
            &mut running.client,
            &Request::Act {
                action: Action::OpenSettings,
            },
        )
        .await;

        let mut saw_event = false;
        let mut saw_outcome = false;
        for _ in 0..2 {
            let msg = read(&mut running.client).await;
            match msg["type"].as_str() {
                Some("event") => {
                    assert_eq!(msg["event"]["type"], "mode_changed");
                    assert_eq!(msg["event"]["to"], "settings");
                    saw_event = true;
                }
                Some("outcome") => saw_outcome = true,
                other => panic!("unexpected message {other:?}"),
            }
        }
        assert!(saw_event && saw_outcome);
    }

    #[tokio::test]
    async fn test_malformed_request_keeps_connection() {
        let mut running = start().await;
        send(&mut running.client, br#"{"type":"dance"}"#).await;

        let reply = read(&mut running.client).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["code"], "invalid_request");

        request(&mut running.client, &Request::Ping).await;
        assert_eq!(read(&mut running.client).await["type"], "pong");
    }

    #[tokio::test]
    async fn test_catalog_lists_languages() {
        let mut running = start().await;
        request(&mut running.client, &Request::GetCatalog).await;

        let reply = read(&mut running.client).await;
        assert_eq!(reply["entries"].as_array().unwrap().len(), LANGUAGES.len());
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let running = start().await;
        running.server.shutdown().await;
        assert!(!running.server.socket_path.exists());
    }
}
