use crate::client::config::SyncConnectionConfig;
use crate::client::types::{
    reconnect_backoff_secs, ConnectionEvent, ConnectionStatus, TransportError,
    MAX_RECONNECT_ATTEMPTS,
};
use crate::ws::{parse_server_message, ClientMessage, ServerMessage};

use tokio_tungstenite::tungstenite;

/// How long to wait for the server's `ready` after `hello`.
const HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// WebSocket transport for the tab registry channel.
///
/// Owns one background task that connects, performs the hello/ready
/// handshake, forwards outbound messages and reports inbound ones as
/// [`ConnectionEvent`]s. Transient failures reconnect with backoff.
pub struct SyncConnection {
    config: SyncConnectionConfig,
    status: ConnectionStatus,
    runtime: tokio::runtime::Handle,
    ws_tx: Option<async_channel::Sender<ClientMessage>>,
    event_tx: async_channel::Sender<ConnectionEvent>,
    abort_handle: Option<tokio::task::AbortHandle>,
}

impl SyncConnection {
    pub fn new(
        config: SyncConnectionConfig,
        runtime: tokio::runtime::Handle,
        event_tx: async_channel::Sender<ConnectionEvent>,
    ) -> Self {
        Self {
            config,
            status: ConnectionStatus::Disconnected,
            runtime,
            ws_tx: None,
            event_tx,
            abort_handle: None,
        }
    }

    pub fn config(&self) -> &SyncConnectionConfig {
        &self.config
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Sender for outbound messages, if connected or connecting.
    pub fn sender(&self) -> Option<&async_channel::Sender<ClientMessage>> {
        self.ws_tx.as_ref()
    }

    /// Start the connection task and return the outbound sender.
    ///
    /// Messages queued while the socket is down are flushed after the next
    /// successful handshake.
    pub fn connect(&mut self) -> async_channel::Sender<ClientMessage> {
        self.disconnect();
        self.status = ConnectionStatus::Connecting;

        let (ws_tx, ws_rx) = async_channel::bounded::<ClientMessage>(256);
        self.ws_tx = Some(ws_tx.clone());

        let config = self.config.clone();
        let event_tx = self.event_tx.clone();
        let task = self.runtime.spawn(async move {
            let _ = event_tx
                .send(ConnectionEvent::StatusChanged(ConnectionStatus::Connecting))
                .await;
            Self::run_ws_loop(config, event_tx, ws_rx).await;
        });
        self.abort_handle = Some(task.abort_handle());

        ws_tx
    }

    /// Stop the connection task and close the outbound channel.
    pub fn disconnect(&mut self) {
        if let Some(handle) = self.abort_handle.take() {
            handle.abort();
        }
        if let Some(tx) = self.ws_tx.take() {
            tx.close();
        }
        self.status = ConnectionStatus::Disconnected;
    }

    /// Run sessions back to back, reconnecting on transient failures.
    async fn run_ws_loop(
        config: SyncConnectionConfig,
        event_tx: async_channel::Sender<ConnectionEvent>,
        ws_rx: async_channel::Receiver<ClientMessage>,
    ) {
        let mut reconnect_attempt: u32 = 0;

        loop {
            match Self::ws_session(&config, &event_tx, &ws_rx, &mut reconnect_attempt).await {
                Ok(()) => {
                    log::info!("Sync socket to {} closed by client", config.url);
                    let _ = event_tx
                        .send(ConnectionEvent::StatusChanged(ConnectionStatus::Disconnected))
                        .await;
                    break;
                }
                Err(TransportError::Auth(msg)) => {
                    log::warn!("Sync server {} rejected credentials: {}", config.url, msg);
                    let _ = event_tx
                        .send(ConnectionEvent::StatusChanged(ConnectionStatus::Error(msg)))
                        .await;
                    break;
                }
                Err(TransportError::Transient(e)) => {
                    reconnect_attempt += 1;

                    if reconnect_attempt > MAX_RECONNECT_ATTEMPTS {
                        let msg = format!(
                            "Connection lost after {} attempts (last error: {})",
                            MAX_RECONNECT_ATTEMPTS, e
                        );
                        log::error!("{}", msg);
                        let _ = event_tx
                            .send(ConnectionEvent::StatusChanged(ConnectionStatus::Error(msg)))
                            .await;
                        break;
                    }

                    let backoff = reconnect_backoff_secs(reconnect_attempt);
                    log::warn!(
                        "Sync socket to {} lost: {}. Reconnecting in {}s (attempt {}/{})",
                        config.url,
                        e,
                        backoff,
                        reconnect_attempt,
                        MAX_RECONNECT_ATTEMPTS
                    );
                    let _ = event_tx
                        .send(ConnectionEvent::StatusChanged(ConnectionStatus::Reconnecting {
                            attempt: reconnect_attempt,
                        }))
                        .await;

                    tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                }
            }
        }
    }

    /// A single socket session. Returns Ok(()) when the outbound channel is
    /// closed by the owner, Err on failure.
    async fn ws_session(
        config: &SyncConnectionConfig,
        event_tx: &async_channel::Sender<ConnectionEvent>,
        ws_rx: &async_channel::Receiver<ClientMessage>,
        reconnect_attempt: &mut u32,
    ) -> Result<(), TransportError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(config.url.as_str())
            .await
            .map_err(|e| TransportError::Transient(format!("WebSocket connect failed: {}", e)))?;

        let (mut ws_write, mut ws_read) = futures::StreamExt::split(ws_stream);

        // Step 1: hello
        let hello = ClientMessage::Hello {
            token: config.token.clone(),
            device_id: config.device_id.clone(),
        };
        let hello_json = serde_json::to_string(&hello)
            .map_err(|e| TransportError::Transient(format!("Failed to encode hello: {}", e)))?;
        futures::SinkExt::send(&mut ws_write, tungstenite::Message::Text(hello_json.into()))
            .await
            .map_err(|e| TransportError::Transient(format!("Failed to send hello: {}", e)))?;

        // Step 2: wait for ready
        let server_instance_id = tokio::time::timeout(
            std::time::Duration::from_secs(HANDSHAKE_TIMEOUT_SECS),
            async {
                loop {
                    let frame = futures::StreamExt::next(&mut ws_read)
                        .await
                        .ok_or_else(|| {
                            TransportError::Transient(
                                "WebSocket closed before ready".to_string(),
                            )
                        })?
                        .map_err(|e| {
                            TransportError::Transient(format!("WebSocket read error: {}", e))
                        })?;
                    let tungstenite::Message::Text(text) = frame else {
                        continue;
                    };
                    match parse_server_message(&text) {
                        Some(ServerMessage::Ready { server_instance_id }) => {
                            return Ok(server_instance_id);
                        }
                        Some(ServerMessage::Error { code, message }) if code == "NOT_AUTHENTICATED" => {
                            return Err(TransportError::Auth(message));
                        }
                        Some(other) => {
                            log::debug!("Ignoring pre-handshake message: {:?}", other);
                        }
                        None => {}
                    }
                }
            },
        )
        .await
        .map_err(|_| TransportError::Transient("Handshake timeout".to_string()))??;

        log::info!(
            "Connected to sync server {} (instance {})",
            config.url,
            server_instance_id
        );
        *reconnect_attempt = 0;
        let _ = event_tx
            .send(ConnectionEvent::StatusChanged(ConnectionStatus::Connected))
            .await;
        let _ = event_tx
            .send(ConnectionEvent::Connected { server_instance_id })
            .await;

        // Step 3: writer task
        let ws_rx_clone = ws_rx.clone();
        let mut writer_handle = tokio::spawn(async move {
            while let Ok(msg) = ws_rx_clone.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        log::warn!("Failed to encode {}: {}", msg.type_name(), e);
                        continue;
                    }
                };
                if let Err(e) =
                    futures::SinkExt::send(&mut ws_write, tungstenite::Message::Text(json.into()))
                        .await
                {
                    log::warn!("Failed to send {}: {}", msg.type_name(), e);
                    return false;
                }
            }
            // Channel closed by owner
            let _ = futures::SinkExt::close(&mut ws_write).await;
            true
        });

        // Step 4: reader loop
        loop {
            tokio::select! {
                writer = &mut writer_handle => {
                    return match writer {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(TransportError::Transient("Writer failed".to_string())),
                        Err(e) => Err(TransportError::Transient(format!("Writer task ended: {}", e))),
                    };
                }
                frame = futures::StreamExt::next(&mut ws_read) => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match parse_server_message(&text) {
                                Some(ServerMessage::Unknown) | None => {}
                                Some(ServerMessage::Error { code, message }) => {
                                    log::warn!("Sync server error {}: {}", code, message);
                                    let _ = event_tx
                                        .send(ConnectionEvent::Message(ServerMessage::Error { code, message }))
                                        .await;
                                }
                                Some(msg) => {
                                    let _ = event_tx.send(ConnectionEvent::Message(msg)).await;
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(_))) => {
                            log::info!("Sync server closed the socket");
                            writer_handle.abort();
                            return Err(TransportError::Transient("Server closed connection".to_string()));
                        }
                        Some(Ok(_)) => {
                            // Binary, ping/pong and raw frames carry nothing for the registry
                        }
                        Some(Err(e)) => {
                            writer_handle.abort();
                            return Err(TransportError::Transient(format!("WebSocket error: {}", e)));
                        }
                        None => {
                            writer_handle.abort();
                            return Err(TransportError::Transient("WebSocket stream ended".to_string()));
                        }
                    }
                }
            }
        }
    }
}

impl Drop for SyncConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_reports_reconnecting() {
        let (event_tx, event_rx) = async_channel::unbounded();
        let mut conn = SyncConnection::new(
            SyncConnectionConfig {
                // Port 9 (discard) on loopback is never a WebSocket server
                url: "ws://127.0.0.1:9/ws".into(),
                device_id: "dev".into(),
                token: None,
            },
            tokio::runtime::Handle::current(),
            event_tx,
        );
        let _tx = conn.connect();
        assert_eq!(conn.status(), &ConnectionStatus::Connecting);

        let mut saw_reconnecting = false;
        for _ in 0..3 {
            match tokio::time::timeout(std::time::Duration::from_secs(5), event_rx.recv()).await {
                Ok(Ok(ConnectionEvent::StatusChanged(ConnectionStatus::Reconnecting { attempt }))) => {
                    assert_eq!(attempt, 1);
                    saw_reconnecting = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_reconnecting);

        conn.disconnect();
        assert_eq!(conn.status(), &ConnectionStatus::Disconnected);
        assert!(conn.sender().is_none());
    }
}
