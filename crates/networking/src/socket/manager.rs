//! Connection manager for the real-time auction channel
//!
//! Owns at most one live connection per session. Callers observe
//! [`ChannelState`] instead of catching errors: every transport failure
//! lands in `last_error` and the connection task exits; reconnection is
//! the transport operator's concern, not ours.

use bidhall_core::{AuctionId, RoomEvent};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::wire;

const SOCKET_URL: &str = "wss://krystal-solutional-cherish.ngrok-free.dev";

/// Capacity of the broadcast channel fanning events out to rooms
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the outbound command queue
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Transport-level connection state, observed rather than thrown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelState {
    pub connected: bool,
    pub last_error: Option<String>,
}

impl ChannelState {
    fn connected() -> Self {
        ChannelState {
            connected: true,
            last_error: None,
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        ChannelState {
            connected: false,
            last_error: Some(reason.into()),
        }
    }

    fn closed() -> Self {
        ChannelState {
            connected: false,
            last_error: None,
        }
    }
}

/// Configuration for the channel connection
#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub url: String,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            url: SOCKET_URL.to_string(),
        }
    }
}

/// Outbound room membership command
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    Join(AuctionId),
    Leave(AuctionId),
}

/// Handle to the session's single channel connection
///
/// Dropping the handle (or calling [`close`](Self::close)) cancels the
/// connection task and closes the socket, on every exit path.
pub struct SocketHandle {
    state_rx: watch::Receiver<ChannelState>,
    command_tx: mpsc::Sender<RoomCommand>,
    events_tx: broadcast::Sender<RoomEvent>,
    cancel: CancellationToken,
}

impl SocketHandle {
    /// Current connection state
    pub fn state(&self) -> ChannelState {
        self.state_rx.borrow().clone()
    }

    /// Watch the connection state (rooms defer joins on this)
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().connected
    }

    /// Subscribe to the normalized room event stream
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events_tx.subscribe()
    }

    /// Sender for join/leave commands
    pub fn commands(&self) -> mpsc::Sender<RoomCommand> {
        self.command_tx.clone()
    }

    /// Tear the connection down
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Open the session's channel connection
///
/// With no credential, no connection attempt is made: the returned handle
/// reports `{connected: false, last_error: "no credential"}` and stays
/// inert, which downstream rooms treat as "do not join yet".
pub fn connect(config: &SocketConfig, credential: Option<&str>) -> SocketHandle {
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let Some(credential) = credential else {
        warn!("No credential available, not connecting to auction channel");
        let (state_tx, state_rx) = watch::channel(ChannelState::failed("no credential"));
        drop(state_tx);
        return SocketHandle {
            state_rx,
            command_tx,
            events_tx,
            cancel,
        };
    };

    let (state_tx, state_rx) = watch::channel(ChannelState::default());
    let url = format!("{}/?token={}", config.url.trim_end_matches('/'), credential);

    tokio::spawn(run_connection(
        url,
        state_tx,
        command_rx,
        events_tx.clone(),
        cancel.clone(),
    ));

    SocketHandle {
        state_rx,
        command_tx,
        events_tx,
        cancel,
    }
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// The connection task: one socket, one reader, one command drain
async fn run_connection(
    url: String,
    state_tx: watch::Sender<ChannelState>,
    mut command_rx: mpsc::Receiver<RoomCommand>,
    events_tx: broadcast::Sender<RoomEvent>,
    cancel: CancellationToken,
) {
    let (ws_stream, _response) = match connect_async(&url).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Channel connection failed: {}", e);
            let _ = state_tx.send(ChannelState::failed(e.to_string()));
            return;
        }
    };

    info!("Connected to auction channel");
    let _ = state_tx.send(ChannelState::connected());

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Channel cancelled, closing socket");
                let _ = write.send(Message::Close(None)).await;
                let _ = state_tx.send(ChannelState::closed());
                break;
            }
            command = command_rx.recv() => {
                match command {
                    Some(command) => {
                        if let Err(e) = send_command(&mut write, &command).await {
                            warn!("Failed to send {:?}: {}", command, e);
                            let _ = state_tx.send(ChannelState::failed(e.to_string()));
                            break;
                        }
                    }
                    // All command senders dropped: the session is over
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        let _ = state_tx.send(ChannelState::closed());
                        break;
                    }
                }
            }
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match wire::decode_frame(&text) {
                            Ok(Some(event)) => {
                                // No receivers just means no room is mounted
                                let _ = events_tx.send(event);
                            }
                            Ok(None) => {}
                            Err(e) => warn!("Dropping malformed frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Server closed the channel");
                        let _ = state_tx.send(ChannelState::failed("server closed the connection"));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Channel read error: {}", e);
                        let _ = state_tx.send(ChannelState::failed(e.to_string()));
                        break;
                    }
                    None => {
                        let _ = state_tx.send(ChannelState::failed("connection lost"));
                        break;
                    }
                }
            }
        }
    }
}

async fn send_command(
    write: &mut WsSink,
    command: &RoomCommand,
) -> std::result::Result<(), tokio_tungstenite::tungstenite::Error> {
    let frames = match command {
        RoomCommand::Join(id) => {
            debug!("Joining auction room: {}", id);
            wire::join_frames(id).to_vec()
        }
        RoomCommand::Leave(id) => {
            debug!("Leaving auction room: {}", id);
            vec![wire::leave_frame(id)]
        }
    };

    for frame in frames {
        match frame.encode() {
            Ok(json) => write.send(Message::Text(json)).await?,
            Err(e) => warn!("Failed to encode {} frame: {}", frame.event, e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_credential_means_no_connection() {
        let handle = connect(&SocketConfig::default(), None);
        let state = handle.state();
        assert!(!state.connected);
        assert_eq!(state.last_error.as_deref(), Some("no credential"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let handle = connect(&SocketConfig::default(), None);
        handle.close();
        handle.close();
        assert!(!handle.is_connected());
    }
}
