use crate::client::ConnectionState;
use crate::subscription::MessageRouter;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connected session ended
enum SessionEnd {
    Closed,
    Failed,
    Shutdown,
}

/// Connect, route frames, and reconnect after `retry_interval` until shutdown.
pub(crate) async fn run_connection(
    uri: String,
    retry_interval: Duration,
    router: MessageRouter,
    state_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempts: u64 = 0;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        attempts += 1;
        state_tx.send_replace(ConnectionState::Connecting);
        info!(uri = %uri, attempt = attempts, "Connecting to SOS websocket");

        let connected = tokio::select! {
            result = connect_async(uri.as_str()) => result,
            _ = shutdown_rx.changed() => break,
        };

        match connected {
            Ok((stream, _response)) => {
                info!(uri = %uri, "WebSocket connection established");
                state_tx.send_replace(ConnectionState::Open);

                match run_session(stream, &router, &mut shutdown_rx).await {
                    SessionEnd::Closed => {
                        state_tx.send_replace(ConnectionState::Closed);
                    }
                    SessionEnd::Failed => {
                        state_tx.send_replace(ConnectionState::Error);
                    }
                    SessionEnd::Shutdown => break,
                }
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "Failed to connect to SOS websocket");
                state_tx.send_replace(ConnectionState::Error);
            }
        }

        debug!(retry_in = ?retry_interval, "Scheduling reconnect");
        tokio::select! {
            _ = tokio::time::sleep(retry_interval) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    state_tx.send_replace(ConnectionState::Closed);
    info!(uri = %uri, "SOS websocket client stopped");
}

async fn run_session(
    mut stream: WsStream,
    router: &MessageRouter,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        router.handle_text(text.as_str());
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            router.handle_text(text);
                        }
                        Err(_) => {
                            warn!(len = bytes.len(), "Dropping non UTF-8 binary frame");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "WebSocket closed by server");
                        return SessionEnd::Closed;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        return SessionEnd::Failed;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        return SessionEnd::Closed;
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if stream.send(Message::Close(None)).await.is_err() {
                    debug!("Close frame not delivered");
                }
                return SessionEnd::Shutdown;
            }
        }
    }
}
