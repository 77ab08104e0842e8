//! RTM websocket source.
//!
//! `spawn` starts a dedicated thread (with its own single-threaded tokio
//! runtime) that dials the websocket and reports the handshake result before
//! the caller gets the channel back. After that the thread owns the socket and
//! the write end of the event channel, and stops (dropping its sender) when the
//! remote closes the socket, a read fails, or the consumer fires the disconnect
//! signal.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::SlackError;
use super::event::{Event, EventChannel, EventSink};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start the source thread for an already-negotiated websocket URL.
///
/// Blocks until the websocket handshake finishes; a failed handshake is
/// returned as an error and no channel is handed out.
pub fn spawn(url: String) -> Result<EventChannel, SlackError> {
    let (channel, sink) = EventChannel::open();
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(), SlackError>>();

    std::thread::Builder::new()
        .name("rtm-source".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(SlackError::Runtime(e)));
                    return;
                }
            };
            runtime.block_on(async move {
                match connect(&url).await {
                    Ok(socket) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        manage_events(socket, sink).await;
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            });
        })?;

    ready_rx
        .blocking_recv()
        .map_err(|_| SlackError::SourceStopped)??;
    Ok(channel)
}

async fn connect(url: &str) -> Result<Socket, SlackError> {
    tracing::info!(url, "connecting to RTM websocket");
    match tokio_tungstenite::connect_async(url).await {
        Ok((socket, _)) => {
            tracing::info!(url, "RTM websocket connection established");
            Ok(socket)
        }
        Err(e) => {
            tracing::warn!(error = %e, "RTM websocket handshake failed");
            Err(e.into())
        }
    }
}

/// Pump websocket frames into the channel until the stream ends.
async fn manage_events(socket: Socket, sink: EventSink) {
    let EventSink {
        events,
        mut disconnect,
    } = sink;
    let (mut writer, mut reader) = socket.split();

    loop {
        tokio::select! {
            _ = &mut disconnect => {
                tracing::info!("disconnect requested; closing RTM websocket");
                if let Err(e) = writer.send(Message::Close(None)).await {
                    tracing::debug!(error = %e, "close frame not delivered");
                }
                break;
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if events.send(Event::parse(&text)).is_err() {
                        tracing::debug!("event consumer gone; stopping source");
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("RTM websocket closed by remote");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "RTM websocket read error, stopping source");
                    let _ = events.send(Event::Error {
                        text: format!("read: {e}"),
                    });
                    break;
                }
            },
        }
    }
}
