//! Bidirectional relay between an authenticated websocket and its upstream
//! destination.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

const READ_BUF_SIZE: usize = 16 * 1024;

/// Copy bytes both ways until either side closes.
///
/// `initial` is the payload that arrived in the same frame as the handshake;
/// it is written upstream before anything else.
pub async fn run(socket: WebSocket, upstream: TcpStream, initial: Vec<u8>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (mut up_rx, mut up_tx) = upstream.into_split();

    if !initial.is_empty() {
        if let Err(e) = up_tx.write_all(&initial).await {
            debug!("failed to write initial payload upstream: {}", e);
            return;
        }
    }

    // Upstream to client.
    let downstream = tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            match up_rx.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    trace!(n, "forwarding upstream bytes to client");
                    if ws_tx
                        .send(WsMessage::Binary(buf[..n].to_vec()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    debug!("upstream read error: {}", e);
                    break;
                }
            }
        }
        let _ = ws_tx.send(WsMessage::Close(None)).await;
    });

    // Client to upstream.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(WsMessage::Binary(data)) => {
                trace!(n = data.len(), "forwarding client bytes upstream");
                if up_tx.write_all(&data).await.is_err() {
                    break;
                }
            }
            Ok(WsMessage::Close(_)) => {
                debug!("client closed relay");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("websocket error during relay: {}", e);
                break;
            }
        }
    }

    let _ = up_tx.shutdown().await;
    downstream.abort();
}
