use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::pipeline::Pipeline;

enum SessionEnd {
    Disconnected,
    Shutdown,
}

/// Owns the world-server connection: connect, receive, reconnect, forever.
///
/// Every inbound text frame becomes its own turn task; the receive loop
/// never waits for a turn to finish. Disconnects of any kind lead back to
/// a fixed-delay reconnect; only the shutdown flag ends the loop.
pub struct ConnectionSupervisor {
    ws_url: String,
    reconnect_delay: Duration,
    pipeline: Arc<Pipeline>,
    outbound: flume::Receiver<String>,
    shutdown: tokio::sync::watch::Receiver<bool>,
    turns: JoinSet<()>,
}

impl ConnectionSupervisor {
    pub fn new(
        ws_url: String,
        reconnect_delay: Duration,
        pipeline: Arc<Pipeline>,
        outbound: flume::Receiver<String>,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Self {
        Self {
            ws_url,
            reconnect_delay,
            pipeline,
            outbound,
            shutdown,
            turns: JoinSet::new(),
        }
    }

    /// Run until shutdown. There is no retry ceiling and no backoff: every
    /// disconnect is followed by the same fixed delay and another attempt.
    pub async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                self.turns.shutdown().await;
                return;
            }

            tracing::info!("Connecting to world server at {}", self.ws_url);
            match self.session().await {
                Ok(SessionEnd::Shutdown) => return,
                Ok(SessionEnd::Disconnected) => {
                    tracing::warn!(
                        "World server connection closed; retrying in {}s",
                        self.reconnect_delay.as_secs()
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "World server connection error: {:#}; retrying in {}s",
                        e,
                        self.reconnect_delay.as_secs()
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        self.turns.shutdown().await;
                        return;
                    }
                }
            }
        }
    }

    /// One connected session. In-flight turn tasks survive a disconnect;
    /// they only get abandoned on shutdown.
    async fn session(&mut self) -> Result<SessionEnd> {
        let (ws, _) = tokio_tungstenite::connect_async(self.ws_url.as_str())
            .await
            .with_context(|| format!("connect {}", self.ws_url))?;
        tracing::info!("Connected to world server");
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let pipeline = self.pipeline.clone();
                            self.turns.spawn(async move {
                                pipeline.handle_frame(&text).await;
                            });
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Ok(SessionEnd::Disconnected);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(e).context("world server stream error");
                        }
                    }
                }
                Ok(packet) = self.outbound.recv_async() => {
                    sink.send(Message::Text(packet))
                        .await
                        .context("world server send failed")?;
                }
                Some(result) = self.turns.join_next() => {
                    if let Err(e) = result {
                        tracing::error!("Turn task panicked: {}", e);
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        self.turns.shutdown().await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }
        }
    }
}
