use crate::types::{BridgeCommand, BridgeEvent};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

/// How long a request waits for its acknowledgement.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to connect to bridge: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("bridge connection closed")]
    Closed,
    #[error("bridge rejected {command}: {reason}")]
    Rejected { command: &'static str, reason: String },
    #[error("bridge did not acknowledge {0} in time")]
    Timeout(&'static str),
    #[error("bridge command queue is full")]
    Busy,
}

type AckResult = Result<serde_json::Value, String>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<AckResult>>>>;

/// Handle to a WebSocket room bridge. Cheap to clone; every clone talks to the
/// same connection.
#[derive(Clone)]
pub struct BridgeClient {
    commands: mpsc::Sender<BridgeCommand>,
    pending: Pending,
    next_id: Arc<AtomicU64>,
}

pub type BridgeEvents = mpsc::Receiver<BridgeEvent>;

/// Opens the bridge socket and starts the reader and writer tasks.
///
/// Acknowledgements are routed to the request that asked for them; every
/// other frame is forwarded, in order, on the returned receiver. The receiver
/// closes when the socket does.
pub async fn connect(
    url: &str,
    capacity: usize,
) -> Result<(BridgeClient, BridgeEvents), BridgeError> {
    let (ws_stream, _) = connect_async(url).await?;
    tracing::info!("connected to room bridge at {}", url);
    let (mut write, mut read) = ws_stream.split();

    let (c_tx, mut c_rx) = mpsc::channel::<BridgeCommand>(capacity);
    let (e_tx, e_rx) = mpsc::channel(capacity);
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(async move {
        while let Some(command) = c_rx.recv().await {
            match serde_json::to_string(&command) {
                Ok(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::error!("failed to send bridge command: {}", e);
                        break;
                    }
                }
                Err(e) => tracing::error!("failed to serialize bridge command: {}", e),
            }
        }
        let _ = write.close().await;
    });

    let acks = pending.clone();
    tokio::spawn(async move {
        while let Some(message) = read.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!("failed to read from bridge: {}", e);
                    break;
                }
            };
            match message {
                Message::Text(text) => match serde_json::from_str::<BridgeEvent>(&text) {
                    Ok(BridgeEvent::Ack {
                        id,
                        ok,
                        error,
                        data,
                    }) => {
                        let waiter = acks
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&id);
                        let result = if ok {
                            Ok(data)
                        } else {
                            Err(error.unwrap_or_else(|| "no reason given".to_string()))
                        };
                        match waiter {
                            Some(waiter) => {
                                let _ = waiter.send(result);
                            }
                            None => tracing::warn!("ack for unknown request {}", id),
                        }
                    }
                    Ok(event) => {
                        if e_tx.send(event).await.is_err() {
                            tracing::debug!("bridge event receiver dropped");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to deserialize bridge event: {}, text=> {:?}",
                            e,
                            text
                        );
                    }
                },
                Message::Binary(bin) => {
                    tracing::warn!("unexpected binary frame from bridge ({} bytes)", bin.len());
                }
                Message::Close(reason) => {
                    tracing::info!("bridge closed the connection: {:?}", reason);
                    break;
                }
                _ => {}
            }
        }
        // Anyone still waiting gets `Closed`.
        acks.lock().unwrap_or_else(PoisonError::into_inner).clear();
    });

    let client = BridgeClient {
        commands: c_tx,
        pending,
        next_id: Arc::new(AtomicU64::new(1)),
    };
    Ok((client, e_rx))
}

impl BridgeClient {
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Sends a command that expects an acknowledgement and waits for it.
    /// Returns the acknowledgement's `data` payload.
    pub async fn request(
        &self,
        name: &'static str,
        command: BridgeCommand,
    ) -> Result<serde_json::Value, BridgeError> {
        let Some(id) = command.id() else {
            self.send(command).await?;
            return Ok(serde_json::Value::Null);
        };
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        if let Err(e) = self.send(command).await {
            self.forget(id);
            return Err(e);
        }

        match tokio::time::timeout(ACK_TIMEOUT, rx).await {
            Ok(Ok(Ok(data))) => Ok(data),
            Ok(Ok(Err(reason))) => Err(BridgeError::Rejected {
                command: name,
                reason,
            }),
            Ok(Err(_)) => Err(BridgeError::Closed),
            Err(_) => {
                self.forget(id);
                Err(BridgeError::Timeout(name))
            }
        }
    }

    pub async fn send(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BridgeError::Closed)
    }

    /// Queues a command without waiting, for callers that cannot await.
    pub fn try_send(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BridgeError::Busy,
            mpsc::error::TrySendError::Closed(_) => BridgeError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
