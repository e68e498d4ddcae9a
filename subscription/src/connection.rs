use crate::error::{Error, ErrorKind};
use async_trait::async_trait;
use log::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Reason sent to every tracked connection when the server shuts down.
pub const SHUTDOWN_REASON: &str = "server shutting down";

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A live, already accepted duplex transport to one subscriber.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends one text message to the peer.
    async fn write(&self, message: String) -> Result<(), Error>;

    /// Tells the peer the connection is closing normally, with a human readable reason.
    async fn close(&self, reason: &str) -> Result<(), Error>;

    /// Tears the connection down without a closing handshake.
    async fn close_now(&self) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Upper bound for a single write (and for each close during shutdown)
    pub write_timeout: Duration,
    /// How often batched messages are flushed to a connection
    pub batch_period: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(5),
            batch_period: Duration::from_millis(500),
        }
    }
}

/// Serves batched messages to subscriber connections and keeps track of every open
/// connection so they can all be closed on shutdown.
///
/// Its connection lock is independent of the subscription registry's locks and the two are
/// never held together.
pub struct StreamingHandler {
    connections: Mutex<HashMap<ConnectionId, Arc<dyn Connection>>>,
    shutdown_token: CancellationToken,
    settings: StreamSettings,
}

impl StreamingHandler {
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            shutdown_token: CancellationToken::new(),
            settings,
        }
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    pub async fn open_connections(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Writes every batch received on `batches` to `connection` until the stream ends, `cancel`
    /// fires (the peer went away) or the handler shuts down.
    ///
    /// The connection is tracked for the duration of the call. If it is still tracked when the
    /// loop exits it is closed immediately, and any close error is reported together with the
    /// loop's own error. Cancellation is a normal way to end and yields `Ok(())`.
    pub async fn handle_subscription<C>(
        &self,
        connection: Arc<C>,
        cancel: CancellationToken,
        mut batches: mpsc::Receiver<Vec<String>>,
    ) -> Result<(), Error>
    where
        C: Connection + 'static,
    {
        let connection_id = ConnectionId::new();
        {
            let mut connections = self.connections.lock().await;
            if self.shutdown_token.is_cancelled() {
                warn!("Refusing connection {}: handler is shut down", connection_id.as_str());
                return Err(Error::new(ErrorKind::Closed));
            }
            connections.insert(
                connection_id.clone(),
                Arc::clone(&connection) as Arc<dyn Connection>,
            );
            info!(
                "Connection {} opened ({} open)",
                connection_id.as_str(),
                connections.len()
            );
        }

        let served = self
            .serve(connection.as_ref(), &cancel, &mut batches)
            .await;
        if let Err(e) = &served {
            warn!("Connection {} stopped streaming: {e}", connection_id.as_str());
        }

        // Shutdown may already have taken the connection and closed it gracefully
        let tracked = self.connections.lock().await.remove(&connection_id);
        let closed = match tracked {
            Some(_) => connection.close_now().await,
            None => Ok(()),
        };
        info!("Connection {} closed", connection_id.as_str());

        Error::join(served.err().into_iter().chain(closed.err()).collect())
    }

    async fn serve<C: Connection>(
        &self,
        connection: &C,
        cancel: &CancellationToken,
        batches: &mut mpsc::Receiver<Vec<String>>,
    ) -> Result<(), Error> {
        loop {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Connection cancelled by peer");
                    return Ok(());
                }
                _ = self.shutdown_token.cancelled() => return Ok(()),
                batch = batches.recv() => match batch {
                    Some(batch) => batch,
                    None => {
                        debug!("Subscriber stream ended");
                        return Ok(());
                    }
                },
            };

            for message in batch {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Connection cancelled by peer during write");
                        return Ok(());
                    }
                    _ = self.shutdown_token.cancelled() => return Ok(()),
                    written = timeout(self.settings.write_timeout, connection.write(message)) => {
                        match written {
                            Ok(result) => result?,
                            Err(_) => return Err(Error::new(ErrorKind::WriteTimeout)),
                        }
                    }
                }
            }
        }
    }

    /// Closes every tracked connection with [`SHUTDOWN_REASON`] and stops accepting new ones.
    ///
    /// Close failures are collected and returned together. Calling this again is a no-op.
    pub async fn shutdown(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;
        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }
        self.shutdown_token.cancel();

        info!("Shutting down {} streaming connection(s)", connections.len());

        let mut errors = Vec::new();
        for (connection_id, connection) in connections.drain() {
            match timeout(self.settings.write_timeout, connection.close(SHUTDOWN_REASON)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Failed to close connection {}: {e}", connection_id.as_str());
                    errors.push(e);
                }
                Err(_) => {
                    warn!("Timed out closing connection {}", connection_id.as_str());
                    errors.push(Error::new(ErrorKind::WriteTimeout));
                }
            }
        }

        Error::join(errors)
    }
}

impl Default for StreamingHandler {
    fn default() -> Self {
        Self::new(StreamSettings::default())
    }
}

impl Drop for StreamingHandler {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
