use async_trait::async_trait;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use subscription::{Connection, Error, ErrorKind};
use tokio::sync::Mutex;

/// Write half of an upgraded websocket. Writes and closes are serialized by the mutex, since
/// the streaming loop and shutdown may both reach for the socket.
pub(crate) struct WsConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsConnection {
    pub(crate) fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn write(&self, message: String) -> Result<(), Error> {
        self.sink
            .lock()
            .await
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| Error::with_source(ErrorKind::Transport, e))
    }

    async fn close(&self, reason: &str) -> Result<(), Error> {
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: reason.to_owned().into(),
        };

        self.sink
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| Error::with_source(ErrorKind::Transport, e))
    }

    async fn close_now(&self) -> Result<(), Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| Error::with_source(ErrorKind::Transport, e))
    }
}
