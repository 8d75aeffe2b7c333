use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::{Frame, CLOSE_NORMAL};
use crate::message::Message;
use crate::write::Writer;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Receiving half of a connection, yielding every complete data message.
///
/// The stream ends after the server closed the connection, or right after an
/// `Err` item when reading failed.
pub struct WSReader {
    read_rx: ReceiverStream<Result<Message, Error>>,
    read_task: JoinHandle<()>,
}

impl WSReader {
    pub fn new(read_rx: ReceiverStream<Result<Message, Error>>, read_task: JoinHandle<()>) -> Self {
        Self { read_rx, read_task }
    }
}

impl Stream for WSReader {
    type Item = Result<Message, Error>;
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.read_rx).poll_next(cx)
    }
}

// The task reading the socket lives as long as this half, otherwise a silent server
// would keep it parked on the socket forever
impl Drop for WSReader {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

/// Sending half of a connection. Clones share the same socket.
#[derive(Clone)]
pub struct WSWriter {
    writer: Arc<Mutex<Writer>>,
    web_socket_config: WebSocketConfig,
}

impl WSWriter {
    pub fn new(writer: Arc<Mutex<Writer>>, web_socket_config: WebSocketConfig) -> Self {
        Self {
            writer,
            web_socket_config,
        }
    }

    // Starts the closing handshake with a normal closure status
    pub async fn close_connection(&mut self) -> Result<(), Error> {
        self.write_frames(vec![Frame::close(CLOSE_NORMAL)]).await
    }

    pub async fn send_message(&mut self, message: Message) -> Result<(), Error> {
        if message.len() > self.web_socket_config.max_message_size {
            return Err(Error::MaxMessageSize);
        }

        self.write_frames(message.to_frames(self.web_socket_config.max_frame_size))
            .await
    }

    pub async fn send_as_binary(&mut self, data: Vec<u8>) -> Result<(), Error> {
        self.send_message(Message::Binary(data)).await
    }

    pub async fn send_as_text(&mut self, data: String) -> Result<(), Error> {
        self.send_message(Message::Text(data)).await
    }

    // Frames of one message are written under the same lock, so they can't interleave
    // with a pong or a close coming from the reader task
    async fn write_frames(&mut self, frames: Vec<Frame>) -> Result<(), Error> {
        let mut writer = self.writer.lock().await;
        for frame in frames {
            writer.write_frame(frame).await?
        }
        Ok(())
    }
}
