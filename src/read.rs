use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::message::Message;
use crate::write::Writer;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;

// Data frames received so far for a message that isn't complete yet
struct Fragment {
    opcode: OpCode,
    payload: Vec<u8>,
}

pub struct ReadStream<R: AsyncRead + Unpin> {
    read: R,
    fragment: Option<Fragment>,
    read_tx: Sender<Result<Message, Error>>,
    writer: Arc<Mutex<Writer>>,
    config: WebSocketConfig,
}

impl<R: AsyncRead + Unpin> ReadStream<R> {
    pub fn new(
        read: R,
        read_tx: Sender<Result<Message, Error>>,
        writer: Arc<Mutex<Writer>>,
        config: WebSocketConfig,
    ) -> Self {
        Self {
            read,
            fragment: None,
            read_tx,
            writer,
            config,
        }
    }

    // Runs until the stream ends. An error is delivered to the reader as the last item,
    // a Close from the server ends the stream without one.
    pub async fn run(mut self) {
        if let Err(err) = self.poll_messages().await {
            let _ = self.read_tx.send(Err(err)).await;
        }
    }

    async fn poll_messages(&mut self) -> Result<(), Error> {
        loop {
            let frame = read_frame(&mut self.read, self.config.max_frame_size).await?;

            match frame.opcode {
                OpCode::Continue => {
                    let Some(fragment) = self.fragment.as_mut() else {
                        return Err(Error::InvalidContinuationFrame);
                    };
                    if fragment.payload.len() + frame.payload.len() > self.config.max_message_size {
                        return Err(Error::MaxMessageSize);
                    }
                    fragment.payload.extend_from_slice(&frame.payload);

                    if frame.final_fragment {
                        if let Some(Fragment { opcode, payload }) = self.fragment.take() {
                            if !self.deliver(Message::from_payload(opcode, payload)?).await {
                                return Ok(());
                            }
                        }
                    }
                }
                OpCode::Text | OpCode::Binary => {
                    if self.fragment.is_some() {
                        return Err(Error::InvalidFrameFragmentation);
                    }

                    if frame.final_fragment {
                        let message = Message::from_payload(frame.opcode, frame.payload)?;
                        if !self.deliver(message).await {
                            return Ok(());
                        }
                    } else {
                        self.fragment = Some(Fragment {
                            opcode: frame.opcode,
                            payload: frame.payload,
                        });
                    }
                }
                OpCode::Close => {
                    // Echo the status code, if any. The writer skips it when we started the closing.
                    let payload = frame.payload.get(..2).map(Vec::from).unwrap_or_default();
                    self.writer
                        .lock()
                        .await
                        .write_frame(Frame::new(true, OpCode::Close, payload))
                        .await?;
                    return Ok(());
                }
                OpCode::Ping => {
                    self.writer
                        .lock()
                        .await
                        .write_frame(Frame::new(true, OpCode::Pong, frame.payload))
                        .await?
                }
                OpCode::Pong => {}
            }
        }
    }

    // Returns false once nobody is listening anymore
    async fn deliver(&mut self, message: Message) -> bool {
        self.read_tx.send(Ok(message)).await.is_ok()
    }
}

pub(crate) async fn read_frame<R: AsyncRead + Unpin>(
    read: &mut R,
    max_frame_size: usize,
) -> Result<Frame, Error> {
    let mut header = [0u8; 2];

    read.read_exact(&mut header).await?;

    // The first bit in the first byte in the frame tells us whether the current frame is the final fragment of a message
    let final_fragment = (header[0] & 0b10000000) != 0;

    // RSV1, RSV2 and RSV3 are only used by extensions, and we don't negotiate any
    if header[0] & 0b01110000 != 0 {
        return Err(Error::RSVNotZero);
    }

    // The opcode is the last 4 bits of the first byte
    let opcode = OpCode::from(header[0] & 0b00001111)?;

    // Control opcodes (ping, pong, close) can't be fragmented
    if !final_fragment && opcode.is_control() {
        return Err(Error::ControlFramesFragmented);
    }

    // The first bit of the second byte is the mask bit, servers shouldn't set it
    // but we accept masked frames anyway
    let masked = (header[1] & 0b10000000) != 0;

    // The next 7 bits are the payload length, 126 and 127 mean the real length
    // follows in the next 2 or 8 bytes
    let mut length = (header[1] & 0b01111111) as usize;

    if length == 126 {
        let mut be_bytes = [0u8; 2];
        read.read_exact(&mut be_bytes).await?;
        length = u16::from_be_bytes(be_bytes) as usize;
    } else if length == 127 {
        let mut be_bytes = [0u8; 8];
        read.read_exact(&mut be_bytes).await?;
        length = u64::from_be_bytes(be_bytes) as usize;
    }

    if opcode.is_control() && length > 125 {
        return Err(Error::ControlFramePayloadSize);
    }

    if length > max_frame_size {
        return Err(Error::MaxFrameSize);
    }

    let mask = if masked {
        let mut mask = [0u8; 4];
        read.read_exact(&mut mask).await?;
        Some(mask)
    } else {
        None
    };

    let mut payload = vec![0u8; length];
    read.read_exact(&mut payload).await?;

    // Each byte of the payload is XOR'd with the byte (modulo 4) of the masking key
    if let Some(mask) = mask {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
    }

    Ok(Frame {
        final_fragment,
        opcode,
        payload,
    })
}
