use crate::error::Error;
use crate::frame::{Frame, OpCode};
use bytes::{BufMut, BytesMut};
use rand::random;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::net::TcpStream;

pub struct Writer {
    write_half: WriteHalf<TcpStream>,
    close_sent: bool,
}

impl Writer {
    pub fn new(write_half: WriteHalf<TcpStream>) -> Self {
        Self {
            write_half,
            close_sent: false,
        }
    }

    // Client frames are always masked with a fresh key. Once a Close frame went out,
    // data frames are refused and control frames are dropped, the peer is not
    // supposed to process anything after it.
    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        if self.close_sent {
            if frame.opcode.is_control() {
                return Ok(());
            }
            return Err(Error::ConnectionClosed);
        }
        if frame.opcode == OpCode::Close {
            self.close_sent = true;
        }

        let encoded = encode_frame(&frame, Some(random::<[u8; 4]>()));
        self.write_half.write_all(&encoded).await?;

        Ok(())
    }
}

// Serializes a frame in a single buffer, so it reaches the socket with one write.
// Servers send frames without mask, that's why the mask is optional.
pub(crate) fn encode_frame(frame: &Frame, mask: Option<[u8; 4]>) -> BytesMut {
    let payload_len = frame.payload.len();
    let mut buf = BytesMut::with_capacity(payload_len + 14);

    // The first byte carries the FIN bit in the MSB and the opcode in the last 4 bits
    buf.put_u8((frame.final_fragment as u8) << 7 | frame.opcode.as_u8());

    let mask_bit = if mask.is_some() { 0b1000_0000 } else { 0 };

    // Lengths up to 125 fit in the second byte, up to 65535 use 2 extra bytes
    // and anything bigger 8 extra bytes, all of them big endian
    if payload_len <= 125 {
        buf.put_u8(mask_bit | payload_len as u8);
    } else if payload_len <= 65535 {
        buf.put_u8(mask_bit | 126);
        buf.put_u16(payload_len as u16);
    } else {
        buf.put_u8(mask_bit | 127);
        buf.put_u64(payload_len as u64);
    }

    match mask {
        Some(mask) => {
            buf.put_slice(&mask);
            buf.extend(
                frame
                    .payload
                    .iter()
                    .enumerate()
                    .map(|(i, byte)| byte ^ mask[i % 4]),
            );
        }
        None => buf.put_slice(&frame.payload),
    }

    buf
}
