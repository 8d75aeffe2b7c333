use crate::error::Error;
use crate::frame::{Frame, OpCode};

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    // Builds a Message from a complete (possibly reassembled) data payload
    pub fn from_payload(opcode: OpCode, payload: Vec<u8>) -> Result<Self, Error> {
        match opcode {
            OpCode::Text => Ok(Message::Text(String::from_utf8(payload)?)),
            OpCode::Binary => Ok(Message::Binary(payload)),
            other => Err(Error::InvalidOpcode(other.as_u8())),
        }
    }

    // The payload bytes, regardless of how the peer framed them
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Splits the message into frames no larger than max_frame_size, the first one
    // carrying the data opcode and the rest using Continue
    pub fn to_frames(self, max_frame_size: usize) -> Vec<Frame> {
        let (opcode, payload) = match self {
            Message::Text(text) => (OpCode::Text, text.into_bytes()),
            Message::Binary(data) => (OpCode::Binary, data),
        };

        if payload.len() <= max_frame_size || max_frame_size == 0 {
            return vec![Frame::new(true, opcode, payload)];
        }

        let chunks = payload.chunks(max_frame_size);
        let total_chunks = chunks.len();

        chunks
            .enumerate()
            .map(|(i, chunk)| {
                let opcode = if i == 0 { opcode } else { OpCode::Continue };
                Frame::new(i == total_chunks - 1, opcode, Vec::from(chunk))
            })
            .collect()
    }
}
