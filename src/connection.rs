use crate::split::{WSReader, WSWriter};

/// An open client connection, right after a successful handshake.
pub struct WSConnection {
    reader: WSReader,
    writer: WSWriter,
}

impl WSConnection {
    pub fn new(reader: WSReader, writer: WSWriter) -> Self {
        Self { reader, writer }
    }

    // Reading and writing usually happen in different tasks, so the connection
    // is mostly used through its two halves
    pub fn split(self) -> (WSReader, WSWriter) {
        (self.reader, self.writer)
    }
}
