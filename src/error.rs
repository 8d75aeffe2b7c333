use httparse::Error as HttpParseError;
use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;
use tokio::time::error::Elapsed;
use url::ParseError;

#[derive(Error, Debug)]
pub enum Error {
    // General Errors
    #[error("{source}")]
    Timeout {
        #[from]
        source: Elapsed,
    },

    #[error("IO Error happened: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("{source}")]
    FromUtf8Error {
        #[from]
        source: FromUtf8Error,
    },

    #[error("Connection already closed")]
    ConnectionClosed,

    // Handshake Errors
    #[error("Server didn't upgrade the connection, status: {0:?}")]
    NoUpgrade(Option<u16>),

    #[error("Server didn't send a valid Sec-WebSocket-Accept key")]
    InvalidAcceptKey,

    #[error("Incomplete HTTP response")]
    IncompleteHTTPResponse,

    #[error("HTTP response head is larger than {0} bytes")]
    HTTPResponseTooLarge(usize),

    // Framing Errors
    #[error("RSV not zero")]
    RSVNotZero,

    #[error("Control frames must not be fragmented")]
    ControlFramesFragmented,

    #[error("Control frame with invalid payload size, can't be greater than 125")]
    ControlFramePayloadSize,

    #[error("Max frame size reached")]
    MaxFrameSize,

    #[error("Max message size reached")]
    MaxMessageSize,

    // Fragmentation Errors
    #[error("Invalid frame while there is a fragmented message in progress")]
    InvalidFrameFragmentation,

    #[error("Invalid continuation frame: no fragmented message to continue")]
    InvalidContinuationFrame,

    #[error("Invalid Opcode: {0:#x}")]
    InvalidOpcode(u8),

    // URL Errors
    #[error("{source}")]
    URLParseError {
        #[from]
        source: ParseError,
    },

    #[error("Invalid scheme in WebSocket URL, only ws:// is supported")]
    InvalidSchemeURL,

    #[error("URL has no host")]
    URLNoHost,

    #[error("`{0}` is not a host:port address")]
    InvalidAddress(String),

    // Load Errors
    #[error("{batch_size} msg x {n_batches} batches x {expansion_factor} replies overflows the reply quota")]
    LoadTooLarge {
        batch_size: usize,
        n_batches: usize,
        expansion_factor: usize,
    },

    #[error("{source}")]
    HttpParseError {
        #[from]
        source: HttpParseError,
    },

    // Codec Errors
    #[error("Couldn't encode client message: {source}")]
    EncodeError { source: serde_json::Error },

    #[error("Couldn't decode server message: {source}")]
    DecodeError { source: serde_json::Error },
}
