use crate::config::{ClientConfig, WebSocketConfig};
use crate::connection::WSConnection;
use crate::error::Error;
use crate::read::ReadStream;
use crate::request::{
    construct_http_request, generate_websocket_accept_value, generate_websocket_key, ResponseExt,
    SEC_WEBSOCKET_ACCEPT,
};
use crate::split::{WSReader, WSWriter};
use crate::write::Writer;
use httparse::Status;
use log::debug;
use std::sync::Arc;
use tokio::io::{
    split, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

// Limit for the response head, a server sending more than this isn't talking websockets
pub(crate) const MAX_RESPONSE_HEAD_SIZE: usize = 16 * 1024;
const MAX_RESPONSE_HEADERS: usize = 32;
// Messages buffered between the reader task and the consumer of WSReader
const READ_CHANNEL_CAPACITY: usize = 1024;

pub async fn connect_async(url: &Url) -> Result<WSConnection, Error> {
    connect_async_with_config(url, &ClientConfig::default()).await
}

// Connects to the server and performs the opening handshake. The TCP connect is
// part of the handshake timeout, so an unreachable or silent server fails the same way.
pub async fn connect_async_with_config(
    url: &Url,
    config: &ClientConfig,
) -> Result<WSConnection, Error> {
    timeout(
        config.handshake_timeout,
        perform_client_handshake(url, config.web_socket_config.clone()),
    )
    .await?
}

async fn perform_client_handshake(
    url: &Url,
    web_socket_config: WebSocketConfig,
) -> Result<WSConnection, Error> {
    let key = generate_websocket_key();
    let (request, host_with_port) = construct_http_request(url, &key)?;

    let stream = TcpStream::connect(&host_with_port).await?;
    // Batches are written message by message, there is no point in Nagle delaying them
    stream.set_nodelay(true)?;

    let (reader, mut write_half) = split(stream);
    let mut buf_reader = BufReader::new(reader);

    write_half.write_all(request.as_bytes()).await?;
    write_half.flush().await?;

    let head = read_response_head(&mut buf_reader).await?;
    verify_response(&head, &key)?;
    debug!("Handshake with {} completed", host_with_port);

    Ok(spawn_connection(buf_reader, write_half, web_socket_config))
}

// The reader task owns the read half. The BufReader is kept as it is, since it may
// already hold the first frames the server sent right after the response.
fn spawn_connection(
    buf_reader: BufReader<ReadHalf<TcpStream>>,
    write_half: WriteHalf<TcpStream>,
    web_socket_config: WebSocketConfig,
) -> WSConnection {
    let writer = Arc::new(Mutex::new(Writer::new(write_half)));
    let (read_tx, read_rx) = mpsc::channel(READ_CHANNEL_CAPACITY);

    let read_stream = ReadStream::new(
        buf_reader,
        read_tx,
        writer.clone(),
        web_socket_config.clone(),
    );
    let read_task = tokio::spawn(read_stream.run());

    WSConnection::new(
        WSReader::new(ReceiverStream::new(read_rx), read_task),
        WSWriter::new(writer, web_socket_config),
    )
}

// Reads the status line and headers, up to and including the empty line
async fn read_response_head<T: AsyncRead + Unpin>(
    buf_reader: &mut BufReader<T>,
) -> Result<Vec<u8>, Error> {
    let mut head = Vec::with_capacity(1024);

    loop {
        // A line never gets past the limit, even when the server doesn't send any newline
        let remaining = (MAX_RESPONSE_HEAD_SIZE + 1 - head.len()) as u64;
        let read = (&mut *buf_reader)
            .take(remaining)
            .read_until(b'\n', &mut head)
            .await?;
        if head.len() > MAX_RESPONSE_HEAD_SIZE {
            return Err(Error::HTTPResponseTooLarge(MAX_RESPONSE_HEAD_SIZE));
        }
        if read == 0 {
            return Err(Error::IncompleteHTTPResponse);
        }
        if head.ends_with(b"\r\n\r\n") || head.ends_with(b"\n\n") {
            return Ok(head);
        }
    }
}

fn verify_response(head: &[u8], key: &str) -> Result<(), Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    if let Status::Partial = response.parse(head)? {
        return Err(Error::IncompleteHTTPResponse);
    }

    if response.code != Some(101) {
        return Err(Error::NoUpgrade(response.code));
    }

    let accept_key = response
        .get_header_value(SEC_WEBSOCKET_ACCEPT)
        .ok_or(Error::InvalidAcceptKey)?;
    if accept_key != generate_websocket_accept_value(key) {
        return Err(Error::InvalidAcceptKey);
    }

    Ok(())
}
