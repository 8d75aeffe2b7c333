use crate::error::Error;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use rand::random;
use sha1::{Digest, Sha1};
use url::Url;

pub(crate) const UUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
pub(crate) const SEC_WEBSOCKET_ACCEPT: &str = "Sec-WebSocket-Accept";

// Builds the upgrade request for a ws:// URL. Also returns host:port, which is
// what the TCP socket connects to.
pub fn construct_http_request(ws_url: &Url, key: &str) -> Result<(String, String), Error> {
    // The default port is needed when the URL is a domain without an explicit one
    let http_port: u16 = match ws_url.scheme() {
        "ws" => 80,
        _ => return Err(Error::InvalidSchemeURL),
    };

    let host = ws_url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or(Error::URLNoHost)?;
    let port = ws_url.port().unwrap_or(http_port);

    // The Host header only carries the port when the URL had one
    let request_host_field = match ws_url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => String::from(host),
    };

    let host_with_port = format!("{}:{}", host, port);

    let request_path = match ws_url.query() {
        Some(query) => format!("{}?{}", ws_url.path(), query),
        None => ws_url.path().to_string(),
    };

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Key: {}\r\nSec-WebSocket-Version: 13\r\n\r\n",
        request_path,
        request_host_field,
        key,
    );

    Ok((request, host_with_port))
}

pub trait ResponseExt {
    fn get_header_value(&self, header_name: &str) -> Option<String>;
}

impl<'h, 'b> ResponseExt for httparse::Response<'h, 'b> {
    fn get_header_value(&self, header_name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(header_name))
            .map(|header| String::from_utf8_lossy(header.value).trim().to_string())
    }
}

pub(crate) fn generate_websocket_accept_value(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(UUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

pub(crate) fn generate_websocket_key() -> String {
    let random_bytes: [u8; 16] = random();
    BASE64_STANDARD.encode(random_bytes)
}
