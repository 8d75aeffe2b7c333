use crate::error::Error;
use std::time::Duration;
use url::Url;

/// Number of replies the target server emits for every client message.
///
/// This is a property of the server under test, not something the client can
/// derive: a session stops reading once it has counted
/// `batch_size * n_batches * EXPANSION_FACTOR` replies.
pub const EXPANSION_FACTOR: usize = 4;

/// The server endpoint is always served under this path.
pub const WS_PATH: &str = "/ws";

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(1);
pub const DEFAULT_PAYLOAD: &str = "This is a test message";

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub max_frame_size: usize,
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            max_message_size: 64 << 20,
            max_frame_size: 16 << 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub web_socket_config: WebSocketConfig,
    // Bounds TCP connect plus the HTTP upgrade exchange.
    pub handshake_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            web_socket_config: WebSocketConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Pacing and sizing of the traffic every simulated client generates.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub batch_size: usize,
    pub n_batches: usize,
    /// Period between two batches, zero sends batches back-to-back.
    pub wait: Duration,
    pub expansion_factor: usize,
    /// How long an interrupted session waits for the server to finish the close handshake.
    pub close_grace: Duration,
    pub payload: String,
    /// Delay client `i` by `i % 100` milliseconds before it connects.
    pub stagger: bool,
}

impl LoadConfig {
    /// Inbound messages a session expects before it closes the connection itself.
    pub fn quota(&self) -> usize {
        self.batch_size * self.n_batches * self.expansion_factor
    }

    pub fn total_messages(&self) -> usize {
        self.batch_size * self.n_batches
    }

    /// Checks the quota fits in a `usize`, everything derived from it relies on that.
    pub fn validate(&self) -> Result<(), Error> {
        self.batch_size
            .checked_mul(self.n_batches)
            .and_then(|total| total.checked_mul(self.expansion_factor))
            .map(|_| ())
            .ok_or(Error::LoadTooLarge {
                batch_size: self.batch_size,
                n_batches: self.n_batches,
                expansion_factor: self.expansion_factor,
            })
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            batch_size: 10,
            n_batches: 100,
            wait: Duration::from_millis(100),
            expansion_factor: EXPANSION_FACTOR,
            close_grace: DEFAULT_CLOSE_GRACE,
            payload: String::from(DEFAULT_PAYLOAD),
            stagger: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// `host:port` of the server under test.
    pub address: String,
    pub clients: usize,
    pub load: LoadConfig,
    pub client_config: ClientConfig,
}

impl FleetConfig {
    pub fn endpoint(&self) -> Result<Url, Error> {
        endpoint_url(&self.address)
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        FleetConfig {
            address: String::from("localhost:3000"),
            clients: 10,
            load: LoadConfig::default(),
            client_config: ClientConfig::default(),
        }
    }
}

// Builds ws://<address>/ws, refusing anything that would change the host or the path
pub fn endpoint_url(address: &str) -> Result<Url, Error> {
    let url = Url::parse(&format!("ws://{}{}", address, WS_PATH))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::URLNoHost);
    }
    if url.path() != WS_PATH || url.query().is_some() || url.fragment().is_some() {
        return Err(Error::InvalidAddress(String::from(address)));
    }

    Ok(url)
}
