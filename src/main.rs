use clap::Parser;
use log::{error, info};
use socket_load::codec::random_payload;
use socket_load::config::{
    ClientConfig, FleetConfig, LoadConfig, WebSocketConfig, DEFAULT_PAYLOAD, EXPANSION_FACTOR,
};
use socket_load::fleet::Fleet;
use std::process::ExitCode;
use std::time::Duration;

/// WebSockets load generator: many clients sending paced batches and counting the replies
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// host:port of the server, the endpoint is ws://<server>/ws
    #[arg(short, long, default_value = "localhost:3000")]
    server: String,

    /// Number of simultaneous clients
    #[arg(short, long, default_value_t = 10)]
    clients: usize,

    /// Number of messages to send in one batch
    #[arg(short, long, default_value_t = 10)]
    batch_size: usize,

    /// Number of batches
    #[arg(short = 'n', long, default_value_t = 100)]
    batches: usize,

    /// Wait period between batches, in milliseconds
    #[arg(short, long, default_value_t = 100)]
    wait: u64,

    /// Replies the server sends for each message
    #[arg(long, default_value_t = EXPANSION_FACTOR)]
    rcv_factor: usize,

    /// Size of a random message payload, a fixed text is sent when missing
    #[arg(long)]
    msg_size: Option<usize>,

    /// Handshake timeout, in seconds
    #[arg(long, default_value_t = 60)]
    handshake_timeout: u64,

    /// How long an interrupted client waits for the server's close, in milliseconds
    #[arg(long, default_value_t = 1000)]
    close_grace: u64,

    /// Delay each client start by (id % 100) milliseconds
    #[arg(long)]
    stagger: bool,
}

impl Args {
    fn into_config(self) -> FleetConfig {
        let payload = match self.msg_size {
            Some(size) => random_payload(size),
            None => String::from(DEFAULT_PAYLOAD),
        };

        FleetConfig {
            address: self.server,
            clients: self.clients,
            load: LoadConfig {
                batch_size: self.batch_size,
                n_batches: self.batches,
                wait: Duration::from_millis(self.wait),
                expansion_factor: self.rcv_factor,
                close_grace: Duration::from_millis(self.close_grace),
                payload,
                stagger: self.stagger,
            },
            client_config: ClientConfig {
                web_socket_config: WebSocketConfig::default(),
                handshake_timeout: Duration::from_secs(self.handshake_timeout),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = Args::parse().into_config();
    info!(
        "{} clients, {} batches of {} msg every {:?}",
        config.clients, config.load.n_batches, config.load.batch_size, config.load.wait
    );

    match Fleet::new(config).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
