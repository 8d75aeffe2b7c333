use crate::config::{ClientConfig, LoadConfig};
use crate::session::{ReceiveOutcome, Session, SendOutcome};
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;
use url::Url;

/// A single simulated client: one connection, driven to completion.
///
/// Failures stay local to the client, they are logged and never reach the fleet.
pub struct ClientSimulation {
    client_id: usize,
    endpoint: Url,
    client_config: ClientConfig,
    load: LoadConfig,
}

impl ClientSimulation {
    pub fn new(
        client_id: usize,
        endpoint: Url,
        client_config: ClientConfig,
        load: LoadConfig,
    ) -> Self {
        Self {
            client_id,
            endpoint,
            client_config,
            load,
        }
    }

    pub async fn run(self, mut interrupt: broadcast::Receiver<()>) {
        let ClientSimulation {
            client_id,
            endpoint,
            client_config,
            load,
        } = self;
        let total_messages = load.total_messages();
        let stagger = load.stagger;

        let open = async {
            if stagger {
                // Spread the clients so they don't tick in lockstep
                sleep(Duration::from_millis(client_id as u64 % 100)).await;
            }
            Session::open(client_id, &endpoint, &client_config, load).await
        };

        // An interrupt during a slow handshake drops the half-open connection
        let session = tokio::select! {
            biased;
            _ = interrupted(&mut interrupt) => {
                info!("client {}: stopped by interrupt before connecting", client_id);
                return;
            }
            opened = open => match opened {
                Ok(session) => session,
                Err(err) => {
                    error!("client {}: dial: {}", client_id, err);
                    return;
                }
            },
        };

        let report = session.run(interrupt).await;

        match (report.send, report.receive) {
            (SendOutcome::Exhausted, Some(ReceiveOutcome::QuotaReached)) => info!(
                "client {}: finished, sent {}/{} msg in {} batches, received {} msg",
                report.client_id, report.sent, total_messages, report.batches, report.received
            ),
            (SendOutcome::Interrupted, _) => info!(
                "client {}: stopped by interrupt, sent {}/{} msg, received {} msg",
                report.client_id, report.sent, total_messages, report.received
            ),
            _ => warn!(
                "client {}: ended early ({:?}/{:?}), sent {}/{} msg, received {} msg",
                report.client_id,
                report.send,
                report.receive,
                report.sent,
                total_messages,
                report.received
            ),
        }
        debug!("client {}: done", client_id);
    }
}

// Resolves on the fleet interrupt. A dropped sender never fires, so it pends forever.
async fn interrupted(interrupt: &mut broadcast::Receiver<()>) {
    if let Err(RecvError::Closed) = interrupt.recv().await {
        std::future::pending::<()>().await;
    }
}
