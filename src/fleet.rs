use crate::client::ClientSimulation;
use crate::config::FleetConfig;
use crate::error::Error;
use futures::future::join_all;
use log::{error, info};
use std::future::Future;
use std::time::Instant;
use tokio::sync::broadcast;

/// Runs every simulated client of a load run and waits for all of them.
pub struct Fleet {
    config: FleetConfig,
}

impl Fleet {
    pub fn new(config: FleetConfig) -> Self {
        Self { config }
    }

    /// Runs the fleet with Ctrl-C as the interrupt.
    pub async fn run(self) -> Result<(), Error> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for the interrupt signal: {}", err);
                // without a signal there is nothing to wait for
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs the fleet, broadcasting an interrupt to every client once `shutdown` resolves.
    ///
    /// Only an invalid target address or load is an error, failing clients are not.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let endpoint = self.config.endpoint()?;
        self.config.load.validate()?;
        let clients = self.config.clients;
        info!("connecting {} clients to {}", clients, endpoint);

        // Every client subscribes before it's spawned, so each one sees the single
        // interrupt exactly once. Sending never blocks, whatever the clients do.
        let (interrupt_tx, _) = broadcast::channel::<()>(clients.max(1));

        let handles: Vec<_> = (1..=clients)
            .map(|client_id| {
                let client = ClientSimulation::new(
                    client_id,
                    endpoint.clone(),
                    self.config.client_config.clone(),
                    self.config.load.clone(),
                );
                tokio::spawn(client.run(interrupt_tx.subscribe()))
            })
            .collect();

        let interrupter = tokio::spawn(async move {
            shutdown.await;
            info!("Received interrupt");
            // Err only means every client already finished
            let _ = interrupt_tx.send(());
        });

        let start = Instant::now();
        for result in join_all(handles).await {
            if let Err(err) = result {
                error!("client task failed: {}", err);
            }
        }
        interrupter.abort();

        info!(
            "all {} clients finished in {:?}",
            clients,
            start.elapsed()
        );
        Ok(())
    }
}
