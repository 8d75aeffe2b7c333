//! One simulated client connection: a paced send path and a counting receive
//! path running concurrently over the same WebSocket.
//!
//! The receive path runs in its own task and publishes its progress through a
//! `watch` channel. The send path checks that channel at every tick boundary,
//! so it stops early once the receive path is done, and waits on it after the
//! last batch so every expected reply is drained before the session returns.

use crate::codec::{decode_server_message, encode_client_message, ClientMessage};
use crate::config::{ClientConfig, LoadConfig};
use crate::error::Error;
use crate::handshake::connect_async_with_config;
use crate::split::{WSReader, WSWriter};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, timeout, Interval, MissedTickBehavior};
use url::Url;

/// How the receive path of a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Counted every expected reply and started the close handshake.
    QuotaReached,
    /// The server closed the connection.
    StreamEnded,
    ReadFailed,
    DecodeFailed,
}

/// How the send path of a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Sent every batch, then waited for the receive path.
    Exhausted,
    /// Stopped at a tick boundary because the receive path was already done.
    ReceiverDone,
    Interrupted,
    WriteFailed,
}

#[derive(Debug, Clone, Copy, Default)]
struct ReceiveProgress {
    received: usize,
    outcome: Option<ReceiveOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub client_id: usize,
    pub sent: usize,
    pub batches: usize,
    pub received: usize,
    pub send: SendOutcome,
    /// `None` when the receive path had to be aborted.
    pub receive: Option<ReceiveOutcome>,
}

pub struct Session {
    client_id: usize,
    config: LoadConfig,
    reader: WSReader,
    writer: WSWriter,
}

impl Session {
    pub async fn open(
        client_id: usize,
        endpoint: &Url,
        client_config: &ClientConfig,
        config: LoadConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let connection = connect_async_with_config(endpoint, client_config).await?;
        let (reader, writer) = connection.split();
        debug!("client {}: connected to {}", client_id, endpoint);

        Ok(Self {
            client_id,
            config,
            reader,
            writer,
        })
    }

    /// Drives the connection until both paths are over. `interrupt` is this
    /// client's subscription to the fleet-wide shutdown signal.
    pub async fn run(self, interrupt: broadcast::Receiver<()>) -> SessionReport {
        let Session {
            client_id,
            config,
            reader,
            writer,
        } = self;

        let (progress_tx, progress_rx) = watch::channel(ReceiveProgress::default());
        let receiver = tokio::spawn(receive(
            client_id,
            reader,
            writer.clone(),
            config.quota(),
            progress_tx,
        ));

        let close_grace = config.close_grace;
        let mut send_path = SendPath {
            client_id,
            config,
            writer,
            interrupt,
            interrupt_open: true,
            progress: progress_rx,
            next_msg_id: 0,
            batches: 0,
        };
        let send = send_path.run().await;

        // A dead socket should make the reader fail on its own, give it a moment to notice
        if send == SendOutcome::WriteFailed {
            let _ = timeout(close_grace, finished(&mut send_path.progress)).await;
        }
        receiver.abort();
        let _ = receiver.await;

        let progress = *send_path.progress.borrow();
        SessionReport {
            client_id,
            sent: send_path.next_msg_id,
            batches: send_path.batches,
            received: progress.received,
            send,
            receive: progress.outcome,
        }
    }
}

async fn receive(
    client_id: usize,
    mut reader: WSReader,
    mut writer: WSWriter,
    quota: usize,
    progress: watch::Sender<ReceiveProgress>,
) {
    let mut received = 0;

    let outcome = loop {
        if received >= quota {
            info!(
                "client {}: received all {} msg, closing connection",
                client_id, received
            );
            if let Err(err) = writer.close_connection().await {
                warn!("client {}: write close: {}", client_id, err);
            }
            break ReceiveOutcome::QuotaReached;
        }

        match reader.next().await {
            Some(Ok(message)) => match decode_server_message(message.as_bytes()) {
                Ok(reply) => {
                    if reply.client_id != client_id {
                        warn!(
                            "client {}: server replied for client {}",
                            client_id, reply.client_id
                        );
                    }
                    received += 1;
                    // Nobody waits on the count, only on the outcome
                    progress.send_if_modified(|state| {
                        state.received = received;
                        false
                    });
                }
                Err(err) => {
                    error!(
                        "client {}: {}, closing receiver. received: {} msg",
                        client_id, err, received
                    );
                    break ReceiveOutcome::DecodeFailed;
                }
            },
            Some(Err(err)) => {
                warn!(
                    "client {}: {}, closing receiver. received: {} msg",
                    client_id, err, received
                );
                break ReceiveOutcome::ReadFailed;
            }
            None => {
                info!(
                    "client {}: server closed the connection. received: {} msg",
                    client_id, received
                );
                break ReceiveOutcome::StreamEnded;
            }
        }
    };

    progress.send_modify(|state| {
        state.received = received;
        state.outcome = Some(outcome);
    });
}

// Resolves once the receive path is over, also when its task is gone
async fn finished(progress: &mut watch::Receiver<ReceiveProgress>) {
    let _ = progress.wait_for(|state| state.outcome.is_some()).await;
}

enum Step {
    ReceiverDone,
    Signal(Result<(), RecvError>),
    Tick,
}

struct SendPath {
    client_id: usize,
    config: LoadConfig,
    writer: WSWriter,
    interrupt: broadcast::Receiver<()>,
    // false once the fleet dropped the interrupt sender without firing it
    interrupt_open: bool,
    progress: watch::Receiver<ReceiveProgress>,
    next_msg_id: usize,
    batches: usize,
}

impl SendPath {
    async fn run(&mut self) -> SendOutcome {
        match self.send_batches().await {
            SendOutcome::Exhausted => self.drain().await,
            outcome => outcome,
        }
    }

    async fn send_batches(&mut self) -> SendOutcome {
        let mut pacer = Pacer::new(self.config.wait);

        while self.batches < self.config.n_batches {
            // biased: a finished receiver or an interrupt always wins over the next tick
            let step = tokio::select! {
                biased;
                _ = finished(&mut self.progress) => Step::ReceiverDone,
                signal = self.interrupt.recv(), if self.interrupt_open => Step::Signal(signal),
                _ = pacer.tick() => Step::Tick,
            };

            match step {
                Step::ReceiverDone => {
                    debug!(
                        "client {}: receiver done after {} batches",
                        self.client_id, self.batches
                    );
                    return SendOutcome::ReceiverDone;
                }
                Step::Signal(signal) => {
                    if self.on_signal(signal).await {
                        return SendOutcome::Interrupted;
                    }
                }
                Step::Tick => {
                    if let Err(err) = self.send_batch().await {
                        error!("client {}: write: {}", self.client_id, err);
                        return SendOutcome::WriteFailed;
                    }
                }
            }
        }

        SendOutcome::Exhausted
    }

    // All batches are out, wait for the receive path to count the replies
    async fn drain(&mut self) -> SendOutcome {
        debug!(
            "client {}: sent {} msg, waiting for replies",
            self.client_id, self.next_msg_id
        );

        loop {
            let step = tokio::select! {
                biased;
                _ = finished(&mut self.progress) => Step::ReceiverDone,
                signal = self.interrupt.recv(), if self.interrupt_open => Step::Signal(signal),
            };

            match step {
                Step::Signal(signal) => {
                    if self.on_signal(signal).await {
                        return SendOutcome::Interrupted;
                    }
                }
                _ => return SendOutcome::Exhausted,
            }
        }
    }

    // Returns true when the signal was an actual interrupt
    async fn on_signal(&mut self, signal: Result<(), RecvError>) -> bool {
        match signal {
            Ok(()) | Err(RecvError::Lagged(_)) => {
                self.interrupt().await;
                true
            }
            Err(RecvError::Closed) => {
                self.interrupt_open = false;
                false
            }
        }
    }

    // Sends the Close frame and gives the server the grace period to answer it
    async fn interrupt(&mut self) {
        info!(
            "client {}: interrupted after {} msg, closing connection",
            self.client_id, self.next_msg_id
        );

        if let Err(err) = self.writer.close_connection().await {
            warn!("client {}: write close: {}", self.client_id, err);
            return;
        }

        if timeout(self.config.close_grace, finished(&mut self.progress))
            .await
            .is_err()
        {
            debug!(
                "client {}: no close from server within {:?}",
                self.client_id, self.config.close_grace
            );
        }
    }

    async fn send_batch(&mut self) -> Result<(), Error> {
        for _ in 0..self.config.batch_size {
            let message = ClientMessage::new(
                self.client_id,
                self.next_msg_id,
                self.config.payload.clone(),
            );
            self.writer
                .send_as_binary(encode_client_message(&message)?)
                .await?;
            self.next_msg_id += 1;
        }
        self.batches += 1;

        Ok(())
    }
}

// Batch clock. The first tick is immediate, a zero period means no pacing at all.
struct Pacer {
    interval: Option<Interval>,
}

impl Pacer {
    fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Self { interval: None };
        }

        let mut interval = interval(period);
        // A slow batch delays the next one instead of triggering a burst to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval: Some(interval),
        }
    }

    async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }
}
