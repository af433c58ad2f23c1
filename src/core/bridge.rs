//! Bridge context: owns the serial source and the MQTT session, drives the
//! dispatch loop and tears both down exactly once.
//!
//! ```text
//!            poll tick                 process_line
//! LineSource ─────────► Bridge::run ────────────────► Dispatcher ──► Session::publish
//!                            │
//!                  cancel / serial error
//!                            ▼
//!                   Bridge::shutdown: close serial ─► stop session ─► disconnect
//! ```

use std::{io, time::Duration};

use async_trait::async_trait;
use espnow_bridge_mqtt::MqttInstance;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{
    dispatch::{Dispatcher, LineOutcome, Publisher},
    error::BridgeError,
    serial::LineSource,
};

/// Publish side of the bridge plus its two-step teardown.
#[async_trait]
pub trait Session: Publisher + Send {
    /// Stops background activity (keepalive, acknowledgements).
    async fn stop(&mut self) -> Result<(), BridgeError>;

    /// Closes the session with the broker.
    async fn disconnect(&mut self) -> Result<(), BridgeError>;
}

impl Publisher for MqttInstance {
    fn publish(&self, topic: &str, payload: String) -> Result<(), BridgeError> {
        MqttInstance::publish(self, topic, payload).map_err(|source| BridgeError::Publish {
            topic: topic.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Session for MqttInstance {
    async fn stop(&mut self) -> Result<(), BridgeError> {
        Ok(MqttInstance::stop(self).await?)
    }

    async fn disconnect(&mut self) -> Result<(), BridgeError> {
        Ok(MqttInstance::disconnect(self).await?)
    }
}

/// Per-outcome line counters, logged on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub published: u64,
    pub publish_failures: u64,
    pub decode_failed: u64,
    pub parse_failed: u64,
    pub unknown_source: u64,
}

impl LineStats {
    fn record(&mut self, outcome: LineOutcome) {
        match outcome {
            LineOutcome::Published { failed, .. } => {
                self.published += 1;
                self.publish_failures += failed as u64;
            }
            LineOutcome::DecodeFailed => self.decode_failed += 1,
            LineOutcome::ParseFailed => self.parse_failed += 1,
            LineOutcome::UnknownSource(_) => self.unknown_source += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.published + self.decode_failed + self.parse_failed + self.unknown_source
    }
}

pub struct Bridge<S, M> {
    source: S,
    session: M,
    dispatcher: Dispatcher,
    poll_interval: Duration,
    stats: LineStats,
}

impl<S, M> Bridge<S, M>
where
    S: LineSource,
    M: Session,
{
    pub fn new(source: S, session: M, dispatcher: Dispatcher, poll_interval: Duration) -> Self {
        Self {
            source,
            session,
            dispatcher,
            poll_interval,
            stats: LineStats::default(),
        }
    }

    pub fn stats(&self) -> &LineStats {
        &self.stats
    }

    /// Polls the source every `poll_interval` and dispatches every complete
    /// line, until `cancel` fires or the source fails.
    ///
    /// Returns `BridgeError::SerialIo` when the source fails. Either way the
    /// caller still owns the bridge and must call [`Bridge::shutdown`].
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), BridgeError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Listening for telemetry (poll interval {} ms)",
            self.poll_interval.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Exiting...");
                    return Ok(());
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.drain() {
                        error!("Serial read failed, leaving dispatch loop: {}", e);
                        return Err(BridgeError::SerialIo(e));
                    }
                }
            }
        }
    }

    /// Dispatches every line that is complete right now.
    fn drain(&mut self) -> io::Result<()> {
        while let Some(line) = self.source.next_line()? {
            let outcome = self.dispatcher.process_line(&line, &self.session);
            self.stats.record(outcome);
        }
        Ok(())
    }

    /// Closes the serial source, stops the session, then disconnects it.
    ///
    /// Every step runs even if an earlier one failed; failures are logged
    /// and returned together as `BridgeError::Teardown`.
    pub async fn shutdown(mut self) -> Result<(), BridgeError> {
        let mut errors = Vec::new();

        debug!("Closing serial port");
        if let Err(e) = self.source.close() {
            error!("Failed to close serial port: {}", e);
            errors.push(BridgeError::SerialIo(e));
        }

        debug!("Stopping MQTT background activity");
        if let Err(e) = self.session.stop().await {
            error!("Failed to stop MQTT client: {}", e);
            errors.push(e);
        }

        debug!("Disconnecting from MQTT broker");
        if let Err(e) = self.session.disconnect().await {
            error!("Failed to disconnect from MQTT broker: {}", e);
            errors.push(e);
        }

        let stats = self.stats;
        info!(
            "Processed {} line(s): {} published, {} unrecognized, {} unknown slave, {} undecodable, {} failed publish(es)",
            stats.total(),
            stats.published,
            stats.parse_failed,
            stats.unknown_source,
            stats.decode_failed,
            stats.publish_failures
        );

        if errors.is_empty() {
            info!("Shutdown complete");
            Ok(())
        } else {
            Err(BridgeError::Teardown(errors))
        }
    }
}
