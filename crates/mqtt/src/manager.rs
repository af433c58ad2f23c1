//! High-level session: builds the client, spawns the connection kernel and
//! exposes publish / stop / disconnect to the application.
//!
//! ```ignore
//! let mut session = MqttManager::from_config(config)?.build_and_start()?;
//! session.publish("esp/now/slave1/temp", "23.5")?;
//! session.stop().await?;
//! session.disconnect().await?;
//! ```

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, QoS};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use validator::Validate;

use super::{
    client::ClientBuilder, config::Config, connection::ConnectionKernel, error::TransferError,
    state::ConnectionState,
};

/// Entry point: validates the configuration and starts the session.
pub struct MqttManager {
    config: Config,
}

impl MqttManager {
    /// Creates a manager from a configuration struct.
    pub fn from_config(config: Config) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Builds the client and spawns the connection kernel.
    ///
    /// Returns immediately; the connection result is delivered through
    /// `MqttInstance::state_receiver`. Must be called inside a tokio runtime.
    pub fn build_and_start(self) -> Result<MqttInstance, TransferError> {
        let qos = self.config.qos()?;
        let builder = ClientBuilder::from_config(&self.config)?;
        info!(
            "Connecting to MQTT broker {}:{} as '{}' (keep alive {}s)",
            self.config.host,
            self.config.port,
            builder.client_id(),
            self.config.keep_alive
        );
        let (client, event_loop) = builder.build()?;

        let cancel = CancellationToken::new();
        let kernel = ConnectionKernel::new(event_loop, cancel.clone());
        let state_rx = kernel.subscribe_state();
        let handle = tokio::spawn(kernel.run());

        Ok(MqttInstance {
            client,
            qos,
            retain: self.config.retain,
            disconnect_timeout: Duration::from_millis(self.config.disconnect_timeout_ms),
            cancel,
            kernel: Some(handle),
            event_loop: None,
            state_rx,
        })
    }
}

/// A running MQTT session.
///
/// Owned by exactly one caller; teardown is `stop()` followed by
/// `disconnect()`, both safe to call in any state.
pub struct MqttInstance {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
    disconnect_timeout: Duration,
    cancel: CancellationToken,
    kernel: Option<JoinHandle<EventLoop>>,
    event_loop: Option<EventLoop>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl MqttInstance {
    /// Receiver for connection state notifications.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Queues a publish and returns without waiting for the broker.
    ///
    /// Fails when the request channel is full or the kernel has stopped.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> Result<(), TransferError> {
        self.client
            .try_publish(topic, self.qos, self.retain, payload.into())?;
        Ok(())
    }

    /// Stops the background activity and waits for the kernel to finish.
    ///
    /// Idempotent: a second call is a no-op.
    pub async fn stop(&mut self) -> Result<(), TransferError> {
        self.cancel.cancel();
        let Some(handle) = self.kernel.take() else {
            return Ok(());
        };
        match handle.await {
            Ok(event_loop) => {
                self.event_loop = Some(event_loop);
                debug!("MQTT background activity stopped");
                Ok(())
            }
            Err(e) => Err(TransferError::ConnectionKernel(e.to_string())),
        }
    }

    /// Sends DISCONNECT and flushes it through the returned event loop.
    ///
    /// Without an event loop (kernel failed to join, or `stop` was never
    /// called) the request is only queued.
    pub async fn disconnect(&mut self) -> Result<(), TransferError> {
        self.client.try_disconnect()?;

        let Some(mut event_loop) = self.event_loop.take() else {
            warn!("No MQTT event loop available, DISCONNECT only queued");
            return Ok(());
        };

        let flush = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(TransferError::from(e)),
                }
            }
        };

        match tokio::time::timeout(self.disconnect_timeout, flush).await {
            Ok(Ok(())) => {
                info!("MQTT session closed");
                Ok(())
            }
            Ok(Err(e)) => {
                debug!("Event loop ended before DISCONNECT was flushed: {}", e);
                Ok(())
            }
            Err(_) => Err(TransferError::DisconnectTimeout(
                self.disconnect_timeout.as_millis() as u64,
            )),
        }
    }
}
