//! MQTT client builder.
//!
//! Wraps rumqttc's `MqttOptions` so the rest of the crate never touches the
//! option struct directly. `build()` returns the `AsyncClient` (request side)
//! and its `EventLoop` (network side); the two must be used together.
//!
//! ```ignore
//! let (client, event_loop) = ClientBuilder::from_config(&config)?.build()?;
//! ```

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use validator::Validate;

use super::{config::Config, error::TransferError};

/// Fluent builder for an `AsyncClient` / `EventLoop` pair.
pub struct ClientBuilder {
    /// MQTT protocol options (host, port, keep-alive, ...)
    opts: MqttOptions,

    /// Capacity of the request channel between client and event loop.
    cap: usize,
}

impl ClientBuilder {
    /// Creates a builder with rumqttc defaults for everything but the address.
    pub fn new(
        client_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        cap: usize,
    ) -> Result<Self, TransferError> {
        if cap == 0 {
            return Err(TransferError::ClientSetup(
                "Request channel capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            opts: MqttOptions::new(client_id, host, port),
            cap,
        })
    }

    /// Creates a builder from a validated `Config`.
    ///
    /// An empty `client_id` is replaced by a random UUID so two bridges on
    /// the same broker never kick each other off.
    pub fn from_config(config: &Config) -> Result<Self, TransferError> {
        config.validate()?;

        let client_id = if config.client_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            config.client_id.clone()
        };

        Ok(Self::new(
            client_id,
            config.host.clone(),
            config.port,
            config.request_channel_capacity,
        )?
        .keep_alive(config.keep_alive)
        .clean_session(config.clean_session))
    }

    /// Sets the keep-alive interval (in seconds).
    pub fn keep_alive(mut self, secs: u64) -> Self {
        self.opts.set_keep_alive(Duration::from_secs(secs));
        self
    }

    /// Configures whether to use a clean session.
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.opts.set_clean_session(clean);
        self
    }

    /// Client identifier the builder will connect with.
    pub fn client_id(&self) -> String {
        self.opts.client_id()
    }

    /// Consumes the builder. No network activity happens until the event
    /// loop is polled.
    pub fn build(self) -> Result<(AsyncClient, EventLoop), TransferError> {
        Ok(AsyncClient::new(self.opts, self.cap))
    }
}
