//! Connection kernel: the background task that drives rumqttc's event loop.
//!
//! The kernel owns the `EventLoop`, turns CONNACK and event-loop errors into
//! `ConnectionState` notifications, and hands the event loop back when it
//! stops so the owner can still flush a DISCONNECT.
//!
//! ```text
//! MqttInstance::publish ──► AsyncClient ──(request channel)──► EventLoop
//!                                                                 │
//!                                      ConnectionKernel::run ◄────┘
//!                                                │
//!                                   watch::Sender<ConnectionState>
//! ```
//!
//! The kernel never reconnects. The first connection error is reported and
//! ends the task; requests queued after that fail on the client side.

use rumqttc::{ConnectReturnCode, ConnectionError, Event, EventLoop, Packet};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::state::ConnectionState;

/// Drives the event loop until cancelled or until the session fails.
pub struct ConnectionKernel {
    /// The event loop that performs all network I/O.
    event_loop: EventLoop,

    /// Cancelled by the owner to stop background activity.
    cancel: CancellationToken,

    /// Connection state broadcast.
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionKernel {
    /// Creates a kernel in the `Connecting` state.
    pub fn new(event_loop: EventLoop, cancel: CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            event_loop,
            cancel,
            state_tx,
        }
    }

    /// Returns a receiver that sees the current state and every change.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Broadcasts `state` if it differs from the current one.
    fn update_state(&self, state: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state.clone();
            true
        });
        if changed {
            debug!("Connection state changed to: {}", state);
        }
    }

    /// Polls the event loop until cancellation or the first connection error.
    ///
    /// Returns the event loop so the owner can flush a DISCONNECT after the
    /// background activity has stopped.
    pub async fn run(mut self) -> EventLoop {
        self.update_state(ConnectionState::Connecting);
        info!("Starting MQTT connection event loop...");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Stop requested, leaving MQTT event loop");
                    self.update_state(ConnectionState::Stopped);
                    break;
                }

                event = self.event_loop.poll() => match event {
                    Ok(event) => self.handle_event(event),
                    Err(e) => {
                        self.handle_error(e);
                        break;
                    }
                }
            }
        }

        self.event_loop
    }

    fn handle_event(&self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    self.update_state(ConnectionState::Connected);
                } else {
                    self.update_state(ConnectionState::Refused(ack.code as u8));
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Disconnected by broker");
                self.update_state(ConnectionState::Disconnected(
                    "Disconnected by broker".into(),
                ));
            }
            Event::Incoming(packet) => trace!("Incoming packet: {:?}", packet),
            Event::Outgoing(outgoing) => trace!("Outgoing packet: {:?}", outgoing),
        }
    }

    fn handle_error(&self, err: ConnectionError) {
        match err {
            ConnectionError::ConnectionRefused(code) => {
                self.update_state(ConnectionState::Refused(code as u8));
            }
            other => {
                self.update_state(ConnectionState::Disconnected(root_cause(&other)));
            }
        }
    }
}

/// Innermost message of an error chain, without surrounding quotes.
fn root_cause(e: &dyn std::error::Error) -> String {
    let mut current = e;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{client::ClientBuilder, config::Config};

    fn unreachable_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            // Port 9 (discard) is closed on test machines; connect is refused.
            port: 9,
            client_id: "kernel_test".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_connecting() {
        let (_client, event_loop) = ClientBuilder::from_config(&unreachable_config())
            .unwrap()
            .build()
            .unwrap();
        let kernel = ConnectionKernel::new(event_loop, CancellationToken::new());
        assert_eq!(*kernel.subscribe_state().borrow(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_update_state_notifies_only_on_change() {
        let (_client, event_loop) = ClientBuilder::from_config(&unreachable_config())
            .unwrap()
            .build()
            .unwrap();
        let kernel = ConnectionKernel::new(event_loop, CancellationToken::new());
        let mut rx = kernel.subscribe_state();

        kernel.update_state(ConnectionState::Connecting);
        assert!(!rx.has_changed().unwrap());

        kernel.update_state(ConnectionState::Connected);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_cancel_stops_kernel() {
        let (_client, event_loop) = ClientBuilder::from_config(&unreachable_config())
            .unwrap()
            .build()
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let kernel = ConnectionKernel::new(event_loop, cancel);
        let rx = kernel.subscribe_state();
        let handle = tokio::spawn(kernel.run());

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("kernel did not stop")
            .unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn test_connection_error_ends_kernel() {
        let (_client, event_loop) = ClientBuilder::from_config(&unreachable_config())
            .unwrap()
            .build()
            .unwrap();
        let kernel = ConnectionKernel::new(event_loop, CancellationToken::new());
        let rx = kernel.subscribe_state();

        tokio::time::timeout(Duration::from_secs(10), kernel.run())
            .await
            .expect("kernel kept running after a connection error");
        assert!(matches!(*rx.borrow(), ConnectionState::Disconnected(_)));
    }

    #[test]
    fn test_root_cause_strips_quotes() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "\"boom\"");
        assert_eq!(root_cause(&err), "boom");
    }
}
