//! Connection monitor: reports MQTT connection state changes in the log.
//!
//! The dispatch loop never waits on the connection. Publishes made before
//! the broker accepted the session are queued by the client, those made
//! after the session is lost fail and are logged by the dispatcher.

use espnow_bridge_mqtt::ConnectionState;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

/// Logs one connection state.
///
/// A session that ends before any `Connected` was seen is reported as a
/// failed connect, not as a lost connection.
pub fn report(state: &ConnectionState, was_connected: bool) {
    match state {
        ConnectionState::Connecting => debug!("Connecting to MQTT broker..."),
        ConnectionState::Connected => info!("Connected to MQTT broker"),
        ConnectionState::Refused(code) => error!("Failed to connect, return code {}", code),
        ConnectionState::Disconnected(reason) if was_connected => {
            error!("Lost connection to MQTT broker: {}", reason)
        }
        ConnectionState::Disconnected(reason) => error!("Failed to connect: {}", reason),
        ConnectionState::Stopped => debug!("MQTT background activity stopped"),
    }
}

/// Follows `state_rx` until the sender side is dropped.
pub async fn listen(mut state_rx: watch::Receiver<ConnectionState>) {
    debug!("Launching connection state monitor");

    let mut was_connected = false;
    let mut state = state_rx.borrow_and_update().clone();
    loop {
        report(&state, was_connected);
        was_connected |= state.is_connected();

        if state_rx.changed().await.is_err() {
            break;
        }
        state = state_rx.borrow_and_update().clone();
    }

    debug!("Connection state channel closed, monitor stopped");
}

/// Spawns [`listen`] on the current runtime.
pub fn spawn(state_rx: watch::Receiver<ConnectionState>) -> JoinHandle<()> {
    tokio::spawn(listen(state_rx))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tracing_test::traced_test;

    use super::*;

    #[traced_test]
    #[tokio::test]
    async fn test_monitor_logs_transitions() {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        let driver = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(ConnectionState::Connected).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(ConnectionState::Disconnected("connection reset".into()))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        };

        tokio::time::timeout(Duration::from_secs(2), async {
            tokio::join!(listen(rx), driver)
        })
        .await
        .expect("monitor did not stop");

        assert!(logs_contain("Connected to MQTT broker"));
        assert!(logs_contain("Lost connection to MQTT broker: connection reset"));
        assert!(logs_contain("monitor stopped"));
    }

    #[tokio::test]
    async fn test_spawned_monitor_ends_with_channel() {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        let handle = spawn(rx);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }

    #[traced_test]
    #[tokio::test]
    async fn test_monitor_reports_initial_state() {
        let (tx, rx) = watch::channel(ConnectionState::Refused(5));
        drop(tx);

        listen(rx).await;

        assert!(logs_contain("Failed to connect, return code 5"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_disconnect_before_connack_is_failed_connect() {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        tx.send(ConnectionState::Disconnected("Connection refused (os error 111)".into()))
            .unwrap();
        drop(tx);

        listen(rx).await;

        assert!(logs_contain("Failed to connect: Connection refused (os error 111)"));
        assert!(!logs_contain("Lost connection to MQTT broker"));
    }
}
