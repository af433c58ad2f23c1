use std::{process, time::Duration};

use espnow_bridge::{
    config::Config,
    core::{bridge::Bridge, dispatch::Dispatcher, monitor, serial::SerialLineSource},
    logger::LoggerManager,
    print_error,
};
use espnow_bridge_mqtt::MqttManager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let cfg = Config::new().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });

    info!("Starting espnow-bridge version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.serial);
    debug!("{:#?}", cfg.transport);

    let source = SerialLineSource::open(&cfg.serial).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });

    let session = MqttManager::from_config(cfg.transport.clone())
        .and_then(MqttManager::build_and_start)
        .unwrap_or_else(|e| {
            error!("Failed to start MQTT client: {}", e);
            process::exit(1);
        });
    let monitor = monitor::spawn(session.state_receiver());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown...");
                    cancel.cancel();
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        });
    }

    let mut bridge = Bridge::new(
        source,
        session,
        Dispatcher::from_config(&cfg.telemetry),
        Duration::from_millis(cfg.serial.poll_interval_ms),
    );

    let run_result = bridge.run(cancel).await;
    let shutdown_result = bridge.shutdown().await;

    // The kernel has stopped; the monitor drains the last state and exits.
    if tokio::time::timeout(Duration::from_millis(100), monitor)
        .await
        .is_err()
    {
        debug!("Connection monitor still running at exit");
    }

    if let Err(e) = &shutdown_result {
        error!("{}", e);
    }
    if run_result.is_err() || shutdown_result.is_err() {
        process::exit(1);
    }
}
