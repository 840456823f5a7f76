//! Scan engine: concurrent serial port supervision.
//!
//! Every `scan_interval` seconds the engine enumerates serial ports,
//! filters them through the include/exclude globs, and reconciles the
//! set of attached readers: new candidates get a [`reader::PortReader`],
//! vanished ones are stopped. Runs until SIGINT/SIGTERM.

pub mod reader;

use crate::config::Settings;
use crate::mqtt::MqttPublisher;
use crate::patterns::PortFilter;
use reader::PortReader;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Run the scan loop until a shutdown signal arrives.
pub async fn run(settings: Settings) {
    let settings = Arc::new(settings);
    let filter = PortFilter::new(&settings.include_patterns, &settings.exclude_patterns);
    let (publisher, driver) = MqttPublisher::connect(&settings);

    let mut readers: BTreeMap<String, PortReader> = BTreeMap::new();
    let mut interval = tokio::time::interval(settings.scan_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let wanted: BTreeSet<String> = candidate_ports(&filter).into_iter().collect();

                let detached: Vec<String> = readers
                    .keys()
                    .filter(|device| !wanted.contains(*device))
                    .cloned()
                    .collect();
                for device in detached {
                    info!("Port removed: {device}");
                    if let Some(reader) = readers.remove(&device) {
                        reader.stop().await;
                    }
                }

                for device in wanted {
                    if !readers.contains_key(&device) {
                        info!("Port attached: {device}");
                        let reader = PortReader::start(
                            device.clone(),
                            publisher.clone(),
                            Arc::clone(&settings),
                        )
                        .await;
                        readers.insert(device, reader);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Signal received, starting graceful shutdown...");
                break;
            }
        }
    }

    for (_, reader) in readers {
        reader.stop().await;
    }
    publisher.disconnect().await;
    driver.abort();
}

/// Enumerate serial ports and apply the include/exclude filter.
///
/// Enumeration failure is treated as an empty device set; the next
/// tick retries.
pub fn candidate_ports(filter: &PortFilter) -> Vec<String> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(err) => {
            warn!("Port enumeration failed: {err}");
            return Vec::new();
        }
    };

    let mut candidates: Vec<String> = ports
        .into_iter()
        .map(|info| info.port_name)
        .filter(|name| filter.allows(name))
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
