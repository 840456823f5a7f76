//! Per-port reader task.
//!
//! Each attached device gets one `PortReader`: it opens the port,
//! announces the connection over MQTT, optionally probes the device,
//! and then forwards every line of output until EOF, error, or the
//! scan loop detaches it.

use crate::config::Settings;
use crate::mqtt::MqttPublisher;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;
use tracing::{debug, warn};

/// Baud rate used for every scanned port.
pub const DEFAULT_BAUD: u32 = 9600;

/// A running (or failed) reader attached to one device path.
pub struct PortReader {
    device: String,
    task: Option<JoinHandle<()>>,
}

impl PortReader {
    /// Attach to a device and start forwarding its output.
    ///
    /// An open failure publishes a retained `error` status and yields a
    /// reader with no task; the device stays attached so it is not
    /// retried until it disappears and re-enumerates.
    pub async fn start(
        device: String,
        publisher: MqttPublisher,
        settings: Arc<Settings>,
    ) -> Self {
        let builder = tokio_serial::new(device.as_str(), DEFAULT_BAUD);
        let mut stream = match SerialStream::open(&builder) {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Failed to open {device}: {err}");
                publish_status(&publisher, &device, "error", Some(err.to_string())).await;
                return Self { device, task: None };
            }
        };

        publish_status(&publisher, &device, "connected", None).await;

        // Optional probe: send an identification command once.
        if !settings.probe_command.is_empty() {
            let probe = format!("{}\r\n", settings.probe_command);
            if let Err(err) = stream.write_all(probe.as_bytes()).await {
                debug!("Probe write to {device} failed: {err}");
            }
        }

        if settings.enable_discovery {
            if let Err(err) = publisher
                .publish_discovery(&device, &settings.discovery_prefix)
                .await
            {
                warn!("Discovery publish for {device} failed: {err}");
            }
        }

        let task = tokio::spawn(read_loop(stream, device.clone(), publisher));
        Self {
            device,
            task: Some(task),
        }
    }

    /// Stop the reader and release the port.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!("Reader for {} stopped", self.device);
    }
}

async fn read_loop<R>(stream: R, device: String, publisher: MqttPublisher)
where
    R: AsyncRead + Unpin + Send,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        match next_line_lossy(&mut reader, &mut buf).await {
            Ok(Some(payload)) => {
                if payload.is_empty() {
                    continue;
                }
                if let Err(err) = publisher.publish_data(&device, &payload).await {
                    warn!("Data publish for {device} failed: {err}");
                }
            }
            Ok(None) => {
                publish_status(&publisher, &device, "disconnected", Some("eof".to_string())).await;
                break;
            }
            Err(err) => {
                publish_status(&publisher, &device, "error", Some(err.to_string())).await;
                break;
            }
        }
    }
}

/// Read the next raw line and decode it tolerantly.
///
/// Devices at a guessed baud rate emit garbage bytes; a line that is
/// not valid UTF-8 is decoded lossily instead of erroring, so one bad
/// line never stops the stream. Returns `Ok(None)` at EOF.
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf).trim().to_string()))
}


async fn publish_status(
    publisher: &MqttPublisher,
    device: &str,
    state: &str,
    error: Option<String>,
) {
    if let Err(err) = publisher.publish_status(device, state, error).await {
        warn!("Status publish for {device} failed: {err}");
    }
}
