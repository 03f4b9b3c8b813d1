// SPDX-License-Identifier: Apache-2.0

//! The line-delimited TCP adapter server.
//!
//! One accept loop per adapter; each connection is handled on its own task.
//! Frames are newline-delimited UTF-8 JSON, one request and one response per
//! frame. Handlers call device memory directly: writes are serialized per
//! device by the memory's own locks, so adapters need no extra coordination.

use crate::error::Error;
use crate::schema::{Command, Request, Response};
use plcsim_config::{AdapterLimits, AdapterSettings};
use plcsim_memory::{DeviceMemory, Source, wal::epoch_millis};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A TCP adapter bound to one listening address.
pub struct LineAdapter {
    name: String,
    settings: AdapterSettings,
    source: Source,
    mem: Arc<DeviceMemory>,
}

impl LineAdapter {
    /// Creates an adapter serving `mem` with the given settings.
    #[must_use]
    pub fn new(mem: Arc<DeviceMemory>, settings: AdapterSettings) -> Self {
        Self {
            name: settings.name.clone(),
            source: Source::adapter(&settings.name),
            settings,
            mem,
        }
    }

    /// Accepts connections until `cancel` is set. In-flight handlers finish
    /// their current request; the accept loop stops immediately.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), Error> {
        let listener =
            TcpListener::bind(self.settings.listen)
                .await
                .map_err(|e| Error::Bind {
                    addr: self.settings.listen,
                    details: e.to_string(),
                })?;
        info!(adapter = %self.name, listen = %self.settings.listen, readonly = self.settings.readonly, "adapter listening");
        let shared = Arc::new(self);
        loop {
            tokio::select! {
                biased; // Prioritize shutdown over new connections.

                _ = cancel.cancelled() => break,

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(adapter = %shared.name, %peer, "client connected");
                            let handler = shared.clone();
                            let _ = tokio::spawn(async move {
                                if let Err(err) = handler.handle_client(stream).await {
                                    debug!(adapter = %handler.name, %err, "connection closed");
                                }
                            });
                        }
                        Err(err) => {
                            warn!(adapter = %shared.name, %err, "accept failed");
                        }
                    }
                }
            }
        }
        info!(adapter = %shared.name, "adapter stopped");
        Ok(())
    }

    async fn handle_client(&self, stream: TcpStream) -> std::io::Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).await?;
            if read == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                let _ = line.pop();
            }
            if line.last() == Some(&b'\r') {
                let _ = line.pop();
            }
            let response = if line.len() > self.settings.limits.max_frame_bytes {
                Response::from_error(&Error::FrameTooLarge)
            } else {
                self.handle_line(&line)
            };
            let mut payload = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
            payload.push(b'\n');
            write_half.write_all(&payload).await?;
        }
        Ok(())
    }

    /// Decodes, validates, and dispatches one frame, mapping every failure
    /// onto an error response.
    pub(crate) fn handle_line(&self, line: &[u8]) -> Response {
        match self.process(line) {
            Ok(response) => response,
            Err(err) => Response::from_error(&err),
        }
    }

    fn process(&self, line: &[u8]) -> Result<Response, Error> {
        let request: Request =
            serde_json::from_slice(line).map_err(|e| Error::InvalidRequest {
                details: e.to_string(),
            })?;
        let command = request.command()?;
        debug!(adapter = %self.name, id = ?request.id, command = ?command, "request");
        let limits: &AdapterLimits = &self.settings.limits;
        match command {
            Command::Read {
                dev,
                space,
                addr,
                count,
            } => {
                if count as usize > limits.max_points_per_request {
                    return Err(Error::TooManyPoints {
                        details: format!(
                            "count {count} exceeds limit {}",
                            limits.max_points_per_request
                        ),
                    });
                }
                let values = self.mem.read(dev, space, addr, count, &self.source)?;
                Ok(Response::read_ok(values, self.mem.current_scan_id()))
            }
            Command::Write {
                dev,
                space,
                addr,
                values,
            } => {
                if values.len() > limits.max_points_per_request {
                    return Err(Error::TooManyPoints {
                        details: format!(
                            "{} values exceed limit {}",
                            values.len(),
                            limits.max_points_per_request
                        ),
                    });
                }
                if self.settings.readonly {
                    return Err(Error::ReadonlyAdapter {
                        adapter: self.name.clone(),
                    });
                }
                self.mem.write(dev, space, addr, values, &self.source)?;
                Ok(Response::write_ok(self.mem.current_scan_id(), epoch_millis()))
            }
        }
    }
}
