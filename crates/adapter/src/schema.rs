// SPDX-License-Identifier: Apache-2.0

//! Wire schema of the line-delimited request/response protocol.
//!
//! One JSON object per frame. Deserialization rejects unknown keys; the
//! per-operation rules (read wants `count`, write wants `values`, never both)
//! are enforced by [`Request::command`].

use crate::error::Error;
use plcsim_memory::{CellValue, Space};
use serde::{Deserialize, Serialize};

/// Requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Read consecutive cells.
    Read,
    /// Write consecutive cells.
    Write,
}

/// A decoded request frame, before per-operation validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    /// Optional client-side correlation id; accepted and ignored.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Requested operation.
    pub op: Op,
    /// Target address space.
    pub space: Space,
    /// Target device suffix.
    pub dev: String,
    /// First target address.
    pub addr: u32,
    /// Point count (reads only).
    #[serde(default)]
    pub count: Option<u32>,
    /// Values to store (writes only).
    #[serde(default)]
    pub values: Option<Vec<CellValue>>,
}

/// A validated request, borrowing from the decoded frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Read `count` cells from `dev`/`space` starting at `addr`.
    Read {
        /// Target device suffix.
        dev: &'a str,
        /// Target address space.
        space: Space,
        /// First address.
        addr: u32,
        /// Point count.
        count: u32,
    },
    /// Write `values` to `dev`/`space` starting at `addr`.
    Write {
        /// Target device suffix.
        dev: &'a str,
        /// Target address space.
        space: Space,
        /// First address.
        addr: u32,
        /// Values to store.
        values: &'a [CellValue],
    },
}

impl Request {
    /// Applies the per-operation schema rules and returns the validated
    /// command.
    pub fn command(&self) -> Result<Command<'_>, Error> {
        if self.dev.is_empty() {
            return Err(Error::InvalidRequest {
                details: "dev required".to_string(),
            });
        }
        match self.op {
            Op::Read => {
                if self.values.is_some() {
                    return Err(Error::InvalidRequest {
                        details: "additional properties are not allowed".to_string(),
                    });
                }
                let count = self.count.ok_or_else(|| Error::InvalidRequest {
                    details: "count must be >= 1".to_string(),
                })?;
                if count < 1 {
                    return Err(Error::InvalidRequest {
                        details: "count must be >= 1".to_string(),
                    });
                }
                Ok(Command::Read {
                    dev: &self.dev,
                    space: self.space,
                    addr: self.addr,
                    count,
                })
            }
            Op::Write => {
                if self.count.is_some() {
                    return Err(Error::InvalidRequest {
                        details: "additional properties are not allowed".to_string(),
                    });
                }
                let values = self
                    .values
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| Error::InvalidRequest {
                        details: "values must be non-empty array".to_string(),
                    })?;
                Ok(Command::Write {
                    dev: &self.dev,
                    space: self.space,
                    addr: self.addr,
                    values,
                })
            }
        }
    }
}

/// Diagnostics attached to successful responses.
#[derive(Debug, Serialize)]
pub struct Diag {
    /// The current scan id.
    pub scan: u64,
    /// Epoch milliseconds of the write, writes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
}

/// Error body of failed responses.
#[derive(Debug, Serialize)]
pub struct ErrBody {
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional extra context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A response frame.
#[derive(Debug, Serialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub ok: bool,
    /// Read results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<CellValue>>,
    /// Diagnostics for successful requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diag: Option<Diag>,
    /// Error body for failed requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<ErrBody>,
}

impl Response {
    /// A successful read response.
    #[must_use]
    pub fn read_ok(values: Vec<CellValue>, scan: u64) -> Self {
        Self {
            ok: true,
            values: Some(values),
            diag: Some(Diag {
                scan,
                time_ms: None,
            }),
            err: None,
        }
    }

    /// A successful write response.
    #[must_use]
    pub fn write_ok(scan: u64, time_ms: u64) -> Self {
        Self {
            ok: true,
            values: None,
            diag: Some(Diag {
                scan,
                time_ms: Some(time_ms),
            }),
            err: None,
        }
    }

    /// A failure response carrying the error's wire code and message.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        Self {
            ok: false,
            values: None,
            diag: None,
            err: Some(ErrBody {
                code: error.code(),
                message: error.to_string(),
                detail: None,
            }),
        }
    }
}
