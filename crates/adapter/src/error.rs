// SPDX-License-Identifier: Apache-2.0

//! Errors for the adapter crate.

use std::net::SocketAddr;

/// Errors raised while serving adapter requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A device memory operation failed.
    #[error(transparent)]
    Device(#[from] plcsim_memory::Error),

    /// The request violates the wire schema.
    #[error("invalid request: {details}")]
    InvalidRequest {
        /// A description of the schema violation.
        details: String,
    },

    /// The request touches more points than the adapter permits.
    #[error("{details}")]
    TooManyPoints {
        /// A description of the exceeded cap.
        details: String,
    },

    /// A write reached an adapter configured as readonly.
    #[error("adapter `{adapter}` is read-only")]
    ReadonlyAdapter {
        /// Name of the rejecting adapter.
        adapter: String,
    },

    /// A frame exceeded the configured byte cap.
    #[error("frame too large")]
    FrameTooLarge,

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {details}")]
    Bind {
        /// The requested listening address.
        addr: SocketAddr,
        /// A description of the failure.
        details: String,
    },
}

impl Error {
    /// Returns the stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::Device(err) => err.code(),
            Error::InvalidRequest { .. } | Error::FrameTooLarge => "INVALID_REQUEST",
            Error::TooManyPoints { .. } => "TOO_MANY_POINTS",
            Error::ReadonlyAdapter { .. } | Error::Bind { .. } => "INTERNAL_ERROR",
        }
    }
}
