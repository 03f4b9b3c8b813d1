// SPDX-License-Identifier: Apache-2.0

//! Errors for the device memory crate.
//!
//! Every variant maps to a stable wire code via [`Error::code`]; adapters put
//! that code verbatim into error responses.

/// Errors that can occur while addressing, reading, or writing device memory.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The device suffix is not present in the loaded profile.
    #[error("unknown device `{device}`")]
    UnknownDevice {
        /// The device suffix that was requested.
        device: String,
    },

    /// An address span, point count, or value is outside the permitted range.
    #[error("{details}")]
    OutOfRange {
        /// A description of the violated bound.
        details: String,
    },

    /// The device does not support the requested address space.
    #[error("{details}")]
    TypeMismatch {
        /// A description of the unsupported space.
        details: String,
    },

    /// The device is not writable.
    #[error("device `{device}` is read-only")]
    ReadOnly {
        /// The device suffix that rejected the write.
        device: String,
    },

    /// The per-device write lock could not be acquired within the timeout.
    #[error("timeout acquiring lock for device `{device}`")]
    LockTimeout {
        /// The device suffix whose lock timed out.
        device: String,
    },

    /// A profile file could not be read.
    #[error("file read error: {details}")]
    FileRead {
        /// A description of the I/O failure.
        details: String,
    },

    /// A profile file could not be deserialized or failed validation.
    #[error("{format} deserialization error: {details}")]
    Deserialization {
        /// The format of the file (e.g. "YAML").
        format: String,
        /// A description of the failure.
        details: String,
    },
}

impl Error {
    /// Returns the stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnknownDevice { .. } => "UNKNOWN_DEVICE",
            Error::OutOfRange { .. } => "OUT_OF_RANGE",
            Error::TypeMismatch { .. } => "TYPE_MISMATCH",
            Error::ReadOnly { .. } => "READONLY",
            Error::LockTimeout { .. } => "LOCK_TIMEOUT",
            Error::FileRead { .. } | Error::Deserialization { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = Error::UnknownDevice {
            device: "ZZ".into(),
        };
        assert_eq!(err.code(), "UNKNOWN_DEVICE");
        assert_eq!(err.to_string(), "unknown device `ZZ`");

        let err = Error::LockTimeout {
            device: "DM".into(),
        };
        assert_eq!(err.code(), "LOCK_TIMEOUT");
    }
}
