// SPDX-License-Identifier: Apache-2.0

//! Errors for the scan engine crate.

/// Errors raised by ladder modules and the scan executive.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A device memory operation failed.
    #[error(transparent)]
    Memory(#[from] plcsim_memory::Error),

    /// A ladder module reported a failure of its own.
    #[error("module `{module}` failed: {details}")]
    ModuleFailed {
        /// Name of the failing module.
        module: String,
        /// A description of the failure.
        details: String,
    },
}

impl Error {
    /// Convenience constructor for module-reported failures.
    #[must_use]
    pub fn module_failed(module: &str, details: impl Into<String>) -> Self {
        Error::ModuleFailed {
            module: module.to_string(),
            details: details.into(),
        }
    }
}
