// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use miette::Diagnostic;

/// Errors that can occur while loading or validating the simulator
/// configuration.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// A collection of errors found while validating the configuration.
    #[error("Invalid configuration: {errors:?}")]
    #[diagnostic(code(plcsim::config::invalid_configuration))]
    InvalidConfiguration {
        /// Every problem found during validation.
        #[related]
        errors: Vec<Error>,
    },

    /// An error that occurred while reading a configuration file.
    #[error("File read error: {details}")]
    #[diagnostic(code(plcsim::config::file_read_error))]
    FileReadError {
        /// A description of the error that occurred.
        details: String,
    },

    /// An error that occurred while deserializing a configuration file.
    #[error("{format} deserialization error: {details}")]
    #[diagnostic(code(plcsim::config::deserialization_error))]
    DeserializationError {
        /// The format of the configuration file (e.g. "YAML").
        format: String,
        /// A description of the error that occurred.
        details: String,
    },

    /// A setting holds an unusable value.
    #[error("Invalid setting `{field}`: {details}")]
    #[diagnostic(code(plcsim::config::invalid_setting))]
    InvalidSetting {
        /// The offending configuration field.
        field: String,
        /// Why the value is unusable.
        details: String,
    },
}
