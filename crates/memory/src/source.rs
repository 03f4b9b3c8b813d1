// SPDX-License-Identifier: Apache-2.0

//! Origin tags for memory operations.

use serde::Serialize;
use std::fmt;

/// Identifies who issued a read or write.
///
/// The tag both labels WAL entries and steers read routing: ladder-origin
/// reads of IO_IMAGE devices resolve against the frozen image instead of the
/// live store. Conventional forms are `ladder:<module>` and
/// `adapter:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    /// Prefix of ladder-origin tags.
    pub const LADDER_PREFIX: &'static str = "ladder:";
    /// Prefix of adapter-origin tags.
    pub const ADAPTER_PREFIX: &'static str = "adapter:";

    /// Tag for a ladder module.
    #[must_use]
    pub fn ladder(module: &str) -> Self {
        Self(format!("{}{module}", Self::LADDER_PREFIX))
    }

    /// Tag for an external adapter.
    #[must_use]
    pub fn adapter(name: &str) -> Self {
        Self(format!("{}{name}", Self::ADAPTER_PREFIX))
    }

    /// Tag with an arbitrary form.
    #[must_use]
    pub fn other(tag: &str) -> Self {
        Self(tag.to_string())
    }

    /// Whether the tag is ladder-origin.
    #[must_use]
    pub fn is_ladder(&self) -> bool {
        self.0.starts_with("ladder")
    }

    /// Whether the tag starts with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// The tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
