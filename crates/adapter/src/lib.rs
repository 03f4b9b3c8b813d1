// SPDX-License-Identifier: Apache-2.0

//! Line-delimited TCP adapters for the PLC simulator.
//!
//! Adapters are the external surface of device memory: UTF-8, one JSON
//! request and one response per newline-delimited frame. Each adapter tags
//! its operations with an `adapter:<name>` source, so deferred writes stay
//! attributable and ladder-only read routing is unaffected.

pub mod error;
pub mod schema;
pub mod server;

pub use error::Error;
pub use schema::{Request, Response};
pub use server::LineAdapter;
